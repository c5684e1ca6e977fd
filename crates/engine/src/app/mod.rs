mod events;
mod loop_runner;
mod rendering;
mod scene;
mod tools;

pub use events::{EventKind, InputEvent, KeyCode, MouseMode};
pub use loop_runner::{run_app, AppError, Application, EngineConfig, EngineContext};
pub use rendering::{Renderer, Viewport};
pub use scene::{AnimatedModel, AnimationPlayback, Camera, Node, NodeId, Scene, SceneId};
pub use tools::ConsoleState;

pub use winit::keyboard::KeyCode;

/// Events delivered to an [`Application`](super::Application) by the frame
/// loop. Key and mouse events arrive as the platform dispatches them;
/// `FrameUpdate` fires exactly once per rendered frame, before presentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown { key: KeyCode },
    KeyUp { key: KeyCode },
    MouseMove { dx: f32, dy: f32 },
    FrameUpdate { timestep: f32 },
}

impl InputEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InputEvent::KeyDown { .. } => EventKind::KeyDown,
            InputEvent::KeyUp { .. } => EventKind::KeyUp,
            InputEvent::MouseMove { .. } => EventKind::MouseMove,
            InputEvent::FrameUpdate { .. } => EventKind::FrameUpdate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    KeyDown,
    KeyUp,
    MouseMove,
    FrameUpdate,
}

/// Relative grabs and hides the cursor for mouselook; Absolute leaves it
/// free and visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMode {
    Relative,
    Absolute,
}

mod bootstrap;
mod character;
mod input;

pub use bootstrap::BootstrapError;

use std::collections::HashMap;

use engine::{
    Application, EngineConfig, EngineContext, EventKind, InputEvent, MouseMode, Scene, Viewport,
};
use thiserror::Error;
use tracing::info;

use character::Character;
use input::{Intent, IntentTracker, IntentTransition};

const MOUSE_SENSITIVITY: f32 = 0.22;
const WINDOW_TITLE: &str = "First Person Shooter Demo";
const MAIN_VIEWPORT_SLOT: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unconfigured,
    Configured,
    Running,
    Stopped,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("start requires a configured application, but state was {state:?}")]
    InvalidState { state: LifecycleState },
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
}

type Handler = fn(&mut FpsApplication, &mut EngineContext, &InputEvent);

/// The sample application: owns the scene and character for the session,
/// maps raw input onto the character controls, and applies the per-frame
/// mouse rotation ahead of the simulation step.
pub struct FpsApplication {
    state: LifecycleState,
    handlers: HashMap<EventKind, Handler>,
    scene: Option<Scene>,
    character: Option<Character>,
    intents: IntentTracker,
    mouse_delta: (f32, f32),
}

impl FpsApplication {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Unconfigured,
            handlers: HashMap::new(),
            scene: None,
            character: None,
            intents: IntentTracker::default(),
            mouse_delta: (0.0, 0.0),
        }
    }

    #[cfg(test)]
    fn state(&self) -> LifecycleState {
        self.state
    }

    fn try_start(&mut self, ctx: &mut EngineContext) -> Result<(), SessionError> {
        if self.state != LifecycleState::Configured {
            return Err(SessionError::InvalidState { state: self.state });
        }

        let (scene, character) = bootstrap::create_scene(&ctx.content)?;
        ctx.renderer.set_viewport(
            MAIN_VIEWPORT_SLOT,
            Viewport::new(scene.id(), character.camera()),
        );
        self.scene = Some(scene);
        self.character = Some(character);
        self.subscribe();

        let mouse_mode = if ctx.console.is_open() {
            MouseMode::Absolute
        } else {
            MouseMode::Relative
        };
        ctx.set_mouse_mode(mouse_mode);

        self.state = LifecycleState::Running;
        info!(?mouse_mode, "session_started");
        Ok(())
    }

    fn subscribe(&mut self) {
        self.handlers.insert(EventKind::KeyDown, Self::handle_key_down);
        self.handlers.insert(EventKind::KeyUp, Self::handle_key_up);
        self.handlers.insert(EventKind::MouseMove, Self::handle_mouse_move);
        self.handlers
            .insert(EventKind::FrameUpdate, Self::handle_frame_update);
    }

    fn handle_key_down(&mut self, _ctx: &mut EngineContext, event: &InputEvent) {
        let InputEvent::KeyDown { key } = event else {
            return;
        };
        if let Some(transition) = self.intents.key_down(*key) {
            self.apply_transition(transition);
        }
    }

    fn handle_key_up(&mut self, _ctx: &mut EngineContext, event: &InputEvent) {
        let InputEvent::KeyUp { key } = event else {
            return;
        };
        if let Some(transition) = self.intents.key_up(*key) {
            self.apply_transition(transition);
        }
    }

    fn handle_mouse_move(&mut self, _ctx: &mut EngineContext, event: &InputEvent) {
        let InputEvent::MouseMove { dx, dy } = event else {
            return;
        };
        self.mouse_delta.0 += dx;
        self.mouse_delta.1 += dy;
    }

    /// The one place per frame where the accumulated mouse delta reaches the
    /// character. The delta is consumed here and never carries over.
    fn handle_frame_update(&mut self, _ctx: &mut EngineContext, event: &InputEvent) {
        let InputEvent::FrameUpdate { .. } = event else {
            return;
        };
        let (dx, dy) = std::mem::take(&mut self.mouse_delta);
        if let (Some(scene), Some(character)) = (self.scene.as_mut(), self.character.as_mut()) {
            character.rotate(scene, dx * MOUSE_SENSITIVITY, dy * MOUSE_SENSITIVITY, 0.0);
        }
    }

    fn apply_transition(&mut self, transition: IntentTransition) {
        let Some(character) = self.character.as_mut() else {
            return;
        };
        let analog = if transition.active { 1.0 } else { 0.0 };
        match transition.intent {
            Intent::Forward => character.forward = analog,
            Intent::Backward => character.backward = analog,
            Intent::Left => character.left = analog,
            Intent::Right => character.right = analog,
            Intent::Jump => character.jump = transition.active,
        }
    }

    #[cfg(test)]
    fn character(&self) -> Option<&Character> {
        self.character.as_ref()
    }

    #[cfg(test)]
    fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }
}

impl Default for FpsApplication {
    fn default() -> Self {
        Self::new()
    }
}

impl Application for FpsApplication {
    fn setup(&mut self, config: &mut EngineConfig) {
        let windowed = cfg!(debug_assertions);
        config.fullscreen = !windowed;
        config.resizable = windowed;
        config.window_title = WINDOW_TITLE.to_string();
        config.frame_limiter = true;
        config.vsync = true;
        self.state = LifecycleState::Configured;
    }

    fn start(
        &mut self,
        ctx: &mut EngineContext,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.try_start(ctx).map_err(Into::into)
    }

    fn handle_event(&mut self, ctx: &mut EngineContext, event: &InputEvent) {
        if let Some(handler) = self.handlers.get(&event.kind()).copied() {
            handler(self, ctx, event);
        }
    }

    fn stop(&mut self, ctx: &mut EngineContext) {
        self.handlers.clear();
        // The viewport references the scene's camera, so it is released
        // before the scene is.
        ctx.renderer.clear_viewport(MAIN_VIEWPORT_SLOT);
        self.character = None;
        self.scene = None;
        self.intents = IntentTracker::default();
        self.mouse_delta = (0.0, 0.0);
        if self.state == LifecycleState::Running {
            info!("session_stopped");
        }
        self.state = LifecycleState::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::KeyCode;
    use glam::Quat;
    use std::fs;
    use std::path::Path;

    fn write_asset(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write");
    }

    fn demo_context() -> (tempfile::TempDir, EngineContext) {
        let temp = tempfile::tempdir().expect("tempdir");
        write_asset(
            temp.path(),
            bootstrap::SCENE_RESOURCE,
            r#"<scene name="map">
                 <node name="spawn_a" tags="SpawnPoint" position="1 0 2"/>
                 <node name="spawn_b" tags="SpawnPoint" position="5 0 -3"/>
               </scene>"#,
        );
        write_asset(
            temp.path(),
            bootstrap::WEAPON_RESOURCE,
            r#"<node name="rifle"><model mesh="models/rifle.mdl"/></node>"#,
        );
        write_asset(
            temp.path(),
            bootstrap::ENEMY_RESOURCE,
            r#"<node name="grunt"><model mesh="models/grunt.mdl"><animation name="idle"/></model></node>"#,
        );
        let ctx = EngineContext::headless(temp.path());
        (temp, ctx)
    }

    fn running_app() -> (tempfile::TempDir, EngineContext, FpsApplication) {
        let (temp, mut ctx) = demo_context();
        let mut app = FpsApplication::new();
        let mut config = EngineConfig::default();
        app.setup(&mut config);
        app.start(&mut ctx).expect("start");
        (temp, ctx, app)
    }

    fn forward_of(app: &FpsApplication) -> f32 {
        app.character().expect("character").forward
    }

    #[test]
    fn setup_configures_engine_parameters() {
        let mut app = FpsApplication::new();
        let mut config = EngineConfig::default();
        app.setup(&mut config);

        assert_eq!(config.window_title, "First Person Shooter Demo");
        assert!(config.frame_limiter);
        assert!(config.vsync);
        assert_eq!(app.state(), LifecycleState::Configured);
    }

    #[test]
    fn start_requires_configuration() {
        let (_temp, mut ctx) = demo_context();
        let mut app = FpsApplication::new();
        assert!(app.start(&mut ctx).is_err());
        assert_eq!(app.state(), LifecycleState::Unconfigured);
    }

    #[test]
    fn start_binds_viewport_to_the_character_camera() {
        let (_temp, ctx, app) = running_app();

        let viewport = ctx.renderer.viewport(MAIN_VIEWPORT_SLOT).expect("viewport");
        let character = app.character().expect("character");
        let scene = app.scene().expect("scene");
        assert_eq!(viewport.camera(), character.camera());
        assert_eq!(viewport.scene(), scene.id());
        assert_eq!(app.state(), LifecycleState::Running);
    }

    #[test]
    fn start_uses_relative_mouse_mode_by_default() {
        let (_temp, ctx, _app) = running_app();
        assert_eq!(ctx.mouse_mode(), MouseMode::Relative);
    }

    #[test]
    fn open_console_forces_absolute_mouse_mode() {
        let (_temp, mut ctx) = demo_context();
        ctx.console.toggle_open();
        let mut app = FpsApplication::new();
        let mut config = EngineConfig::default();
        app.setup(&mut config);
        app.start(&mut ctx).expect("start");

        assert_eq!(ctx.mouse_mode(), MouseMode::Absolute);
    }

    #[test]
    fn key_press_sets_forward_and_release_clears_it() {
        let (_temp, mut ctx, mut app) = running_app();

        app.handle_event(&mut ctx, &InputEvent::KeyDown { key: KeyCode::KeyW });
        assert_eq!(forward_of(&app), 1.0);

        app.handle_event(&mut ctx, &InputEvent::KeyUp { key: KeyCode::KeyW });
        assert_eq!(forward_of(&app), 0.0);
    }

    #[test]
    fn pressing_twice_is_idempotent() {
        let (_temp, mut ctx, mut app) = running_app();

        app.handle_event(&mut ctx, &InputEvent::KeyDown { key: KeyCode::KeyW });
        app.handle_event(&mut ctx, &InputEvent::KeyDown { key: KeyCode::KeyW });
        assert_eq!(forward_of(&app), 1.0);

        app.handle_event(&mut ctx, &InputEvent::KeyUp { key: KeyCode::KeyW });
        assert_eq!(forward_of(&app), 0.0);
    }

    #[test]
    fn releasing_one_alias_keeps_forward_active() {
        let (_temp, mut ctx, mut app) = running_app();

        app.handle_event(&mut ctx, &InputEvent::KeyDown { key: KeyCode::KeyW });
        app.handle_event(&mut ctx, &InputEvent::KeyDown { key: KeyCode::ArrowUp });
        app.handle_event(&mut ctx, &InputEvent::KeyUp { key: KeyCode::KeyW });
        assert_eq!(forward_of(&app), 1.0);

        app.handle_event(&mut ctx, &InputEvent::KeyUp { key: KeyCode::ArrowUp });
        assert_eq!(forward_of(&app), 0.0);
    }

    #[test]
    fn releasing_unpressed_key_is_harmless() {
        let (_temp, mut ctx, mut app) = running_app();
        app.handle_event(&mut ctx, &InputEvent::KeyUp { key: KeyCode::KeyS });
        let character = app.character().expect("character");
        assert_eq!(character.backward, 0.0);
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let (_temp, mut ctx, mut app) = running_app();
        app.handle_event(&mut ctx, &InputEvent::KeyDown { key: KeyCode::KeyQ });
        let character = app.character().expect("character");
        assert_eq!(character.forward, 0.0);
        assert_eq!(character.backward, 0.0);
        assert_eq!(character.left, 0.0);
        assert_eq!(character.right, 0.0);
        assert!(!character.jump);
    }

    #[test]
    fn space_drives_the_jump_flag() {
        let (_temp, mut ctx, mut app) = running_app();

        app.handle_event(&mut ctx, &InputEvent::KeyDown { key: KeyCode::Space });
        assert!(app.character().expect("character").jump);

        app.handle_event(&mut ctx, &InputEvent::KeyUp { key: KeyCode::Space });
        assert!(!app.character().expect("character").jump);
    }

    #[test]
    fn mouse_delta_is_applied_once_per_frame_with_sensitivity() {
        let (_temp, mut ctx, mut app) = running_app();

        app.handle_event(&mut ctx, &InputEvent::MouseMove { dx: 6.0, dy: -2.0 });
        app.handle_event(&mut ctx, &InputEvent::MouseMove { dx: 4.0, dy: -2.0 });
        app.handle_event(&mut ctx, &InputEvent::FrameUpdate { timestep: 0.016 });

        let scene = app.scene().expect("scene");
        let character = app.character().expect("character");
        let expected_yaw = Quat::from_rotation_y((10.0 * MOUSE_SENSITIVITY).to_radians());
        let expected_pitch = Quat::from_rotation_x((-4.0 * MOUSE_SENSITIVITY).to_radians());
        assert!(scene
            .node(character.node())
            .rotation
            .abs_diff_eq(expected_yaw, 1e-5));
        assert!(scene
            .node(character.camera())
            .rotation
            .abs_diff_eq(expected_pitch, 1e-5));
    }

    #[test]
    fn frame_without_mouse_motion_leaves_rotation_unchanged() {
        let (_temp, mut ctx, mut app) = running_app();

        app.handle_event(&mut ctx, &InputEvent::MouseMove { dx: 10.0, dy: 4.0 });
        app.handle_event(&mut ctx, &InputEvent::FrameUpdate { timestep: 0.016 });
        let body_after_first = app
            .scene()
            .expect("scene")
            .node(app.character().expect("character").node())
            .rotation;

        app.handle_event(&mut ctx, &InputEvent::FrameUpdate { timestep: 0.016 });
        let body_after_second = app
            .scene()
            .expect("scene")
            .node(app.character().expect("character").node())
            .rotation;
        assert_eq!(body_after_first, body_after_second);
    }

    #[test]
    fn events_are_inert_before_start() {
        let (_temp, mut ctx) = demo_context();
        let mut app = FpsApplication::new();
        app.handle_event(&mut ctx, &InputEvent::KeyDown { key: KeyCode::KeyW });
        app.handle_event(&mut ctx, &InputEvent::FrameUpdate { timestep: 0.016 });
        assert!(app.character().is_none());
    }

    #[test]
    fn stop_releases_viewport_and_scene_and_is_terminal() {
        let (_temp, mut ctx, mut app) = running_app();

        app.stop(&mut ctx);
        assert!(ctx.renderer.viewport(MAIN_VIEWPORT_SLOT).is_none());
        assert!(app.scene().is_none());
        assert!(app.character().is_none());
        assert_eq!(app.state(), LifecycleState::Stopped);

        // Stopping again is a no-op release.
        app.stop(&mut ctx);
        assert_eq!(app.state(), LifecycleState::Stopped);

        // Events no longer dispatch.
        app.handle_event(&mut ctx, &InputEvent::KeyDown { key: KeyCode::KeyW });
        assert!(app.character().is_none());
    }

    #[test]
    fn restart_requires_reconfiguration() {
        let (_temp, mut ctx, mut app) = running_app();
        app.stop(&mut ctx);

        assert!(app.start(&mut ctx).is_err());

        let mut config = EngineConfig::default();
        app.setup(&mut config);
        app.start(&mut ctx).expect("restart after setup");
        assert_eq!(app.state(), LifecycleState::Running);
    }

    #[test]
    fn held_intents_reset_across_sessions() {
        let (_temp, mut ctx, mut app) = running_app();
        app.handle_event(&mut ctx, &InputEvent::KeyDown { key: KeyCode::KeyW });
        app.stop(&mut ctx);

        let mut config = EngineConfig::default();
        app.setup(&mut config);
        app.start(&mut ctx).expect("restart");
        assert_eq!(forward_of(&app), 0.0);

        app.handle_event(&mut ctx, &InputEvent::KeyDown { key: KeyCode::KeyW });
        assert_eq!(forward_of(&app), 1.0);
    }
}

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{DeviceEvent, ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::PhysicalKey;
use winit::window::{CursorGrabMode, Fullscreen, Window, WindowBuilder};

use crate::content::ResourceCache;
use crate::{resolve_app_paths, StartupError};

use super::events::{InputEvent, KeyCode, MouseMode};
use super::rendering::Renderer;
use super::tools::ConsoleState;

const FRAME_LIMITER_FPS: u32 = 60;
const CONSOLE_TOGGLE_KEY: KeyCode = KeyCode::Backquote;

/// Engine startup parameters, filled in by [`Application::setup`] before the
/// window exists.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub fullscreen: bool,
    pub resizable: bool,
    pub window_title: String,
    pub frame_limiter: bool,
    pub vsync: bool,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fullscreen: false,
            resizable: true,
            window_title: "Engine".to_string(),
            frame_limiter: true,
            vsync: true,
            window_width: 1280,
            window_height: 720,
        }
    }
}

/// The collaborators an application reaches during its lifecycle: resource
/// loading, the viewport slots, the debug console, and the requested
/// mouse-capture mode.
pub struct EngineContext {
    pub content: ResourceCache,
    pub renderer: Renderer,
    pub console: ConsoleState,
    mouse_mode: MouseMode,
}

impl EngineContext {
    pub fn new(content: ResourceCache, renderer: Renderer) -> Self {
        Self {
            content,
            renderer,
            console: ConsoleState::default(),
            mouse_mode: MouseMode::Absolute,
        }
    }

    /// A context with no window surface, for driving applications in tests.
    pub fn headless(asset_root: impl Into<PathBuf>) -> Self {
        Self::new(ResourceCache::new(asset_root), Renderer::headless())
    }

    pub fn mouse_mode(&self) -> MouseMode {
        self.mouse_mode
    }

    pub fn set_mouse_mode(&mut self, mode: MouseMode) {
        self.mouse_mode = mode;
    }
}

/// The seam between the frame loop and the game: configuration, session
/// start/stop, and synchronous event handling. All methods run on the loop
/// thread in dispatch order.
pub trait Application {
    fn setup(&mut self, config: &mut EngineConfig);
    fn start(
        &mut self,
        ctx: &mut EngineContext,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn handle_event(&mut self, ctx: &mut EngineContext, event: &InputEvent);
    fn stop(&mut self, ctx: &mut EngineContext);
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("application start failed: {0}")]
    Start(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app<A: Application + 'static>(mut app: A) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        assets = %app_paths.assets_dir.display(),
        "startup"
    );

    let mut config = EngineConfig::default();
    app.setup(&mut config);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let mut builder = WindowBuilder::new()
        .with_title(config.window_title.clone())
        .with_inner_size(LogicalSize::new(
            config.window_width as f64,
            config.window_height as f64,
        ))
        .with_resizable(config.resizable);
    if config.fullscreen {
        builder = builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }
    let window = Arc::new(builder.build(&event_loop).map_err(AppError::CreateWindow)?);

    let renderer =
        Renderer::with_window(Arc::clone(&window), config.vsync).map_err(AppError::CreateRenderer)?;
    let mut ctx = EngineContext::new(
        ResourceCache::new(app_paths.assets_dir.clone()),
        renderer,
    );

    app.start(&mut ctx).map_err(AppError::Start)?;
    apply_mouse_mode(&window, ctx.mouse_mode());
    info!(
        fullscreen = config.fullscreen,
        vsync = config.vsync,
        frame_limiter = config.frame_limiter,
        mouse_mode = ?ctx.mouse_mode(),
        "session_running"
    );

    event_loop.set_control_flow(ControlFlow::Poll);
    let frame_target = frame_limiter_target(config.frame_limiter);
    let mut last_frame = Instant::now();
    let mut last_present = Instant::now();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = ctx.renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event: key_event, .. } => {
                    route_key_event(&mut app, &mut ctx, &key_event, window_target);
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let timestep = now.saturating_duration_since(last_frame).as_secs_f32();
                    last_frame = now;

                    // The per-frame update runs before anything else this
                    // frame touches the simulation.
                    app.handle_event(&mut ctx, &InputEvent::FrameUpdate { timestep });

                    let elapsed = Instant::now().saturating_duration_since(last_present);
                    let cap_sleep = compute_cap_sleep(elapsed, frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    if let Err(error) = ctx.renderer.present() {
                        warn!(error = %error, "renderer_present_failed");
                        window_target.exit();
                    }
                    last_present = Instant::now();
                }
                _ => {}
            },
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => {
                app.handle_event(
                    &mut ctx,
                    &InputEvent::MouseMove {
                        dx: delta.0 as f32,
                        dy: delta.1 as f32,
                    },
                );
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                app.stop(&mut ctx);
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Keyboard routing: the grave key toggles the console; while the console is
/// open it consumes key presses. Key releases always reach the application so
/// held intents clear even if the console opened mid-press.
fn route_key_event<A: Application>(
    app: &mut A,
    ctx: &mut EngineContext,
    key_event: &KeyEvent,
    window_target: &EventLoopWindowTarget<()>,
) {
    let PhysicalKey::Code(code) = key_event.physical_key else {
        return;
    };

    if code == CONSOLE_TOGGLE_KEY {
        if key_event.state == ElementState::Pressed && !key_event.repeat {
            ctx.console.toggle_open();
            info!(console_open = ctx.console.is_open(), "console_toggled");
        }
        return;
    }

    match key_event.state {
        ElementState::Pressed if ctx.console.is_open() => {
            ctx.console.handle_key_event(key_event);
        }
        ElementState::Pressed if code == KeyCode::Escape => {
            info!(reason = "escape_key", "shutdown_requested");
            window_target.exit();
        }
        ElementState::Pressed => {
            app.handle_event(ctx, &InputEvent::KeyDown { key: code });
        }
        ElementState::Released => {
            app.handle_event(ctx, &InputEvent::KeyUp { key: code });
        }
    }
}

fn apply_mouse_mode(window: &Window, mode: MouseMode) {
    match mode {
        MouseMode::Relative => {
            let grabbed = window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(error) = grabbed {
                warn!(error = %error, "cursor_grab_failed");
            }
            window.set_cursor_visible(false);
        }
        MouseMode::Absolute => {
            if let Err(error) = window.set_cursor_grab(CursorGrabMode::None) {
                warn!(error = %error, "cursor_release_failed");
            }
            window.set_cursor_visible(true);
        }
    }
}

fn frame_limiter_target(enabled: bool) -> Option<Duration> {
    enabled.then(|| Duration::from_secs_f64(1.0 / FRAME_LIMITER_FPS as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

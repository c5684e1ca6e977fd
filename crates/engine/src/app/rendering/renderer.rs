use std::sync::Arc;

use pixels::{Error, Pixels, PixelsBuilder, SurfaceTexture};
use winit::window::Window;

use crate::app::scene::{NodeId, SceneId};

const CLEAR_COLOR: [u8; 4] = [18, 20, 26, 255];

/// A render-target binding of one scene/camera pair. Constructing a new
/// viewport for a slot replaces (and thereby releases) whatever was bound
/// there before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    scene: SceneId,
    camera: NodeId,
}

impl Viewport {
    pub fn new(scene: SceneId, camera: NodeId) -> Self {
        Self { scene, camera }
    }

    pub fn scene(&self) -> SceneId {
        self.scene
    }

    pub fn camera(&self) -> NodeId {
        self.camera
    }
}

struct Surface {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    vsync: bool,
}

/// Owns the window's viewport slots and, when windowed, the pixel surface
/// they present through. Slot 0 is the primary render target.
pub struct Renderer {
    slots: Vec<Option<Viewport>>,
    surface: Option<Surface>,
}

impl Renderer {
    /// A renderer with slot bookkeeping but no surface; present is a no-op.
    pub fn headless() -> Self {
        Self {
            slots: Vec::new(),
            surface: None,
        }
    }

    pub fn with_window(window: Arc<Window>, vsync: bool) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = build_pixels(Arc::clone(&window), size.width, size.height, vsync)?;
        Ok(Self {
            slots: Vec::new(),
            surface: Some(Surface {
                window,
                pixels,
                vsync,
            }),
        })
    }

    /// Installs `viewport` in `slot`, returning the binding it displaced.
    /// The displaced viewport is moved out, so it is released exactly once
    /// when the caller drops it.
    pub fn set_viewport(&mut self, slot: usize, viewport: Viewport) -> Option<Viewport> {
        if self.slots.len() <= slot {
            self.slots.resize(slot + 1, None);
        }
        self.slots[slot].replace(viewport)
    }

    /// Removes and returns the binding in `slot`. Clearing an empty or
    /// never-bound slot is a no-op.
    pub fn clear_viewport(&mut self, slot: usize) -> Option<Viewport> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    pub fn viewport(&self, slot: usize) -> Option<&Viewport> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };
        if width == 0 || height == 0 {
            return Ok(());
        }
        surface.pixels = build_pixels(Arc::clone(&surface.window), width, height, surface.vsync)?;
        Ok(())
    }

    /// Clears and presents the frame. Scene content is drawn by the real
    /// engine; this sample presents the clear color only.
    pub fn present(&mut self) -> Result<(), Error> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };
        for chunk in surface.pixels.frame_mut().chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }
        surface.pixels.render()
    }
}

fn build_pixels(
    window: Arc<Window>,
    width: u32,
    height: u32,
    vsync: bool,
) -> Result<Pixels<'static>, Error> {
    let surface = SurfaceTexture::new(width, height, window);
    PixelsBuilder::new(width, height, surface)
        .enable_vsync(vsync)
        .build()
}

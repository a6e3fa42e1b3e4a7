//! Capability surface the presentation pipeline draws through.
//!
//! A [`Platform`] turns a driver identifier into an initialized
//! [`GraphicsBackend`]. The backend hands out surface, renderer and texture
//! handles; the pipeline owns every handle it receives and gives each one
//! back through the matching `destroy_*` call, newest first.

use std::fmt;

use thiserror::Error;

use crate::events::{ImageBuffer, InputEvent};
use crate::processing::layout::PixelRect;

/// Failure text reported by a backend operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererMode {
    Accelerated,
    Software,
}

/// Per-backend quirks the pipeline must respect during teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// When false the surface is handed to [`GraphicsBackend::abandon_surface`]
    /// instead of being destroyed.
    pub safe_to_destroy_surface: bool,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            safe_to_destroy_surface: true,
        }
    }
}

pub trait Platform {
    type Backend: GraphicsBackend;

    /// Brings up the video subsystem with one driver. A failed call must leave
    /// no partially initialized state behind.
    fn init(&mut self, driver: &str) -> Result<Self::Backend, BackendError>;
}

pub trait GraphicsBackend {
    type Surface;
    type Renderer;
    type Texture;

    fn driver(&self) -> &str;

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::default()
    }

    fn display_mode(&mut self) -> Result<DisplayMode, BackendError>;

    fn create_surface(
        &mut self,
        mode: DisplayMode,
        fullscreen: bool,
    ) -> Result<Self::Surface, BackendError>;

    fn create_renderer(
        &mut self,
        surface: &Self::Surface,
        mode: RendererMode,
    ) -> Result<Self::Renderer, BackendError>;

    /// Largest texture edge the renderer accepts.
    fn max_texture_dimension(&self, renderer: &Self::Renderer) -> u32;

    fn create_texture(
        &mut self,
        renderer: &Self::Renderer,
        pixels: &ImageBuffer,
    ) -> Result<Self::Texture, BackendError>;

    fn set_texture_alpha(&mut self, texture: &mut Self::Texture, alpha: u8);

    /// Starts a frame filled with `color`.
    fn clear(&mut self, renderer: &mut Self::Renderer, color: [u8; 3]) -> Result<(), BackendError>;

    /// Draws `src` (whole texture when `None`) into `dest`.
    fn draw_texture(
        &mut self,
        renderer: &mut Self::Renderer,
        texture: &Self::Texture,
        src: Option<PixelRect>,
        dest: PixelRect,
    ) -> Result<(), BackendError>;

    fn present(&mut self, renderer: &mut Self::Renderer) -> Result<(), BackendError>;

    fn destroy_texture(&mut self, texture: Self::Texture);

    fn destroy_renderer(&mut self, renderer: Self::Renderer);

    fn destroy_surface(&mut self, surface: Self::Surface);

    /// Releases ownership without tearing the surface down.
    fn abandon_surface(&mut self, surface: Self::Surface) {
        std::mem::forget(surface);
    }

    /// Next pending input event, without waiting.
    fn poll_event(&mut self) -> Option<InputEvent>;

    /// Milliseconds since the backend was initialized.
    fn now_ms(&self) -> u64;

    fn sleep_ms(&mut self, ms: u64);

    /// Shuts the video subsystem down. Called last, after every handle is gone.
    fn teardown(self);
}

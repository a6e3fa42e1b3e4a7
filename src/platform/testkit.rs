//! Scripted platform for exercising the pipeline without a display.
//!
//! Every backend call is appended to a shared [`OpLog`] so tests can assert on
//! ordering. Time is virtual: it only advances through `sleep_ms` and the
//! optional per-present frame cost.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Result, anyhow};

use crate::events::{ImageBuffer, InputEvent};
use crate::platform::{
    BackendCapabilities, BackendError, DisplayMode, GraphicsBackend, Platform, RendererMode,
};
use crate::processing::layout::PixelRect;
use crate::tasks::loader::ImageDecoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOp {
    Init(String),
    InitFailed(String),
    CreateSurface {
        width: u32,
        height: u32,
        fullscreen: bool,
    },
    SurfaceFailed,
    CreateRenderer(RendererMode),
    RendererFailed(RendererMode),
    CreateTexture {
        id: u32,
        width: u32,
        height: u32,
    },
    TextureFailed {
        index: usize,
    },
    Clear([u8; 3]),
    Draw {
        texture: u32,
        alpha: u8,
        dest: PixelRect,
    },
    Present,
    DestroyTexture(u32),
    DestroyRenderer,
    DestroySurface,
    AbandonSurface,
    Sleep(u64),
    Teardown,
}

#[derive(Debug, Clone, Default)]
pub struct OpLog(Arc<Mutex<Vec<BackendOp>>>);

impl OpLog {
    fn push(&self, op: BackendOp) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(op);
    }

    pub fn ops(&self) -> Vec<BackendOp> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn count(&self, pred: impl Fn(&BackendOp) -> bool) -> usize {
        self.ops().iter().filter(|op| pred(op)).count()
    }

    pub fn presents(&self) -> usize {
        self.count(|op| matches!(op, BackendOp::Present))
    }

    /// Alpha of every draw call, in order.
    pub fn draw_alphas(&self) -> Vec<u8> {
        self.ops()
            .iter()
            .filter_map(|op| match op {
                BackendOp::Draw { alpha, .. } => Some(*alpha),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
struct BackendScript {
    display: DisplayMode,
    surface_error: Option<String>,
    failing_renderers: Vec<RendererMode>,
    max_texture_dim: u32,
    failing_texture: Option<usize>,
    failing_present: Option<usize>,
    events: Vec<(u64, InputEvent)>,
    frame_cost_ms: u64,
    safe_to_destroy_surface: bool,
}

impl Default for BackendScript {
    fn default() -> Self {
        Self {
            display: DisplayMode {
                width: 1920,
                height: 1080,
            },
            surface_error: None,
            failing_renderers: Vec::new(),
            max_texture_dim: 8192,
            failing_texture: None,
            failing_present: None,
            events: Vec::new(),
            frame_cost_ms: 0,
            safe_to_destroy_surface: true,
        }
    }
}

/// Builder-style platform whose drivers either come up or fail with a fixed message.
#[derive(Debug, Default)]
pub struct ScriptedPlatform {
    drivers: HashMap<String, Option<String>>,
    script: BackendScript,
    log: OpLog,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> OpLog {
        self.log.clone()
    }

    pub fn working_driver(mut self, driver: &str) -> Self {
        self.drivers.insert(driver.to_string(), None);
        self
    }

    pub fn failing_driver(mut self, driver: &str, message: &str) -> Self {
        self.drivers
            .insert(driver.to_string(), Some(message.to_string()));
        self
    }

    pub fn display(mut self, width: u32, height: u32) -> Self {
        self.script.display = DisplayMode { width, height };
        self
    }

    pub fn failing_surface(mut self, message: &str) -> Self {
        self.script.surface_error = Some(message.to_string());
        self
    }

    pub fn failing_renderer(mut self, mode: RendererMode) -> Self {
        self.script.failing_renderers.push(mode);
        self
    }

    pub fn max_texture_dimension(mut self, dim: u32) -> Self {
        self.script.max_texture_dim = dim;
        self
    }

    /// Fails the `index`-th texture upload (zero based).
    pub fn failing_texture(mut self, index: usize) -> Self {
        self.script.failing_texture = Some(index);
        self
    }

    /// Fails the `index`-th present (zero based).
    pub fn failing_present(mut self, index: usize) -> Self {
        self.script.failing_present = Some(index);
        self
    }

    pub fn event_at(mut self, at_ms: u64, event: InputEvent) -> Self {
        self.script.events.push((at_ms, event));
        self
    }

    /// Virtual time consumed by every present.
    pub fn frame_cost_ms(mut self, ms: u64) -> Self {
        self.script.frame_cost_ms = ms;
        self
    }

    pub fn surface_unsafe_to_destroy(mut self) -> Self {
        self.script.safe_to_destroy_surface = false;
        self
    }
}

impl Platform for ScriptedPlatform {
    type Backend = ScriptedBackend;

    fn init(&mut self, driver: &str) -> Result<ScriptedBackend, BackendError> {
        match self.drivers.get(driver) {
            Some(None) => {
                self.log.push(BackendOp::Init(driver.to_string()));
                let mut events: Vec<_> = self.script.events.clone();
                events.sort_by_key(|(at, _)| *at);
                Ok(ScriptedBackend {
                    driver: driver.to_string(),
                    script: self.script.clone(),
                    log: self.log.clone(),
                    now_ms: 0,
                    next_texture: 0,
                    textures_created: 0,
                    presents: 0,
                    events: events.into(),
                })
            }
            Some(Some(message)) => {
                self.log.push(BackendOp::InitFailed(driver.to_string()));
                Err(BackendError::new(message.clone()))
            }
            None => {
                self.log.push(BackendOp::InitFailed(driver.to_string()));
                Err(BackendError::new(format!("unknown driver {driver}")))
            }
        }
    }
}

#[derive(Debug)]
pub struct ScriptedBackend {
    driver: String,
    script: BackendScript,
    log: OpLog,
    now_ms: u64,
    next_texture: u32,
    textures_created: usize,
    presents: usize,
    events: VecDeque<(u64, InputEvent)>,
}

#[derive(Debug)]
pub struct ScriptedSurface {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub struct ScriptedRenderer {
    pub mode: RendererMode,
}

#[derive(Debug)]
pub struct ScriptedTexture {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    pub alpha: u8,
}

impl GraphicsBackend for ScriptedBackend {
    type Surface = ScriptedSurface;
    type Renderer = ScriptedRenderer;
    type Texture = ScriptedTexture;

    fn driver(&self) -> &str {
        &self.driver
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            safe_to_destroy_surface: self.script.safe_to_destroy_surface,
        }
    }

    fn display_mode(&mut self) -> Result<DisplayMode, BackendError> {
        Ok(self.script.display)
    }

    fn create_surface(
        &mut self,
        mode: DisplayMode,
        fullscreen: bool,
    ) -> Result<ScriptedSurface, BackendError> {
        if let Some(message) = &self.script.surface_error {
            self.log.push(BackendOp::SurfaceFailed);
            return Err(BackendError::new(message.clone()));
        }
        self.log.push(BackendOp::CreateSurface {
            width: mode.width,
            height: mode.height,
            fullscreen,
        });
        Ok(ScriptedSurface {
            width: mode.width,
            height: mode.height,
        })
    }

    fn create_renderer(
        &mut self,
        _surface: &ScriptedSurface,
        mode: RendererMode,
    ) -> Result<ScriptedRenderer, BackendError> {
        if self.script.failing_renderers.contains(&mode) {
            self.log.push(BackendOp::RendererFailed(mode));
            return Err(BackendError::new(format!("{mode:?} renderer unavailable")));
        }
        self.log.push(BackendOp::CreateRenderer(mode));
        Ok(ScriptedRenderer { mode })
    }

    fn max_texture_dimension(&self, _renderer: &ScriptedRenderer) -> u32 {
        self.script.max_texture_dim
    }

    fn create_texture(
        &mut self,
        _renderer: &ScriptedRenderer,
        pixels: &ImageBuffer,
    ) -> Result<ScriptedTexture, BackendError> {
        let index = self.textures_created;
        self.textures_created += 1;
        if self.script.failing_texture == Some(index) {
            self.log.push(BackendOp::TextureFailed { index });
            return Err(BackendError::new("out of video memory"));
        }
        let max = self.script.max_texture_dim;
        if pixels.width > max || pixels.height > max {
            self.log.push(BackendOp::TextureFailed { index });
            return Err(BackendError::new(format!(
                "texture {}x{} exceeds {max}",
                pixels.width, pixels.height
            )));
        }
        let id = self.next_texture;
        self.next_texture += 1;
        self.log.push(BackendOp::CreateTexture {
            id,
            width: pixels.width,
            height: pixels.height,
        });
        Ok(ScriptedTexture {
            id,
            width: pixels.width,
            height: pixels.height,
            alpha: 255,
        })
    }

    fn set_texture_alpha(&mut self, texture: &mut ScriptedTexture, alpha: u8) {
        texture.alpha = alpha;
    }

    fn clear(&mut self, _renderer: &mut ScriptedRenderer, color: [u8; 3]) -> Result<(), BackendError> {
        self.log.push(BackendOp::Clear(color));
        Ok(())
    }

    fn draw_texture(
        &mut self,
        _renderer: &mut ScriptedRenderer,
        texture: &ScriptedTexture,
        _src: Option<PixelRect>,
        dest: PixelRect,
    ) -> Result<(), BackendError> {
        self.log.push(BackendOp::Draw {
            texture: texture.id,
            alpha: texture.alpha,
            dest,
        });
        Ok(())
    }

    fn present(&mut self, _renderer: &mut ScriptedRenderer) -> Result<(), BackendError> {
        let index = self.presents;
        self.presents += 1;
        if self.script.failing_present == Some(index) {
            return Err(BackendError::new("device lost"));
        }
        self.log.push(BackendOp::Present);
        self.now_ms += self.script.frame_cost_ms;
        Ok(())
    }

    fn destroy_texture(&mut self, texture: ScriptedTexture) {
        self.log.push(BackendOp::DestroyTexture(texture.id));
    }

    fn destroy_renderer(&mut self, _renderer: ScriptedRenderer) {
        self.log.push(BackendOp::DestroyRenderer);
    }

    fn destroy_surface(&mut self, _surface: ScriptedSurface) {
        self.log.push(BackendOp::DestroySurface);
    }

    fn abandon_surface(&mut self, _surface: ScriptedSurface) {
        self.log.push(BackendOp::AbandonSurface);
    }

    fn poll_event(&mut self) -> Option<InputEvent> {
        match self.events.front() {
            Some((at, _)) if *at <= self.now_ms => self.events.pop_front().map(|(_, ev)| ev),
            _ => None,
        }
    }

    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.log.push(BackendOp::Sleep(ms));
        self.now_ms += ms;
    }

    fn teardown(self) {
        self.log.push(BackendOp::Teardown);
    }
}

/// Decoder that hands out a fixed buffer, or fails with a fixed message.
#[derive(Debug, Clone)]
pub struct StaticDecoder {
    image: Option<ImageBuffer>,
    error: String,
}

impl StaticDecoder {
    pub fn new(image: ImageBuffer) -> Self {
        Self {
            image: Some(image),
            error: String::new(),
        }
    }

    pub fn solid(width: u32, height: u32) -> Self {
        Self::new(ImageBuffer::filled(width, height, [90, 120, 150, 255]))
    }

    pub fn failing(message: &str) -> Self {
        Self {
            image: None,
            error: message.to_string(),
        }
    }
}

impl ImageDecoder for StaticDecoder {
    fn decode(&self, _path: &Path) -> Result<ImageBuffer> {
        self.image.clone().ok_or_else(|| anyhow!(self.error.clone()))
    }
}

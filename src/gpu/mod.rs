//! Production platform: winit for the window and input, wgpu for drawing.
//!
//! Driver identifiers name wgpu backends, so falling back from `vulkan` to
//! `gl` re-initializes the instance against a different graphics API.

mod backend;
mod pipeline;
mod window;

use tracing::debug;
use winit::event_loop::EventLoop;

use crate::config::Configuration;
use crate::platform::{BackendCapabilities, BackendError, Platform};

pub use backend::{WgpuBackend, WgpuRenderer, WgpuSurface, WgpuTexture};

/// Maps a configured driver name onto the wgpu backends it enables.
pub fn backends_for(driver: &str) -> Option<wgpu::Backends> {
    let backends = match driver.trim().to_ascii_lowercase().as_str() {
        "vulkan" => wgpu::Backends::VULKAN,
        "gl" | "gles" | "opengl" => wgpu::Backends::GL,
        "metal" => wgpu::Backends::METAL,
        "dx12" => wgpu::Backends::DX12,
        "primary" => wgpu::Backends::PRIMARY,
        "secondary" => wgpu::Backends::SECONDARY,
        "auto" => wgpu::Backends::all(),
        _ => return None,
    };
    Some(backends)
}

pub struct WgpuPlatform {
    cfg: Configuration,
}

impl WgpuPlatform {
    pub fn new(cfg: &Configuration) -> Self {
        Self { cfg: cfg.clone() }
    }
}

impl Platform for WgpuPlatform {
    type Backend = WgpuBackend;

    fn init(&mut self, driver: &str) -> Result<WgpuBackend, BackendError> {
        let backends = backends_for(driver)
            .ok_or_else(|| BackendError::new(format!("unsupported video driver `{driver}`")))?;
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let adapters = instance.enumerate_adapters(backends);
        if adapters.is_empty() {
            return Err(BackendError::new(format!("no {driver} adapters found")));
        }
        for adapter in &adapters {
            let info = adapter.get_info();
            debug!(driver, name = %info.name, backend = ?info.backend, "adapter available");
        }

        let event_loop = EventLoop::new()
            .map_err(|err| BackendError::new(format!("failed to open the windowing system: {err}")))?;
        let capabilities = BackendCapabilities {
            safe_to_destroy_surface: self.cfg.surface_safe_to_destroy(driver),
        };
        Ok(WgpuBackend::new(driver, instance, event_loop, capabilities))
    }
}

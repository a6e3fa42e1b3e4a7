use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use wgpu::SurfaceError;
use winit::{
    event_loop::EventLoop,
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::Window,
};

use super::pipeline::{TilePipeline, TileUniform, srgb_to_linear, tile_format};
use super::window::{WindowPump, WindowRequest};
use crate::events::{ImageBuffer, InputEvent};
use crate::platform::{
    BackendCapabilities, BackendError, DisplayMode, GraphicsBackend, RendererMode,
};
use crate::processing::layout::PixelRect;

const PUMP_ATTEMPTS: usize = 200;
const PUMP_BACKOFF: Duration = Duration::from_millis(5);

/// Video subsystem brought up for one wgpu backend, with its winit event loop.
pub struct WgpuBackend {
    driver: String,
    instance: wgpu::Instance,
    event_loop: EventLoop<()>,
    pump: WindowPump,
    started: Instant,
    capabilities: BackendCapabilities,
}

pub struct WgpuSurface {
    window: Arc<Window>,
    surface: Arc<wgpu::Surface<'static>>,
    /// Coordinate space of destination rects.
    target: DisplayMode,
}

struct Frame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

pub struct WgpuRenderer {
    window: Arc<Window>,
    surface: Arc<wgpu::Surface<'static>>,
    target: DisplayMode,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    /// Non-sRGB surfaces get linear tiles so texels pass through unconverted.
    tile_format: wgpu::TextureFormat,
    pipeline: TilePipeline,
    frame: Option<Frame>,
}

pub struct WgpuTexture {
    texture: wgpu::Texture,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    alpha: u8,
}

impl WgpuBackend {
    pub(crate) fn new(
        driver: &str,
        instance: wgpu::Instance,
        event_loop: EventLoop<()>,
        capabilities: BackendCapabilities,
    ) -> Self {
        Self {
            driver: driver.to_string(),
            instance,
            event_loop,
            pump: WindowPump::default(),
            started: Instant::now(),
            capabilities,
        }
    }

    fn pump_once(&mut self) {
        if self.pump.exited {
            return;
        }
        if let PumpStatus::Exit(code) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.pump)
        {
            debug!(code, "event loop exited");
            self.pump.mark_exited();
        }
    }

    fn pump_until<T>(
        &mut self,
        what: &str,
        mut ready: impl FnMut(&mut WindowPump) -> Option<T>,
    ) -> Result<T, BackendError> {
        for _ in 0..PUMP_ATTEMPTS {
            if self.pump.exited {
                return Err(BackendError::new(format!(
                    "event loop exited while waiting for {what}"
                )));
            }
            self.pump_once();
            if let Some(value) = ready(&mut self.pump) {
                return Ok(value);
            }
            std::thread::sleep(PUMP_BACKOFF);
        }
        Err(BackendError::new(format!("timed out waiting for {what}")))
    }
}

impl WgpuRenderer {
    fn acquire(&mut self) -> Result<wgpu::SurfaceTexture, BackendError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                info!("splash surface lost; reconfiguring");
                self.reconfigure();
                self.surface.get_current_texture().map_err(|err| {
                    BackendError::new(format!("failed to acquire frame after reconfigure: {err}"))
                })
            }
            Err(err) => Err(BackendError::new(format!("failed to acquire frame: {err}"))),
        }
    }

    fn reconfigure(&mut self) {
        let size = self.window.inner_size();
        self.config.width = size.width.max(1);
        self.config.height = size.height.max(1);
        self.surface.configure(&self.device, &self.config);
        debug!(
            width = self.config.width,
            height = self.config.height,
            "splash surface reconfigured"
        );
    }

    fn clear_color(&self, color: [u8; 3]) -> wgpu::Color {
        let channel = |c: u8| {
            if self.config.format.is_srgb() {
                srgb_to_linear(c)
            } else {
                f64::from(c) / 255.0
            }
        };
        wgpu::Color {
            r: channel(color[0]),
            g: channel(color[1]),
            b: channel(color[2]),
            a: 1.0,
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    type Surface = WgpuSurface;
    type Renderer = WgpuRenderer;
    type Texture = WgpuTexture;

    fn driver(&self) -> &str {
        &self.driver
    }

    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn display_mode(&mut self) -> Result<DisplayMode, BackendError> {
        self.pump_until("a monitor", |pump| pump.monitor)
    }

    fn create_surface(
        &mut self,
        mode: DisplayMode,
        fullscreen: bool,
    ) -> Result<WgpuSurface, BackendError> {
        self.pump.created = None;
        self.pump.request = Some(WindowRequest { mode, fullscreen });
        let window = self
            .pump_until("the splash window", |pump| pump.created.take())?
            .map_err(|err| BackendError::new(format!("window creation failed: {err}")))?;
        let surface = self
            .instance
            .create_surface(window.clone())
            .map_err(|err| BackendError::new(format!("surface creation failed: {err}")))?;
        let size = window.inner_size();
        info!(
            driver = %self.driver,
            width = size.width,
            height = size.height,
            fullscreen,
            "splash window created"
        );
        Ok(WgpuSurface {
            window,
            surface: Arc::new(surface),
            target: mode,
        })
    }

    fn create_renderer(
        &mut self,
        surface: &WgpuSurface,
        mode: RendererMode,
    ) -> Result<WgpuRenderer, BackendError> {
        let adapter = pollster::block_on(self.instance.request_adapter(
            &wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(surface.surface.as_ref()),
                force_fallback_adapter: mode == RendererMode::Software,
            },
        ))
        .map_err(|err| BackendError::new(format!("no {mode:?} adapter: {err}")))?;
        let adapter_info = adapter.get_info();
        debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "adapter selected"
        );

        let caps = surface.surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| BackendError::new("surface is incompatible with the adapter"))?;

        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("splash-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| BackendError::new(format!("failed to acquire GPU device: {err}")))?;

        let size = surface.window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            ?mode,
            "splash surface configured"
        );
        if !config.format.is_srgb() {
            warn!(format = ?config.format, "surface has no sRGB format; uploading linear tiles");
        }

        let pipeline = TilePipeline::new(&device, format);
        Ok(WgpuRenderer {
            window: surface.window.clone(),
            surface: surface.surface.clone(),
            target: surface.target,
            device,
            queue,
            tile_format: tile_format(config.format),
            config,
            pipeline,
            frame: None,
        })
    }

    fn max_texture_dimension(&self, renderer: &WgpuRenderer) -> u32 {
        renderer.device.limits().max_texture_dimension_2d
    }

    fn create_texture(
        &mut self,
        renderer: &WgpuRenderer,
        pixels: &ImageBuffer,
    ) -> Result<WgpuTexture, BackendError> {
        let (w, h) = (pixels.width, pixels.height);
        let max = self.max_texture_dimension(renderer);
        if w == 0 || h == 0 || w > max || h > max {
            return Err(BackendError::new(format!(
                "texture {w}x{h} outside the supported 1..={max} range"
            )));
        }

        let size = wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        };
        renderer
            .device
            .push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = renderer.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("splash-tile"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: renderer.tile_format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        renderer.queue.write_texture(
            texture.as_image_copy(),
            &pixels.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            size,
        );
        if let Some(err) = pollster::block_on(renderer.device.pop_error_scope()) {
            texture.destroy();
            return Err(BackendError::new(format!("texture upload failed: {err}")));
        }

        let uniform = renderer.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("splash-tile-uniform"),
            size: std::mem::size_of::<TileUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = renderer.pipeline.bind_group(&renderer.device, &view, &uniform);

        Ok(WgpuTexture {
            texture,
            uniform,
            bind_group,
            width: w,
            height: h,
            alpha: u8::MAX,
        })
    }

    fn set_texture_alpha(&mut self, texture: &mut WgpuTexture, alpha: u8) {
        texture.alpha = alpha;
    }

    fn clear(&mut self, renderer: &mut WgpuRenderer, color: [u8; 3]) -> Result<(), BackendError> {
        renderer.frame = None;
        let surface_texture = renderer.acquire()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = renderer
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("splash-frame"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("splash-clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(renderer.clear_color(color)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        }
        renderer.frame = Some(Frame {
            surface_texture,
            view,
            encoder,
        });
        Ok(())
    }

    fn draw_texture(
        &mut self,
        renderer: &mut WgpuRenderer,
        texture: &WgpuTexture,
        src: Option<PixelRect>,
        dest: PixelRect,
    ) -> Result<(), BackendError> {
        let target = (renderer.target.width, renderer.target.height);
        let Some(frame) = renderer.frame.as_mut() else {
            return Err(BackendError::new("draw issued outside a frame"));
        };
        // Uniform writes land at submit; each texture is drawn at most once per frame.
        let uniform = TileUniform::new(
            dest,
            target,
            src,
            (texture.width, texture.height),
            texture.alpha,
        );
        renderer
            .queue
            .write_buffer(&texture.uniform, 0, bytemuck::bytes_of(&uniform));

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("splash-tile"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&renderer.pipeline.pipeline);
        pass.set_bind_group(0, &texture.bind_group, &[]);
        pass.draw(0..4, 0..1);
        Ok(())
    }

    fn present(&mut self, renderer: &mut WgpuRenderer) -> Result<(), BackendError> {
        let Some(frame) = renderer.frame.take() else {
            return Err(BackendError::new("present issued without a cleared frame"));
        };
        let Frame {
            surface_texture,
            view,
            encoder,
        } = frame;
        renderer.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
        Ok(())
    }

    fn destroy_texture(&mut self, texture: WgpuTexture) {
        texture.uniform.destroy();
        texture.texture.destroy();
    }

    fn destroy_renderer(&mut self, mut renderer: WgpuRenderer) {
        renderer.frame = None;
        debug!("splash renderer destroyed");
    }

    fn destroy_surface(&mut self, surface: WgpuSurface) {
        drop(surface);
        debug!("splash window destroyed");
    }

    fn abandon_surface(&mut self, surface: WgpuSurface) {
        debug!(driver = %self.driver, "leaving splash window to the process exit");
        std::mem::forget(surface);
    }

    fn poll_event(&mut self) -> Option<InputEvent> {
        if self.pump.events.is_empty() {
            self.pump_once();
        }
        self.pump.events.pop_front()
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn sleep_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }

    fn teardown(self) {
        info!(driver = %self.driver, "video subsystem shut down");
    }
}

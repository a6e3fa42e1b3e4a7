pub mod fade;
pub mod state;

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Configuration;
use crate::error::DisplayError;
use crate::events::ImageBuffer;
use crate::platform::{
    BackendCapabilities, BackendError, DisplayMode, GraphicsBackend, Platform, RendererMode,
    select_backend,
};
use crate::processing::layout::{self, Size};
use crate::processing::scale::apply_plan;
use crate::processing::tiles::{Tile, partition, release_tiles};
use crate::tasks::loader::ImageDecoder;

use fade::FadeState;
use state::{PresentationSM, PresentationState};

const FRAME_LOG_INTERVAL: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The dwell time elapsed without interruption.
    MinimumDurationElapsed,
    /// A quit event, key press or external shutdown request ended the session.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub driver: String,
    pub display: DisplayMode,
    pub renderer: RendererMode,
    pub tiles: usize,
    pub frames: u64,
    pub final_alpha: u8,
    pub exit: ExitReason,
}

/// Handles acquired so far, released newest-first by [`Session::shutdown`].
struct Session<B: GraphicsBackend> {
    backend: B,
    capabilities: BackendCapabilities,
    surface: Option<B::Surface>,
    renderer: Option<B::Renderer>,
    tiles: Vec<Tile<B::Texture>>,
}

impl<B: GraphicsBackend> Session<B> {
    fn new(backend: B) -> Self {
        let capabilities = backend.capabilities();
        Self {
            backend,
            capabilities,
            surface: None,
            renderer: None,
            tiles: Vec::new(),
        }
    }

    fn shutdown(mut self) {
        let tiles = std::mem::take(&mut self.tiles);
        let tile_count = tiles.len();
        release_tiles(&mut self.backend, tiles);
        if let Some(renderer) = self.renderer.take() {
            self.backend.destroy_renderer(renderer);
        }
        if let Some(surface) = self.surface.take() {
            if self.capabilities.safe_to_destroy_surface {
                self.backend.destroy_surface(surface);
            } else {
                debug!(
                    driver = self.backend.driver(),
                    "surface is unsafe to destroy on this driver; abandoning it"
                );
                self.backend.abandon_surface(surface);
            }
        }
        debug!(tiles = tile_count, "presentation resources released");
        self.backend.teardown();
    }
}

/// Shows the configured photo until the dwell time elapses or someone cancels.
///
/// Runs the whole lifecycle on the calling thread: driver selection, surface
/// and renderer creation, decode, plan, resample, tiling, then the frame loop.
/// Every handle acquired on the way is released in reverse order before this
/// returns, on success and on failure alike.
pub fn run<P, D>(
    platform: &mut P,
    decoder: &D,
    cfg: &Configuration,
    cancel: &CancellationToken,
) -> Result<SessionReport, DisplayError>
where
    P: Platform,
    D: ImageDecoder + ?Sized,
{
    let mut sm = PresentationSM::new();
    let backend = select_backend(platform, &cfg.video_drivers).inspect_err(|err| {
        error!(stage = %err.stage(), error = %err, "presentation failed");
    })?;

    let mut session = Session::new(backend);
    let outcome = present(&mut session, &mut sm, decoder, cfg, cancel);
    sm.on_exit();
    session.shutdown();

    match &outcome {
        Ok(report) => info!(
            driver = %report.driver,
            frames = report.frames,
            exit = ?report.exit,
            "presentation finished"
        ),
        Err(err) => error!(stage = %err.stage(), error = %err, "presentation failed"),
    }
    outcome
}

fn present<B, D>(
    session: &mut Session<B>,
    sm: &mut PresentationSM,
    decoder: &D,
    cfg: &Configuration,
    cancel: &CancellationToken,
) -> Result<SessionReport, DisplayError>
where
    B: GraphicsBackend,
    D: ImageDecoder + ?Sized,
{
    let driver = session.backend.driver().to_string();
    let mode = session.backend.display_mode().map_err(|err| {
        DisplayError::SurfaceCreationFailed(BackendError::new(format!(
            "display mode query failed: {err}"
        )))
    })?;
    if mode.width == 0 || mode.height == 0 {
        return Err(DisplayError::SurfaceCreationFailed(BackendError::new(
            format!("display mode query failed: backend reported {mode}"),
        )));
    }
    info!(driver = %driver, display = %mode, "display mode");

    let surface = session
        .backend
        .create_surface(mode, cfg.fullscreen)
        .map_err(DisplayError::SurfaceCreationFailed)?;
    let surface = session.surface.insert(surface);
    let (renderer, renderer_mode) =
        create_renderer(&mut session.backend, surface, cfg.renderer_fallback)?;
    let renderer = session.renderer.insert(renderer);
    sm.on_backend_ready();

    let display = Size::new(mode.width, mode.height);
    let scaled = load_image(decoder, cfg, display)?;
    let hw_limit = session.backend.max_texture_dimension(renderer);
    let max_tile = cfg.max_tile_dimension.min(hw_limit);
    if max_tile < cfg.max_tile_dimension {
        debug!(
            configured = cfg.max_tile_dimension,
            hardware = hw_limit,
            "tile size limited by renderer"
        );
    }
    session.tiles = partition(
        &mut session.backend,
        renderer,
        &scaled,
        max_tile,
        display,
        cfg.max_tiles,
    )?;
    drop(scaled);
    info!(tiles = session.tiles.len(), tile_dim = max_tile, "photo uploaded");
    sm.on_tiles_ready();

    let stats = run_frames(
        &mut session.backend,
        renderer,
        &mut session.tiles,
        sm,
        cfg,
        cancel,
    )?;

    Ok(SessionReport {
        driver,
        display: mode,
        renderer: renderer_mode,
        tiles: session.tiles.len(),
        frames: stats.frames,
        final_alpha: stats.final_alpha,
        exit: stats.exit,
    })
}

fn create_renderer<B: GraphicsBackend>(
    backend: &mut B,
    surface: &B::Surface,
    fallback: bool,
) -> Result<(B::Renderer, RendererMode), DisplayError> {
    match backend.create_renderer(surface, RendererMode::Accelerated) {
        Ok(renderer) => Ok((renderer, RendererMode::Accelerated)),
        Err(err) if fallback => {
            warn!(error = %err, "accelerated renderer unavailable; trying software");
            backend
                .create_renderer(surface, RendererMode::Software)
                .map(|renderer| (renderer, RendererMode::Software))
                .map_err(|soft| {
                    DisplayError::RendererCreationFailed(BackendError::new(format!(
                        "accelerated: {err}; software: {soft}"
                    )))
                })
        }
        Err(err) => Err(DisplayError::RendererCreationFailed(err)),
    }
}

/// Decode, plan and resample; each step consumes the previous buffer.
fn load_image<D: ImageDecoder + ?Sized>(
    decoder: &D,
    cfg: &Configuration,
    display: Size,
) -> Result<ImageBuffer, DisplayError> {
    let decoded =
        decoder
            .decode(&cfg.image_path)
            .map_err(|err| DisplayError::ImageDecodeFailed {
                path: cfg.image_path.clone(),
                reason: format!("{err:#}"),
            })?;
    let plan = layout::plan(
        Size::new(decoded.width, decoded.height),
        display,
        cfg.fit,
    )?;
    info!(
        source_w = decoded.width,
        source_h = decoded.height,
        out_w = plan.output.width,
        out_h = plan.output.height,
        scale = plan.scale,
        fit = ?plan.policy,
        crop = ?plan.crop,
        "geometry planned"
    );
    apply_plan(decoded, &plan)
}

struct FrameStats {
    frames: u64,
    final_alpha: u8,
    exit: ExitReason,
}

fn run_frames<B: GraphicsBackend>(
    backend: &mut B,
    renderer: &mut B::Renderer,
    tiles: &mut [Tile<B::Texture>],
    sm: &mut PresentationSM,
    cfg: &Configuration,
    cancel: &CancellationToken,
) -> Result<FrameStats, DisplayError> {
    let fade = FadeState::new(
        backend.now_ms(),
        cfg.fade_duration,
        cfg.min_display_duration,
    );
    let frame_ms = duration_ms(cfg.frame_interval);
    let mut frames = 0u64;
    let mut final_alpha = 0u8;
    let mut cancelled = false;

    loop {
        let frame_start = backend.now_ms();
        while let Some(event) = backend.poll_event() {
            if event.is_terminal() && !cancelled {
                info!(?event, "input requested exit");
                cancelled = true;
            }
        }
        if !cancelled && cancel.is_cancelled() {
            info!("shutdown requested");
            cancelled = true;
        }

        let now = backend.now_ms();
        let alpha = fade.alpha_at(now);
        let keep_going = fade.should_continue(now, cancelled);
        if let Some(change) = sm.on_frame(alpha, keep_going) {
            if change.to == PresentationState::Steady {
                info!(elapsed_ms = fade.elapsed(now), "fade-in complete");
            }
        }
        if sm.current() == PresentationState::Exiting {
            break;
        }

        render_frame(backend, renderer, tiles, alpha, cfg.background_color)
            .map_err(DisplayError::RuntimeRenderFailed)?;
        frames += 1;
        final_alpha = alpha;
        if frames % FRAME_LOG_INTERVAL == 0 {
            debug!(frames, alpha, elapsed_ms = fade.elapsed(now), "frame presented");
        }

        if cancel.is_cancelled() {
            continue;
        }
        let spent = backend.now_ms().saturating_sub(frame_start);
        let pause = frame_ms.saturating_sub(spent);
        if pause > 0 {
            backend.sleep_ms(pause);
        }
    }

    Ok(FrameStats {
        frames,
        final_alpha,
        exit: if cancelled {
            ExitReason::Cancelled
        } else {
            ExitReason::MinimumDurationElapsed
        },
    })
}

fn render_frame<B: GraphicsBackend>(
    backend: &mut B,
    renderer: &mut B::Renderer,
    tiles: &mut [Tile<B::Texture>],
    alpha: u8,
    background: [u8; 3],
) -> Result<(), BackendError> {
    backend.clear(renderer, background)?;
    for tile in tiles.iter_mut() {
        backend.set_texture_alpha(&mut tile.texture, alpha);
        backend.draw_texture(renderer, &tile.texture, None, tile.dest)?;
    }
    backend.present(renderer)
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

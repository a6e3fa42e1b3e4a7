use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use humantime::format_duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use photo_splash::config::Configuration;
use photo_splash::gpu::WgpuPlatform;
use photo_splash::tasks::{loader::ExifAwareDecoder, viewer};

#[derive(Debug, Parser)]
#[command(
    name = "photo-splash",
    version,
    about = "fade a single photo in on a fullscreen display"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Show this file instead of the configured image-path
    #[arg(long, value_name = "FILE")]
    image: Option<PathBuf>,
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        image,
        verbose,
    } = Args::parse();

    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!("{default_level},wgpu=warn,naga=warn,winit=warn"))
            }),
        )
        .with_target(false)
        .compact()
        .init();

    let mut cfg = Configuration::load(&config)?;
    if let Some(image) = image {
        cfg = cfg.with_image_path(image);
    }
    tracing::info!(
        image = %cfg.image_path.display(),
        fit = ?cfg.fit,
        fade = %format_duration(cfg.fade_duration),
        dwell = %format_duration(cfg.min_display_duration),
        drivers = ?cfg.video_drivers,
        "loaded configuration from {}",
        config.display()
    );

    let cancel = CancellationToken::new();

    // Ctrl-C and SIGTERM end the session early
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    #[cfg(unix)]
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        received = sigterm.recv() => {
                            if received.is_some() {
                                tracing::info!("SIGTERM received; initiating shutdown");
                                cancel.cancel();
                            }
                        }
                    }
                }
                Err(err) => tracing::warn!("failed to register SIGTERM handler: {err}"),
            }
        });
    }

    // The window and GPU stay on the main thread; the runtime only hosts the watchers.
    let mut platform = WgpuPlatform::new(&cfg);
    let report = tokio::task::block_in_place(|| {
        viewer::run(&mut platform, &ExifAwareDecoder, &cfg, &cancel)
    })
    .map_err(|err| {
        let stage = err.stage();
        anyhow::Error::new(err).context(format!("photo splash failed during {stage}"))
    })?;

    tracing::info!(
        driver = %report.driver,
        display = %report.display,
        renderer = ?report.renderer,
        tiles = report.tiles,
        frames = report.frames,
        exit = ?report.exit,
        "splash complete"
    );
    cancel.cancel();
    Ok(())
}

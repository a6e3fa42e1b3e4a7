use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::processing::layout::FitPolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Photo shown for the session.
    pub image_path: PathBuf,
    /// Video drivers tried in order until one initializes.
    pub video_drivers: Vec<String>,
    /// How the photo is mapped onto the display.
    pub fit: FitPolicy,
    /// Time for the photo to go from transparent to opaque.
    #[serde(with = "humantime_serde")]
    pub fade_duration: Duration,
    /// Minimum time the photo stays up when nobody cancels.
    #[serde(with = "humantime_serde")]
    pub min_display_duration: Duration,
    /// Pacing interval between frames.
    #[serde(with = "humantime_serde")]
    pub frame_interval: Duration,
    /// Upper bound for a tile edge; the renderer's own limit also applies.
    pub max_tile_dimension: u32,
    /// Tiles allowed per image before loading fails.
    pub max_tiles: usize,
    pub fullscreen: bool,
    /// Retry with a software renderer when the accelerated one cannot be created.
    pub renderer_fallback: bool,
    /// Color behind letterbox/pillarbox margins and under the fade.
    pub background_color: [u8; 3],
    /// Drivers whose window must not be destroyed at exit.
    pub surface_teardown_quirks: Vec<String>,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.image_path.as_os_str().is_empty(),
            "image-path must not be empty"
        );
        ensure!(
            !self.video_drivers.is_empty(),
            "video-drivers must list at least one driver"
        );
        ensure!(
            self.video_drivers.iter().all(|d| !d.trim().is_empty()),
            "video-drivers entries must not be blank"
        );
        ensure!(
            self.max_tile_dimension > 0,
            "max-tile-dimension must be greater than zero"
        );
        ensure!(self.max_tiles > 0, "max-tiles must be greater than zero");
        ensure!(
            !self.frame_interval.is_zero(),
            "frame-interval must be greater than zero"
        );
        ensure!(
            self.frame_interval < Duration::from_secs(1),
            "frame-interval must be shorter than one second"
        );
        Ok(self)
    }

    pub fn with_image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = path.into();
        self
    }

    pub fn surface_safe_to_destroy(&self, driver: &str) -> bool {
        !self
            .surface_teardown_quirks
            .iter()
            .any(|quirk| quirk.eq_ignore_ascii_case(driver))
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?
            .validated()
            .context("invalid configuration values")
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            image_path: PathBuf::new(),
            video_drivers: Self::default_video_drivers(),
            fit: FitPolicy::Contain,
            fade_duration: Duration::from_millis(2000),
            min_display_duration: Duration::from_millis(5000),
            frame_interval: Duration::from_millis(16),
            max_tile_dimension: 2048,
            max_tiles: 4,
            fullscreen: true,
            renderer_fallback: true,
            background_color: [0, 0, 0],
            surface_teardown_quirks: Vec::new(),
        }
    }
}

impl Configuration {
    fn default_video_drivers() -> Vec<String> {
        ["vulkan", "gl", "auto"].map(String::from).to_vec()
    }
}

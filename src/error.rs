use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::platform::BackendError;

/// One failed driver initialization, kept so the final error can list them all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAttempt {
    pub driver: String,
    pub message: String,
}

impl fmt::Display for BackendAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.driver, self.message)
    }
}

/// Pipeline stage a [`DisplayError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Initializing,
    Loading,
    Presenting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initializing => "initializing",
            Self::Loading => "loading",
            Self::Presenting => "presenting",
        })
    }
}

/// Library error type for the display pipeline. Every variant is fatal to the session.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// Every configured video driver failed to initialize.
    #[error("no video backend available ({})", describe_attempts(.attempts))]
    NoBackendAvailable { attempts: Vec<BackendAttempt> },

    /// The fullscreen surface (window) could not be created.
    #[error("surface creation failed: {0}")]
    SurfaceCreationFailed(BackendError),

    /// Neither renderer mode could be created for the surface.
    #[error("renderer creation failed: {0}")]
    RendererCreationFailed(BackendError),

    /// The image decoder rejected the file.
    #[error("failed to decode image {}: {reason}", .path.display())]
    ImageDecodeFailed { path: PathBuf, reason: String },

    /// Zero-sized inputs, or a resample that could not be performed.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The tile grid would exceed the configured cap.
    #[error("image needs {tiles_x}x{tiles_y} tiles but at most {max_tiles} are allowed")]
    TooManyTiles {
        tiles_x: u32,
        tiles_y: u32,
        max_tiles: usize,
    },

    /// A tile texture could not be created; all earlier tiles were released.
    #[error("texture creation failed for tile {tile}: {source}")]
    TextureCreationFailed {
        tile: usize,
        #[source]
        source: BackendError,
    },

    /// Clearing, drawing or presenting a frame failed.
    #[error("render failed: {0}")]
    RuntimeRenderFailed(BackendError),
}

impl DisplayError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::NoBackendAvailable { .. }
            | Self::SurfaceCreationFailed(_)
            | Self::RendererCreationFailed(_) => Stage::Initializing,
            Self::ImageDecodeFailed { .. }
            | Self::InvalidGeometry(_)
            | Self::TooManyTiles { .. }
            | Self::TextureCreationFailed { .. } => Stage::Loading,
            Self::RuntimeRenderFailed(_) => Stage::Presenting,
        }
    }
}

fn describe_attempts(attempts: &[BackendAttempt]) -> String {
    if attempts.is_empty() {
        return "no drivers configured".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_backend_lists_every_attempt() {
        let err = DisplayError::NoBackendAvailable {
            attempts: vec![
                BackendAttempt {
                    driver: "vulkan".into(),
                    message: "no adapters".into(),
                },
                BackendAttempt {
                    driver: "gl".into(),
                    message: "egl missing".into(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("vulkan: no adapters"), "{text}");
        assert!(text.contains("gl: egl missing"), "{text}");
        assert_eq!(err.stage(), Stage::Initializing);
    }

    #[test]
    fn empty_driver_list_is_described() {
        let err = DisplayError::NoBackendAvailable { attempts: vec![] };
        assert!(err.to_string().contains("no drivers configured"));
    }

    #[test]
    fn stages_follow_the_pipeline() {
        assert_eq!(
            DisplayError::TooManyTiles {
                tiles_x: 3,
                tiles_y: 3,
                max_tiles: 4
            }
            .stage(),
            Stage::Loading
        );
        assert_eq!(
            DisplayError::RuntimeRenderFailed(BackendError::new("lost")).stage(),
            Stage::Presenting
        );
    }
}

use tracing::{info, warn};

use crate::error::{BackendAttempt, DisplayError};
use crate::platform::{GraphicsBackend, Platform};

/// Initializes the first driver in `drivers` that comes up.
///
/// Each failed attempt is dropped before the next one starts and recorded in
/// the returned error when nothing works.
pub fn select_backend<P, S>(platform: &mut P, drivers: &[S]) -> Result<P::Backend, DisplayError>
where
    P: Platform,
    S: AsRef<str>,
{
    let mut attempts = Vec::with_capacity(drivers.len());
    for driver in drivers {
        let driver = driver.as_ref();
        info!(driver, "trying video driver");
        match platform.init(driver) {
            Ok(backend) => {
                info!(driver = backend.driver(), "video driver initialized");
                return Ok(backend);
            }
            Err(err) => {
                warn!(driver, error = %err, "video driver failed to initialize");
                attempts.push(BackendAttempt {
                    driver: driver.to_string(),
                    message: err.to_string(),
                });
            }
        }
    }
    Err(DisplayError::NoBackendAvailable { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testkit::{BackendOp, ScriptedPlatform};

    #[test]
    fn stops_at_first_working_driver() {
        let mut platform = ScriptedPlatform::new()
            .failing_driver("kmsdrm", "no drm device")
            .working_driver("x11")
            .working_driver("wayland");
        let backend = select_backend(&mut platform, &["kmsdrm", "x11", "wayland"]).unwrap();
        assert_eq!(backend.driver(), "x11");
        assert_eq!(
            platform.log().ops(),
            vec![
                BackendOp::InitFailed("kmsdrm".into()),
                BackendOp::Init("x11".into()),
            ]
        );
    }

    #[test]
    fn reports_every_failed_attempt() {
        let mut platform = ScriptedPlatform::new()
            .failing_driver("vulkan", "no adapters")
            .failing_driver("gl", "egl unavailable");
        let err = select_backend(&mut platform, &["vulkan", "gl"])
            .err()
            .expect("selection should fail");
        match err {
            DisplayError::NoBackendAvailable { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].driver, "vulkan");
                assert_eq!(attempts[1].message, "egl unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_list_fails() {
        let mut platform = ScriptedPlatform::new().working_driver("x11");
        let drivers: [&str; 0] = [];
        assert!(matches!(
            select_backend(&mut platform, &drivers),
            Err(DisplayError::NoBackendAvailable { attempts }) if attempts.is_empty()
        ));
        assert!(platform.log().ops().is_empty());
    }
}

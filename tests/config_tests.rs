use photo_splash::config::Configuration;
use photo_splash::processing::layout::FitPolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn write_config(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("splash.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
image-path: "/srv/splash/boot.jpg"
video-drivers: [kmsdrm, gl]
fit: cover
fade-duration: 750ms
min-display-duration: 8s
frame-interval: 20ms
max-tile-dimension: 4096
max-tiles: 6
fullscreen: false
renderer-fallback: false
background-color: [16, 16, 16]
surface-teardown-quirks: [kmsdrm]
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.image_path, PathBuf::from("/srv/splash/boot.jpg"));
    assert_eq!(cfg.video_drivers, vec!["kmsdrm", "gl"]);
    assert_eq!(cfg.fit, FitPolicy::Cover);
    assert_eq!(cfg.fade_duration, Duration::from_millis(750));
    assert_eq!(cfg.min_display_duration, Duration::from_secs(8));
    assert_eq!(cfg.frame_interval, Duration::from_millis(20));
    assert_eq!(cfg.max_tile_dimension, 4096);
    assert_eq!(cfg.max_tiles, 6);
    assert!(!cfg.fullscreen);
    assert!(!cfg.renderer_fallback);
    assert_eq!(cfg.background_color, [16, 16, 16]);
    assert!(!cfg.surface_safe_to_destroy("kmsdrm"));
    assert!(cfg.surface_safe_to_destroy("gl"));
}

#[test]
fn omitted_keys_take_defaults() {
    let cfg: Configuration = serde_yaml::from_str("image-path: /tmp/a.png\n").unwrap();
    assert_eq!(cfg.video_drivers, vec!["vulkan", "gl", "auto"]);
    assert_eq!(cfg.fit, FitPolicy::Contain);
    assert_eq!(cfg.fade_duration, Duration::from_secs(2));
    assert_eq!(cfg.min_display_duration, Duration::from_secs(5));
    assert_eq!(cfg.frame_interval, Duration::from_millis(16));
    assert_eq!(cfg.max_tile_dimension, 2048);
    assert_eq!(cfg.max_tiles, 4);
    assert!(cfg.fullscreen);
    assert!(cfg.renderer_fallback);
    assert_eq!(cfg.background_color, [0, 0, 0]);
    assert!(cfg.surface_teardown_quirks.is_empty());
}

#[test]
fn quirk_match_ignores_case() {
    let cfg: Configuration =
        serde_yaml::from_str("image-path: a.png\nsurface-teardown-quirks: [KMSDRM]\n").unwrap();
    assert!(!cfg.surface_safe_to_destroy("kmsdrm"));
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "image-path: a.png\nfade-time: 2s\n");
    let err = Configuration::load(&path).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("failed to load configuration"), "{msg}");
    assert!(msg.contains("unknown field"), "{msg}");
}

#[test]
fn load_validates_values() {
    let dir = tempfile::tempdir().unwrap();
    let cases = [
        ("fit: contain\n", "image-path"),
        ("image-path: a.png\nvideo-drivers: []\n", "video-drivers"),
        ("image-path: a.png\nvideo-drivers: [' ']\n", "video-drivers"),
        ("image-path: a.png\nmax-tiles: 0\n", "max-tiles"),
        ("image-path: a.png\nmax-tile-dimension: 0\n", "max-tile-dimension"),
        ("image-path: a.png\nframe-interval: 0s\n", "frame-interval"),
        ("image-path: a.png\nframe-interval: 2s\n", "frame-interval"),
    ];
    for (yaml, needle) in cases {
        let path = write_config(dir.path(), yaml);
        let err = Configuration::load(&path).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("invalid configuration values"), "{msg}");
        assert!(msg.contains(needle), "expected `{needle}` in `{msg}`");
    }
}

#[test]
fn load_accepts_a_minimal_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "image-path: splash.png\n");
    let cfg = Configuration::load(&path).unwrap();
    assert_eq!(cfg.image_path, PathBuf::from("splash.png"));
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = Configuration::load(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{err:#}").contains("absent.yaml"));
}

#[test]
fn image_override_replaces_configured_path() {
    let cfg: Configuration = serde_yaml::from_str("image-path: a.png\n").unwrap();
    let cfg = cfg.with_image_path("/tmp/b.jpg");
    assert_eq!(cfg.image_path, PathBuf::from("/tmp/b.jpg"));
}

use photo_splash::error::DisplayError;
use photo_splash::events::ImageBuffer;
use photo_splash::platform::testkit::{
    BackendOp, ScriptedBackend, ScriptedPlatform, ScriptedRenderer,
};
use photo_splash::platform::{DisplayMode, GraphicsBackend, Platform, RendererMode};
use photo_splash::processing::layout::{PixelRect, Size};
use photo_splash::processing::tiles::{partition, release_tiles, tile_grid};

fn bring_up(
    platform: &mut ScriptedPlatform,
    width: u32,
    height: u32,
) -> (ScriptedBackend, ScriptedRenderer) {
    let mut backend = platform.init("test").unwrap();
    let surface = backend
        .create_surface(DisplayMode { width, height }, true)
        .unwrap();
    let renderer = backend
        .create_renderer(&surface, RendererMode::Accelerated)
        .unwrap();
    (backend, renderer)
}

#[test]
fn uneven_image_gets_edge_slivers() {
    let grid = tile_grid(Size::new(3000, 2500), 2048, Size::new(3000, 2500), 4).unwrap();
    assert_eq!((grid.tiles_x, grid.tiles_y), (2, 2));
    let sizes: Vec<_> = grid
        .placements
        .iter()
        .map(|p| (p.source.width, p.source.height))
        .collect();
    assert_eq!(sizes, vec![(2048, 2048), (952, 2048), (2048, 452), (952, 452)]);
}

#[test]
fn grid_over_the_cap_is_rejected() {
    let err = tile_grid(Size::new(5000, 5000), 2048, Size::new(1920, 1080), 4).unwrap_err();
    match err {
        DisplayError::TooManyTiles {
            tiles_x,
            tiles_y,
            max_tiles,
        } => assert_eq!((tiles_x, tiles_y, max_tiles), (3, 3, 4)),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn tiles_cover_the_image_exactly_once() {
    let outputs = [(1, 1), (17, 9), (1440, 1080), (1920, 1080), (2049, 2047), (4000, 100)];
    for &(w, h) in &outputs {
        for dim in [3, 7, 64, 1000, 2048, 4096] {
            let output = Size::new(w, h);
            let display = Size::new(1920, 1080);
            let Ok(grid) = tile_grid(output, dim, display, usize::MAX) else {
                panic!("grid failed for {w}x{h} with {dim}");
            };
            assert_eq!(grid.tiles_x, w.div_ceil(dim));
            assert_eq!(grid.tiles_y, h.div_ceil(dim));

            let image = PixelRect::new(0, 0, w, h);
            let area: u64 = grid.placements.iter().map(|p| p.source.area()).sum();
            assert_eq!(area, image.area(), "{w}x{h} with {dim}");
            for p in &grid.placements {
                assert!(image.contains(&p.source));
                assert!(p.source.width <= dim && p.source.height <= dim);
                assert_eq!((p.dest.width, p.dest.height), (p.source.width, p.source.height));
            }
            // quadratic, so only for small grids
            if grid.len() <= 64 {
                for (i, a) in grid.placements.iter().enumerate() {
                    for b in &grid.placements[i + 1..] {
                        assert!(!a.source.intersects(&b.source));
                        assert!(!a.dest.intersects(&b.dest));
                    }
                }
            }
        }
    }
}

#[test]
fn destinations_are_centered_on_the_display() {
    let grid = tile_grid(Size::new(1440, 1080), 1000, Size::new(1920, 1080), 4).unwrap();
    assert_eq!(grid.len(), 4);
    assert_eq!(grid.placements[0].dest, PixelRect::new(240, 0, 1000, 1000));
    assert_eq!(grid.placements[1].dest, PixelRect::new(1240, 0, 440, 1000));
    assert_eq!(grid.placements[2].dest, PixelRect::new(240, 1000, 1000, 80));
    assert_eq!(grid.placements[3].dest, PixelRect::new(1240, 1000, 440, 80));
}

#[test]
fn partition_uploads_each_tile_with_its_own_pixels() {
    let mut platform = ScriptedPlatform::new().working_driver("test");
    let log = platform.log();
    let (mut backend, renderer) = bring_up(&mut platform, 30, 20);

    let mut image = ImageBuffer::filled(30, 20, [0, 0, 0, 255]);
    // mark the first pixel of the bottom-right tile
    let at = (10 * 30 + 20) * 4;
    image.pixels[at..at + 4].copy_from_slice(&[255, 0, 0, 255]);

    let tiles = partition(&mut backend, &renderer, &image, 10, Size::new(30, 20), 6).unwrap();
    assert_eq!(tiles.len(), 6);
    assert_eq!(tiles[5].source, PixelRect::new(20, 10, 10, 10));
    assert_eq!(tiles[5].dest, PixelRect::new(20, 10, 10, 10));
    let created = log.count(|op| matches!(op, BackendOp::CreateTexture { width: 10, height: 10, .. }));
    assert_eq!(created, 6);

    let region = image.region(tiles[5].source);
    assert_eq!(&region.pixels[0..4], &[255, 0, 0, 255]);

    release_tiles(&mut backend, tiles);
    let destroyed: Vec<_> = log
        .ops()
        .into_iter()
        .filter_map(|op| match op {
            BackendOp::DestroyTexture(id) => Some(id),
            _ => None,
        })
        .collect();
    assert_eq!(destroyed, vec![5, 4, 3, 2, 1, 0]);
}

#[test]
fn failed_upload_releases_earlier_tiles_in_reverse() {
    let mut platform = ScriptedPlatform::new()
        .working_driver("test")
        .failing_texture(2);
    let log = platform.log();
    let (mut backend, renderer) = bring_up(&mut platform, 30, 20);
    let image = ImageBuffer::filled(30, 20, [1, 2, 3, 255]);

    let err = partition(&mut backend, &renderer, &image, 10, Size::new(30, 20), 6)
        .err()
        .expect("third upload should fail");
    assert!(matches!(err, DisplayError::TextureCreationFailed { tile: 2, .. }));

    let tail: Vec<_> = log
        .ops()
        .into_iter()
        .skip_while(|op| !matches!(op, BackendOp::CreateTexture { .. }))
        .collect();
    assert_eq!(
        tail,
        vec![
            BackendOp::CreateTexture { id: 0, width: 10, height: 10 },
            BackendOp::CreateTexture { id: 1, width: 10, height: 10 },
            BackendOp::TextureFailed { index: 2 },
            BackendOp::DestroyTexture(1),
            BackendOp::DestroyTexture(0),
        ]
    );
}

#[test]
fn cap_is_checked_before_any_upload() {
    let mut platform = ScriptedPlatform::new().working_driver("test");
    let log = platform.log();
    let (mut backend, renderer) = bring_up(&mut platform, 50, 50);
    let image = ImageBuffer::filled(50, 50, [0, 0, 0, 255]);

    let err = partition(&mut backend, &renderer, &image, 20, Size::new(50, 50), 4)
        .err()
        .expect("3x3 grid exceeds the cap");
    assert!(matches!(err, DisplayError::TooManyTiles { .. }));
    assert_eq!(log.count(|op| matches!(op, BackendOp::CreateTexture { .. })), 0);
}

//! Splits a scaled image into texture-sized tiles centered on the display.

use tracing::{debug, warn};

use crate::error::DisplayError;
use crate::events::ImageBuffer;
use crate::platform::GraphicsBackend;
use crate::processing::layout::{PixelRect, Size, center_offset};

/// Where one tile comes from and where it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePlacement {
    /// Rectangle within the scaled image.
    pub source: PixelRect,
    /// Same-sized rectangle within the display.
    pub dest: PixelRect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub tile_dim: u32,
    /// Row-major.
    pub placements: Vec<TilePlacement>,
}

impl TileGrid {
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// A tile whose pixels live in a backend texture.
pub struct Tile<T> {
    pub source: PixelRect,
    pub dest: PixelRect,
    pub texture: T,
}

/// Lays out the grid for an `output`-sized image without touching the backend.
pub fn tile_grid(
    output: Size,
    max_tile_dim: u32,
    display: Size,
    max_tiles: usize,
) -> Result<TileGrid, DisplayError> {
    if max_tile_dim == 0 {
        return Err(DisplayError::InvalidGeometry(
            "maximum tile dimension must be positive".into(),
        ));
    }
    if output.width == 0 || output.height == 0 {
        return Err(DisplayError::InvalidGeometry(format!(
            "cannot tile an empty {}x{} image",
            output.width, output.height
        )));
    }

    let tiles_x = output.width.div_ceil(max_tile_dim);
    let tiles_y = output.height.div_ceil(max_tile_dim);
    let count = u64::from(tiles_x) * u64::from(tiles_y);
    if count > max_tiles as u64 {
        return Err(DisplayError::TooManyTiles {
            tiles_x,
            tiles_y,
            max_tiles,
        });
    }

    let (ox, oy) = center_offset(output, display);
    let mut placements = Vec::with_capacity(count as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x = tx * max_tile_dim;
            let y = ty * max_tile_dim;
            let source = PixelRect::new(
                x as i32,
                y as i32,
                max_tile_dim.min(output.width - x),
                max_tile_dim.min(output.height - y),
            );
            placements.push(TilePlacement {
                source,
                dest: source.offset(ox, oy),
            });
        }
    }

    Ok(TileGrid {
        tiles_x,
        tiles_y,
        tile_dim: max_tile_dim,
        placements,
    })
}

/// Uploads every tile of `image` as its own texture.
///
/// All-or-nothing: when any upload fails, the textures created so far are
/// destroyed newest-first and the error is returned.
pub fn partition<B: GraphicsBackend>(
    backend: &mut B,
    renderer: &B::Renderer,
    image: &ImageBuffer,
    max_tile_dim: u32,
    display: Size,
    max_tiles: usize,
) -> Result<Vec<Tile<B::Texture>>, DisplayError> {
    let grid = tile_grid(
        Size::new(image.width, image.height),
        max_tile_dim,
        display,
        max_tiles,
    )?;
    debug!(
        tiles_x = grid.tiles_x,
        tiles_y = grid.tiles_y,
        tile_dim = grid.tile_dim,
        "tile grid planned"
    );

    let mut tiles: Vec<Tile<B::Texture>> = Vec::with_capacity(grid.len());
    for (index, placement) in grid.placements.iter().enumerate() {
        let pixels = image.region(placement.source);
        match backend.create_texture(renderer, &pixels) {
            Ok(texture) => tiles.push(Tile {
                source: placement.source,
                dest: placement.dest,
                texture,
            }),
            Err(source) => {
                warn!(tile = index, error = %source, "tile texture creation failed; releasing earlier tiles");
                release_tiles(backend, tiles);
                return Err(DisplayError::TextureCreationFailed {
                    tile: index,
                    source,
                });
            }
        }
    }
    Ok(tiles)
}

/// Destroys tiles in reverse creation order.
pub fn release_tiles<B: GraphicsBackend>(backend: &mut B, mut tiles: Vec<Tile<B::Texture>>) {
    while let Some(tile) = tiles.pop() {
        backend.destroy_texture(tile.texture);
    }
}

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use image::{RgbaImage, imageops};
use tracing::debug;

use crate::events::ImageBuffer;

/// Turns a file into RGBA8 pixels. Format detection is the decoder's business.
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Result<ImageBuffer>;
}

/// Decoder backed by the `image` crate, with EXIF orientation applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifAwareDecoder;

impl ImageDecoder for ExifAwareDecoder {
    fn decode(&self, path: &Path) -> Result<ImageBuffer> {
        let img = decode_rgba8_apply_exif(path)?;
        let (width, height) = img.dimensions();
        debug!(path = %path.display(), width, height, "decoded image");
        ImageBuffer::new(width, height, img.into_raw())
            .context("decoder produced a buffer of unexpected length")
    }
}

fn decode_rgba8_apply_exif(path: &Path) -> Result<RgbaImage> {
    let img = image::ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .with_guessed_format()
        .context("failed to sniff image format")?
        .decode()
        .with_context(|| format!("failed to decode {}", path.display()))?
        .to_rgba8();

    let orientation = read_orientation(path).unwrap_or(1);
    Ok(apply_orientation(img, orientation))
}

/// Maps the eight EXIF orientations onto flips and quarter turns.
fn apply_orientation(img: RgbaImage, orientation: u16) -> RgbaImage {
    match orientation {
        2 => imageops::flip_horizontal(&img),
        3 => imageops::rotate180(&img),
        4 => imageops::flip_vertical(&img),
        5 => imageops::flip_horizontal(&imageops::rotate90(&img)),
        6 => imageops::rotate90(&img),
        7 => imageops::flip_horizontal(&imageops::rotate270(&img)),
        8 => imageops::rotate270(&img),
        _ => img,
    }
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let value = field.value.get_uint(0)?;
    debug!(orientation = value, path = %path.display(), "exif orientation");
    u16::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn marked(width: u32, height: u32) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img
    }

    #[test]
    fn quarter_turns_swap_dimensions() {
        for orientation in [5, 6, 7, 8] {
            let out = apply_orientation(marked(4, 2), orientation);
            assert_eq!(out.dimensions(), (2, 4), "orientation {orientation}");
        }
        for orientation in [1, 2, 3, 4, 0, 9] {
            let out = apply_orientation(marked(4, 2), orientation);
            assert_eq!(out.dimensions(), (4, 2), "orientation {orientation}");
        }
    }

    #[test]
    fn rotate_90_moves_the_top_left_marker_to_top_right() {
        let out = apply_orientation(marked(4, 2), 6);
        assert_eq!(out.get_pixel(1, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn decodes_png_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splash.png");
        marked(3, 2).save(&path).unwrap();

        let buffer = ExifAwareDecoder.decode(&path).unwrap();
        assert_eq!((buffer.width, buffer.height), (3, 2));
        assert_eq!(&buffer.pixels[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExifAwareDecoder
            .decode(&dir.path().join("nope.jpg"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("nope.jpg"));
    }
}

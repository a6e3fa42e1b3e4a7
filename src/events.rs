use std::borrow::Cow;

use crate::processing::layout::PixelRect;

/// Input observed while presenting. Only `Quit` and `KeyDown` end a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    KeyDown,
    Other,
}

impl InputEvent {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Quit | Self::KeyDown)
    }
}

/// Tightly packed RGBA8 pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl std::fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

impl ImageBuffer {
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Returns `None` when `pixels` does not hold exactly `width * height` RGBA8 texels.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(Self::BYTES_PER_PIXEL)?;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: rgba.repeat(count),
        }
    }

    pub fn row_bytes(&self) -> usize {
        self.width as usize * Self::BYTES_PER_PIXEL
    }

    /// Pixels covered by `rect`, copied only when `rect` is a strict sub-rectangle.
    ///
    /// `rect` must lie inside the buffer; callers get it from the tile grid.
    pub fn region(&self, rect: PixelRect) -> Cow<'_, ImageBuffer> {
        if rect.x == 0 && rect.y == 0 && rect.width == self.width && rect.height == self.height {
            return Cow::Borrowed(self);
        }
        let x = rect.x.max(0) as usize;
        let y = rect.y.max(0) as usize;
        let row_len = rect.width as usize * Self::BYTES_PER_PIXEL;
        let stride = self.row_bytes();
        let mut pixels = Vec::with_capacity(row_len * rect.height as usize);
        for row in y..y + rect.height as usize {
            let start = row * stride + x * Self::BYTES_PER_PIXEL;
            pixels.extend_from_slice(&self.pixels[start..start + row_len]);
        }
        Cow::Owned(Self {
            width: rect.width,
            height: rect.height,
            pixels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: u32, height: u32) -> ImageBuffer {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[x as u8, y as u8, 0, 255]);
            }
        }
        ImageBuffer::new(width, height, pixels).unwrap()
    }

    #[test]
    fn new_rejects_short_buffers() {
        assert!(ImageBuffer::new(2, 2, vec![0; 15]).is_none());
        assert!(ImageBuffer::new(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn full_region_is_borrowed() {
        let img = numbered(4, 3);
        let region = img.region(PixelRect::new(0, 0, 4, 3));
        assert!(matches!(region, Cow::Borrowed(_)));
    }

    #[test]
    fn sub_region_copies_the_right_rows() {
        let img = numbered(4, 3);
        let region = img.region(PixelRect::new(2, 1, 2, 2));
        assert_eq!((region.width, region.height), (2, 2));
        assert_eq!(&region.pixels[0..4], &[2, 1, 0, 255]);
        assert_eq!(&region.pixels[4..8], &[3, 1, 0, 255]);
        assert_eq!(&region.pixels[8..12], &[2, 2, 0, 255]);
    }

    #[test]
    fn only_quit_and_keys_are_terminal() {
        assert!(InputEvent::Quit.is_terminal());
        assert!(InputEvent::KeyDown.is_terminal());
        assert!(!InputEvent::Other.is_terminal());
    }
}

use serde::Deserialize;

use crate::error::DisplayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned pixel rectangle. Origins are signed so destination rects may
/// sit partially off-screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn intersects(&self, other: &Self) -> bool {
        i64::from(self.x) < other.right()
            && i64::from(other.x) < self.right()
            && i64::from(self.y) < other.bottom()
            && i64::from(other.y) < self.bottom()
    }

    pub fn contains(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitPolicy {
    /// Whole image visible, letterboxed or pillarboxed.
    #[default]
    Contain,
    /// Display fully covered, overflow cropped symmetrically.
    Cover,
}

/// Result of mapping a source image onto a target surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryPlan {
    pub policy: FitPolicy,
    pub source: Size,
    pub target: Size,
    pub scale: f64,
    /// Whole source scaled by `scale`.
    pub scaled: Size,
    /// What reaches the display. Equals `scaled` for CONTAIN and `target` for COVER.
    pub output: Size,
    /// Region of the source to keep, in source pixels.
    pub crop: Option<PixelRect>,
    /// Top-left of `output` inside the target.
    pub offset: (i32, i32),
}

pub fn plan(source: Size, target: Size, policy: FitPolicy) -> Result<GeometryPlan, DisplayError> {
    if source.width == 0 || source.height == 0 {
        return Err(DisplayError::InvalidGeometry(format!(
            "source dimensions must be positive, got {}x{}",
            source.width, source.height
        )));
    }
    if target.width == 0 || target.height == 0 {
        return Err(DisplayError::InvalidGeometry(format!(
            "target dimensions must be positive, got {}x{}",
            target.width, target.height
        )));
    }

    let sw = f64::from(source.width);
    let sh = f64::from(source.height);
    let tw = f64::from(target.width);
    let th = f64::from(target.height);
    let rx = tw / sw;
    let ry = th / sh;

    let plan = match policy {
        FitPolicy::Contain => {
            let scale = rx.min(ry);
            let scaled = Size::new(
                scaled_dim(sw, scale).min(target.width),
                scaled_dim(sh, scale).min(target.height),
            );
            GeometryPlan {
                policy,
                source,
                target,
                scale,
                scaled,
                output: scaled,
                crop: None,
                offset: center_offset(scaled, target),
            }
        }
        FitPolicy::Cover => {
            let scale = rx.max(ry);
            let scaled = Size::new(scaled_dim(sw, scale), scaled_dim(sh, scale));
            GeometryPlan {
                policy,
                source,
                target,
                scale,
                scaled,
                output: target,
                crop: cover_crop(source, target),
                offset: (0, 0),
            }
        }
    };
    Ok(plan)
}

/// Source region whose aspect ratio matches the target, centered on the overflowing axis.
fn cover_crop(source: Size, target: Size) -> Option<PixelRect> {
    // Compare aspect ratios exactly: sw/sh vs tw/th.
    let lhs = u64::from(source.width) * u64::from(target.height);
    let rhs = u64::from(target.width) * u64::from(source.height);
    if lhs == rhs {
        return None;
    }
    let sw = f64::from(source.width);
    let sh = f64::from(source.height);
    let target_aspect = f64::from(target.width) / f64::from(target.height);
    if lhs > rhs {
        // wider than the target: keep full height
        let width = round_half_up(sh * target_aspect).clamp(1.0, sw) as u32;
        let x = (source.width - width) / 2;
        Some(PixelRect::new(x as i32, 0, width, source.height))
    } else {
        let height = round_half_up(sw / target_aspect).clamp(1.0, sh) as u32;
        let y = (source.height - height) / 2;
        Some(PixelRect::new(0, y as i32, source.width, height))
    }
}

fn scaled_dim(dim: f64, scale: f64) -> u32 {
    round_half_up(dim * scale).max(1.0) as u32
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

pub fn center_offset(inner: Size, outer: Size) -> (i32, i32) {
    let ox = (i64::from(outer.width) - i64::from(inner.width)) / 2;
    let oy = (i64::from(outer.height) - i64::from(inner.height)) / 2;
    (ox as i32, oy as i32)
}

use fast_image_resize as fir;
use tracing::debug;

use crate::error::DisplayError;
use crate::events::ImageBuffer;
use crate::processing::layout::GeometryPlan;

/// Produces the `plan.output`-sized buffer, consuming the decoded source.
pub fn apply_plan(source: ImageBuffer, plan: &GeometryPlan) -> Result<ImageBuffer, DisplayError> {
    if source.width != plan.source.width || source.height != plan.source.height {
        return Err(DisplayError::InvalidGeometry(format!(
            "plan expects a {}x{} source but the buffer is {}x{}",
            plan.source.width, plan.source.height, source.width, source.height
        )));
    }
    let target = plan.output;
    if plan.crop.is_none() && target.width == source.width && target.height == source.height {
        return Ok(source);
    }

    let src_view = fir::images::ImageRef::new(
        source.width,
        source.height,
        &source.pixels,
        fir::PixelType::U8x4,
    )
    .map_err(|err| DisplayError::InvalidGeometry(format!("bad source buffer: {err}")))?;
    let mut dst_image = fir::images::Image::new(target.width, target.height, fir::PixelType::U8x4);

    let mut options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    if let Some(crop) = plan.crop {
        options = options.crop(
            f64::from(crop.x),
            f64::from(crop.y),
            f64::from(crop.width),
            f64::from(crop.height),
        );
    }

    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .map_err(|err| DisplayError::InvalidGeometry(format!("resample failed: {err}")))?;
    debug!(
        from_w = source.width,
        from_h = source.height,
        to_w = target.width,
        to_h = target.height,
        cropped = plan.crop.is_some(),
        "image resampled"
    );
    drop(source);

    ImageBuffer::new(target.width, target.height, dst_image.into_vec()).ok_or_else(|| {
        DisplayError::InvalidGeometry("resampled buffer has an unexpected length".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::layout::{FitPolicy, PixelRect, Size, plan};

    #[test]
    fn contain_resamples_to_output_size() {
        let src = ImageBuffer::filled(400, 300, [200, 10, 10, 255]);
        let p = plan(Size::new(400, 300), Size::new(192, 108), FitPolicy::Contain).unwrap();
        let out = apply_plan(src, &p).unwrap();
        assert_eq!((out.width, out.height), (144, 108));
        let px = &out.pixels[0..4];
        assert!(px[0].abs_diff(200) <= 1 && px[1].abs_diff(10) <= 1, "{px:?}");
    }

    #[test]
    fn cover_crops_before_resampling() {
        // top and bottom bands are red, middle is green; cover keeps only the middle
        let (w, h) = (40u32, 30u32);
        let mut pixels = Vec::new();
        for y in 0..h {
            let color = if (6..24).contains(&y) {
                [0, 255, 0, 255]
            } else {
                [255, 0, 0, 255]
            };
            for _ in 0..w {
                pixels.extend_from_slice(&color);
            }
        }
        let src = ImageBuffer::new(w, h, pixels).unwrap();
        let p = plan(Size::new(w, h), Size::new(16, 9), FitPolicy::Cover).unwrap();
        // 40 * 9 / 16 = 22.5 rows, rounded half-up
        assert_eq!(p.crop.unwrap(), PixelRect::new(0, 3, 40, 23));
        let out = apply_plan(src, &p).unwrap();
        assert_eq!((out.width, out.height), (16, 9));
        let center = ((4 * 16 + 8) * 4) as usize;
        let px = &out.pixels[center..center + 4];
        assert!(px[1] > 200 && px[0] < 50, "center pixel should be green: {px:?}");
    }

    #[test]
    fn identity_plan_moves_the_buffer() {
        let src = ImageBuffer::filled(64, 32, [1, 2, 3, 255]);
        let p = plan(Size::new(64, 32), Size::new(64, 32), FitPolicy::Contain).unwrap();
        let out = apply_plan(src.clone(), &p).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let src = ImageBuffer::filled(10, 10, [0, 0, 0, 255]);
        let p = plan(Size::new(20, 10), Size::new(10, 10), FitPolicy::Contain).unwrap();
        assert!(matches!(
            apply_plan(src, &p),
            Err(DisplayError::InvalidGeometry(_))
        ));
    }
}

// pixelmill/src/processors/decoder.rs
//! Shrink-on-decode planning and decode dispatch. JPEG can decode directly
//! at 1/2, 1/4 or 1/8 resolution; every other supported format decodes at
//! full size and leaves reduction to the resize stage.

use image::ImageReader;
use std::io::Cursor;

use crate::core::{EngineError, ImageInfo, PixelBuffer, Result, SourceFormat};

/// Denominators the JPEG decoder supports natively, largest first
/// (mozjpeg scales by N/8).
const JPEG_DENOMINATORS: [u32; 3] = [8, 4, 2];

/// Chosen decode-time reduction. `decoded_dim = ceil(source_dim / denominator)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShrinkPlan {
    pub denominator: u32,
}

impl ShrinkPlan {
    pub fn full() -> Self {
        Self { denominator: 1 }
    }

    pub fn decoded_dims(&self, src_width: u32, src_height: u32) -> (u32, u32) {
        (
            src_width.div_ceil(self.denominator),
            src_height.div_ceil(self.denominator),
        )
    }
}

/// Pick the largest native denominator that still dominates the target on
/// both axes, so the decoded buffer never undershoots what later stages
/// need. A missing target axis is resolved from the source aspect ratio;
/// no target at all means full decode.
pub fn plan_shrink(
    format: SourceFormat,
    src_width: u32,
    src_height: u32,
    target_width: Option<u32>,
    target_height: Option<u32>,
) -> ShrinkPlan {
    if format != SourceFormat::Jpeg || src_width == 0 || src_height == 0 {
        return ShrinkPlan::full();
    }

    let (tw, th) = match (target_width, target_height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => {
            let ratio = w as f64 / src_width as f64;
            (w, ((src_height as f64 * ratio).round() as u32).max(1))
        }
        (None, Some(h)) => {
            let ratio = h as f64 / src_height as f64;
            (((src_width as f64 * ratio).round() as u32).max(1), h)
        }
        (None, None) => return ShrinkPlan::full(),
    };
    if tw == 0 || th == 0 {
        return ShrinkPlan::full();
    }

    let shrink = (src_width as f64 / tw as f64).min(src_height as f64 / th as f64);
    for &denominator in &JPEG_DENOMINATORS {
        if shrink >= denominator as f64 {
            return ShrinkPlan { denominator };
        }
    }
    ShrinkPlan::full()
}

/// Decode the input according to the plan. The caller has already checked
/// the pixel-count ceiling against the sniffed header.
pub fn decode(data: &[u8], info: &ImageInfo, plan: &ShrinkPlan) -> Result<PixelBuffer> {
    if info.format == SourceFormat::Jpeg && plan.denominator > 1 {
        log::debug!(
            "decoding jpeg at 1/{} ({}x{} source)",
            plan.denominator,
            info.width,
            info.height
        );
        decode_jpeg_scaled(data, plan.denominator)
    } else {
        decode_full(data)
    }
}

/// JPEG shrink-on-decode through mozjpeg; the DCT-domain reduction makes
/// this far cheaper than decode-then-resize for large sources.
fn decode_jpeg_scaled(data: &[u8], denominator: u32) -> Result<PixelBuffer> {
    let numerator = (8 / denominator) as u8;

    let mut decompress = mozjpeg::Decompress::new_mem(data)
        .map_err(|e| EngineError::DecodeError(format!("jpeg decompress init: {:?}", e)))?;
    decompress.scale(numerator);

    let mut decompress = decompress
        .rgb()
        .map_err(|e| EngineError::DecodeError(format!("jpeg rgb output: {:?}", e)))?;

    let width = decompress.width() as u32;
    let height = decompress.height() as u32;

    let pixels: Vec<[u8; 3]> = decompress
        .read_scanlines()
        .map_err(|e| EngineError::DecodeError(format!("jpeg scanline read: {:?}", e)))?;
    decompress
        .finish()
        .map_err(|e| EngineError::DecodeError(format!("jpeg finish: {:?}", e)))?;

    let flat: Vec<u8> = pixels.into_iter().flatten().collect();
    PixelBuffer::from_rgb_raw(width, height, flat)
}

fn decode_full(data: &[u8]) -> Result<PixelBuffer> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| EngineError::DecodeError(format!("format probe: {}", e)))?;
    let image = reader
        .decode()
        .map_err(|e| EngineError::DecodeError(e.to_string()))?;
    Ok(PixelBuffer::from_dynamic(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn info(format: SourceFormat, width: u32, height: u32) -> ImageInfo {
        ImageInfo {
            format,
            width,
            height,
            channels: 3,
            has_alpha: false,
        }
    }

    #[test]
    fn jpeg_plan_picks_largest_dominating_denominator() {
        let plan = plan_shrink(SourceFormat::Jpeg, 4000, 3000, Some(200), Some(150));
        assert_eq!(plan.denominator, 8);

        let plan = plan_shrink(SourceFormat::Jpeg, 4000, 3000, Some(1500), None);
        assert_eq!(plan.denominator, 2);

        let plan = plan_shrink(SourceFormat::Jpeg, 4000, 3000, Some(3500), None);
        assert_eq!(plan.denominator, 1);
    }

    #[test]
    fn no_target_means_full_decode() {
        let plan = plan_shrink(SourceFormat::Jpeg, 4000, 3000, None, None);
        assert_eq!(plan.denominator, 1);
        let plan = plan_shrink(SourceFormat::Jpeg, 4000, 3000, Some(0), Some(0));
        assert_eq!(plan.denominator, 1);
    }

    #[test]
    fn formats_without_native_scaling_always_decode_full() {
        for format in [
            SourceFormat::Png,
            SourceFormat::WebP,
            SourceFormat::Gif,
            SourceFormat::Bmp,
            SourceFormat::Tiff,
        ] {
            let plan = plan_shrink(format, 8000, 6000, Some(100), Some(75));
            assert_eq!(plan.denominator, 1);
        }
    }

    #[test]
    fn decoded_dims_never_undershoot_target() {
        for (src_w, src_h, tw, th) in [
            (4000u32, 3000u32, 200u32, 150u32),
            (1920, 1080, 800, 450),
            (3001, 1999, 333, 222),
            (500, 500, 499, 499),
        ] {
            let plan = plan_shrink(SourceFormat::Jpeg, src_w, src_h, Some(tw), Some(th));
            let (dw, dh) = plan.decoded_dims(src_w, src_h);
            assert!(dw >= tw, "{}x{} -> {}x{} undershot width", src_w, src_h, dw, dh);
            assert!(dh >= th, "{}x{} -> {}x{} undershot height", src_w, src_h, dw, dh);
        }
    }

    #[test]
    fn full_decode_round_trips_png() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_fn(20, 10, |x, y| {
            image::Rgb([x as u8 * 10, y as u8 * 20, 7])
        }));
        let mut bytes = Cursor::new(Vec::new());
        source.write_to(&mut bytes, ImageFormat::Png).unwrap();

        let buffer = decode(
            bytes.get_ref(),
            &info(SourceFormat::Png, 20, 10),
            &ShrinkPlan::full(),
        )
        .unwrap();
        assert_eq!((buffer.width(), buffer.height()), (20, 10));
        assert_eq!(buffer.as_bytes(), source.as_bytes());
    }

    #[test]
    fn scaled_jpeg_decode_emits_reduced_dims() {
        let source = DynamicImage::ImageRgb8(RgbImage::new(64, 48));
        let mut bytes = Cursor::new(Vec::new());
        source.write_to(&mut bytes, ImageFormat::Jpeg).unwrap();

        let plan = ShrinkPlan { denominator: 8 };
        let buffer = decode(bytes.get_ref(), &info(SourceFormat::Jpeg, 64, 48), &plan).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (8, 6));
    }
}

// pixelmill/src/processors/encoder.rs
//! Terminal encode dispatch. Parameters were validated before the decode
//! stage ran, so by the time a buffer arrives here every branch can only
//! fail on codec-level errors.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use std::io::Cursor;

use crate::core::{EngineError, OutputFormat, OutputOptions, PixelBuffer, Result};
use crate::utils;

const DEFAULT_QUALITY: i32 = 80;

/// Encode the buffer into the requested container. JPEG and BMP cannot
/// carry alpha, so four-channel buffers are composited over `background`
/// first.
pub fn encode(
    buffer: PixelBuffer,
    options: &OutputOptions,
    background: [u8; 4],
) -> Result<Vec<u8>> {
    log::debug!(
        "encoding {}x{} ({}ch) as {}",
        buffer.width(),
        buffer.height(),
        buffer.channels(),
        utils::output_format_name(options.format)
    );

    match options.format {
        OutputFormat::Jpeg => encode_jpeg(buffer, options, background),
        OutputFormat::Png => encode_png(buffer, options),
        OutputFormat::WebP => encode_webp(buffer, options),
        OutputFormat::Gif => encode_gif(buffer),
        OutputFormat::Bmp => encode_bmp(buffer, background),
    }
}

fn encode_jpeg(
    buffer: PixelBuffer,
    options: &OutputOptions,
    background: [u8; 4],
) -> Result<Vec<u8>> {
    let quality = options.quality.unwrap_or(DEFAULT_QUALITY);
    let flat = utils::flatten(buffer, background)?;
    let (width, height) = (flat.width() as usize, flat.height() as usize);

    let encode_err = |stage: &str, e: &dyn std::fmt::Display| {
        EngineError::EncodeError(format!("jpeg {}: {}", stage, e))
    };

    let mut compress = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
    compress.set_size(width, height);
    compress.set_quality(quality as f32);

    let mut started = compress
        .start_compress(Vec::new())
        .map_err(|e| encode_err("start", &e))?;
    started
        .write_scanlines(flat.as_bytes())
        .map_err(|e| encode_err("scanlines", &e))?;
    started.finish().map_err(|e| encode_err("finish", &e))
}

/// PNG compression level 0-9 maps onto the encoder's three strategies;
/// lower levels also switch to the cheaper sub filter.
fn png_strategy(compression: Option<i32>) -> (CompressionType, FilterType) {
    match compression {
        Some(level) if level <= 3 => (CompressionType::Fast, FilterType::Sub),
        Some(level) if level <= 6 => (CompressionType::Default, FilterType::Adaptive),
        Some(_) => (CompressionType::Best, FilterType::Adaptive),
        None => (CompressionType::Default, FilterType::Adaptive),
    }
}

fn encode_png(buffer: PixelBuffer, options: &OutputOptions) -> Result<Vec<u8>> {
    let (compression, filter) = png_strategy(options.compression);
    let color = match buffer.channels() {
        3 => ExtendedColorType::Rgb8,
        _ => ExtendedColorType::Rgba8,
    };

    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, compression, filter)
        .write_image(buffer.as_bytes(), buffer.width(), buffer.height(), color)
        .map_err(|e| EngineError::EncodeError(format!("png: {}", e)))?;
    Ok(out)
}

fn encode_webp(buffer: PixelBuffer, options: &OutputOptions) -> Result<Vec<u8>> {
    let (width, height) = (buffer.width(), buffer.height());
    let encoder = match &buffer {
        PixelBuffer::Rgb(buf) => webp::Encoder::from_rgb(buf.as_raw(), width, height),
        PixelBuffer::Rgba(buf) => webp::Encoder::from_rgba(buf.as_raw(), width, height),
    };

    let encoded = if options.lossless {
        encoder.encode_lossless()
    } else {
        encoder.encode(options.quality.unwrap_or(DEFAULT_QUALITY) as f32)
    };
    Ok(encoded.to_vec())
}

fn encode_gif(buffer: PixelBuffer) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    buffer
        .into_dynamic()
        .write_to(&mut out, ImageFormat::Gif)
        .map_err(|e| EngineError::EncodeError(format!("gif: {}", e)))?;
    Ok(out.into_inner())
}

fn encode_bmp(buffer: PixelBuffer, background: [u8; 4]) -> Result<Vec<u8>> {
    let flat = utils::flatten(buffer, background)?;
    let mut out = Cursor::new(Vec::new());
    flat.into_dynamic()
        .write_to(&mut out, ImageFormat::Bmp)
        .map_err(|e| EngineError::EncodeError(format!("bmp: {}", e)))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn rgb_fixture() -> PixelBuffer {
        PixelBuffer::Rgb(RgbImage::from_fn(16, 12, |x, y| {
            Rgb([x as u8 * 16, y as u8 * 20, 60])
        }))
    }

    fn rgba_fixture() -> PixelBuffer {
        PixelBuffer::Rgba(RgbaImage::from_pixel(16, 12, Rgba([40, 80, 120, 128])))
    }

    fn output(format: OutputFormat) -> OutputOptions {
        OutputOptions::new(format)
    }

    #[test]
    fn jpeg_output_carries_jpeg_magic() {
        let bytes = encode(rgb_fixture(), &output(OutputFormat::Jpeg), WHITE).unwrap();
        assert_eq!(&bytes[0..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn jpeg_flattens_alpha_input() {
        let bytes = encode(rgba_fixture(), &output(OutputFormat::Jpeg), WHITE).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(!decoded.color().has_alpha());
        assert_eq!((decoded.width(), decoded.height()), (16, 12));
    }

    #[test]
    fn png_round_trips_losslessly() {
        let source = rgb_fixture();
        let original = source.as_bytes().to_vec();
        let bytes = encode(source, &output(OutputFormat::Png), WHITE).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.to_rgb8().as_raw(), &original);
    }

    #[test]
    fn png_preserves_alpha_channel() {
        let bytes = encode(rgba_fixture(), &output(OutputFormat::Png), WHITE).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(decoded.color().has_alpha());
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0[3], 128);
    }

    #[test]
    fn png_compression_levels_all_decode() {
        for level in [0, 3, 5, 9] {
            let mut options = output(OutputFormat::Png);
            options.compression = Some(level);
            let bytes = encode(rgb_fixture(), &options, WHITE).unwrap();
            assert!(image::load_from_memory(&bytes).is_ok(), "level {}", level);
        }
    }

    #[test]
    fn webp_output_carries_riff_magic() {
        let bytes = encode(rgb_fixture(), &output(OutputFormat::WebP), WHITE).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn lossless_webp_round_trips_exactly() {
        let source = rgb_fixture();
        let original = source.as_bytes().to_vec();
        let mut options = output(OutputFormat::WebP);
        options.lossless = true;
        let bytes = encode(source, &options, WHITE).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.to_rgb8().as_raw(), &original);
    }

    #[test]
    fn gif_output_carries_gif_magic() {
        let bytes = encode(rgb_fixture(), &output(OutputFormat::Gif), WHITE).unwrap();
        assert_eq!(&bytes[0..3], b"GIF");
    }

    #[test]
    fn bmp_flattens_and_carries_bmp_magic() {
        let bytes = encode(rgba_fixture(), &output(OutputFormat::Bmp), WHITE).unwrap();
        assert_eq!(&bytes[0..2], b"BM");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(!decoded.color().has_alpha());
    }
}

// pixelmill/src/utils/mod.rs
use rayon::prelude::*;

use crate::core::{OutputFormat, PixelBuffer, Result, SourceFormat};

pub fn source_format_name(format: SourceFormat) -> &'static str {
    match format {
        SourceFormat::Jpeg => "jpeg",
        SourceFormat::Png => "png",
        SourceFormat::WebP => "webp",
        SourceFormat::Gif => "gif",
        SourceFormat::Bmp => "bmp",
        SourceFormat::Tiff => "tiff",
    }
}

pub fn output_format_name(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Jpeg => "jpeg",
        OutputFormat::Png => "png",
        OutputFormat::WebP => "webp",
        OutputFormat::Gif => "gif",
        OutputFormat::Bmp => "bmp",
    }
}

/// Composite the buffer over an opaque background, producing a
/// three-channel raster for encoders that cannot carry alpha. An RGB
/// buffer passes through unchanged.
pub fn flatten(buffer: PixelBuffer, background: [u8; 4]) -> Result<PixelBuffer> {
    let rgba = match buffer {
        PixelBuffer::Rgb(_) => return Ok(buffer),
        PixelBuffer::Rgba(buf) => buf,
    };

    let (width, height) = (rgba.width(), rgba.height());
    let src = rgba.as_raw();
    let mut out = vec![0u8; width as usize * height as usize * 3];

    out.par_chunks_exact_mut(3)
        .zip(src.par_chunks_exact(4))
        .for_each(|(dst, px)| {
            let alpha = px[3] as u32;
            let inverse = 255 - alpha;
            for c in 0..3 {
                dst[c] = ((px[c] as u32 * alpha + background[c] as u32 * inverse) / 255) as u8;
            }
        });

    PixelBuffer::from_rgb_raw(width, height, out)
}

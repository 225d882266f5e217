// pixelmill/src/core/buffer.rs
use image::{DynamicImage, RgbImage, RgbaImage};
use rayon::prelude::*;

use super::{EngineError, Result};

/// A validated crop rectangle in pixel coordinates. Produced by the region
/// calculator; `x + width <= image_width` and `y + height <= image_height`
/// hold by construction, and both extents are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The decoded raster: row-major 8-bit samples, three channels (RGB) or
/// four (RGBA). `len == width * height * channels` is guaranteed by the
/// backing image buffer. A buffer is owned exclusively by the stage
/// currently holding it and moves, never shared, from stage to stage.
#[derive(Debug)]
pub enum PixelBuffer {
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

impl PixelBuffer {
    pub fn width(&self) -> u32 {
        match self {
            PixelBuffer::Rgb(buf) => buf.width(),
            PixelBuffer::Rgba(buf) => buf.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            PixelBuffer::Rgb(buf) => buf.height(),
            PixelBuffer::Rgba(buf) => buf.height(),
        }
    }

    pub fn channels(&self) -> u8 {
        match self {
            PixelBuffer::Rgb(_) => 3,
            PixelBuffer::Rgba(_) => 4,
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, PixelBuffer::Rgba(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PixelBuffer::Rgb(buf) => buf.as_raw(),
            PixelBuffer::Rgba(buf) => buf.as_raw(),
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            PixelBuffer::Rgb(buf) => &mut **buf,
            PixelBuffer::Rgba(buf) => &mut **buf,
        }
    }

    /// Wrap a decoded image, keeping the raster as-is when it is already
    /// RGB8/RGBA8 and converting (alpha-preserving) otherwise.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageRgb8(buf) => PixelBuffer::Rgb(buf),
            DynamicImage::ImageRgba8(buf) => PixelBuffer::Rgba(buf),
            other => {
                if other.color().has_alpha() {
                    PixelBuffer::Rgba(other.to_rgba8())
                } else {
                    PixelBuffer::Rgb(other.to_rgb8())
                }
            }
        }
    }

    /// Hand the raster to an `image`-crate collaborator without copying.
    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            PixelBuffer::Rgb(buf) => DynamicImage::ImageRgb8(buf),
            PixelBuffer::Rgba(buf) => DynamicImage::ImageRgba8(buf),
        }
    }

    pub(crate) fn from_rgb_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        RgbImage::from_raw(width, height, data)
            .map(PixelBuffer::Rgb)
            .ok_or_else(|| {
                EngineError::ProcessingError(format!(
                    "rgb raster does not match {}x{}",
                    width, height
                ))
            })
    }

    pub(crate) fn from_rgba_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        RgbaImage::from_raw(width, height, data)
            .map(PixelBuffer::Rgba)
            .ok_or_else(|| {
                EngineError::ProcessingError(format!(
                    "rgba raster does not match {}x{}",
                    width, height
                ))
            })
    }

    /// Borrow a read-only window of this buffer. The caller guarantees the
    /// region was validated against this buffer's dimensions.
    pub fn view(&self, region: CropRegion) -> PixelRegion<'_> {
        debug_assert!(region.x + region.width <= self.width());
        debug_assert!(region.y + region.height <= self.height());
        PixelRegion {
            source: self,
            region,
        }
    }
}

/// A borrowed sub-rectangle of a `PixelBuffer`. Holding a view costs
/// nothing; `materialize` copies the window into owned memory at the point
/// a downstream stage needs a contiguous raster.
#[derive(Debug, Clone, Copy)]
pub struct PixelRegion<'a> {
    source: &'a PixelBuffer,
    region: CropRegion,
}

impl PixelRegion<'_> {
    pub fn width(&self) -> u32 {
        self.region.width
    }

    pub fn height(&self) -> u32 {
        self.region.height
    }

    pub fn region(&self) -> CropRegion {
        self.region
    }

    /// Copy the window into a new owned buffer, row by row in parallel.
    pub fn materialize(&self) -> Result<PixelBuffer> {
        let channels = self.source.channels() as usize;
        let src = self.source.as_bytes();
        let src_stride = self.source.width() as usize * channels;
        let row_len = self.region.width as usize * channels;
        let x0 = self.region.x as usize * channels;
        let y0 = self.region.y as usize;

        let mut data = vec![0u8; row_len * self.region.height as usize];
        data.par_chunks_exact_mut(row_len)
            .enumerate()
            .for_each(|(row, out)| {
                let start = (y0 + row) * src_stride + x0;
                out.copy_from_slice(&src[start..start + row_len]);
            });

        match self.source {
            PixelBuffer::Rgb(_) => {
                PixelBuffer::from_rgb_raw(self.region.width, self.region.height, data)
            }
            PixelBuffer::Rgba(_) => {
                PixelBuffer::from_rgba_raw(self.region.width, self.region.height, data)
            }
        }
    }
}

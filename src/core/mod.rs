// pixelmill/src/core/mod.rs
use thiserror::Error;

mod buffer;
mod engine;

pub use buffer::{CropRegion, PixelBuffer, PixelRegion};
pub use engine::Engine;

/// Container formats the sniffer recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
    Tiff,
}

/// Formats the encoder dispatch can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
}

/// Resampling kernels a caller may force. When absent, the planner selects
/// a kernel from the downscale ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    CatmullRom,
    Mitchell,
    Lanczos3,
}

/// Policy for reconciling a requested box with the source aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    /// Scale to cover both axes at least; overflow removal is a prior
    /// crop's job.
    Cover,
    /// Scale to fit within both axes.
    Contain,
    /// Force both axes exactly, distorting if ratios differ.
    Fill,
    /// Like Contain but never grows.
    Inside,
    /// Like Cover but never shrinks.
    Outside,
}

/// Anchor point for placing a crop region within the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    Center,
    North,
    South,
    East,
    West,
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

/// Header-only description of an input image, produced without decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: SourceFormat,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub has_alpha: bool,
}

/// Crop request. Three shapes are accepted: explicit rectangle
/// (x, y, width, height), aspect ratio with gravity, or literal
/// dimensions with gravity.
#[derive(Debug, Clone, Default)]
pub struct CropOptions {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// Target aspect ratio as "W:H", e.g. "16:9".
    pub aspect_ratio: Option<String>,
    pub gravity: Option<Gravity>,
}

/// Resize request. At least one of width/height must be given; a missing
/// axis is resolved from the source aspect ratio.
#[derive(Debug, Clone, Default)]
pub struct ResizeOptions {
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub fit: Option<FitMode>,
    pub filter: Option<ResizeFilter>,
    /// Flatten color for alpha-incapable outputs, overriding the engine
    /// default for this invocation.
    pub background: Option<[u8; 4]>,
}

/// Terminal encode request.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// JPEG/WebP quality, 1-100.
    pub quality: Option<i32>,
    /// PNG compression level, 0-9.
    pub compression: Option<i32>,
    /// WebP lossless mode; quality is ignored when set.
    pub lossless: bool,
}

impl OutputOptions {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            quality: None,
            compression: None,
            lossless: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(q) = self.quality {
            if !(1..=100).contains(&q) {
                return Err(EngineError::InvalidParameter(format!(
                    "encode quality {} out of range 1-100",
                    q
                )));
            }
        }
        if let Some(c) = self.compression {
            if !(0..=9).contains(&c) {
                return Err(EngineError::InvalidParameter(format!(
                    "png compression level {} out of range 0-9",
                    c
                )));
            }
        }
        Ok(())
    }
}

/// Full transform request. Stages run in a fixed order regardless of the
/// order fields are set; absent stages are skipped.
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    pub crop: Option<CropOptions>,
    pub resize: Option<ResizeOptions>,
    /// Degrees clockwise, one of 90, 180, 270.
    pub rotate: Option<i32>,
    pub flip_h: bool,
    pub flip_v: bool,
    pub grayscale: bool,
    /// Blur strength, 0-100.
    pub blur: Option<i32>,
    /// Sharpen strength, 0-100.
    pub sharpen: Option<i32>,
    /// Brightness adjustment, -100 to 100.
    pub brightness: Option<i32>,
    /// Contrast adjustment, -100 to 100.
    pub contrast: Option<i32>,
    /// Encode target; defaults to PNG when omitted.
    pub output: Option<OutputOptions>,
}

impl TransformOptions {
    pub fn validate(&self) -> Result<()> {
        if let Some(deg) = self.rotate {
            if !matches!(deg, 90 | 180 | 270) {
                return Err(EngineError::InvalidParameter(format!(
                    "rotate must be 90, 180 or 270, got {}",
                    deg
                )));
            }
        }
        for (name, value) in [("blur", self.blur), ("sharpen", self.sharpen)] {
            if let Some(v) = value {
                if !(0..=100).contains(&v) {
                    return Err(EngineError::InvalidParameter(format!(
                        "{} {} out of range 0-100",
                        name, v
                    )));
                }
            }
        }
        for (name, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
        ] {
            if let Some(v) = value {
                if !(-100..=100).contains(&v) {
                    return Err(EngineError::InvalidParameter(format!(
                        "{} {} out of range -100 to 100",
                        name, v
                    )));
                }
            }
        }
        if let Some(ref output) = self.output {
            output.validate()?;
        }
        Ok(())
    }
}

/// Engine-wide limits and defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hard ceiling on source width*height, checked against header
    /// dimensions before any decode allocation.
    pub max_pixels: u64,
    /// Default flatten color for alpha-incapable outputs.
    pub background: [u8; 4],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pixels: 100_000_000,
            background: [255, 255, 255, 255],
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_pixels == 0 {
            return Err(EngineError::InvalidParameter(
                "max_pixels must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unrecognized image format: {0}")]
    FormatError(String),

    #[error("truncated image header: {0}")]
    HeaderTruncated(String),

    #[error("decode failed: {0}")]
    DecodeError(String),

    #[error("memory limit exceeded: {0}")]
    MemoryLimitExceeded(String),

    #[error("crop region out of bounds: {0}")]
    RegionOutOfBounds(String),

    #[error("invalid aspect ratio: {0}")]
    InvalidAspectRatio(String),

    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("resize target unreachable: {0}")]
    Unreachable(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("encode failed: {0}")]
    EncodeError(String),

    #[error("processing error: {0}")]
    ProcessingError(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

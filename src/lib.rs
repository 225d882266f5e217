// pixelmill/src/lib.rs
//! pixelmill is a server-side image transcoding and transform engine:
//! bytes in, bytes out. A request is sniffed from its header, decode work
//! is planned (JPEG shrinks at decode time), and a fixed-order stage
//! sequence runs before the result is encoded into the requested
//! container.
//!
//! ```no_run
//! use pixelmill::prelude::*;
//!
//! # fn main() -> pixelmill::core::Result<()> {
//! let engine = Engine::new();
//! let input = std::fs::read("photo.jpg").map_err(|e| {
//!     EngineError::DecodeError(e.to_string())
//! })?;
//!
//! let options = TransformOptions {
//!     resize: Some(ResizeOptions {
//!         width: Some(800),
//!         ..Default::default()
//!     }),
//!     output: Some(OutputOptions::new(OutputFormat::WebP)),
//!     ..Default::default()
//! };
//! let output = engine.transform(&input, &options)?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod processors;
pub mod utils;

pub mod prelude {
    pub use crate::core::{
        CropOptions, CropRegion, Engine, EngineConfig, EngineError, FitMode, Gravity,
        ImageInfo, OutputFormat, OutputOptions, PixelBuffer, ResizeFilter, ResizeOptions,
        Result, SourceFormat, TransformOptions,
    };
}

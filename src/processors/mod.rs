// pixelmill/src/processors/mod.rs
pub mod cropper;
pub mod decoder;
pub mod encoder;
pub mod filters;
pub mod resizer;
pub mod sniffer;

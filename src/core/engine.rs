// pixelmill/src/core/engine.rs
//! The transform engine: sniff, plan, decode, run the stage sequence,
//! encode. Stages always run in the same order no matter how the request
//! was assembled: crop, resize, rotate, horizontal flip, vertical flip,
//! grayscale, blur, sharpen, brightness, contrast.

use crate::core::{
    EngineConfig, EngineError, ImageInfo, OutputFormat, OutputOptions, PixelBuffer, Result,
    TransformOptions,
};
use crate::processors::{cropper, decoder, encoder, filters, resizer, sniffer};
use crate::utils;

pub struct Engine {
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Describe an input from its header alone. No pixel data is decoded,
    /// so this is safe to call on arbitrarily large images.
    pub fn info(&self, data: &[u8]) -> Result<ImageInfo> {
        sniffer::sniff(data)
    }

    /// Run a full transform: bytes in, encoded bytes out.
    pub fn transform(&self, data: &[u8], options: &TransformOptions) -> Result<Vec<u8>> {
        options.validate()?;

        let info = sniffer::sniff(data)?;
        log::info!(
            "transform: {} {}x{} ({}ch)",
            utils::source_format_name(info.format),
            info.width,
            info.height,
            info.channels
        );

        // Enforced from header dimensions, before any pixel allocation.
        let pixels = info.width as u64 * info.height as u64;
        if pixels > self.config.max_pixels {
            return Err(EngineError::MemoryLimitExceeded(format!(
                "{}x{} is {} pixels, limit is {}",
                info.width, info.height, pixels, self.config.max_pixels
            )));
        }

        // Resolve geometry against header dimensions so invalid requests
        // fail before the decode spends any work.
        let crop_region = options
            .crop
            .as_ref()
            .map(|crop| cropper::resolve(crop, info.width, info.height))
            .transpose()?;

        let (working_width, working_height) = match crop_region {
            Some(region) => (region.width, region.height),
            None => (info.width, info.height),
        };

        let resize_target = options
            .resize
            .as_ref()
            .map(|resize| resizer::resolve_target(working_width, working_height, resize))
            .transpose()?;

        // Crop coordinates address the full-resolution source, so
        // shrink-on-decode only engages when no crop is requested.
        let shrink = match (&crop_region, resize_target) {
            (None, Some((tw, th))) => {
                decoder::plan_shrink(info.format, info.width, info.height, Some(tw), Some(th))
            }
            _ => decoder::ShrinkPlan::full(),
        };

        let mut buffer = decoder::decode(data, &info, &shrink)?;

        if let Some(region) = crop_region {
            log::debug!(
                "cropping to {}x{} at ({}, {})",
                region.width,
                region.height,
                region.x,
                region.y
            );
            buffer = buffer.view(region).materialize()?;
        }

        if let Some((target_width, target_height)) = resize_target {
            let filter = options.resize.as_ref().and_then(|r| r.filter);
            let plan = resizer::plan(
                buffer.width(),
                buffer.height(),
                target_width,
                target_height,
                filter,
            );
            buffer = resizer::execute(buffer, &plan)?;
        }

        buffer = self.apply_filters(buffer, options);

        let default_output = OutputOptions::new(OutputFormat::Png);
        let output = options.output.as_ref().unwrap_or(&default_output);
        let background = options
            .resize
            .as_ref()
            .and_then(|r| r.background)
            .unwrap_or(self.config.background);

        let encoded = encoder::encode(buffer, output, background)?;
        log::info!(
            "transform complete: {} bytes of {}",
            encoded.len(),
            utils::output_format_name(output.format)
        );
        Ok(encoded)
    }

    fn apply_filters(&self, mut buffer: PixelBuffer, options: &TransformOptions) -> PixelBuffer {
        if let Some(degrees) = options.rotate {
            buffer = filters::rotate(buffer, degrees);
        }
        if options.flip_h {
            buffer = filters::flip_horizontal(buffer);
        }
        if options.flip_v {
            buffer = filters::flip_vertical(buffer);
        }
        if options.grayscale {
            filters::grayscale(&mut buffer);
        }
        if let Some(amount) = options.blur {
            buffer = filters::blur(buffer, amount);
        }
        if let Some(amount) = options.sharpen {
            buffer = filters::sharpen(buffer, amount);
        }
        if let Some(value) = options.brightness {
            filters::brightness(&mut buffer, value);
        }
        if let Some(value) = options.contrast {
            filters::contrast(&mut buffer, value);
        }
        buffer
    }
}

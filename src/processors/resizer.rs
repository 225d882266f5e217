// pixelmill/src/processors/resizer.rs
//! Resize planning and execution. The planner resolves fit-mode geometry,
//! picks a kernel from the dominant-axis downscale ratio, and breaks large
//! reductions into progressive box-filter halvings; each halving is itself
//! scale-matched low-pass filtering, so the chain matches a single
//! high-quality pass at a fraction of the cost.

use fast_image_resize as fr;
use fr::{MulDiv, PixelType, ResizeAlg};

use crate::core::{
    EngineError, FitMode, PixelBuffer, ResizeFilter, ResizeOptions, Result,
};

/// Downscale ratio above which a single convolution pass is replaced by
/// box-filter halvings.
const MULTI_STEP_RATIO: f64 = 4.0;

/// Resampling kernel for one plan step. Extends the caller-facing filter
/// set with the box average the planner uses for halving passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Nearest,
    Box,
    Bilinear,
    CatmullRom,
    Mitchell,
    Lanczos3,
}

impl From<ResizeFilter> for Kernel {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => Kernel::Nearest,
            ResizeFilter::Bilinear => Kernel::Bilinear,
            ResizeFilter::CatmullRom => Kernel::CatmullRom,
            ResizeFilter::Mitchell => Kernel::Mitchell,
            ResizeFilter::Lanczos3 => Kernel::Lanczos3,
        }
    }
}

impl Kernel {
    fn resize_alg(self) -> ResizeAlg {
        match self {
            Kernel::Nearest => ResizeAlg::Nearest,
            Kernel::Box => ResizeAlg::Convolution(fr::FilterType::Box),
            Kernel::Bilinear => ResizeAlg::Convolution(fr::FilterType::Bilinear),
            Kernel::CatmullRom => ResizeAlg::Convolution(fr::FilterType::CatmullRom),
            Kernel::Mitchell => ResizeAlg::Convolution(fr::FilterType::Mitchell),
            Kernel::Lanczos3 => ResizeAlg::Convolution(fr::FilterType::Lanczos3),
        }
    }
}

/// One resampling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeStep {
    pub width: u32,
    pub height: u32,
    pub kernel: Kernel,
}

/// Ordered pass list. Empty when the source already matches the target
/// (shrink-on-decode landed exactly); otherwise every step strictly
/// reduces toward the target and the last step is exactly the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizePlan {
    pub steps: Vec<ResizeStep>,
}

impl ResizePlan {
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Check request dimensions before any decode happens: present axes must
/// be positive, and at least one axis must be present.
pub fn validate(options: &ResizeOptions) -> Result<(Option<u32>, Option<u32>)> {
    let check = |name: &str, value: Option<i32>| -> Result<Option<u32>> {
        match value {
            Some(v) if v <= 0 => Err(EngineError::InvalidDimensions(format!(
                "resize {} must be positive, got {}",
                name, v
            ))),
            Some(v) => Ok(Some(v as u32)),
            None => Ok(None),
        }
    };
    let width = check("width", options.width)?;
    let height = check("height", options.height)?;
    if width.is_none() && height.is_none() {
        return Err(EngineError::Unreachable(
            "resize requires at least one of width or height".to_string(),
        ));
    }
    Ok((width, height))
}

/// Resolve the requested box against the source dimensions. A single given
/// axis preserves the source aspect ratio; with both axes given the fit
/// mode decides how ratio mismatch is reconciled.
pub fn resolve_target(
    src_width: u32,
    src_height: u32,
    options: &ResizeOptions,
) -> Result<(u32, u32)> {
    let (width, height) = validate(options)?;
    let fit = options.fit.unwrap_or(FitMode::Cover);

    let scaled = |dim: u32, num: u32, den: u32| -> u32 {
        ((dim as f64 * num as f64 / den as f64).round() as u32).max(1)
    };

    match (width, height) {
        (Some(w), Some(h)) => {
            let src_ratio = src_width as f64 / src_height as f64;
            let target_ratio = w as f64 / h as f64;
            let cover = || {
                if src_ratio > target_ratio {
                    // Wider than the box: height is the constrained axis.
                    (scaled(src_width, h, src_height), h)
                } else {
                    (w, scaled(src_height, w, src_width))
                }
            };
            let contain = || {
                if src_ratio > target_ratio {
                    (w, scaled(src_height, w, src_width))
                } else {
                    (scaled(src_width, h, src_height), h)
                }
            };
            Ok(match fit {
                FitMode::Fill => (w, h),
                FitMode::Cover => cover(),
                FitMode::Contain => contain(),
                FitMode::Inside => {
                    if src_width <= w && src_height <= h {
                        (src_width, src_height)
                    } else {
                        contain()
                    }
                }
                FitMode::Outside => {
                    if src_width >= w && src_height >= h {
                        (src_width, src_height)
                    } else {
                        cover()
                    }
                }
            })
        }
        (Some(w), None) => Ok((w, scaled(src_height, w, src_width))),
        (None, Some(h)) => Ok((scaled(src_width, h, src_height), h)),
        (None, None) => Err(EngineError::Unreachable(
            "resize requires at least one of width or height".to_string(),
        )),
    }
}

/// Kernel choice by dominant-axis downscale ratio.
fn kernel_for_ratio(ratio: f64) -> Kernel {
    if ratio > MULTI_STEP_RATIO {
        Kernel::Box
    } else if ratio > 2.0 {
        Kernel::Bilinear
    } else if ratio > 1.33 {
        Kernel::CatmullRom
    } else {
        Kernel::Lanczos3
    }
}

/// Build the pass list from source to target. An explicit caller filter
/// forces a single pass; otherwise large reductions get box halvings
/// until the remaining ratio is at most two, then one quality pass.
pub fn plan(
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
    filter: Option<ResizeFilter>,
) -> ResizePlan {
    if (src_width, src_height) == (dst_width, dst_height) {
        return ResizePlan { steps: Vec::new() };
    }

    if let Some(filter) = filter {
        return ResizePlan {
            steps: vec![ResizeStep {
                width: dst_width,
                height: dst_height,
                kernel: filter.into(),
            }],
        };
    }

    let ratio = (src_width as f64 / dst_width as f64)
        .max(src_height as f64 / dst_height as f64);

    let mut steps = Vec::new();
    let (mut cur_width, mut cur_height) = (src_width, src_height);

    if ratio > MULTI_STEP_RATIO {
        while cur_width > dst_width * 2 && cur_height > dst_height * 2 {
            cur_width /= 2;
            cur_height /= 2;
            steps.push(ResizeStep {
                width: cur_width,
                height: cur_height,
                kernel: Kernel::Box,
            });
        }
    }

    if (cur_width, cur_height) != (dst_width, dst_height) {
        let remaining = (cur_width as f64 / dst_width as f64)
            .max(cur_height as f64 / dst_height as f64);
        steps.push(ResizeStep {
            width: dst_width,
            height: dst_height,
            kernel: kernel_for_ratio(remaining),
        });
    }

    ResizePlan { steps }
}

/// Run the plan, consuming and replacing the buffer once per step.
pub fn execute(buffer: PixelBuffer, plan: &ResizePlan) -> Result<PixelBuffer> {
    if plan.is_noop() {
        return Ok(buffer);
    }
    log::debug!(
        "resizing {}x{} through {} pass(es)",
        buffer.width(),
        buffer.height(),
        plan.steps.len()
    );

    let mut current = buffer;
    for step in &plan.steps {
        current = resample(current, step)?;
    }
    Ok(current)
}

fn resample(buffer: PixelBuffer, step: &ResizeStep) -> Result<PixelBuffer> {
    let (src_width, src_height) = (buffer.width(), buffer.height());
    let options = fr::ResizeOptions::new().resize_alg(step.kernel.resize_alg());
    let map_err =
        |e: &dyn std::fmt::Display| EngineError::ProcessingError(format!("resample: {}", e));

    match buffer {
        PixelBuffer::Rgb(image) => {
            let src = fr::images::Image::from_vec_u8(
                src_width,
                src_height,
                image.into_raw(),
                PixelType::U8x3,
            )
            .map_err(|e| map_err(&e))?;
            let mut dst = fr::images::Image::new(step.width, step.height, PixelType::U8x3);
            fr::Resizer::new()
                .resize(&src, &mut dst, &options)
                .map_err(|e| map_err(&e))?;
            PixelBuffer::from_rgb_raw(step.width, step.height, dst.into_vec())
        }
        PixelBuffer::Rgba(image) => {
            let mut src = fr::images::Image::from_vec_u8(
                src_width,
                src_height,
                image.into_raw(),
                PixelType::U8x4,
            )
            .map_err(|e| map_err(&e))?;

            // Convolve premultiplied so transparent pixels do not bleed
            // color into their neighbors.
            let mul_div = MulDiv::default();
            mul_div
                .multiply_alpha_inplace(&mut src)
                .map_err(|e| map_err(&e))?;

            let mut dst = fr::images::Image::new(step.width, step.height, PixelType::U8x4);
            fr::Resizer::new()
                .resize(&src, &mut dst, &options)
                .map_err(|e| map_err(&e))?;
            mul_div
                .divide_alpha_inplace(&mut dst)
                .map_err(|e| map_err(&e))?;

            PixelBuffer::from_rgba_raw(step.width, step.height, dst.into_vec())
        }
    }
}

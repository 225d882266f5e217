// pixelmill/src/processors/cropper.rs
//! Region calculation: resolves a crop request against the source
//! dimensions into a validated rectangle. Pure geometry; applying the
//! region to pixels is the buffer view's job.

use crate::core::{CropOptions, CropRegion, EngineError, Gravity, Result};

/// Per-axis anchor derived from a gravity value.
#[derive(Clone, Copy)]
enum Anchor {
    Start,
    Center,
    End,
}

impl Anchor {
    fn offset(self, slack: u32) -> u32 {
        match self {
            Anchor::Start => 0,
            Anchor::Center => slack / 2,
            Anchor::End => slack,
        }
    }
}

/// Each gravity value is a fixed (x-axis, y-axis) anchor pair.
fn anchors(gravity: Gravity) -> (Anchor, Anchor) {
    match gravity {
        Gravity::Center => (Anchor::Center, Anchor::Center),
        Gravity::North => (Anchor::Center, Anchor::Start),
        Gravity::South => (Anchor::Center, Anchor::End),
        Gravity::East => (Anchor::End, Anchor::Center),
        Gravity::West => (Anchor::Start, Anchor::Center),
        Gravity::NorthWest => (Anchor::Start, Anchor::Start),
        Gravity::NorthEast => (Anchor::End, Anchor::Start),
        Gravity::SouthWest => (Anchor::Start, Anchor::End),
        Gravity::SouthEast => (Anchor::End, Anchor::End),
    }
}

fn place(
    src_width: u32,
    src_height: u32,
    crop_width: u32,
    crop_height: u32,
    gravity: Gravity,
) -> (u32, u32) {
    let (ax, ay) = anchors(gravity);
    (
        ax.offset(src_width - crop_width),
        ay.offset(src_height - crop_height),
    )
}

/// Parse a "W:H" ratio string with positive integer terms.
fn parse_aspect_ratio(ratio: &str) -> Result<(u32, u32)> {
    let invalid = || {
        EngineError::InvalidAspectRatio(format!(
            "'{}' is not a W:H ratio like '16:9'",
            ratio
        ))
    };
    let (w, h) = ratio.split_once(':').ok_or_else(invalid)?;
    let w: u32 = w.trim().parse().map_err(|_| invalid())?;
    let h: u32 = h.trim().parse().map_err(|_| invalid())?;
    if w == 0 || h == 0 {
        return Err(invalid());
    }
    Ok((w, h))
}

/// Largest rectangle of the requested ratio that fits inside the image:
/// keep the constrained axis, shrink the overshooting one.
fn largest_fitting(src_width: u32, src_height: u32, aspect_w: u32, aspect_h: u32) -> (u32, u32) {
    let src_ratio = src_width as f64 / src_height as f64;
    let target_ratio = aspect_w as f64 / aspect_h as f64;

    if src_ratio > target_ratio {
        let width = (src_height as f64 * target_ratio).round() as u32;
        (width.min(src_width).max(1), src_height)
    } else {
        let height = (src_width as f64 / target_ratio).round() as u32;
        (src_width, height.min(src_height).max(1))
    }
}

/// Resolve a crop request into a validated region. Three request shapes:
/// explicit rectangle, aspect ratio + gravity, or dimensions + gravity.
pub fn resolve(options: &CropOptions, src_width: u32, src_height: u32) -> Result<CropRegion> {
    if let Some(ref ratio) = options.aspect_ratio {
        let (aspect_w, aspect_h) = parse_aspect_ratio(ratio)?;
        let (crop_w, crop_h) = largest_fitting(src_width, src_height, aspect_w, aspect_h);
        let gravity = options.gravity.unwrap_or(Gravity::Center);
        let (x, y) = place(src_width, src_height, crop_w, crop_h, gravity);
        return Ok(CropRegion {
            x,
            y,
            width: crop_w,
            height: crop_h,
        });
    }

    if options.x.is_some() || options.y.is_some() {
        let x = options.x.unwrap_or(0) as i64;
        let y = options.y.unwrap_or(0) as i64;
        let width = options.width.ok_or_else(|| {
            EngineError::InvalidParameter(
                "explicit crop requires width alongside x/y".to_string(),
            )
        })? as i64;
        let height = options.height.ok_or_else(|| {
            EngineError::InvalidParameter(
                "explicit crop requires height alongside x/y".to_string(),
            )
        })? as i64;

        if x < 0 || y < 0 || width <= 0 || height <= 0 {
            return Err(EngineError::RegionOutOfBounds(format!(
                "rectangle ({}, {}) {}x{} has a negative or empty extent",
                x, y, width, height
            )));
        }
        if x + width > src_width as i64 || y + height > src_height as i64 {
            return Err(EngineError::RegionOutOfBounds(format!(
                "rectangle ({}, {}) {}x{} exceeds image bounds {}x{}",
                x, y, width, height, src_width, src_height
            )));
        }
        return Ok(CropRegion {
            x: x as u32,
            y: y as u32,
            width: width as u32,
            height: height as u32,
        });
    }

    if options.width.is_some() || options.height.is_some() {
        let width = options.width.map(i64::from).unwrap_or(src_width as i64);
        let height = options.height.map(i64::from).unwrap_or(src_height as i64);
        if width <= 0 || height <= 0 {
            return Err(EngineError::RegionOutOfBounds(format!(
                "extent {}x{} is not positive",
                width, height
            )));
        }
        if width > src_width as i64 || height > src_height as i64 {
            return Err(EngineError::RegionOutOfBounds(format!(
                "extent {}x{} exceeds image bounds {}x{}",
                width, height, src_width, src_height
            )));
        }
        let (width, height) = (width as u32, height as u32);
        let gravity = options.gravity.unwrap_or(Gravity::Center);
        let (x, y) = place(src_width, src_height, width, height, gravity);
        return Ok(CropRegion {
            x,
            y,
            width,
            height,
        });
    }

    Err(EngineError::InvalidParameter(
        "crop requires (x, y, width, height), an aspect ratio, or (width, height, gravity)"
            .to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aspect(ratio: &str) -> CropOptions {
        CropOptions {
            aspect_ratio: Some(ratio.to_string()),
            ..Default::default()
        }
    }

    fn explicit(x: i32, y: i32, width: i32, height: i32) -> CropOptions {
        CropOptions {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    #[test]
    fn square_crop_of_landscape_is_centered() {
        let region = resolve(&aspect("1:1"), 800, 600).unwrap();
        assert_eq!(
            region,
            CropRegion {
                x: 100,
                y: 0,
                width: 600,
                height: 600
            }
        );
    }

    #[test]
    fn widescreen_crop_of_landscape_trims_height() {
        let region = resolve(&aspect("16:9"), 800, 600).unwrap();
        assert_eq!(
            region,
            CropRegion {
                x: 0,
                y: 75,
                width: 800,
                height: 450
            }
        );
    }

    #[test]
    fn corner_gravities_pin_to_edges() {
        let mut options = aspect("1:1");
        options.gravity = Some(Gravity::NorthWest);
        let region = resolve(&options, 1000, 600).unwrap();
        assert_eq!((region.x, region.y), (0, 0));

        options.gravity = Some(Gravity::SouthEast);
        let region = resolve(&options, 1000, 600).unwrap();
        assert_eq!((region.x, region.y), (400, 0));
        assert_eq!((region.width, region.height), (600, 600));
    }

    #[test]
    fn center_gravity_is_centered_within_one_pixel() {
        for (w, h) in [(801u32, 601u32), (800, 600), (997, 313)] {
            let region = resolve(&aspect("1:1"), w, h).unwrap();
            let slack_x = w - region.width;
            let slack_y = h - region.height;
            assert!(region.x.abs_diff(slack_x - region.x) <= 1);
            assert!(region.y.abs_diff(slack_y - region.y) <= 1);
        }
    }

    #[test]
    fn resolved_regions_stay_in_bounds() {
        let gravities = [
            Gravity::Center,
            Gravity::North,
            Gravity::South,
            Gravity::East,
            Gravity::West,
            Gravity::NorthWest,
            Gravity::NorthEast,
            Gravity::SouthWest,
            Gravity::SouthEast,
        ];
        for gravity in gravities {
            for ratio in ["1:1", "16:9", "9:16", "4:3", "21:9"] {
                let mut options = aspect(ratio);
                options.gravity = Some(gravity);
                let region = resolve(&options, 1280, 720).unwrap();
                assert!(region.width > 0 && region.height > 0);
                assert!(region.x + region.width <= 1280);
                assert!(region.y + region.height <= 720);
            }
        }
    }

    #[test]
    fn dimensions_with_gravity_place_the_literal_extent() {
        let options = CropOptions {
            width: Some(200),
            height: Some(100),
            gravity: Some(Gravity::SouthEast),
            ..Default::default()
        };
        let region = resolve(&options, 800, 600).unwrap();
        assert_eq!(
            region,
            CropRegion {
                x: 600,
                y: 500,
                width: 200,
                height: 100
            }
        );
    }

    #[test]
    fn oversized_extent_is_out_of_bounds() {
        let options = CropOptions {
            width: Some(900),
            height: Some(100),
            ..Default::default()
        };
        assert!(matches!(
            resolve(&options, 800, 600),
            Err(EngineError::RegionOutOfBounds(_))
        ));
    }

    #[test]
    fn explicit_rectangle_past_the_edge_fails() {
        assert!(matches!(
            resolve(&explicit(700, 500, 200, 200), 800, 600),
            Err(EngineError::RegionOutOfBounds(_))
        ));
    }

    #[test]
    fn explicit_rectangle_with_empty_extent_fails() {
        assert!(resolve(&explicit(0, 0, 0, 100), 800, 600).is_err());
        assert!(resolve(&explicit(0, 0, 100, -1), 800, 600).is_err());
        assert!(resolve(&explicit(-1, 0, 100, 100), 800, 600).is_err());
    }

    #[test]
    fn explicit_rectangle_at_exact_bounds_passes() {
        let region = resolve(&explicit(0, 0, 800, 600), 800, 600).unwrap();
        assert_eq!((region.width, region.height), (800, 600));
    }

    #[test]
    fn malformed_ratios_are_rejected() {
        for ratio in ["16x9", "0:9", "9:0", "a:b", "16:", ":9", "16:9:4"] {
            assert!(
                matches!(
                    resolve(&aspect(ratio), 800, 600),
                    Err(EngineError::InvalidAspectRatio(_))
                ),
                "ratio {:?} should be rejected",
                ratio
            );
        }
    }

    #[test]
    fn partial_explicit_rectangle_is_invalid() {
        let options = CropOptions {
            x: Some(10),
            y: Some(10),
            width: Some(50),
            ..Default::default()
        };
        assert!(matches!(
            resolve(&options, 800, 600),
            Err(EngineError::InvalidParameter(_))
        ));
    }
}

// pixelmill/src/processors/filters.rs
//! Pixel-point and geometry filters applied after crop and resize:
//! rotation, flips, grayscale, blur, sharpen, brightness and contrast.
//! Strength parameters arrive pre-validated in their documented ranges.

use image::imageops;
use rayon::prelude::*;

use crate::core::PixelBuffer;

/// Rotate clockwise by a validated quarter-turn (90, 180 or 270).
pub fn rotate(buffer: PixelBuffer, degrees: i32) -> PixelBuffer {
    let image = buffer.into_dynamic();
    let rotated = match degrees {
        90 => image.rotate90(),
        180 => image.rotate180(),
        _ => image.rotate270(),
    };
    PixelBuffer::from_dynamic(rotated)
}

pub fn flip_horizontal(buffer: PixelBuffer) -> PixelBuffer {
    PixelBuffer::from_dynamic(buffer.into_dynamic().fliph())
}

pub fn flip_vertical(buffer: PixelBuffer) -> PixelBuffer {
    PixelBuffer::from_dynamic(buffer.into_dynamic().flipv())
}

/// Rec. 601 luma, replicated across the color channels. Channel count and
/// alpha are untouched, so a transparent PNG stays transparent.
pub fn grayscale(buffer: &mut PixelBuffer) {
    let channels = buffer.channels() as usize;
    buffer
        .as_bytes_mut()
        .par_chunks_exact_mut(channels)
        .for_each(|px| {
            let luma = ((px[0] as u32 * 299 + px[1] as u32 * 587 + px[2] as u32 * 114 + 500)
                / 1000) as u8;
            px[0] = luma;
            px[1] = luma;
            px[2] = luma;
        });
}

/// Gaussian blur; strength 0-100 maps to sigma 0.0-10.0. Zero is a no-op.
pub fn blur(buffer: PixelBuffer, amount: i32) -> PixelBuffer {
    let sigma = amount as f32 / 10.0;
    if sigma <= 0.0 {
        return buffer;
    }
    match buffer {
        PixelBuffer::Rgb(buf) => PixelBuffer::Rgb(imageops::blur(&buf, sigma)),
        PixelBuffer::Rgba(buf) => PixelBuffer::Rgba(imageops::blur(&buf, sigma)),
    }
}

/// Unsharp mask with the same strength-to-sigma mapping as blur.
pub fn sharpen(buffer: PixelBuffer, amount: i32) -> PixelBuffer {
    let sigma = amount as f32 / 10.0;
    if sigma <= 0.0 {
        return buffer;
    }
    match buffer {
        PixelBuffer::Rgb(buf) => PixelBuffer::Rgb(imageops::unsharpen(&buf, sigma, 1)),
        PixelBuffer::Rgba(buf) => PixelBuffer::Rgba(imageops::unsharpen(&buf, sigma, 1)),
    }
}

/// Additive brightness: -100..100 maps to a -255..255 per-channel delta,
/// saturating at the sample range. Alpha is untouched.
pub fn brightness(buffer: &mut PixelBuffer, value: i32) {
    if value == 0 {
        return;
    }
    let delta = value * 255 / 100;
    let channels = buffer.channels() as usize;
    buffer
        .as_bytes_mut()
        .par_chunks_exact_mut(channels)
        .for_each(|px| {
            for sample in &mut px[..3] {
                *sample = (*sample as i32 + delta).clamp(0, 255) as u8;
            }
        });
}

/// Linear contrast around the midpoint using the classic 259-based factor.
/// Alpha is untouched.
pub fn contrast(buffer: &mut PixelBuffer, value: i32) {
    if value == 0 {
        return;
    }
    let factor = (259.0 * (value as f32 + 255.0)) / (255.0 * (259.0 - value as f32));
    let channels = buffer.channels() as usize;
    buffer
        .as_bytes_mut()
        .par_chunks_exact_mut(channels)
        .for_each(|px| {
            for sample in &mut px[..3] {
                *sample = (factor * (*sample as f32 - 128.0) + 128.0).clamp(0.0, 255.0) as u8;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn solid_rgb(width: u32, height: u32, px: [u8; 3]) -> PixelBuffer {
        PixelBuffer::Rgb(RgbImage::from_pixel(width, height, Rgb(px)))
    }

    #[test]
    fn quarter_turns_swap_dimensions() {
        let buffer = solid_rgb(30, 20, [1, 2, 3]);
        let turned = rotate(buffer, 90);
        assert_eq!((turned.width(), turned.height()), (20, 30));

        let turned = rotate(turned, 180);
        assert_eq!((turned.width(), turned.height()), (20, 30));

        let turned = rotate(turned, 270);
        assert_eq!((turned.width(), turned.height()), (30, 20));
    }

    #[test]
    fn rotate_90_moves_the_top_left_corner() {
        let mut source = RgbImage::new(2, 2);
        source.put_pixel(0, 0, Rgb([255, 0, 0]));
        let turned = rotate(PixelBuffer::Rgb(source), 90);
        // Clockwise: top-left lands at top-right.
        assert_eq!(&turned.as_bytes()[3..6], &[255, 0, 0]);
    }

    #[test]
    fn horizontal_flip_mirrors_rows() {
        let mut source = RgbImage::new(3, 1);
        source.put_pixel(0, 0, Rgb([9, 9, 9]));
        let flipped = flip_horizontal(PixelBuffer::Rgb(source));
        assert_eq!(&flipped.as_bytes()[6..9], &[9, 9, 9]);
    }

    #[test]
    fn vertical_flip_mirrors_columns() {
        let mut source = RgbImage::new(1, 3);
        source.put_pixel(0, 0, Rgb([9, 9, 9]));
        let flipped = flip_vertical(PixelBuffer::Rgb(source));
        assert_eq!(&flipped.as_bytes()[6..9], &[9, 9, 9]);
    }

    #[test]
    fn grayscale_preserves_alpha() {
        let mut buffer = PixelBuffer::Rgba(RgbaImage::from_pixel(
            4,
            4,
            Rgba([200, 50, 10, 77]),
        ));
        grayscale(&mut buffer);
        for px in buffer.as_bytes().chunks_exact(4) {
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
            assert_eq!(px[3], 77);
        }
    }

    #[test]
    fn grayscale_uses_rec601_weights() {
        let mut buffer = solid_rgb(1, 1, [100, 150, 200]);
        grayscale(&mut buffer);
        // (100*299 + 150*587 + 200*114 + 500) / 1000 = 141 (140.75 rounded)
        assert_eq!(buffer.as_bytes()[0], 141);

        // Fractional luma rounds to nearest, not down.
        let mut buffer = solid_rgb(1, 1, [0, 0, 5]);
        grayscale(&mut buffer);
        // 5*114 = 570, rounds up to 1.
        assert_eq!(buffer.as_bytes()[0], 1);
    }

    #[test]
    fn brightness_shifts_and_saturates() {
        let mut buffer = solid_rgb(2, 2, [100, 200, 250]);
        brightness(&mut buffer, 20); // delta 51
        assert_eq!(&buffer.as_bytes()[0..3], &[151, 251, 255]);

        let mut buffer = solid_rgb(2, 2, [30, 30, 30]);
        brightness(&mut buffer, -20);
        assert_eq!(&buffer.as_bytes()[0..3], &[0, 0, 0]);
    }

    #[test]
    fn contrast_pushes_samples_away_from_midpoint() {
        let mut buffer = solid_rgb(1, 1, [64, 128, 192]);
        contrast(&mut buffer, 50);
        let px = &buffer.as_bytes()[0..3];
        assert!(px[0] < 64);
        assert_eq!(px[1], 128);
        assert!(px[2] > 192);
    }

    #[test]
    fn contrast_leaves_alpha_alone() {
        let mut buffer = PixelBuffer::Rgba(RgbaImage::from_pixel(
            2,
            2,
            Rgba([10, 128, 240, 33]),
        ));
        contrast(&mut buffer, 80);
        for px in buffer.as_bytes().chunks_exact(4) {
            assert_eq!(px[3], 33);
        }
    }

    #[test]
    fn zero_strength_filters_are_noops() {
        let buffer = solid_rgb(4, 4, [10, 20, 30]);
        let original = buffer.as_bytes().to_vec();
        let blurred = blur(buffer, 0);
        assert_eq!(blurred.as_bytes(), original.as_slice());

        let mut bright = blurred;
        brightness(&mut bright, 0);
        contrast(&mut bright, 0);
        assert_eq!(bright.as_bytes(), original.as_slice());
    }

    #[test]
    fn blur_flattens_detail() {
        let mut source = RgbImage::from_pixel(9, 9, Rgb([0, 0, 0]));
        source.put_pixel(4, 4, Rgb([255, 255, 255]));
        let blurred = blur(PixelBuffer::Rgb(source), 50);
        let bytes = blurred.as_bytes();
        let center = (4 * 9 + 4) * 3;
        assert!(bytes[center] < 255);
        // Energy spread to a neighbor.
        assert!(bytes[center + 3] > 0);
    }
}

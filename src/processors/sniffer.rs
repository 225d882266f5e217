// pixelmill/src/processors/sniffer.rs
//! Container format detection and header-only dimension probing. Reads the
//! minimal header bytes for each format; never decodes pixel data.

use crate::core::{EngineError, ImageInfo, Result, SourceFormat};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// How far into a JPEG we will scan for the frame header. Headers for any
/// reasonable image fit well within this.
const JPEG_SCAN_LIMIT: usize = 65536;

/// Identify the container format and read dimensions, channel count and
/// alpha presence from the header alone.
pub fn sniff(data: &[u8]) -> Result<ImageInfo> {
    if data.len() < 4 {
        return Err(EngineError::HeaderTruncated(format!(
            "{} bytes is too short for any image magic",
            data.len()
        )));
    }

    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        sniff_jpeg(data)
    } else if data.starts_with(&PNG_SIGNATURE) {
        sniff_png(data)
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        sniff_gif(data)
    } else if data.starts_with(b"RIFF") {
        sniff_webp(data)
    } else if data.starts_with(b"BM") {
        sniff_bmp(data)
    } else if data.starts_with(b"II\x2A\x00") || data.starts_with(b"MM\x00\x2A") {
        sniff_tiff(data)
    } else if data.len() < 8 {
        // Could be a cut-off PNG/WebP signature; too short to say.
        Err(EngineError::HeaderTruncated(format!(
            "{} bytes is too short to identify a format",
            data.len()
        )))
    } else {
        Err(EngineError::FormatError(
            "no known image magic bytes".to_string(),
        ))
    }
}

fn be16(data: &[u8], pos: usize) -> u32 {
    u16::from_be_bytes([data[pos], data[pos + 1]]) as u32
}

fn le16(data: &[u8], pos: usize) -> u32 {
    u16::from_le_bytes([data[pos], data[pos + 1]]) as u32
}

fn be32(data: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

fn le24(data: &[u8], pos: usize) -> u32 {
    data[pos] as u32 | (data[pos + 1] as u32) << 8 | (data[pos + 2] as u32) << 16
}

/// Scan JPEG markers for an SOF frame header carrying dimensions and the
/// component count. Stops at start-of-scan.
fn sniff_jpeg(data: &[u8]) -> Result<ImageInfo> {
    let limit = data.len().min(JPEG_SCAN_LIMIT);
    let mut pos = 2; // past SOI

    while pos + 4 < limit {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // Standalone markers carry no length field.
        if marker == 0x00 || marker == 0x01 || (0xD0..=0xD9).contains(&marker) {
            pos += 2;
            continue;
        }

        let length = be16(data, pos + 2) as usize;

        // SOF0-SOF3: baseline, extended, progressive, lossless.
        if matches!(marker, 0xC0..=0xC3) {
            if pos + 9 >= data.len() {
                return Err(EngineError::HeaderTruncated(
                    "jpeg frame header cut short".to_string(),
                ));
            }
            let height = be16(data, pos + 5);
            let width = be16(data, pos + 7);
            let components = data[pos + 9];
            if width == 0 || height == 0 {
                return Err(EngineError::FormatError(
                    "jpeg frame header reports zero dimensions".to_string(),
                ));
            }
            return Ok(ImageInfo {
                format: SourceFormat::Jpeg,
                width,
                height,
                channels: if components == 1 { 1 } else { 3 },
                has_alpha: false,
            });
        }
        if marker == 0xDA {
            break;
        }
        pos += 2 + length;
    }

    Err(EngineError::HeaderTruncated(
        "no jpeg frame header found before scan data".to_string(),
    ))
}

fn sniff_png(data: &[u8]) -> Result<ImageInfo> {
    // Signature (8) + IHDR chunk header (8) + width/height/depth/color (10).
    if data.len() < 26 {
        return Err(EngineError::HeaderTruncated(
            "png shorter than its IHDR chunk".to_string(),
        ));
    }
    if &data[12..16] != b"IHDR" {
        return Err(EngineError::FormatError(
            "png does not start with an IHDR chunk".to_string(),
        ));
    }

    let width = be32(data, 16);
    let height = be32(data, 20);
    let color_type = data[25];
    let (channels, has_alpha) = match color_type {
        0 => (1, false),
        2 => (3, false),
        3 => (1, false), // palette indices expand to rgb on decode
        4 => (2, true),
        6 => (4, true),
        other => {
            return Err(EngineError::FormatError(format!(
                "png color type {} is not defined",
                other
            )))
        }
    };

    Ok(ImageInfo {
        format: SourceFormat::Png,
        width,
        height,
        channels,
        has_alpha,
    })
}

fn sniff_gif(data: &[u8]) -> Result<ImageInfo> {
    // Magic (6) + logical screen descriptor (7).
    if data.len() < 13 {
        return Err(EngineError::HeaderTruncated(
            "gif shorter than its logical screen descriptor".to_string(),
        ));
    }
    Ok(ImageInfo {
        format: SourceFormat::Gif,
        width: le16(data, 6),
        height: le16(data, 8),
        // Frames composite through a palette with a transparency index, so
        // decode always yields rgba.
        channels: 4,
        has_alpha: true,
    })
}

fn sniff_webp(data: &[u8]) -> Result<ImageInfo> {
    if data.len() < 16 {
        return Err(EngineError::HeaderTruncated(
            "riff container shorter than its first chunk tag".to_string(),
        ));
    }
    if &data[8..12] != b"WEBP" {
        return Err(EngineError::FormatError(
            "riff container is not webp".to_string(),
        ));
    }

    match &data[12..16] {
        b"VP8 " => {
            if data.len() < 30 {
                return Err(EngineError::HeaderTruncated(
                    "vp8 frame header cut short".to_string(),
                ));
            }
            if data[23..26] != [0x9D, 0x01, 0x2A] {
                return Err(EngineError::FormatError(
                    "vp8 chunk missing keyframe start code".to_string(),
                ));
            }
            Ok(ImageInfo {
                format: SourceFormat::WebP,
                width: le16(data, 26) & 0x3FFF,
                height: le16(data, 28) & 0x3FFF,
                channels: 3,
                has_alpha: false,
            })
        }
        b"VP8L" => {
            if data.len() < 25 {
                return Err(EngineError::HeaderTruncated(
                    "vp8l stream header cut short".to_string(),
                ));
            }
            if data[20] != 0x2F {
                return Err(EngineError::FormatError(
                    "vp8l chunk missing signature byte".to_string(),
                ));
            }
            // 14-bit width-1, 14-bit height-1, 1 alpha bit, packed LSB-first.
            let bits = u32::from_le_bytes([data[21], data[22], data[23], data[24]]);
            let width = (bits & 0x3FFF) + 1;
            let height = ((bits >> 14) & 0x3FFF) + 1;
            let has_alpha = (bits >> 28) & 1 == 1;
            Ok(ImageInfo {
                format: SourceFormat::WebP,
                width,
                height,
                channels: if has_alpha { 4 } else { 3 },
                has_alpha,
            })
        }
        b"VP8X" => {
            if data.len() < 30 {
                return Err(EngineError::HeaderTruncated(
                    "vp8x header cut short".to_string(),
                ));
            }
            let flags = data[20];
            let has_alpha = flags & 0x10 != 0;
            Ok(ImageInfo {
                format: SourceFormat::WebP,
                width: le24(data, 24) + 1,
                height: le24(data, 27) + 1,
                channels: if has_alpha { 4 } else { 3 },
                has_alpha,
            })
        }
        _ => Err(EngineError::FormatError(
            "webp container has no recognizable image chunk".to_string(),
        )),
    }
}

fn sniff_bmp(data: &[u8]) -> Result<ImageInfo> {
    // File header (14) + enough of BITMAPINFOHEADER for dims and depth.
    if data.len() < 30 {
        return Err(EngineError::HeaderTruncated(
            "bmp shorter than its info header".to_string(),
        ));
    }
    let width = i32::from_le_bytes([data[18], data[19], data[20], data[21]]);
    let height = i32::from_le_bytes([data[22], data[23], data[24], data[25]]);
    let bpp = le16(data, 28);
    if width <= 0 || height == 0 {
        return Err(EngineError::FormatError(format!(
            "bmp header reports dimensions {}x{}",
            width, height
        )));
    }
    let has_alpha = bpp == 32;
    Ok(ImageInfo {
        format: SourceFormat::Bmp,
        width: width as u32,
        // Negative height means a top-down bitmap.
        height: height.unsigned_abs(),
        channels: if has_alpha { 4 } else { 3 },
        has_alpha,
    })
}

fn sniff_tiff(data: &[u8]) -> Result<ImageInfo> {
    const TAG_IMAGE_WIDTH: u32 = 256;
    const TAG_IMAGE_LENGTH: u32 = 257;
    const TAG_SAMPLES_PER_PIXEL: u32 = 277;
    const TYPE_SHORT: u32 = 3;
    const TYPE_LONG: u32 = 4;

    let big_endian = data.starts_with(b"MM");
    let read16 = |pos: usize| -> Option<u32> {
        let bytes = [*data.get(pos)?, *data.get(pos + 1)?];
        Some(if big_endian {
            u16::from_be_bytes(bytes) as u32
        } else {
            u16::from_le_bytes(bytes) as u32
        })
    };
    let read32 = |pos: usize| -> Option<u32> {
        let bytes = [
            *data.get(pos)?,
            *data.get(pos + 1)?,
            *data.get(pos + 2)?,
            *data.get(pos + 3)?,
        ];
        Some(if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    };

    let truncated =
        || EngineError::HeaderTruncated("tiff directory cut short".to_string());

    let ifd_offset = read32(4).ok_or_else(truncated)? as usize;
    let entry_count = read16(ifd_offset).ok_or_else(truncated)?;

    let mut width = None;
    let mut height = None;
    let mut samples = None;

    // Cap the walk; a directory this size is not a sane header.
    for i in 0..entry_count.min(512) {
        let entry = ifd_offset + 2 + i as usize * 12;
        let tag = read16(entry).ok_or_else(truncated)?;
        let field_type = read16(entry + 2).ok_or_else(truncated)?;
        // SHORT values sit left-justified in the inline value field.
        let value = match field_type {
            TYPE_SHORT => read16(entry + 8).ok_or_else(truncated)?,
            TYPE_LONG => read32(entry + 8).ok_or_else(truncated)?,
            _ => continue,
        };
        match tag {
            TAG_IMAGE_WIDTH => width = Some(value),
            TAG_IMAGE_LENGTH => height = Some(value),
            TAG_SAMPLES_PER_PIXEL => samples = Some(value),
            _ => {}
        }
    }

    match (width, height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => {
            let channels = samples.unwrap_or(3).min(4) as u8;
            Ok(ImageInfo {
                format: SourceFormat::Tiff,
                width,
                height,
                channels,
                has_alpha: channels == 4,
            })
        }
        _ => Err(EngineError::HeaderTruncated(
            "tiff directory carries no dimensions".to_string(),
        )),
    }
}

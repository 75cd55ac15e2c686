//! Image Normalizer (C1).
//!
//! EXIF-corrects, resizes, and recompresses images to JPEG at role-specific
//! quality/edge targets, and samples deterministic subsets per pipeline
//! stage. Decode failures are non-fatal: the input bytes pass through
//! unchanged and the failure is logged.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use tracing::warn;

/// Decode, apply EXIF orientation, convert to RGB, scale the longest edge
/// down to `max_edge` preserving aspect ratio, and re-encode as JPEG at
/// `quality`. On decode failure, returns the input unchanged.
pub fn normalize(bytes: &[u8], max_edge: u32, quality: u8) -> Vec<u8> {
    match try_normalize(bytes, max_edge, quality) {
        Ok(out) => out,
        Err(err) => {
            warn!(error = %err, "image decode failed, passing through original bytes");
            bytes.to_vec()
        }
    }
}

fn try_normalize(bytes: &[u8], max_edge: u32, quality: u8) -> anyhow::Result<Vec<u8>> {
    let orientation = read_exif_orientation(bytes);

    let img = image::load_from_memory(bytes)?;
    let img = apply_orientation(img, orientation);
    let img = DynamicImage::ImageRgb8(img.to_rgb8());

    let (w, h) = img.dimensions();
    let scale = if w.max(h) > max_edge {
        max_edge as f64 / w.max(h) as f64
    } else {
        1.0
    };

    let resized = if scale < 1.0 {
        let new_w = ((w as f64) * scale).round().max(1.0) as u32;
        let new_h = ((h as f64) * scale).round().max(1.0) as u32;
        img.resize(new_w, new_h, image::imageops::FilterType::Lanczos3)
    } else {
        img
    };

    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    resized.write_with_encoder(encoder)?;

    Ok(out.into_inner())
}

/// Read the EXIF orientation tag (0x0112) from a JPEG's APP1 segment, if
/// present. Returns `1` (identity) when absent or unparseable — a full
/// EXIF dependency isn't warranted for reading a single tag.
fn read_exif_orientation(bytes: &[u8]) -> u16 {
    const APP1_MARKER: [u8; 2] = [0xFF, 0xE1];
    const EXIF_HEADER: &[u8] = b"Exif\0\0";

    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return 1;
    }

    let mut pos = 2usize;
    while pos + 4 <= bytes.len() {
        let marker = &bytes[pos..pos + 2];
        if marker[0] != 0xFF {
            break;
        }
        // SOS or EOI: no more markers worth scanning.
        if marker[1] == 0xDA || marker[1] == 0xD9 {
            break;
        }

        let seg_len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if seg_len < 2 || pos + 2 + seg_len > bytes.len() {
            break;
        }
        let seg_start = pos + 4;
        let seg_end = pos + 2 + seg_len;

        if marker == APP1_MARKER && seg_end - seg_start >= EXIF_HEADER.len() {
            let seg = &bytes[seg_start..seg_end];
            if seg.starts_with(EXIF_HEADER) {
                if let Some(orientation) = parse_tiff_orientation(&seg[EXIF_HEADER.len()..]) {
                    return orientation;
                }
            }
        }

        pos = seg_end;
    }

    1
}

fn parse_tiff_orientation(tiff: &[u8]) -> Option<u16> {
    if tiff.len() < 8 {
        return None;
    }

    let little_endian = match &tiff[0..2] {
        b"II" => true,
        b"MM" => false,
        _ => return None,
    };

    let read_u16 = |b: &[u8]| -> u16 {
        if little_endian {
            u16::from_le_bytes([b[0], b[1]])
        } else {
            u16::from_be_bytes([b[0], b[1]])
        }
    };
    let read_u32 = |b: &[u8]| -> u32 {
        if little_endian {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        }
    };

    let ifd_offset = read_u32(&tiff[4..8]) as usize;
    if ifd_offset + 2 > tiff.len() {
        return None;
    }

    let entry_count = read_u16(&tiff[ifd_offset..ifd_offset + 2]) as usize;
    let mut pos = ifd_offset + 2;

    for _ in 0..entry_count {
        if pos + 12 > tiff.len() {
            break;
        }
        let tag = read_u16(&tiff[pos..pos + 2]);
        if tag == 0x0112 {
            let value = read_u16(&tiff[pos + 8..pos + 10]);
            return Some(value);
        }
        pos += 12;
    }

    None
}

fn apply_orientation(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Re-encode generic images without resizing constraints, preserving the
/// guessed source format hint (used only for diagnostics, not behavior).
pub fn guess_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Deterministic index set for sampling `k` items out of `n`:
/// `{0, floor(n/3), floor(2n/3), n-1}` for `n >= 4`. Exposed separately
/// from `sample_for_classification` so the pure index math is directly
/// testable on its own.
pub fn classification_sample_indices(n: usize, k: usize) -> Vec<usize> {
    if n <= k {
        return (0..n).collect();
    }

    let mut indices: std::collections::BTreeSet<usize> = std::collections::BTreeSet::new();
    indices.insert(0);
    indices.insert(n / 3);
    indices.insert((2 * n) / 3);
    indices.insert(n - 1);

    indices.into_iter().collect()
}

/// If `images.len() <= k`, return all of them; otherwise return the items
/// at `classification_sample_indices`, each normalized with classification
/// parameters.
pub fn sample_for_classification(
    images: &[crate::domain::Image],
    k: usize,
    max_edge: u32,
    quality: u8,
) -> Vec<crate::domain::Image> {
    let indices = classification_sample_indices(images.len(), k);
    indices
        .into_iter()
        .map(|i| {
            let img = &images[i];
            crate::domain::Image::new(
                normalize(&img.bytes, max_edge, quality),
                img.room_id.clone(),
                img.origin_index,
            )
        })
        .collect()
}

/// If `images.len() <= k`, return all of them; otherwise return the first
/// `k`, each normalized with checklist parameters.
pub fn sample_for_checklist(
    images: &[crate::domain::Image],
    k: usize,
    max_edge: u32,
    quality: u8,
) -> Vec<crate::domain::Image> {
    let take = images.len().min(k);
    images[..take]
        .iter()
        .map(|img| {
            crate::domain::Image::new(
                normalize(&img.bytes, max_edge, quality),
                img.room_id.clone(),
                img.origin_index,
            )
        })
        .collect()
}

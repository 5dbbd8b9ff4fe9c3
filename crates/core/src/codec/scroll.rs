//! Strip decoding for panorama backgrounds.
//!
//! Backgrounds wider or taller than the visible window are stored as
//! independent 8-pixel strips so the engine can decode only the sliver
//! entering the window on each scroll step. The pixel data for such an
//! image begins with a table of 32-bit offsets, one per strip, relative to
//! the start of the image data; each strip is a run-length stream in the
//! grammar of [`super::rle`].
//!
//! Horizontal panoramas use vertical strips (8 pixels wide, full image
//! height, decoded column-major with stride 8). Vertical panoramas use
//! horizontal strips (full image width, 8 pixels tall).

use super::{rle, CodecError};
use crate::bytes::{u32_at, Endian};

/// Strip width (vertical strips) or height (horizontal strips) in pixels.
pub const STRIP_SIZE: usize = 8;

fn strip_start(
    data: &[u8],
    endian: Endian,
    strip: usize,
    strips: usize,
) -> Result<usize, CodecError> {
    if strip >= strips {
        return Err(CodecError::BadStrip { strip, strips });
    }
    let offset = u32_at(data, strip * 4, endian).map_err(|e| CodecError::BadStripOffset {
        offset: e.offset,
        len: data.len(),
    })? as usize;
    if offset >= data.len() {
        return Err(CodecError::BadStripOffset {
            offset,
            len: data.len(),
        });
    }
    Ok(offset)
}

/// Decode one vertical strip of a horizontally scrolling panorama:
/// 8 x `height` pixels into `dst` (stride 8).
pub fn decode_vstrip(
    data: &[u8],
    endian: Endian,
    strip: usize,
    strips: usize,
    height: usize,
    dst: &mut [u8],
) -> Result<(), CodecError> {
    if height == 0 || strips == 0 {
        return Ok(());
    }
    let start = strip_start(data, endian, strip, strips)?;
    rle::decode_columns(&data[start..], STRIP_SIZE, height, dst)?;
    Ok(())
}

/// Decode one horizontal strip of a vertically scrolling panorama:
/// `width` x 8 pixels into `dst` (stride `width`).
pub fn decode_hstrip(
    data: &[u8],
    endian: Endian,
    strip: usize,
    strips: usize,
    width: usize,
    dst: &mut [u8],
) -> Result<(), CodecError> {
    if width == 0 || strips == 0 {
        return Ok(());
    }
    let start = strip_start(data, endian, strip, strips)?;
    rle::decode_columns(&data[start..], width, STRIP_SIZE, dst)?;
    Ok(())
}

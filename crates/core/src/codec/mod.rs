//! Image decode algorithms for zone pixel data.
//!
//! Four related but distinct codecs, all pure functions from an encoded
//! byte stream plus pixel dimensions to a chunky (one colour index per
//! pixel, or two per byte for nibble output) destination buffer:
//!
//! - [`rle`]: the signed run-length grammar written down destination
//!   columns, with run state carried across column boundaries.
//! - [`planar`]: interleaved bit-plane words converted to chunky pixels
//!   (four planes packed two pixels per byte, five planes one byte per
//!   pixel, plus the one-plane text mode).
//! - [`scroll`]: the same run-length grammar applied strip-by-strip to
//!   panorama backgrounds wider or taller than the visible window.
//! - [`mask`]: mask-selected compositing of a decoded foreground over an
//!   existing background, with the optional colour-key rule.
//!
//! Every decoder treats zero width or height as a no-op and fails with a
//! typed [`CodecError`] rather than writing past its destination.

use thiserror::Error;

pub mod mask;
pub mod planar;
pub mod rle;
pub mod scroll;

pub use mask::{composite, MaskKind};
pub use planar::{planes_to_bytes, planes_to_nibbles, text_plane_to_bytes, TEXT_MARK};
pub use rle::decode_columns;
pub use scroll::{decode_hstrip, decode_vstrip, STRIP_SIZE};

/// Decode failure. Always fatal for the resource being decoded; the engine
/// assumes shipped pixel data is well formed, so any of these indicates
/// corruption or a mis-sized destination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("destination too small: need {need} bytes, have {have}")]
    DestinationTooSmall { need: usize, have: usize },

    #[error("source exhausted at offset {offset}")]
    SourceUnderrun { offset: usize },

    #[error("image width {width} is not a multiple of 8")]
    UnalignedWidth { width: usize },

    #[error("strip {strip} out of range ({strips} strips)")]
    BadStrip { strip: usize, strips: usize },

    #[error("strip offset {offset:#x} outside pixel data (len {len})")]
    BadStripOffset { offset: usize, len: usize },

    #[error("mask too small: need {need} bytes, have {have}")]
    MaskTooSmall { need: usize, have: usize },
}

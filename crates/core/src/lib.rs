//! Core primitives for the VGA zone runtime: image codecs, the indexed
//! surface and presentation seam, bounds-checked byte readers, and logging.
//!
//! Everything in this crate is game-agnostic; the per-release variant
//! tables and the bytecode interpreter live in `vga_engine`.

pub mod bytes;
pub mod codec;
pub mod logging;
pub mod surface;

pub use bytes::{ByteReader, Endian, ShortRead};
pub use codec::CodecError;
pub use surface::{DisplaySink, NullSink, Rect, Rgb, Surface, SurfaceLock};

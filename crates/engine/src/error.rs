//! The fatal interpreter error.
//!
//! Nothing in this engine is retryable: zone bytecode ships with the game
//! and is assumed authored correctly, so an unknown opcode, an overflowing
//! table or a missing resource means corrupt data or an unsupported
//! release. Every failure carries the opcode or identifier that triggered
//! it and terminates the running script.

use thiserror::Error;
use vga_core::CodecError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown opcode {opcode:#06x} at offset {offset:#06x} in zone {zone}")]
    UnknownOpcode {
        opcode: u16,
        offset: usize,
        zone: u16,
    },

    #[error("{table} table full ({capacity} entries)")]
    TableFull {
        table: &'static str,
        capacity: usize,
    },

    #[error("zone {zone} is malformed: {reason}")]
    MalformedZone { zone: u16, reason: String },

    #[error("zone {zone} has no {kind} {id}")]
    MissingResource {
        kind: &'static str,
        id: u16,
        zone: u16,
    },

    #[error("zone {zone} is not loaded")]
    ZoneNotLoaded { zone: u16 },

    #[error("script read past end of zone {zone} at offset {offset:#06x}")]
    ScriptOverrun { zone: u16, offset: usize },

    #[error("{what} index {index} out of range")]
    IndexOutOfRange { what: &'static str, index: usize },

    #[error("image decode failed: {0}")]
    Codec(#[from] CodecError),
}

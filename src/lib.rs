//! Codec and container engine for LFG! installer archives.
//!
//! An LFG archive is a chain of volume files, each opening with an `LFG!`
//! header, holding `FILE` records whose payloads are compressed with an
//! implode/explode codec compatible with the PKWARE Data Compression
//! Library variant those installers shipped.  A payload may straddle volume
//! boundaries; record headers never do.
//!
//! The crate splits along the natural seams of the format:
//!
//! - [`bits`]: LSB-first bit reader/writer with the continuation seam that
//!   lets a bit stream cross volume files.
//! - [`codec`]: the implode (encoder) and explode (decoder) pair.
//! - [`archive`]: the outer container (volume headers, file records,
//!   multi-volume packing and extraction).
//! - [`cli`]: display-level notification machinery and list-file input
//!   shared by the `lfgextract` and `lfgpack` binaries.

pub mod archive;
pub mod bits;
pub mod cli;
pub mod codec;
pub mod error;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level re-exports for the common entry points.
// ─────────────────────────────────────────────────────────────────────────────

/// One-shot, in-memory compression of a byte slice into an implode payload.
pub use codec::implode::implode_to_vec;
/// One-shot, in-memory decompression of an implode payload.
pub use codec::explode::explode_to_vec;
/// Streaming encoder entry point.
pub use codec::implode::implode;
/// Streaming decoder entry point.
pub use codec::explode::explode;
/// Dictionary (sliding-window) size selection.
pub use codec::DictSize;
/// Match-search strategy selection.
pub use codec::Strategy;
/// Per-file emission statistics, filled by either codec half.
pub use codec::stats::CodecStats;

/// Archive extraction driver.
pub use archive::reader::{extract_archive, ExtractOptions, ExtractSummary};
/// Archive creation driver.
pub use archive::writer::{pack_archive, DictChoice, PackOptions, PackSummary};

/// Crate error type.
pub use error::LfgError;

// ─────────────────────────────────────────────────────────────────────────────
// Version
// ─────────────────────────────────────────────────────────────────────────────

pub const VERSION_MAJOR: u32 = 1;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_STRING: &str = "1.1";

/// Returns the library version string (e.g. `"1.1"`).
pub fn version_string() -> &'static str {
    VERSION_STRING
}

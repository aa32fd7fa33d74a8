//! The implode/explode codec pair.
//!
//! A compressed payload opens with two plain bytes, the literal mode
//! (always 0: raw 8-bit literals) and the dictionary exponent, followed by
//! a bit stream of literals and `(length, offset)` back-references into a
//! sliding window of the most recent output.  The stream ends with a match
//! code of length [`END_OF_STREAM`], a value ordinary matches cannot reach.

pub mod explode;
pub mod implode;
pub mod stats;
pub mod tables;

/// Shortest encodable back-reference.
pub const MIN_MATCH: u32 = 2;

/// Longest encodable back-reference.
pub const MAX_MATCH: u32 = 518;

/// The length value reserved as the end-of-stream marker (`MAX_MATCH + 1`,
/// reachable only as base 264 + the all-ones 8-bit suffix).
pub const END_OF_STREAM: u32 = 519;

/// Wire offsets of length-2 matches carry exactly 2 low bits, capping them
/// at `(0x3F << 2) | 3`.
pub const MAX_LEN2_WIRE_OFFSET: u32 = 255;

// ---------------------------------------------------------------------------
// Dictionary size
// ---------------------------------------------------------------------------

/// Sliding-window size, stored in the payload header as the exponent `e`
/// with `window = 1 << (e + 6)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictSize {
    /// 1 KiB window (`e = 4`).
    K1,
    /// 2 KiB window (`e = 5`).
    K2,
    /// 4 KiB window (`e = 6`).
    K4,
}

impl DictSize {
    /// The header exponent: 4, 5 or 6.
    pub fn exponent(self) -> u32 {
        match self {
            DictSize::K1 => 4,
            DictSize::K2 => 5,
            DictSize::K4 => 6,
        }
    }

    /// Window size in bytes: 1024, 2048 or 4096.
    pub fn window_size(self) -> usize {
        1 << (self.exponent() + 6)
    }

    /// Parses a header exponent byte; values outside 4..=6 are invalid.
    pub fn from_exponent(e: u8) -> Option<Self> {
        match e {
            4 => Some(DictSize::K1),
            5 => Some(DictSize::K2),
            6 => Some(DictSize::K4),
            _ => None,
        }
    }

    /// Window the packer picks by default: the smallest one no smaller than
    /// the file, capped at 4 KiB.
    pub fn auto_for_len(input_len: u64) -> Self {
        if input_len <= 1024 {
            DictSize::K1
        } else if input_len <= 2048 {
            DictSize::K2
        } else {
            DictSize::K4
        }
    }

    /// All sizes, smallest first; the order the exhaustive optimizer tries.
    pub fn all() -> [DictSize; 3] {
        [DictSize::K1, DictSize::K2, DictSize::K4]
    }
}

// ---------------------------------------------------------------------------
// Match-search strategy
// ---------------------------------------------------------------------------

/// How hard the encoder works per position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Emit the longest match at the current position unconditionally.
    Greedy,
    /// Weigh the longest match against a literal plus the longest match one
    /// byte later, choosing the cheaper encoding per output byte.
    Lazy,
}

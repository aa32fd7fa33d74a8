//! The hand-rolled prefix codes for match lengths and offsets.
//!
//! Both codes mix bit orders: the prefix is read and written MSB-first, the
//! numeric suffix LSB-first.  The tables here drive both directions:
//! the decoder scans them while accumulating prefix bits, the encoder looks
//! up a row directly.

// ---------------------------------------------------------------------------
// Length code
// ---------------------------------------------------------------------------

/// One row of the length code: lengths `base .. base + 2^extra_bits` map to
/// `prefix` (over `prefix_bits` bits, MSB-first) followed by `extra_bits`
/// LSB-first bits holding `length - base`.
pub struct LengthCode {
    pub base: u16,
    pub prefix_bits: u8,
    pub prefix: u8,
    pub extra_bits: u8,
}

/// All sixteen length codes, longest base first so the encoder can take the
/// first row whose base fits.  Lengths 2 and 3 sit outside the otherwise
/// monotonic layout: 3 gets the shortest code, 2 a longer one.
pub const LENGTH_CODES: [LengthCode; 16] = [
    LengthCode { base: 264, prefix_bits: 7, prefix: 0b0000000, extra_bits: 8 },
    LengthCode { base: 136, prefix_bits: 7, prefix: 0b0000001, extra_bits: 7 },
    LengthCode { base: 72, prefix_bits: 6, prefix: 0b000001, extra_bits: 6 },
    LengthCode { base: 40, prefix_bits: 6, prefix: 0b000010, extra_bits: 5 },
    LengthCode { base: 24, prefix_bits: 6, prefix: 0b000011, extra_bits: 4 },
    LengthCode { base: 16, prefix_bits: 5, prefix: 0b00010, extra_bits: 3 },
    LengthCode { base: 12, prefix_bits: 5, prefix: 0b00011, extra_bits: 2 },
    LengthCode { base: 10, prefix_bits: 5, prefix: 0b00100, extra_bits: 1 },
    LengthCode { base: 9, prefix_bits: 5, prefix: 0b00101, extra_bits: 0 },
    LengthCode { base: 8, prefix_bits: 4, prefix: 0b0011, extra_bits: 0 },
    LengthCode { base: 7, prefix_bits: 4, prefix: 0b0100, extra_bits: 0 },
    LengthCode { base: 6, prefix_bits: 4, prefix: 0b0101, extra_bits: 0 },
    LengthCode { base: 5, prefix_bits: 3, prefix: 0b011, extra_bits: 0 },
    LengthCode { base: 4, prefix_bits: 3, prefix: 0b100, extra_bits: 0 },
    LengthCode { base: 3, prefix_bits: 2, prefix: 0b11, extra_bits: 0 },
    LengthCode { base: 2, prefix_bits: 3, prefix: 0b101, extra_bits: 0 },
];

/// Returns the code row for `length` (2..=519).
pub fn length_code_for(length: u32) -> &'static LengthCode {
    debug_assert!((2..=519).contains(&length));
    // Row order puts base 2 last, after base 3, so the scan must skip rows
    // whose range does not actually contain the length.
    LENGTH_CODES
        .iter()
        .find(|row| {
            let base = u32::from(row.base);
            length >= base && length - base < (1 << row.extra_bits)
        })
        .expect("every length in 2..=519 has a code row")
}

// ---------------------------------------------------------------------------
// Offset code (upper bits)
// ---------------------------------------------------------------------------

/// Code level `L` of the offset-upper code.  A prefix `b` of `L` bits
/// (MSB-first) with `b - base_bits` in `[0, count)` decodes to
/// `base_value - (b - base_bits)`.
pub struct OffsetLevel {
    pub count: u8,
    pub base_value: u8,
    pub base_bits: u8,
}

/// Indexed by code length; levels 0, 1 and 3 carry no codes.
pub const OFFSET_LEVELS: [OffsetLevel; 9] = [
    OffsetLevel { count: 0, base_value: 0x00, base_bits: 0x00 },
    OffsetLevel { count: 0, base_value: 0x00, base_bits: 0x00 },
    OffsetLevel { count: 1, base_value: 0x00, base_bits: 0x03 },
    OffsetLevel { count: 0, base_value: 0x00, base_bits: 0x00 },
    OffsetLevel { count: 2, base_value: 0x02, base_bits: 0x0A },
    OffsetLevel { count: 4, base_value: 0x06, base_bits: 0x10 },
    OffsetLevel { count: 15, base_value: 0x15, base_bits: 0x11 },
    OffsetLevel { count: 26, base_value: 0x2F, base_bits: 0x08 },
    OffsetLevel { count: 16, base_value: 0x3F, base_bits: 0x00 },
];

/// Encodes the upper offset bits (0..=63): returns `(bit_count, bits)` to be
/// written MSB-first.
pub fn encode_offset_upper(upper: u32) -> (u32, u32) {
    debug_assert!(upper <= 0x3F);
    for (level, row) in OFFSET_LEVELS.iter().enumerate() {
        if row.count == 0 {
            continue;
        }
        let hi = u32::from(row.base_value);
        let lo = hi + 1 - u32::from(row.count);
        if upper >= lo && upper <= hi {
            return (level as u32, u32::from(row.base_bits) + (hi - upper));
        }
    }
    unreachable!("offset-upper ranges cover 0..=63")
}

// ---------------------------------------------------------------------------
// Bit-cost accounting
// ---------------------------------------------------------------------------

/// Bits a literal costs on the wire: the selector bit plus the raw byte.
pub const LITERAL_COST_BITS: u32 = 9;

/// Number of LSB-first low offset bits for a match: 2 for length-2 matches,
/// otherwise the dictionary exponent.
pub fn low_offset_bits(length: u32, dict_exponent: u32) -> u32 {
    if length == 2 {
        2
    } else {
        dict_exponent
    }
}

/// Total wire cost in bits of a match with the given 0-based wire offset.
pub fn match_cost_bits(wire_offset: u32, length: u32, dict_exponent: u32) -> u32 {
    let low_bits = low_offset_bits(length, dict_exponent);
    let (upper_bits, _) = encode_offset_upper(wire_offset >> low_bits);
    let row = length_code_for(length);
    1 + u32::from(row.prefix_bits) + u32::from(row.extra_bits) + upper_bits + low_bits
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

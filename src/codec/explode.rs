//! The explode half of the codec: bit stream in, original bytes out.

use std::io::{self, Write};

use crate::bits::{BitReader, ByteFeed, SliceFeed};
use crate::codec::stats::CodecStats;
use crate::codec::tables::{LENGTH_CODES, OFFSET_LEVELS};
use crate::codec::{DictSize, END_OF_STREAM};
use crate::error::{LfgError, Result};

// ---------------------------------------------------------------------------
// Output window
// ---------------------------------------------------------------------------

/// Size of the output buffer that doubles as the back-reference dictionary.
/// A power of two comfortably above the largest window (4 KiB), so recent
/// history is always resident even right after a flush.
const WINDOW_BUF_SIZE: usize = 0x4000;

/// Circular output buffer.  Bytes accumulate until the buffer fills, then
/// the whole buffer goes to the writer; the contents stay in place so
/// back-references keep working across the flush.
struct OutputWindow<W: Write> {
    buf: Box<[u8]>,
    pos: usize,
    written: u64,
    out: W,
}

impl<W: Write> OutputWindow<W> {
    fn new(out: W) -> Self {
        OutputWindow {
            buf: vec![0u8; WINDOW_BUF_SIZE].into_boxed_slice(),
            pos: 0,
            written: 0,
            out,
        }
    }

    fn push(&mut self, byte: u8) -> io::Result<()> {
        self.buf[self.pos] = byte;
        self.pos += 1;
        self.written += 1;
        if self.pos == WINDOW_BUF_SIZE {
            self.out.write_all(&self.buf)?;
            self.pos = 0;
        }
        Ok(())
    }

    /// The byte emitted `distance` positions ago (1 = most recent).
    fn back(&self, distance: usize) -> u8 {
        self.buf[self.pos.wrapping_sub(distance) & (WINDOW_BUF_SIZE - 1)]
    }

    fn finish(mut self) -> io::Result<u64> {
        self.out.write_all(&self.buf[..self.pos])?;
        self.out.flush()?;
        Ok(self.written)
    }
}

// ---------------------------------------------------------------------------
// Code decoding
// ---------------------------------------------------------------------------

/// Decodes one length code: MSB-first prefix, then the LSB-first suffix
/// added to the row base.  [`END_OF_STREAM`] comes out of the longest row.
fn decode_length<F: ByteFeed>(reader: &mut BitReader<F>) -> Result<u32> {
    let mut prefix = reader.read_bits_msb_first(2)?;
    let mut prefix_bits = 2u32;
    loop {
        let hit = LENGTH_CODES
            .iter()
            .find(|row| u32::from(row.prefix_bits) == prefix_bits && u32::from(row.prefix) == prefix);
        if let Some(row) = hit {
            let extra = if row.extra_bits > 0 {
                reader.read_bits_lsb_first(u32::from(row.extra_bits))?
            } else {
                0
            };
            return Ok(u32::from(row.base) + extra);
        }
        if prefix_bits == 7 {
            return Err(LfgError::CorruptLengthCode);
        }
        prefix = (prefix << 1) | reader.read_bit()?;
        prefix_bits += 1;
    }
}

/// Decodes one offset: variable-length upper bits, then `e` fixed low bits
/// (2 for length-2 matches).  Returns the 0-based wire offset.
fn decode_offset<F: ByteFeed>(
    reader: &mut BitReader<F>,
    length: u32,
    dict_exponent: u32,
) -> Result<u32> {
    let mut bits = reader.read_bits_msb_first(2)?;
    let mut upper = None;
    for (level, row) in OFFSET_LEVELS.iter().enumerate().skip(2) {
        let diff = bits as i32 - i32::from(row.base_bits);
        if row.count > 0 && diff >= 0 && diff < i32::from(row.count) {
            upper = Some(u32::from(row.base_value) - diff as u32);
            break;
        }
        if level == 8 {
            return Err(LfgError::CorruptOffsetCode);
        }
        bits = (bits << 1) | reader.read_bit()?;
    }
    let upper = upper.ok_or(LfgError::CorruptOffsetCode)?;

    let low_bits = if length == 2 { 2 } else { dict_exponent };
    let low = reader.read_bits_lsb_first(low_bits)?;
    Ok((upper << low_bits) | low)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Outcome of a successful explode.
#[derive(Debug, Clone, Copy)]
pub struct ExplodeSummary {
    /// Bytes emitted to the output.
    pub bytes_written: u64,
    /// Window size declared in the payload header.
    pub dict: DictSize,
    /// `true` when the caller supplied an expected length and the output
    /// disagreed. Advisory only; the output is still complete.
    pub length_mismatch: bool,
}

/// Decompresses one payload from `feed` into `out`.
///
/// The feed must be positioned at the two payload header bytes; decoding
/// stops at the end-of-stream marker, leaving any remaining feed bytes
/// (bit-padding included) unconsumed beyond the marker's byte.
///
/// `expected_len` is checked against the actual output length; a mismatch is
/// reported in the summary, not as an error.
///
/// # Errors
///
/// [`LfgError::UnsupportedParameter`] for a nonzero literal mode or an
/// out-of-range dictionary exponent, [`LfgError::UnexpectedEndOfInput`] when
/// the feed (and any volume continuation behind it) runs dry mid-stream,
/// and the corrupt-code variants for bit patterns outside the tables.
pub fn explode<F: ByteFeed, W: Write>(
    feed: F,
    out: W,
    expected_len: Option<u64>,
    mut stats: Option<&mut CodecStats>,
) -> Result<ExplodeSummary> {
    let mut reader = BitReader::new(feed);

    let literal_mode = reader.read_aligned_byte()?;
    if literal_mode != 0 {
        return Err(LfgError::UnsupportedParameter(format!(
            "literal mode {literal_mode} (only 0 is supported)"
        )));
    }
    let exponent = reader.read_aligned_byte()?;
    let dict = DictSize::from_exponent(exponent).ok_or_else(|| {
        LfgError::UnsupportedParameter(format!(
            "dictionary size value {exponent} (expected 4, 5 or 6)"
        ))
    })?;

    let mut window = OutputWindow::new(out);
    loop {
        if reader.read_bit()? == 0 {
            let byte = reader.read_bits_lsb_first(8)? as u8;
            window.push(byte).map_err(LfgError::Io)?;
            if let Some(s) = stats.as_deref_mut() {
                s.record_literal();
            }
            continue;
        }

        let length = decode_length(&mut reader)?;
        if length == END_OF_STREAM {
            break;
        }

        let wire_offset = decode_offset(&mut reader, length, dict.exponent())?;
        let distance = wire_offset as usize + 1;
        // The source position trails the write position by a constant
        // distance, so a copy longer than the distance re-reads bytes it
        // just produced, the overlap behavior run-length encoding relies on.
        for _ in 0..length {
            let byte = window.back(distance);
            window.push(byte).map_err(LfgError::Io)?;
        }
        if let Some(s) = stats.as_deref_mut() {
            s.record_match(length, distance as u32);
        }
    }

    let bytes_written = window.finish().map_err(LfgError::Io)?;
    let length_mismatch = expected_len.is_some_and(|exp| exp != bytes_written);

    Ok(ExplodeSummary {
        bytes_written,
        dict,
        length_mismatch,
    })
}

/// Decompresses an in-memory payload, returning the original bytes.
pub fn explode_to_vec(payload: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    explode(SliceFeed::new(payload), &mut out, None, None)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitWriter;

    /// Hand-assembles a payload from (literal | match) emissions.
    enum Emit {
        Lit(u8),
        Match { length: u32, distance: u32 },
    }

    fn assemble(dict: DictSize, emissions: &[Emit]) -> Vec<u8> {
        use crate::codec::tables::{encode_offset_upper, length_code_for, low_offset_bits};
        let mut payload = vec![0u8, dict.exponent() as u8];
        let mut w = BitWriter::new(&mut payload);
        for e in emissions {
            match *e {
                Emit::Lit(b) => {
                    w.write_bit(0).unwrap();
                    w.write_bits_lsb_first(8, u32::from(b)).unwrap();
                }
                Emit::Match { length, distance } => {
                    let wire = distance - 1;
                    w.write_bit(1).unwrap();
                    let row = length_code_for(length);
                    w.write_bits_msb_first(u32::from(row.prefix_bits), u32::from(row.prefix))
                        .unwrap();
                    if row.extra_bits > 0 {
                        w.write_bits_lsb_first(u32::from(row.extra_bits), length - u32::from(row.base))
                            .unwrap();
                    }
                    let k = low_offset_bits(length, dict.exponent());
                    let (ub, uv) = encode_offset_upper(wire >> k);
                    w.write_bits_msb_first(ub, uv).unwrap();
                    w.write_bits_lsb_first(k, wire).unwrap();
                }
            }
        }
        // End-of-stream marker: length 519.
        w.write_bit(1).unwrap();
        w.write_bits_msb_first(7, 0).unwrap();
        w.write_bits_lsb_first(8, 0xFF).unwrap();
        w.flush().unwrap();
        payload
    }

    #[test]
    fn literals_only() {
        let payload = assemble(
            DictSize::K1,
            &[
                Emit::Lit(b'H'),
                Emit::Lit(b'e'),
                Emit::Lit(b'l'),
                Emit::Lit(b'l'),
                Emit::Lit(b'o'),
            ],
        );
        assert_eq!(payload[0], 0);
        assert_eq!(payload[1], 4);
        assert_eq!(explode_to_vec(&payload).unwrap(), b"Hello");
    }

    #[test]
    fn match_copies_from_window() {
        let payload = assemble(
            DictSize::K1,
            &[
                Emit::Lit(b'A'),
                Emit::Lit(b'B'),
                Emit::Lit(b'C'),
                Emit::Match { length: 3, distance: 3 },
            ],
        );
        assert_eq!(explode_to_vec(&payload).unwrap(), b"ABCABC");
    }

    #[test]
    fn overlapping_match_repeats_last_byte() {
        let payload = assemble(
            DictSize::K1,
            &[Emit::Lit(0x58), Emit::Match { length: 9, distance: 1 }],
        );
        assert_eq!(explode_to_vec(&payload).unwrap(), vec![0x58u8; 10]);
    }

    #[test]
    fn empty_payload_is_header_plus_marker() {
        let payload = assemble(DictSize::K1, &[]);
        assert_eq!(payload.len(), 4); // 2 header bytes + 16 marker bits
        assert_eq!(explode_to_vec(&payload).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_nonzero_literal_mode() {
        let mut payload = assemble(DictSize::K1, &[]);
        payload[0] = 1;
        assert!(matches!(
            explode_to_vec(&payload),
            Err(LfgError::UnsupportedParameter(_))
        ));
    }

    #[test]
    fn rejects_bad_dictionary_exponent() {
        for bad in [0u8, 3, 7, 0xFF] {
            let mut payload = assemble(DictSize::K1, &[]);
            payload[1] = bad;
            assert!(matches!(
                explode_to_vec(&payload),
                Err(LfgError::UnsupportedParameter(_))
            ));
        }
    }

    #[test]
    fn truncated_stream_reports_unexpected_end() {
        let payload = assemble(
            DictSize::K1,
            &[Emit::Lit(1), Emit::Lit(2), Emit::Lit(3), Emit::Lit(4)],
        );
        // Drop the marker bytes and whatever padding followed.
        let truncated = &payload[..payload.len() - 2];
        assert!(matches!(
            explode_to_vec(truncated),
            Err(LfgError::UnexpectedEndOfInput)
        ));
    }

    #[test]
    fn expected_length_mismatch_is_advisory() {
        let payload = assemble(DictSize::K1, &[Emit::Lit(9)]);
        let mut out = Vec::new();
        let summary =
            explode(SliceFeed::new(&payload), &mut out, Some(5), None).unwrap();
        assert!(summary.length_mismatch);
        assert_eq!(summary.bytes_written, 1);
        assert_eq!(out, vec![9]);

        let mut out = Vec::new();
        let summary =
            explode(SliceFeed::new(&payload), &mut out, Some(1), None).unwrap();
        assert!(!summary.length_mismatch);
    }

    #[test]
    fn stats_count_emissions() {
        let payload = assemble(
            DictSize::K1,
            &[
                Emit::Lit(b'A'),
                Emit::Lit(b'B'),
                Emit::Lit(b'C'),
                Emit::Match { length: 3, distance: 3 },
            ],
        );
        let mut stats = CodecStats::new();
        let mut out = Vec::new();
        explode(SliceFeed::new(&payload), &mut out, None, Some(&mut stats)).unwrap();
        assert_eq!(stats.literal_count, 3);
        assert_eq!(stats.match_count, 1);
        assert_eq!(stats.offset_range(), Some((3, 3)));
        assert_eq!(stats.length_range(), Some((3, 3)));
    }

    #[test]
    fn window_survives_a_flush_boundary() {
        // Push past the 16 KiB flush point, then reference history.
        let mut emissions: Vec<Emit> = (0..WINDOW_BUF_SIZE + 10)
            .map(|i| Emit::Lit((i % 251) as u8))
            .collect();
        emissions.push(Emit::Match { length: 20, distance: 512 });
        let payload = assemble(DictSize::K4, &emissions);
        let out = explode_to_vec(&payload).unwrap();
        let n = WINDOW_BUF_SIZE + 10;
        assert_eq!(out.len(), n + 20);
        for j in 0..20 {
            assert_eq!(out[n + j], out[n + j - 512]);
        }
    }
}

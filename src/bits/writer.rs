//! LSB-first bit accumulation into a byte sink.

use std::io::{self, Write};

// ---------------------------------------------------------------------------
// Byte delivery
// ---------------------------------------------------------------------------

/// Destination for completed bytes from a [`BitWriter`].
///
/// The archive writer's implementation charges each byte against the current
/// volume's budget and rolls a fresh volume when the budget is gone, so a
/// bit stream can span volumes without the encoder noticing.
pub trait ByteSink {
    fn put_byte(&mut self, byte: u8) -> io::Result<()>;
}

impl ByteSink for Vec<u8> {
    fn put_byte(&mut self, byte: u8) -> io::Result<()> {
        self.push(byte);
        Ok(())
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn put_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).put_byte(byte)
    }
}

/// Sink that discards bytes and counts them.
///
/// Used by the exhaustive optimization level to size candidate encodings
/// without producing output.
#[derive(Default)]
pub struct CountSink {
    count: u64,
}

impl CountSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl ByteSink for CountSink {
    fn put_byte(&mut self, _byte: u8) -> io::Result<()> {
        self.count += 1;
        Ok(())
    }
}

/// Sink over any [`Write`] implementation.
pub struct WriteSink<W: Write> {
    inner: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(inner: W) -> Self {
        WriteSink { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteSink for WriteSink<W> {
    fn put_byte(&mut self, byte: u8) -> io::Result<()> {
        self.inner.write_all(&[byte])
    }
}

// ---------------------------------------------------------------------------
// Bit writer
// ---------------------------------------------------------------------------

/// Accumulates bits into bytes, bit 0 first, emitting each completed byte to
/// the sink.  Mirror of [`crate::bits::BitReader`].
pub struct BitWriter<S: ByteSink> {
    sink: S,
    current: u8,
    /// Position the next bit will occupy in `current`.
    bit_pos: u8,
    bytes_written: u64,
}

impl<S: ByteSink> BitWriter<S> {
    pub fn new(sink: S) -> Self {
        BitWriter {
            sink,
            current: 0,
            bit_pos: 0,
            bytes_written: 0,
        }
    }

    /// Bytes fully emitted so far; a pending partial byte is not counted.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, bit: u32) -> io::Result<()> {
        self.current |= ((bit & 1) as u8) << self.bit_pos;
        if self.bit_pos == 7 {
            self.sink.put_byte(self.current)?;
            self.current = 0;
            self.bytes_written += 1;
        }
        self.bit_pos = (self.bit_pos + 1) % 8;
        Ok(())
    }

    /// Writes the low `count` bits (≤ 8) of `bits`, LSB first.
    pub fn write_bits_lsb_first(&mut self, count: u32, bits: u32) -> io::Result<()> {
        debug_assert!(count <= 8);
        for i in 0..count {
            self.write_bit(bits >> i)?;
        }
        Ok(())
    }

    /// Writes the low `count` bits (≤ 8) of `bits`, MSB first.
    pub fn write_bits_msb_first(&mut self, count: u32, bits: u32) -> io::Result<()> {
        debug_assert!(count <= 8);
        for i in (0..count).rev() {
            self.write_bit(bits >> i)?;
        }
        Ok(())
    }

    /// Pads the pending partial byte with zero bits and emits it.
    pub fn flush(&mut self) -> io::Result<()> {
        while self.bit_pos != 0 {
            self.write_bit(0)?;
        }
        Ok(())
    }

    /// Consumes the writer, returning the sink.
    ///
    /// Callers are expected to [`flush`](Self::flush) first; a pending
    /// partial byte is otherwise lost.
    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

//! LSB-first bit extraction from a byte feed.

use std::io::{self, Read};

use crate::error::{LfgError, Result};

// ---------------------------------------------------------------------------
// Byte supply
// ---------------------------------------------------------------------------

/// Source of bytes for a [`BitReader`].
///
/// `next_byte` returns `Ok(None)` when the stream is definitively finished;
/// implementations that can continue into another volume must only return
/// `None` once the continuation has been tried and declined.
pub trait ByteFeed {
    fn next_byte(&mut self) -> io::Result<Option<u8>>;
}

impl<F: ByteFeed + ?Sized> ByteFeed for &mut F {
    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).next_byte()
    }
}

/// Feed over an in-memory byte slice.
pub struct SliceFeed<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceFeed<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceFeed { data, pos: 0 }
    }
}

impl ByteFeed for SliceFeed<'_> {
    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        match self.data.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                Ok(Some(b))
            }
            None => Ok(None),
        }
    }
}

/// Feed over any [`Read`] implementation.
///
/// Wrap files in a `BufReader` before handing them here; the feed itself
/// reads one byte at a time.
pub struct IoFeed<R: Read> {
    inner: R,
}

impl<R: Read> IoFeed<R> {
    pub fn new(inner: R) -> Self {
        IoFeed { inner }
    }
}

impl<R: Read> ByteFeed for IoFeed<R> {
    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Bit reader
// ---------------------------------------------------------------------------

/// Pulls bits out of a [`ByteFeed`], bit 0 of each byte first.
pub struct BitReader<F: ByteFeed> {
    feed: F,
    current: u8,
    /// Bit position in `current` that the next bit comes from; 0 means a
    /// fresh byte must be fetched first.
    bit_pos: u8,
}

impl<F: ByteFeed> BitReader<F> {
    pub fn new(feed: F) -> Self {
        BitReader {
            feed,
            current: 0,
            bit_pos: 0,
        }
    }

    /// Reads a whole byte from the underlying feed.
    ///
    /// Only meaningful while bit extraction is byte-aligned (before the
    /// first `read_bit` or after a multiple of 8 bits); used for the
    /// byte-oriented payload header.
    pub fn read_aligned_byte(&mut self) -> Result<u8> {
        debug_assert_eq!(self.bit_pos, 0, "aligned read inside a byte");
        match self.feed.next_byte().map_err(LfgError::Io)? {
            Some(b) => Ok(b),
            None => Err(LfgError::UnexpectedEndOfInput),
        }
    }

    /// Reads one bit.
    pub fn read_bit(&mut self) -> Result<u32> {
        if self.bit_pos == 0 {
            self.current = match self.feed.next_byte().map_err(LfgError::Io)? {
                Some(b) => b,
                None => return Err(LfgError::UnexpectedEndOfInput),
            };
        }
        let value = (self.current >> self.bit_pos) & 1;
        self.bit_pos = (self.bit_pos + 1) % 8;
        Ok(u32::from(value))
    }

    /// Reads `count` bits (≤ 8) and assembles them LSB-first: the first bit
    /// read lands at position 0 of the result.
    pub fn read_bits_lsb_first(&mut self, count: u32) -> Result<u32> {
        debug_assert!(count <= 8);
        let mut value = 0;
        for i in 0..count {
            value |= self.read_bit()? << i;
        }
        Ok(value)
    }

    /// Reads `count` bits (≤ 8) and assembles them MSB-first: the first bit
    /// read lands at position `count - 1` of the result.
    pub fn read_bits_msb_first(&mut self, count: u32) -> Result<u32> {
        debug_assert!(count <= 8);
        let mut value = 0;
        for _ in 0..count {
            value = (value << 1) | self.read_bit()?;
        }
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

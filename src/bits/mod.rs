//! Bit-level I/O over byte streams.
//!
//! The compressed payload is a stream of bits pulled from (or pushed into)
//! bytes starting at bit 0, the least significant bit.  Two assembly orders
//! exist side by side in the format: prefix codes are assembled MSB-first
//! (shift-left-and-or), numeric suffixes LSB-first (natural little-endian).
//! [`BitReader`] and [`BitWriter`] expose both.
//!
//! Byte supply and delivery go through the [`ByteFeed`] and [`ByteSink`]
//! traits.  The archive layer implements them with volume awareness: a feed
//! that reaches the end of a volume opens the next one and keeps going, and a
//! sink whose byte budget runs out rolls a new volume before accepting the
//! byte.  That keeps volume hops byte-aligned and entirely outside the codec.

pub mod reader;
pub mod writer;

pub use reader::{BitReader, ByteFeed, IoFeed, SliceFeed};
pub use writer::{BitWriter, ByteSink, CountSink, WriteSink};

//! On-disk layout of the LFG container.
//!
//! Every volume file starts with an 8-byte volume header (`LFG!` plus the
//! little-endian body length).  The first volume continues with a 20-byte
//! archive header.  File records are 32 bytes of header followed by the
//! compressed payload; the stored length field spans the whole record, so
//! the next `FILE` tag sits exactly that many bytes after the record start.
//! All integers are little-endian; there is no padding or alignment.

use std::io::{self, Read, Write};

use crate::archive::volume::{decode_name_field, encode_name_field};
use crate::error::{LfgError, Result};

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

/// Tag opening every volume file.
pub const VOLUME_TAG: [u8; 4] = *b"LFG!";

/// Tag opening every file record.
pub const FILE_TAG: [u8; 4] = *b"FILE";

/// Volume header: tag + body length.
pub const VOLUME_HEADER_LEN: u64 = 8;

/// Archive header carried by the first volume only.
pub const ARCHIVE_HEADER_LEN: u64 = 20;

/// File record header, stored length field included.
pub const FILE_HEADER_LEN: u64 = 32;

/// NUL-padded name fields in both header kinds.
pub const NAME_FIELD_LEN: usize = 13;

/// Fixed trailer of every file record header.  Written verbatim; decoded
/// with a warning when it differs.
pub const FILE_HEADER_FILLER: [u8; 6] = [2, 0, 1, 0, 0, 0];

/// Byte offset of the body-length field inside a volume file.
pub const BODY_LEN_OFFSET: u64 = 4;

/// Byte offset of the volume-count field inside the first volume.
pub const VOLUME_COUNT_OFFSET: u64 = 22;

/// Byte offset of the total-uncompressed field inside the first volume.
pub const TOTAL_UNPACKED_OFFSET: u64 = 24;

// ---------------------------------------------------------------------------
// Parsed headers
// ---------------------------------------------------------------------------

/// The archive-wide header of volume 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Archive name as recorded (13-byte field, NUL-trimmed).
    pub name: String,
    /// Number of volume files making up the archive.
    pub volume_count: u8,
    /// Total uncompressed bytes across all file records.
    pub total_unpacked: u32,
}

/// One file record header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Distance from the record's first byte to the next record (or the end
    /// of the archive); includes these 32 header bytes.
    pub stored_len: u32,
    /// Stored filename, NUL-trimmed.
    pub name: String,
    /// Uncompressed length of the file.
    pub unpacked_len: u32,
    /// Whether the fixed filler bytes held their expected values.
    pub filler_ok: bool,
}

impl FileHeader {
    /// Compressed payload length (stored length minus the header bytes).
    pub fn payload_len(&self) -> u64 {
        u64::from(self.stored_len).saturating_sub(FILE_HEADER_LEN)
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads and validates a volume header, returning the body length.
pub fn read_volume_header<R: Read>(r: &mut R, path: &str) -> Result<u32> {
    let mut tag = [0u8; 4];
    r.read_exact(&mut tag)
        .map_err(|_| LfgError::NotAnArchive(format!("{path}: 'LFG!' tag not found")))?;
    if tag != VOLUME_TAG {
        return Err(LfgError::NotAnArchive(format!(
            "{path}: 'LFG!' tag not found"
        )));
    }
    read_u32_le(r).map_err(|_| LfgError::NotAnArchive(format!("{path}: truncated volume header")))
}

/// Reads and validates the archive header that follows the volume header of
/// volume 1.
pub fn read_archive_header<R: Read>(r: &mut R, path: &str) -> Result<ArchiveHeader> {
    let bad = || LfgError::NotAnArchive(format!("{path}: not a valid initial volume"));

    let mut name_field = [0u8; NAME_FIELD_LEN];
    r.read_exact(&mut name_field).map_err(|_| bad())?;
    if read_u8(r).map_err(|_| bad())? != 0 {
        return Err(bad());
    }
    let volume_count = read_u8(r).map_err(|_| bad())?;
    if read_u8(r).map_err(|_| bad())? != 0 {
        return Err(bad());
    }
    let total_unpacked = read_u32_le(r).map_err(|_| bad())?;

    Ok(ArchiveHeader {
        name: decode_name_field(&name_field),
        volume_count,
        total_unpacked,
    })
}

/// Reads the remainder of a file record header, the 4-byte `FILE` tag having
/// already been consumed by the caller.
pub fn read_file_header<R: Read>(r: &mut R, path: &str) -> Result<FileHeader> {
    let truncated =
        || LfgError::NotAnArchive(format!("{path}: truncated file record header"));

    let stored_len = read_u32_le(r).map_err(|_| truncated())?;
    let mut name_field = [0u8; NAME_FIELD_LEN];
    r.read_exact(&mut name_field).map_err(|_| truncated())?;
    let pad = read_u8(r).map_err(|_| truncated())?;
    let unpacked_len = read_u32_le(r).map_err(|_| truncated())?;
    let mut filler = [0u8; 6];
    r.read_exact(&mut filler).map_err(|_| truncated())?;

    Ok(FileHeader {
        stored_len,
        name: decode_name_field(&name_field),
        unpacked_len,
        filler_ok: pad == 0 && filler == FILE_HEADER_FILLER,
    })
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Writes a volume header.  `body_len` is usually 0 at creation time and
/// patched once the volume is complete.
pub fn write_volume_header<W: Write>(w: &mut W, body_len: u32) -> io::Result<()> {
    w.write_all(&VOLUME_TAG)?;
    w.write_all(&body_len.to_le_bytes())
}

/// Writes the archive header of volume 1; count and total start as
/// placeholders and are patched at completion.
pub fn write_archive_header<W: Write>(
    w: &mut W,
    name: &str,
    volume_count: u8,
    total_unpacked: u32,
) -> io::Result<()> {
    w.write_all(&encode_name_field(name))?;
    w.write_all(&[0, volume_count, 0])?;
    w.write_all(&total_unpacked.to_le_bytes())
}

/// Writes a file record header with a placeholder stored length.
pub fn write_file_header<W: Write>(w: &mut W, name: &str, unpacked_len: u32) -> io::Result<()> {
    w.write_all(&FILE_TAG)?;
    w.write_all(&0u32.to_le_bytes())?;
    w.write_all(&encode_name_field(name))?;
    w.write_all(&[0])?;
    w.write_all(&unpacked_len.to_le_bytes())?;
    w.write_all(&FILE_HEADER_FILLER)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn volume_header_roundtrip() {
        let mut buf = Vec::new();
        write_volume_header(&mut buf, 0xDEAD_BEEF).unwrap();
        assert_eq!(buf.len() as u64, VOLUME_HEADER_LEN);
        assert_eq!(&buf[..4], b"LFG!");
        let body = read_volume_header(&mut Cursor::new(&buf), "t.xxx").unwrap();
        assert_eq!(body, 0xDEAD_BEEF);
    }

    #[test]
    fn bad_volume_tag_is_not_an_archive() {
        let buf = b"LGF!\x00\x00\x00\x00";
        let err = read_volume_header(&mut Cursor::new(&buf[..]), "t.xxx").unwrap_err();
        assert!(matches!(err, LfgError::NotAnArchive(_)));
    }

    #[test]
    fn archive_header_roundtrip() {
        let mut buf = Vec::new();
        write_archive_header(&mut buf, "GAME___A.XXX", 3, 123_456).unwrap();
        assert_eq!(buf.len() as u64, ARCHIVE_HEADER_LEN);
        let hdr = read_archive_header(&mut Cursor::new(&buf), "t.xxx").unwrap();
        assert_eq!(hdr.name, "GAME___A.XXX");
        assert_eq!(hdr.volume_count, 3);
        assert_eq!(hdr.total_unpacked, 123_456);
    }

    #[test]
    fn archive_header_rejects_nonzero_pads() {
        let mut buf = Vec::new();
        write_archive_header(&mut buf, "A.XXX", 1, 10).unwrap();
        for pos in [13usize, 15] {
            let mut bad = buf.clone();
            bad[pos] = 7;
            let err = read_archive_header(&mut Cursor::new(&bad), "t.xxx").unwrap_err();
            assert!(matches!(err, LfgError::NotAnArchive(_)));
        }
    }

    #[test]
    fn file_header_roundtrip() {
        let mut buf = Vec::new();
        write_file_header(&mut buf, "ROOM.BIN", 9000).unwrap();
        assert_eq!(buf.len() as u64, FILE_HEADER_LEN);
        assert_eq!(&buf[..4], b"FILE");

        let mut cursor = Cursor::new(&buf[4..]);
        let hdr = read_file_header(&mut cursor, "t.xxx").unwrap();
        assert_eq!(hdr.stored_len, 0); // placeholder until patched
        assert_eq!(hdr.name, "ROOM.BIN");
        assert_eq!(hdr.unpacked_len, 9000);
        assert!(hdr.filler_ok);
    }

    #[test]
    fn unexpected_filler_is_flagged_not_fatal() {
        let mut buf = Vec::new();
        write_file_header(&mut buf, "X", 1).unwrap();
        buf[26] = 0xEE; // first filler byte
        let hdr = read_file_header(&mut Cursor::new(&buf[4..]), "t.xxx").unwrap();
        assert!(!hdr.filler_ok);
        assert_eq!(hdr.name, "X");
    }

    #[test]
    fn payload_len_subtracts_the_header() {
        let hdr = FileHeader {
            stored_len: 100,
            name: "A".into(),
            unpacked_len: 0,
            filler_ok: true,
        };
        assert_eq!(hdr.payload_len(), 68);
    }
}

//! Volume naming conventions.
//!
//! Multi-volume archives follow the installer disk convention
//! `NAME___A.XXX`, `NAME___B.XXX`, …: the next volume's path is the current
//! one with the character before the 4-character extension suffix
//! incremented.  Name fields inside headers are 13 bytes, NUL-padded, with
//! any directory component stripped.

use std::path::{Path, PathBuf};

use crate::archive::format::NAME_FIELD_LEN;

// ---------------------------------------------------------------------------
// 13-byte name fields
// ---------------------------------------------------------------------------

/// Encodes a name into the fixed 13-byte header field: bytes beyond the
/// field are dropped, shorter names are NUL-padded.
pub fn encode_name_field(name: &str) -> [u8; NAME_FIELD_LEN] {
    let mut field = [0u8; NAME_FIELD_LEN];
    for (dst, src) in field.iter_mut().zip(name.bytes()) {
        *dst = src;
    }
    field
}

/// Decodes a 13-byte header field: everything before the first NUL, with
/// non-ASCII bytes replaced.  The final byte is ignored, so a full field is
/// still terminated.
pub fn decode_name_field(field: &[u8; NAME_FIELD_LEN]) -> String {
    let end = field[..NAME_FIELD_LEN - 1]
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(NAME_FIELD_LEN - 1);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Strips everything up to the last `/` or `\` of a path string; what the
/// header name fields record.
pub fn strip_directory(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Path of the volume following `current`: the fifth character from the end
/// (the letter just before a `.XXX`-style extension) incremented by one.
///
/// Returns `None` when the path is too short for the convention or is not
/// valid UTF-8; the caller then falls back to its explicit archive list.
pub fn next_volume_path(current: &Path) -> Option<PathBuf> {
    let s = current.to_str()?;
    if s.len() < 5 {
        return None;
    }
    let mut bytes = s.as_bytes().to_vec();
    let idx = bytes.len() - 5;
    if !bytes[idx].is_ascii() {
        return None;
    }
    bytes[idx] = bytes[idx].checked_add(1)?;
    Some(PathBuf::from(String::from_utf8(bytes).ok()?))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

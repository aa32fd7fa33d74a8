//! Crate-wide error type.
//!
//! Every failure the codec or container layer can hit is a variant of
//! [`LfgError`].  Conditions the format treats as advisory (length mismatch,
//! unexpected filler bytes, zero disk count, volume-length disagreement) are
//! *not* errors; they are reported through the display layer and processing
//! continues.

use std::fmt;
use std::io;

/// Fatal error conditions for a file or archive operation.
#[derive(Debug)]
pub enum LfgError {
    /// The bit reader ran out of bytes and no continuation volume was
    /// available (or the continuation declined).
    UnexpectedEndOfInput,
    /// Missing `LFG!` or `FILE` tag where the container requires one.
    NotAnArchive(String),
    /// Literal mode other than 0, or dictionary exponent outside 4..=6.
    UnsupportedParameter(String),
    /// The decoder read a bit pattern matching no row of the length table.
    CorruptLengthCode,
    /// The decoder read a bit pattern matching no row of the offset table.
    CorruptOffsetCode,
    /// A path or stored filename exceeds the internal 255-byte limit.
    FilenameTooLong(String),
    /// Extraction target already exists and overwrite was not requested.
    OutputExists(String),
    /// A per-volume byte budget too small to hold the mandatory headers.
    DiskSizeTooSmall(u32),
    /// Underlying read/write/open/seek failure.
    Io(io::Error),
}

impl fmt::Display for LfgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LfgError::UnexpectedEndOfInput => {
                write!(f, "unexpected end of input in compressed stream")
            }
            LfgError::NotAnArchive(what) => {
                write!(f, "not an LFG archive: {what}")
            }
            LfgError::UnsupportedParameter(what) => {
                write!(f, "unsupported parameter: {what}")
            }
            LfgError::CorruptLengthCode => {
                write!(f, "corrupt stream: no matching length code")
            }
            LfgError::CorruptOffsetCode => {
                write!(f, "corrupt stream: no matching offset code")
            }
            LfgError::FilenameTooLong(name) => {
                write!(f, "filename too long: {name}")
            }
            LfgError::OutputExists(path) => {
                write!(f, "output file already exists: {path}")
            }
            LfgError::DiskSizeTooSmall(size) => {
                write!(f, "disk size {size} cannot hold the archive headers")
            }
            LfgError::Io(e) => write!(f, "i/o error: {e}"),
        }
    }
}

impl std::error::Error for LfgError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LfgError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LfgError {
    fn from(e: io::Error) -> Self {
        LfgError::Io(e)
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, LfgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_condition() {
        let cases: Vec<(LfgError, &str)> = vec![
            (LfgError::UnexpectedEndOfInput, "unexpected end"),
            (LfgError::NotAnArchive("no LFG! tag".into()), "LFG"),
            (LfgError::CorruptLengthCode, "length code"),
            (LfgError::CorruptOffsetCode, "offset code"),
            (LfgError::OutputExists("a.bin".into()), "a.bin"),
        ];
        for (err, needle) in cases {
            assert!(
                err.to_string().contains(needle),
                "{err} should mention {needle}"
            );
        }
    }

    #[test]
    fn io_errors_convert_and_chain() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: LfgError = io_err.into();
        assert!(matches!(err, LfgError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}

//! Notification-level output machinery.
//!
//! A crate-level atomic holds the current display level; the macros gate
//! stderr notifications on it.  Result tables go to stdout, diagnostics and
//! warnings to stderr, so piped output stays clean.
//!
//! Levels: 0 = silent, 1 = errors only, 2 = results and warnings (default),
//! 3 = per-volume and progress detail.

use std::sync::atomic::{AtomicU32, Ordering};

/// Global notification level.
pub static DISPLAY_LEVEL: AtomicU32 = AtomicU32::new(2);

/// Returns the current display level.
#[inline]
pub fn display_level() -> u32 {
    DISPLAY_LEVEL.load(Ordering::Relaxed)
}

/// Sets the display level.
#[inline]
pub fn set_display_level(level: u32) {
    DISPLAY_LEVEL.store(level, Ordering::Relaxed);
}

/// Print to stderr unconditionally.
#[macro_export]
macro_rules! display {
    ($($arg:tt)*) => {
        eprint!($($arg)*)
    };
}

/// Print to stderr when the display level is at least `$level`.
#[macro_export]
macro_rules! displaylevel {
    ($level:expr, $($arg:tt)*) => {
        if $crate::cli::display::display_level() >= $level {
            eprintln!($($arg)*);
        }
    };
}

/// Print a result line to stdout when the display level is at least `$level`.
#[macro_export]
macro_rules! displayout {
    ($level:expr, $($arg:tt)*) => {
        if $crate::cli::display::display_level() >= $level {
            println!($($arg)*);
        }
    };
}

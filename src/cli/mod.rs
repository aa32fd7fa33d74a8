//! Shared plumbing for the `lfgextract` and `lfgpack` binaries.

pub mod display;
pub mod file_list;

pub use display::{display_level, set_display_level};
pub use file_list::read_list_file;

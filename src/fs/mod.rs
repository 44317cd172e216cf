//! Filesystem helpers for unlatch.
//!
//! Path normalisation for the handle tool, and the sibling temp-file and move
//! primitives the alternative unlock strategies are built from.

mod move_file;
mod path;
mod temp;

pub use move_file::move_file;
pub use path::{file_name_only, normalize_path};
pub use temp::{remove_if_exists, sibling_temp_path, write_and_sync};

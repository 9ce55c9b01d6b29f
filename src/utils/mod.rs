//! Shared utilities.

pub mod path;

pub use path::{normalize_path, slash_path};

//! Output formatters for catalog results.
//!
//! - [`json`]: machine-readable output for scripting
//! - [`text`]: human-readable output for terminals

pub mod json;
pub mod text;

pub use json::{write_json, JsonOutputError, JsonScanOutput};

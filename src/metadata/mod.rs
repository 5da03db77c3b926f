//! Title, poster and descriptive metadata for catalog entries.
//!
//! - [`sidecar`]: parsing of `kavita.yaml`, `series.yaml` and `series.json`
//! - [`resolver`]: the ordered poster/title fallback chain

pub mod resolver;
pub mod sidecar;

use std::path::PathBuf;

use crate::scanner::ScanError;

pub use resolver::{default_title, MetadataResolver, ResolvedMetadata};
pub use sidecar::{Sidecar, SIDECAR_NAMES};

/// Errors raised while resolving metadata.
///
/// Sidecar errors are never fatal to a scan: the resolver logs them and
/// continues with the heuristic chain.
#[derive(thiserror::Error, Debug)]
pub enum MetadataError {
    /// The sidecar could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Sidecar path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The sidecar is not valid YAML/JSON.
    #[error("Malformed sidecar {path}: {message}")]
    Parse {
        /// Sidecar path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The directory itself could not be listed.
    #[error(transparent)]
    Listing(#[from] ScanError),
}

//! Scanner module for directory traversal and entry discovery.
//!
//! This module provides functionality for:
//! - Unicode-tolerant path resolution on network shares
//! - Sorted single-directory listings and name-based exclusion
//! - Series/grouping classification of library folders
//! - A bounded worker pool with a serialized cache writer
//!
//! # Architecture
//!
//! - [`path_utils`]: NFC normalization, logical path resolution, hashing keys
//! - [`kind`]: image / archive classification by extension
//! - [`listing`]: sorted directory listings
//! - [`filter`]: excluded and hidden names
//! - [`walker`]: the [`DirectoryScanner`]
//! - [`pool`]: the [`ScanPool`] that drives scans concurrently
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use nascatalog::cache::CacheStore;
//! use nascatalog::scanner::{DirectoryScanner, ScanPool, ScannerConfig};
//! use std::path::Path;
//!
//! let store = Arc::new(CacheStore::open(Path::new("/tmp/catalog.db")).unwrap());
//! let scanner = DirectoryScanner::new(Path::new("/volume1/comics"), ScannerConfig::default());
//! let pool = ScanPool::new(8).unwrap();
//! let report = scanner.scan(&pool, store, "", None).unwrap();
//! println!("{} directories, {} failed", report.succeeded, report.failed);
//! ```

pub mod filter;
pub mod kind;
pub mod listing;
pub mod path_utils;
pub mod pool;
pub mod walker;

use std::path::PathBuf;

use crate::cache::CacheError;

pub use filter::{NameFilter, DEFAULT_EXCLUDED_NAMES};
pub use kind::{ArchiveFormat, MediaKind};
pub use listing::{read_dir_sorted, DirItem};
pub use pool::{ScanFailure, ScanPool, ScanProgress, ScanSnapshot, MAX_WORKERS};
pub use walker::{DirectoryScanner, ScanReport, ScannerConfig};

/// One unit of scan work: a directory to list, resolve and classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTask {
    /// Real on-disk path of the directory.
    pub abs_path: PathBuf,
    /// Path relative to the catalog root.
    pub rel_path: String,
    /// Segments from the catalog root.
    pub depth: u32,
}

impl ScanTask {
    /// Create a task for a directory.
    #[must_use]
    pub fn new(abs_path: PathBuf, rel_path: impl Into<String>) -> Self {
        let rel_path = rel_path.into();
        Self {
            depth: path_utils::depth_of(&rel_path),
            abs_path,
            rel_path,
        }
    }

    /// Task for a child directory of this one.
    #[must_use]
    pub fn child(&self, item: &DirItem) -> Self {
        Self {
            abs_path: item.path.clone(),
            rel_path: path_utils::join_relative(&self.rel_path, &item.name),
            depth: self.depth + 1,
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a directory.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A worker panicked while processing a directory.
    #[error("Worker panicked while scanning {0}")]
    WorkerPanicked(PathBuf),

    /// The worker pool could not be created.
    #[error("Failed to start scan workers: {0}")]
    Pool(String),

    /// The cache rejected a write.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

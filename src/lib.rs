//! NasCatalog - scan-and-cache engine for comic and webtoon libraries
//!
//! Walks a library on network storage with a bounded worker pool, resolves
//! titles, posters and sidecar metadata per series, and keeps the results in
//! a SQLite cache so listings never re-walk the share.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use nascatalog::cache::CacheStore;
//! use nascatalog::catalog::{Catalog, CatalogSettings};
//!
//! let store = Arc::new(CacheStore::open(Path::new("catalog.db")).unwrap());
//! let catalog = Catalog::new(Path::new("/volume1/comics"), store, CatalogSettings::default()).unwrap();
//! catalog.trigger_scan("", None).unwrap();
//! for item in catalog.list_children("Manga", 1, None).unwrap().items {
//!     println!("{}", item.path);
//! }
//! ```

pub mod app;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod thumbnail;

pub use app::run_app;

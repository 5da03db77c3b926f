//! Persistent entry cache.
//!
//! The cache stores one row per filesystem node the scanner has resolved,
//! so listings and metadata lookups never re-walk the network share.
//!
//! # Architecture
//!
//! * [`database`]: SQLite persistence, schema management and queries.
//! * [`entry`]: the [`Entry`] row model and the [`PosterRef`] tagged union.
//! * [`writer`]: the single serialized writer thread used during scans.
//!
//! # Freshness
//!
//! Rows never expire. Modification times on network mounts are not
//! reliable enough for TTL invalidation, so a row stays valid until an
//! explicit re-scan overwrites it (upserts are keyed by path hash and
//! therefore idempotent).

pub mod database;
pub mod entry;
pub mod writer;

pub use database::{CacheError, CacheResult, CacheStore, Page, MAX_PAGE_SIZE};
pub use entry::{Entry, EntryMetadata, PathHash, PosterRef};
pub use writer::{CacheWriter, WriterStats};

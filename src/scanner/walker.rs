//! Directory scanner: series classification and cache population.
//!
//! # Overview
//!
//! [`DirectoryScanner`] turns a subtree of the library into cache rows.
//! Every directory it visits is listed once, filtered, resolved with the
//! [`MetadataResolver`] and handed to the cache writer before any of its
//! children are scheduled.
//!
//! Directories are either:
//!
//! - **series-level**: at or below the configured series depth, or
//!   directly containing an archive. Archive children and subdirectories
//!   become chapter rows and the scan stops descending there.
//! - **grouping**: anything shallower. Each subdirectory becomes its own
//!   scan task on the [`ScanPool`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use super::filter::{NameFilter, DEFAULT_EXCLUDED_NAMES};
use super::listing::{read_dir_sorted, DirItem};
use super::path_utils::{file_name_nfc, fold_name, join_relative, relative_path, resolve_path};
use super::pool::{ScanFailure, ScanPool, ScanProgress};
use super::{ScanError, ScanTask};
use crate::cache::{CacheStore, CacheWriter, Entry};
use crate::metadata::resolver::DEFAULT_POSTER_SEARCH_DEPTH;
use crate::metadata::{MetadataResolver, ResolvedMetadata};
use crate::progress::ProgressCallback;

/// Default depth at which directories are treated as series.
pub const DEFAULT_SERIES_DEPTH: u32 = 2;

/// Scanner settings.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Depth at which a directory is a series regardless of contents.
    pub series_depth: u32,
    /// Levels the poster search may descend.
    pub poster_search_depth: usize,
    /// Names skipped everywhere.
    pub excluded_names: Vec<String>,
    /// Skip names starting with a dot.
    pub skip_hidden: bool,
    /// If non-empty, only these first-level folders are scanned from the root.
    pub root_categories: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            series_depth: DEFAULT_SERIES_DEPTH,
            poster_search_depth: DEFAULT_POSTER_SEARCH_DEPTH,
            excluded_names: DEFAULT_EXCLUDED_NAMES.iter().map(|s| (*s).to_string()).collect(),
            skip_hidden: true,
            root_categories: Vec::new(),
        }
    }
}

/// Summary of a finished scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Relative path the scan started from.
    pub root: String,
    /// Directories queued.
    pub submitted: usize,
    /// Directories finished.
    pub processed: usize,
    /// Directories scanned without error.
    pub succeeded: usize,
    /// Directories that failed.
    pub failed: usize,
    /// Directories skipped after a shutdown request.
    pub skipped: usize,
    /// Cache rows written.
    pub entries_written: usize,
    /// Most recent failures.
    pub failures: Vec<ScanFailure>,
    /// Wall-clock duration.
    pub duration_ms: u64,
    /// The scan was cut short by a shutdown request.
    pub interrupted: bool,
}

impl ScanReport {
    /// Whether any directory failed or was skipped.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.failed > 0 || self.skipped > 0
    }
}

/// Walks a library subtree and writes every node into the cache.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    root: PathBuf,
    config: ScannerConfig,
    filter: NameFilter,
    resolver: MetadataResolver,
    categories: Vec<String>,
}

impl DirectoryScanner {
    /// Create a scanner for the library rooted at `root`.
    #[must_use]
    pub fn new(root: &Path, config: ScannerConfig) -> Self {
        let filter = NameFilter::new(&config.excluded_names, config.skip_hidden);
        let resolver = MetadataResolver::new(config.poster_search_depth, filter.clone());
        let categories = config.root_categories.iter().map(|c| fold_name(c)).collect();
        Self {
            root: root.to_path_buf(),
            config,
            filter,
            resolver,
            categories,
        }
    }

    /// Library root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scanner settings.
    #[must_use]
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Resolver configured with this scanner's filter.
    #[must_use]
    pub fn resolver(&self) -> &MetadataResolver {
        &self.resolver
    }

    /// Scan the subtree at logical path `start` and wait for all writes.
    ///
    /// Failures inside the subtree are recorded in the report; only a start
    /// path that does not exist or is not a directory is an error.
    pub fn scan(
        &self,
        pool: &ScanPool,
        store: Arc<CacheStore>,
        start: &str,
        callback: Option<&dyn ProgressCallback>,
    ) -> Result<ScanReport, ScanError> {
        let abs = resolve_path(&self.root, start);
        if !abs.exists() {
            return Err(ScanError::NotFound(abs));
        }
        if !abs.is_dir() {
            return Err(ScanError::NotADirectory(abs));
        }
        let rel = relative_path(&self.root, &abs);

        log::info!("Scanning '{}' ({})", rel, abs.display());
        if let Some(cb) = callback {
            cb.on_scan_start(&rel);
        }

        let started = Instant::now();
        let writer = CacheWriter::spawn(store)?;
        let progress = ScanProgress::new();
        let work = |task: &ScanTask| self.scan_directory(task, &writer);
        pool.run(vec![ScanTask::new(abs, rel.clone())], &work, &progress, callback);
        let stats = writer.finish()?;

        let snapshot = progress.snapshot();
        if let Some(cb) = callback {
            cb.on_scan_end(&snapshot);
        }

        let report = ScanReport {
            root: rel,
            submitted: snapshot.submitted,
            processed: snapshot.processed,
            succeeded: snapshot.succeeded,
            failed: snapshot.failed,
            skipped: snapshot.skipped,
            entries_written: stats.rows_written,
            failures: progress.failures(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            interrupted: pool.is_shutdown_requested(),
        };
        log::info!(
            "Scan of '{}' finished: {} directories, {} rows, {} failed in {} ms",
            report.root,
            report.processed,
            report.entries_written,
            report.failed,
            report.duration_ms
        );
        Ok(report)
    }

    /// Process one directory: upsert it (and its chapters when it is a
    /// series) and return the subdirectories still to scan.
    pub fn scan_directory(&self, task: &ScanTask, writer: &CacheWriter) -> Result<Vec<ScanTask>, ScanError> {
        let listing = match read_dir_sorted(&task.abs_path) {
            Ok(listing) => self.filter.apply(listing),
            Err(e) => {
                // Keep the node visible to its parent with a fallback title.
                let fallback = ResolvedMetadata::untitled(&file_name_nfc(&task.abs_path));
                writer.submit(vec![make_entry(&task.abs_path, &task.rel_path, true, task.depth, fallback)])?;
                return Err(e);
            }
        };
        let listing = if task.depth == 0 {
            self.restrict_to_categories(listing)
        } else {
            listing
        };

        let resolved = self
            .resolver
            .resolve_listing(&task.abs_path, &task.rel_path, &listing);
        let mut node = make_entry(&task.abs_path, &task.rel_path, true, task.depth, resolved);

        if !self.is_series_level(task.depth, &listing) {
            writer.submit(vec![node])?;
            return Ok(listing
                .iter()
                .filter(|item| item.is_dir)
                .map(|item| task.child(item))
                .collect());
        }

        log::debug!("Series '{}' ({} entries)", task.rel_path, listing.len());
        node.is_series = true;
        let mut batch = Vec::with_capacity(listing.len() + 1);
        batch.push(node);
        batch.extend(
            listing
                .iter()
                .filter_map(|item| self.chapter_entry(task, item)),
        );
        writer.submit(batch)?;
        Ok(Vec::new())
    }

    /// Whether a directory at `depth` with `listing` is a series.
    #[must_use]
    pub fn is_series_level(&self, depth: u32, listing: &[DirItem]) -> bool {
        depth >= self.config.series_depth || listing.iter().any(DirItem::is_archive)
    }

    fn chapter_entry(&self, parent: &ScanTask, item: &DirItem) -> Option<Entry> {
        let rel = join_relative(&parent.rel_path, &item.name);
        let depth = parent.depth + 1;

        if item.is_archive() {
            let resolved = MetadataResolver::resolve_file(&item.path, &rel);
            return Some(make_entry(&item.path, &rel, false, depth, resolved));
        }
        if !item.is_dir {
            return None;
        }

        let resolved = self.resolver.resolve(&item.path, &rel).unwrap_or_else(|e| {
            log::warn!("Chapter '{}' unreadable: {}", rel, e);
            ResolvedMetadata::untitled(&item.name)
        });
        Some(make_entry(&item.path, &rel, true, depth, resolved))
    }

    fn restrict_to_categories(&self, listing: Vec<DirItem>) -> Vec<DirItem> {
        if self.categories.is_empty() {
            return listing;
        }
        listing
            .into_iter()
            .filter(|item| item.is_dir && self.categories.contains(&item.folded_name()))
            .collect()
    }
}

/// Build a cache row from a resolution.
fn make_entry(abs: &Path, rel: &str, is_dir: bool, depth: u32, resolved: ResolvedMetadata) -> Entry {
    let mut entry = Entry::new(abs, rel, is_dir, depth);
    entry.title = resolved.title;
    entry.poster = resolved.poster;
    entry.metadata = resolved.metadata;
    entry
}

//! The catalog service: listings, metadata, thumbnails and scans over one
//! library root.
//!
//! [`Catalog`] owns the cache store, the directory scanner, the scan pool
//! and the thumbnail extractor. Listings are answered from the cache; a
//! listing of a directory with no cached children scans that directory
//! synchronously and queries again.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::{CacheError, CacheStore, Entry, EntryMetadata, Page, PathHash, PosterRef, MAX_PAGE_SIZE};
use crate::metadata::MetadataError;
use crate::progress::ProgressCallback;
use crate::scanner::path_utils::{logical_segments, relative_path, resolve_path};
use crate::scanner::pool::DEFAULT_WORKERS;
use crate::scanner::{DirectoryScanner, ScanError, ScanPool, ScanReport, ScannerConfig};
use crate::thumbnail::{Thumbnail, ThumbnailError, ThumbnailExtractor};

/// Page size used when the caller does not pass one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Errors returned by catalog operations.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    /// The logical path tries to leave the library root.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Nothing exists at the logical path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Cache failure.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Scan failure.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Metadata failure.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Thumbnail failure.
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),
}

/// Catalog settings.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    /// Scanner settings.
    pub scanner: ScannerConfig,
    /// Scan worker threads.
    pub workers: usize,
    /// Thumbnail disk cache, if any.
    pub thumb_cache_dir: Option<PathBuf>,
    /// Page size used when none is requested.
    pub default_page_size: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            scanner: ScannerConfig::default(),
            workers: DEFAULT_WORKERS,
            thumb_cache_dir: None,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Title and poster summary attached to a listed item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    /// Display title.
    pub title: String,
    /// Encoded poster reference.
    pub poster: Option<PosterRef>,
    /// Descriptive fields.
    #[serde(flatten)]
    pub details: EntryMetadata,
}

/// One item of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    /// Raw file or folder name.
    pub name: String,
    /// Folder (as opposed to an archive file).
    pub is_directory: bool,
    /// Logical path relative to the library root.
    pub path: String,
    /// Resolved metadata.
    pub metadata: Option<ItemMetadata>,
}

impl From<Entry> for ListItem {
    fn from(entry: Entry) -> Self {
        Self {
            metadata: Some(ItemMetadata {
                title: entry.display_name().to_string(),
                poster: entry.poster,
                details: entry.metadata,
            }),
            name: entry.name,
            is_directory: entry.is_dir,
            path: entry.rel_path,
        }
    }
}

/// One page of listed items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Total matching items over all pages.
    pub total_items: u64,
    /// 1-based page number.
    pub page: u32,
    /// Page size used.
    pub page_size: u32,
    /// Items on this page.
    pub items: Vec<ListItem>,
}

impl From<Page<Entry>> for Listing {
    fn from(page: Page<Entry>) -> Self {
        let page = page.map(ListItem::from);
        Self {
            total_items: page.total,
            page: page.page,
            page_size: page.page_size,
            items: page.items,
        }
    }
}

/// Full description of one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDetails {
    /// Logical path.
    pub path: String,
    /// Display title.
    pub title: String,
    /// Poster reference.
    pub poster: Option<PosterRef>,
    /// Folder (as opposed to an archive file).
    pub is_directory: bool,
    /// Descriptive fields.
    #[serde(flatten)]
    pub metadata: EntryMetadata,
    /// Cached children (chapters of a series).
    pub chapters: Vec<ListItem>,
    /// Whether the data came from the cache.
    pub cached: bool,
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    /// Library root.
    pub root: PathBuf,
    /// Database file.
    pub database: PathBuf,
    /// Cached entries.
    pub entries: u64,
}

/// Scan-and-cache service for one library root.
pub struct Catalog {
    root: PathBuf,
    store: Arc<CacheStore>,
    scanner: DirectoryScanner,
    extractor: ThumbnailExtractor,
    pool: ScanPool,
    default_page_size: u32,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("root", &self.root)
            .field("store", &self.store)
            .field("workers", &self.pool.workers())
            .finish_non_exhaustive()
    }
}

impl Catalog {
    /// Create a catalog over `root` backed by `store`.
    pub fn new(root: &Path, store: Arc<CacheStore>, settings: CatalogSettings) -> Result<Self, CatalogError> {
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()).into());
        }
        let scanner = DirectoryScanner::new(root, settings.scanner);
        let extractor = ThumbnailExtractor::new(root, settings.thumb_cache_dir)
            .with_filter(crate::scanner::NameFilter::new(
                &scanner.config().excluded_names,
                scanner.config().skip_hidden,
            ));
        Ok(Self {
            root: root.to_path_buf(),
            store,
            scanner,
            extractor,
            pool: ScanPool::new(settings.workers)?,
            default_page_size: settings.default_page_size.clamp(1, MAX_PAGE_SIZE),
            progress: None,
        })
    }

    /// Stop scans when `flag` becomes true.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.pool = self.pool.with_shutdown_flag(flag);
        self
    }

    /// Report scan progress to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Library root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Underlying cache store.
    #[must_use]
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Resolve a logical path to the real on-disk path.
    #[must_use]
    pub fn resolve_path(&self, logical: &str) -> PathBuf {
        resolve_path(&self.root, logical)
    }

    /// One page of the children of `logical`.
    ///
    /// An empty path lists every series of the library. A directory with no
    /// cached children is scanned first.
    pub fn list_children(&self, logical: &str, page: u32, page_size: Option<u32>) -> Result<Listing, CatalogError> {
        let page_size = page_size.unwrap_or(self.default_page_size);
        check_logical(logical)?;

        if logical_segments(logical).is_empty() {
            let mut listing = self.store.query_series(page, page_size)?;
            if listing.total == 0 {
                log::info!("Series list empty, scanning library");
                self.trigger_scan("", None)?;
                listing = self.store.query_series(page, page_size)?;
            }
            return Ok(listing.into());
        }

        let abs = self.existing_path(logical)?;
        let hash = PathHash::of(&abs);
        let mut listing = self.store.query_children(&hash, page, page_size)?;
        if listing.total == 0 && abs.is_dir() {
            log::debug!("Cache miss for '{}', scanning", logical);
            self.trigger_scan(logical, None)?;
            listing = self.store.query_children(&hash, page, page_size)?;
        }
        Ok(listing.into())
    }

    /// Title, poster, metadata and chapters of `logical`.
    ///
    /// Falls back to a live resolution when the entry is not cached.
    pub fn entry_metadata(&self, logical: &str) -> Result<EntryDetails, CatalogError> {
        check_logical(logical)?;
        let abs = self.existing_path(logical)?;
        let hash = PathHash::of(&abs);

        if let Some(entry) = self.store.get(&hash)? {
            let chapters = self
                .store
                .query_children(&hash, 1, MAX_PAGE_SIZE)?
                .items
                .into_iter()
                .map(ListItem::from)
                .collect();
            return Ok(EntryDetails {
                title: entry.display_name().to_string(),
                path: entry.rel_path,
                poster: entry.poster,
                is_directory: entry.is_dir,
                metadata: entry.metadata,
                chapters,
                cached: true,
            });
        }

        let rel = relative_path(&self.root, &abs);
        let resolved = self.scanner.resolver().resolve(&abs, &rel)?;
        Ok(EntryDetails {
            path: rel,
            title: resolved.title,
            poster: resolved.poster,
            is_directory: abs.is_dir(),
            metadata: resolved.metadata,
            chapters: Vec::new(),
            cached: false,
        })
    }

    /// Image bytes for a poster reference.
    pub fn thumbnail(&self, poster: &PosterRef) -> Result<Thumbnail, CatalogError> {
        Ok(self.extractor.extract(poster)?)
    }

    /// Scan `logical` and everything below it, blocking until the cache
    /// holds the results. `series_depth` overrides the configured depth.
    pub fn trigger_scan(&self, logical: &str, series_depth: Option<u32>) -> Result<ScanReport, CatalogError> {
        check_logical(logical)?;
        let callback = self.progress.as_deref();
        let report = match series_depth {
            Some(depth) if depth != self.scanner.config().series_depth => {
                let config = ScannerConfig {
                    series_depth: depth.max(1),
                    ..self.scanner.config().clone()
                };
                DirectoryScanner::new(&self.root, config).scan(&self.pool, Arc::clone(&self.store), logical, callback)?
            }
            _ => self
                .scanner
                .scan(&self.pool, Arc::clone(&self.store), logical, callback)?,
        };
        Ok(report)
    }

    /// Series whose title or name contains `query`.
    pub fn search(&self, query: &str, page: u32, page_size: Option<u32>) -> Result<Listing, CatalogError> {
        let page_size = page_size.unwrap_or(self.default_page_size);
        Ok(self.store.search_title(query.trim(), page, page_size)?.into())
    }

    /// Remove cached entries titled exactly `title`.
    pub fn purge_by_title(&self, title: &str) -> Result<usize, CatalogError> {
        Ok(self.store.purge_by_title(title)?)
    }

    /// Remove every cached entry.
    pub fn clear(&self) -> Result<(), CatalogError> {
        Ok(self.store.clear()?)
    }

    /// Cache statistics.
    pub fn stats(&self) -> Result<CatalogStats, CatalogError> {
        Ok(CatalogStats {
            root: self.root.clone(),
            database: self.store.path().to_path_buf(),
            entries: self.store.count()?,
        })
    }

    /// Page names of an archive or image folder.
    pub fn list_pages(&self, logical: &str) -> Result<Vec<String>, CatalogError> {
        check_logical(logical)?;
        Ok(self.extractor.list_pages(logical)?)
    }

    /// Bytes of one page of an archive or image folder.
    pub fn read_page(&self, logical: &str, page: &str) -> Result<Thumbnail, CatalogError> {
        check_logical(logical)?;
        Ok(self.extractor.read_page(logical, page)?)
    }

    fn existing_path(&self, logical: &str) -> Result<PathBuf, CatalogError> {
        let abs = self.resolve_path(logical);
        if abs.exists() {
            Ok(abs)
        } else {
            Err(CatalogError::NotFound(logical.to_string()))
        }
    }
}

fn check_logical(logical: &str) -> Result<(), CatalogError> {
    if logical_segments(logical).iter().any(|s| s == "..") {
        return Err(CatalogError::InvalidPath(logical.to_string()));
    }
    Ok(())
}

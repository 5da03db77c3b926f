//! On-demand poster extraction.
//!
//! Deferred poster references ([`PosterRef::ArchiveEntry`]) are only
//! materialized when a client asks for them. Extracted bytes are kept in a
//! disk cache keyed by the encoded reference, and concurrent requests for
//! the same key wait for a single extraction.
//!
//! - [`archive`]: zip / cbz / epub covers and pages
//! - [`document`]: page images of PDF files

pub mod archive;
pub mod document;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::cache::PosterRef;
use crate::scanner::filter::NameFilter;
use crate::scanner::kind::{classify, is_image_name, ArchiveFormat, MediaKind};
use crate::scanner::listing::read_dir_sorted;
use crate::scanner::path_utils::{file_name_nfc, logical_segments, resolve_path};

/// Encoded image bytes with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// Image bytes.
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `image/jpeg`.
    pub mime: String,
}

impl Thumbnail {
    /// Wrap bytes, sniffing the MIME type (falling back to `name`'s extension).
    #[must_use]
    pub fn new(bytes: Vec<u8>, name: &str) -> Self {
        let mime = sniff_mime(&bytes, name);
        Self { bytes, mime }
    }

    /// Wrap bytes with a known MIME type.
    #[must_use]
    pub fn with_mime(bytes: Vec<u8>, mime: &str) -> Self {
        Self {
            bytes,
            mime: mime.to_string(),
        }
    }
}

/// MIME type from magic bytes, else from the file extension.
#[must_use]
pub fn sniff_mime(bytes: &[u8], name: &str) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_lowercase()).unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Errors that can occur while producing a thumbnail or page.
#[derive(thiserror::Error, Debug)]
pub enum ThumbnailError {
    /// The source contains no usable image.
    #[error("No image available for {0}")]
    NoImage(String),

    /// The referenced file or entry does not exist.
    #[error("Not found: {0}")]
    NotFound(PathBuf),

    /// External URLs are served by the client, not extracted.
    #[error("External poster URL: {0}")]
    External(String),

    /// The source format cannot be read.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// An I/O error occurred while reading the source.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The archive or document is corrupt.
    #[error("Cannot read {path}: {message}")]
    Archive {
        /// Archive path
        path: PathBuf,
        /// Decoder message
        message: String,
    },
}

impl ThumbnailError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Materializes poster references into image bytes.
#[derive(Debug)]
pub struct ThumbnailExtractor {
    root: PathBuf,
    cache_dir: Option<PathBuf>,
    filter: NameFilter,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ThumbnailExtractor {
    /// Extractor for the library at `root`, caching under `cache_dir` if given.
    #[must_use]
    pub fn new(root: &Path, cache_dir: Option<PathBuf>) -> Self {
        Self {
            root: root.to_path_buf(),
            cache_dir,
            filter: NameFilter::default(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Use `filter` when picking images inside directories.
    #[must_use]
    pub fn with_filter(mut self, filter: NameFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Produce image bytes for a poster reference.
    ///
    /// Corrupt or image-less archives yield [`ThumbnailError::NoImage`].
    pub fn extract(&self, poster: &PosterRef) -> Result<Thumbnail, ThumbnailError> {
        if let PosterRef::ExternalUrl(url) = poster {
            return Err(ThumbnailError::External(url.clone()));
        }

        let key = poster.to_string();
        if let Some(hit) = self.cache_lookup(&key) {
            return Ok(hit);
        }

        let slot = self.key_lock(&key);
        let result = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            match self.cache_lookup(&key) {
                Some(hit) => Ok(hit),
                None => self.materialize(poster).inspect(|thumb| self.cache_store(&key, thumb)),
            }
        };
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        result
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(inflight.entry(key.to_string()).or_default())
    }

    fn materialize(&self, poster: &PosterRef) -> Result<Thumbnail, ThumbnailError> {
        match poster {
            PosterRef::LocalFile(rel) => {
                let abs = resolve_path(&self.root, rel);
                read_image_file(&abs)
            }
            PosterRef::ArchiveEntry(rel) => {
                let abs = resolve_path(&self.root, rel);
                if abs.is_dir() {
                    self.directory_cover(&abs)
                } else if abs.exists() {
                    cover_of_archive(&abs)
                } else {
                    Err(ThumbnailError::NotFound(abs))
                }
            }
            PosterRef::ExternalUrl(url) => Err(ThumbnailError::External(url.clone())),
        }
    }

    /// Cover for a directory marker: its first archive, else its first image.
    fn directory_cover(&self, dir: &Path) -> Result<Thumbnail, ThumbnailError> {
        let listing = read_dir_sorted(dir)
            .map(|l| self.filter.apply(l))
            .map_err(|e| ThumbnailError::NoImage(e.to_string()))?;

        if let Some(item) = listing.iter().find(|item| item.is_archive()) {
            return cover_of_archive(&item.path);
        }
        match listing.iter().find(|item| item.is_image()) {
            Some(item) => read_image_file(&item.path),
            None => Err(ThumbnailError::NoImage(dir.display().to_string())),
        }
    }

    /// Sorted page names of an archive or image directory.
    pub fn list_pages(&self, rel: &str) -> Result<Vec<String>, ThumbnailError> {
        let abs = resolve_path(&self.root, rel);
        if abs.is_dir() {
            let listing = read_dir_sorted(&abs).map_err(|e| ThumbnailError::NoImage(e.to_string()))?;
            return Ok(self
                .filter
                .apply(listing)
                .into_iter()
                .filter(|item| item.is_image())
                .map(|item| item.name)
                .collect());
        }
        if !abs.exists() {
            return Err(ThumbnailError::NotFound(abs));
        }
        match classify(&file_name_nfc(&abs)) {
            MediaKind::Archive(format) if format.is_zip_container() => {
                Ok(archive::image_entries(&abs)?.into_iter().map(|img| img.name).collect())
            }
            MediaKind::Archive(ArchiveFormat::Pdf) => {
                let count = document::page_count(&abs)?;
                Ok((1..=count).map(|n| n.to_string()).collect())
            }
            _ => Err(ThumbnailError::Unsupported(abs.display().to_string())),
        }
    }

    /// Bytes of one page (as named by [`Self::list_pages`]).
    pub fn read_page(&self, rel: &str, page: &str) -> Result<Thumbnail, ThumbnailError> {
        let abs = resolve_path(&self.root, rel);
        if abs.is_dir() {
            let segments = logical_segments(page);
            if segments.is_empty() || segments.iter().any(|s| s == "..") {
                return Err(ThumbnailError::NotFound(abs.join(page)));
            }
            let target = resolve_path(&abs, page);
            if !is_image_name(&file_name_nfc(&target)) {
                return Err(ThumbnailError::Unsupported(target.display().to_string()));
            }
            return read_image_file(&target);
        }
        match classify(&file_name_nfc(&abs)) {
            MediaKind::Archive(format) if format.is_zip_container() => archive::read_entry(&abs, page),
            MediaKind::Archive(ArchiveFormat::Pdf) => match page.parse::<u32>() {
                Ok(n) => document::extract_page_image(&abs, n),
                Err(_) => Err(ThumbnailError::NotFound(abs.join(page))),
            },
            _ => Err(ThumbnailError::Unsupported(format!("{} page {}", abs.display(), page))),
        }
    }

    fn cache_paths(&self, key: &str) -> Option<(PathBuf, PathBuf)> {
        let dir = self.cache_dir.as_ref()?;
        let name = blake3::hash(key.as_bytes()).to_hex();
        Some((dir.join(name.as_str()), dir.join(format!("{}.mime", name.as_str()))))
    }

    fn cache_lookup(&self, key: &str) -> Option<Thumbnail> {
        let (data, mime) = self.cache_paths(key)?;
        let mime = fs::read_to_string(mime).ok()?;
        let bytes = fs::read(data).ok()?;
        log::trace!("Thumbnail cache hit for {}", key);
        Some(Thumbnail::with_mime(bytes, mime.trim()))
    }

    fn cache_store(&self, key: &str, thumb: &Thumbnail) {
        let Some((data, mime)) = self.cache_paths(key) else {
            return;
        };
        let written = data
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(&data, &thumb.bytes))
            .and_then(|()| fs::write(&mime, &thumb.mime));
        if let Err(e) = written {
            log::warn!("Failed to cache thumbnail {}: {}", data.display(), e);
        }
    }
}

fn read_image_file(path: &Path) -> Result<Thumbnail, ThumbnailError> {
    let bytes = fs::read(path).map_err(|e| ThumbnailError::io(path, e))?;
    Ok(Thumbnail::new(bytes, &file_name_nfc(path)))
}

/// Cover of an archive file; decoder and read failures degrade to `NoImage`.
fn cover_of_archive(path: &Path) -> Result<Thumbnail, ThumbnailError> {
    let result = match classify(&file_name_nfc(path)) {
        MediaKind::Archive(format) if format.is_zip_container() => archive::extract_cover(path),
        MediaKind::Archive(ArchiveFormat::Pdf) => document::extract_first_page_image(path),
        MediaKind::Archive(ArchiveFormat::Rar) => {
            log::debug!("RAR extraction is not supported: {}", path.display());
            Err(ThumbnailError::NoImage(path.display().to_string()))
        }
        MediaKind::Image => read_image_file(path),
        _ => Err(ThumbnailError::NoImage(path.display().to_string())),
    };
    result.map_err(|e| match e {
        ThumbnailError::Archive { .. } | ThumbnailError::Unsupported(_) | ThumbnailError::Io { .. } => {
            log::warn!("Thumbnail extraction failed: {}", e);
            ThumbnailError::NoImage(path.display().to_string())
        }
        other => other,
    })
}

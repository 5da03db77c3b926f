//! Title and poster resolution for a single entry.
//!
//! Priority, each step only consulted when the previous produced nothing:
//!
//! 1. Sidecar file (title override, descriptive fields, explicit poster)
//! 2. Image whose name contains a poster keyword
//! 3. First image by name
//! 4. First archive by name, as a deferred thumbnail marker
//! 5. Steps 2-4 again in subdirectories, down to a bounded depth

use std::path::Path;

use super::sidecar::{self, Sidecar};
use super::MetadataError;
use crate::cache::entry::has_url_scheme;
use crate::cache::{EntryMetadata, PosterRef};
use crate::scanner::filter::NameFilter;
use crate::scanner::kind::{classify, strip_archive_extension, MediaKind, POSTER_KEYWORDS};
use crate::scanner::listing::{read_dir_sorted, DirItem};
use crate::scanner::path_utils::{file_name_nfc, join_relative, normalize_path_str};

/// Default number of directory levels (including the entry itself) the
/// poster search may inspect.
pub const DEFAULT_POSTER_SEARCH_DEPTH: usize = 3;

/// Bounds of the poster search depth.
pub const MIN_POSTER_SEARCH_DEPTH: usize = 3;
/// Upper bound; see [`MIN_POSTER_SEARCH_DEPTH`].
pub const MAX_POSTER_SEARCH_DEPTH: usize = 6;

/// Outcome of resolving one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    /// Display title.
    pub title: String,
    /// Poster, if one was found.
    pub poster: Option<PosterRef>,
    /// Descriptive metadata.
    pub metadata: EntryMetadata,
}

impl ResolvedMetadata {
    /// Resolution carrying only the default title for `name`.
    #[must_use]
    pub fn untitled(name: &str) -> Self {
        Self {
            title: default_title(name),
            poster: None,
            metadata: EntryMetadata::default(),
        }
    }

    fn apply_sidecar(&mut self, sidecar: Sidecar, rel_path: &str) {
        if let Some(title) = sidecar.title.filter(|t| !t.trim().is_empty()) {
            self.title = normalize_path_str(title.trim());
        }
        if let Some(summary) = sidecar.summary {
            self.metadata.summary = summary;
        }
        if !sidecar.writers.is_empty() {
            self.metadata.writers = sidecar.writers;
        }
        if !sidecar.genres.is_empty() {
            self.metadata.genres = sidecar.genres;
        }
        if let Some(status) = sidecar.status {
            self.metadata.status = status;
        }
        if let Some(publisher) = sidecar.publisher {
            self.metadata.publisher = publisher;
        }
        if let Some(poster) = sidecar.poster {
            self.poster = Some(if has_url_scheme(&poster) {
                PosterRef::ExternalUrl(poster)
            } else {
                PosterRef::LocalFile(join_relative(rel_path, &poster))
            });
        }
    }
}

/// NFC base name with one known archive extension stripped.
#[must_use]
pub fn default_title(name: &str) -> String {
    let name = normalize_path_str(name);
    strip_archive_extension(&name).to_string()
}

/// Resolves (title, poster, metadata) for directories and archive files.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    poster_search_depth: usize,
    filter: NameFilter,
}

impl Default for MetadataResolver {
    fn default() -> Self {
        Self::new(DEFAULT_POSTER_SEARCH_DEPTH, NameFilter::default())
    }
}

impl MetadataResolver {
    /// Create a resolver. `poster_search_depth` is clamped to
    /// `MIN_POSTER_SEARCH_DEPTH..=MAX_POSTER_SEARCH_DEPTH`.
    #[must_use]
    pub fn new(poster_search_depth: usize, filter: NameFilter) -> Self {
        Self {
            poster_search_depth: poster_search_depth
                .clamp(MIN_POSTER_SEARCH_DEPTH, MAX_POSTER_SEARCH_DEPTH),
            filter,
        }
    }

    /// Configured poster search depth.
    #[must_use]
    pub fn poster_search_depth(&self) -> usize {
        self.poster_search_depth
    }

    /// Resolve any entry, reading the directory listing if needed.
    pub fn resolve(&self, abs_path: &Path, rel_path: &str) -> Result<ResolvedMetadata, MetadataError> {
        if !abs_path.is_dir() {
            return Ok(Self::resolve_file(abs_path, rel_path));
        }
        let listing = self.filter.apply(read_dir_sorted(abs_path)?);
        Ok(self.resolve_listing(abs_path, rel_path, &listing))
    }

    /// Resolve a non-directory entry.
    ///
    /// Archives get their stem as title and a deferred marker pointing at
    /// themselves; no bytes are read.
    #[must_use]
    pub fn resolve_file(abs_path: &Path, rel_path: &str) -> ResolvedMetadata {
        let name = file_name_nfc(abs_path);
        let mut resolved = ResolvedMetadata::untitled(&name);
        resolved.poster = match classify(&name) {
            MediaKind::Archive(_) => Some(PosterRef::ArchiveEntry(rel_path.to_string())),
            MediaKind::Image => Some(PosterRef::LocalFile(rel_path.to_string())),
            MediaKind::Other => None,
        };
        resolved
    }

    /// Resolve a directory from an already read (and filtered) listing.
    #[must_use]
    pub fn resolve_listing(&self, abs_path: &Path, rel_path: &str, listing: &[DirItem]) -> ResolvedMetadata {
        let mut resolved = ResolvedMetadata::untitled(&file_name_nfc(abs_path));

        if let Some(item) = sidecar::find_sidecar(listing) {
            match sidecar::load(&item.path) {
                Ok(sidecar) => {
                    log::trace!("Loaded sidecar {}", item.path.display());
                    resolved.apply_sidecar(sidecar, rel_path);
                }
                Err(e) => log::warn!("Ignoring sidecar: {}", e),
            }
        }

        if resolved.poster.is_none() {
            resolved.poster = self.find_poster(rel_path, listing);
        }

        log::trace!(
            "Resolved '{}' -> title '{}', poster {:?}",
            rel_path,
            resolved.title,
            resolved.poster.as_ref().map(ToString::to_string)
        );
        resolved
    }

    /// Heuristic poster search (steps 2-5) over a directory listing.
    #[must_use]
    pub fn find_poster(&self, rel_path: &str, listing: &[DirItem]) -> Option<PosterRef> {
        self.search_level(rel_path, listing, self.poster_search_depth)
    }

    fn search_level(&self, rel_path: &str, listing: &[DirItem], levels: usize) -> Option<PosterRef> {
        if let Some(poster) = poster_in_listing(rel_path, listing) {
            return Some(poster);
        }
        if levels <= 1 {
            return None;
        }

        for dir in listing.iter().filter(|item| item.is_dir) {
            let child_rel = join_relative(rel_path, &dir.name);
            let child_listing = match read_dir_sorted(&dir.path) {
                Ok(l) => self.filter.apply(l),
                Err(e) => {
                    log::debug!("Poster search skipped {}: {}", dir.path.display(), e);
                    continue;
                }
            };
            if let Some(poster) = self.search_level(&child_rel, &child_listing, levels - 1) {
                return Some(poster);
            }
        }
        None
    }
}

/// Steps 2-4 applied to one sorted listing.
fn poster_in_listing(rel_path: &str, listing: &[DirItem]) -> Option<PosterRef> {
    let images = || listing.iter().filter(|item| item.is_image());

    let keyword = images().find(|item| {
        let lower = item.name.to_lowercase();
        POSTER_KEYWORDS.iter().any(|kw| lower.contains(kw))
    });
    if let Some(item) = keyword.or_else(|| images().next()) {
        return Some(PosterRef::LocalFile(join_relative(rel_path, &item.name)));
    }

    listing
        .iter()
        .find(|item| item.is_archive())
        .map(|item| PosterRef::ArchiveEntry(join_relative(rel_path, &item.name)))
}

//! Cache entry definitions.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::scanner::path_utils::path_key;

/// Stable identifier of an absolute path: 128 bits of BLAKE3 over
/// [`path_key`], hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathHash(String);

impl PathHash {
    /// Hash an on-disk path.
    #[must_use]
    pub fn of(path: &Path) -> Self {
        let hex = blake3::hash(path_key(path).as_bytes()).to_hex();
        Self(hex.as_str()[..32].to_string())
    }

    /// Wrap an already computed hash (as read back from the database).
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Hex representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prefix of encoded deferred thumbnail markers.
pub const ARCHIVE_THUMB_PREFIX: &str = "archive-thumb:";

/// Marker prefix written by older catalog databases.
const LEGACY_THUMB_PREFIX: &str = "zip_thumb://";

static URL_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("URL scheme pattern is valid")
});

/// Whether a string starts with a URL scheme (`https://`, `ftp://`, ...).
#[must_use]
pub fn has_url_scheme(value: &str) -> bool {
    URL_SCHEME.is_match(value)
}

/// Where a poster image comes from.
///
/// Decoded once from its stored string form; consumers match on the
/// variant instead of re-parsing prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PosterRef {
    /// Image file, relative to the catalog root.
    LocalFile(String),
    /// Deferred marker: archive (or directory) relative to the catalog root
    /// whose representative page is extracted on demand.
    ArchiveEntry(String),
    /// Image hosted elsewhere.
    ExternalUrl(String),
}

impl PosterRef {
    /// Decode a stored poster reference.
    ///
    /// Returns `None` for empty strings.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Some(rest) = value.strip_prefix(ARCHIVE_THUMB_PREFIX) {
            return Some(Self::ArchiveEntry(rest.to_string()));
        }
        if let Some(rest) = value.strip_prefix(LEGACY_THUMB_PREFIX) {
            return Some(Self::ArchiveEntry(rest.to_string()));
        }
        if has_url_scheme(value) {
            return Some(Self::ExternalUrl(value.to_string()));
        }
        Some(Self::LocalFile(value.to_string()))
    }
}

impl fmt::Display for PosterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalFile(path) => f.write_str(path),
            Self::ArchiveEntry(path) => write!(f, "{}{}", ARCHIVE_THUMB_PREFIX, path),
            Self::ExternalUrl(url) => f.write_str(url),
        }
    }
}

impl FromStr for PosterRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| "empty poster reference".to_string())
    }
}

impl Serialize for PosterRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PosterRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Descriptive metadata stored alongside an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryMetadata {
    /// Synopsis.
    pub summary: String,
    /// Writers / authors.
    pub writers: Vec<String>,
    /// Genres or keywords.
    pub genres: Vec<String>,
    /// Publication status.
    pub status: String,
    /// Publisher.
    pub publisher: String,
}

impl Default for EntryMetadata {
    fn default() -> Self {
        Self {
            summary: String::new(),
            writers: Vec::new(),
            genres: Vec::new(),
            status: "Unknown".to_string(),
            publisher: String::new(),
        }
    }
}

/// One filesystem node known to the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Primary key.
    pub path_hash: PathHash,
    /// Hash of the parent directory.
    pub parent_hash: PathHash,
    /// Real on-disk path.
    pub abs_path: PathBuf,
    /// Path relative to the catalog root (`/`-separated, NFC).
    pub rel_path: String,
    /// Raw filesystem name (NFC).
    pub name: String,
    /// Directory or archive file.
    pub is_dir: bool,
    /// Segments from the catalog root.
    pub depth: u32,
    /// Series-level directory: listed at the library root and matched by search.
    pub is_series: bool,
    /// Resolved poster, if any.
    pub poster: Option<PosterRef>,
    /// Display title.
    pub title: String,
    /// Descriptive metadata.
    pub metadata: EntryMetadata,
    /// When this row was last resolved.
    pub last_scanned: DateTime<Utc>,
}

impl Entry {
    /// Build an entry for `abs_path`, deriving both hashes from the path.
    #[must_use]
    pub fn new(abs_path: &Path, rel_path: &str, is_dir: bool, depth: u32) -> Self {
        let parent = abs_path.parent().unwrap_or(abs_path);
        Self {
            path_hash: PathHash::of(abs_path),
            parent_hash: PathHash::of(parent),
            abs_path: abs_path.to_path_buf(),
            rel_path: rel_path.to_string(),
            name: crate::scanner::path_utils::file_name_nfc(abs_path),
            is_dir,
            depth,
            is_series: false,
            poster: None,
            title: String::new(),
            metadata: EntryMetadata::default(),
            last_scanned: Utc::now(),
        }
    }

    /// Title to show, falling back to the raw name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

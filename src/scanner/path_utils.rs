//! Unicode path normalization and logical path resolution.
//!
//! NAS shares (Synology, macOS-originated copies) frequently store names in
//! NFD form while clients send NFC paths. The same visual name can have
//! different byte representations:
//!
//! - NFC: `café` - 'é' is U+00E9 (single code point)
//! - NFD: `café` - 'e' U+0065 + combining acute accent U+0301
//!
//! Everything that compares or hashes names goes through this module.
//!
//! # Example
//!
//! ```
//! use nascatalog::scanner::path_utils::{fold_name, paths_equal};
//!
//! let nfc = "café";
//! let nfd = "cafe\u{0301}";
//! assert!(paths_equal(nfc, nfd));
//! assert_eq!(fold_name("CAFE\u{0301}"), fold_name("café"));
//! ```

use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Normalize a string to NFC (Composed) form.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// Check if two strings are equal after NFC normalization.
#[must_use]
pub fn paths_equal(a: &str, b: &str) -> bool {
    normalize_path_str(a) == normalize_path_str(b)
}

/// Comparison form of a single name: NFC, then lower-cased.
///
/// Used for segment matching in [`resolve_path`], for the exclusion set
/// and for sidecar file lookup.
#[must_use]
pub fn fold_name(name: &str) -> String {
    normalize_path_str(name).to_lowercase()
}

/// Check if two names match case- and normalization-insensitively.
#[must_use]
pub fn names_match(a: &str, b: &str) -> bool {
    fold_name(a) == fold_name(b)
}

/// NFC name of the last component of `path`, or an empty string.
#[must_use]
pub fn file_name_nfc(path: &Path) -> String {
    path.file_name()
        .map(|n| normalize_path_str(&n.to_string_lossy()))
        .unwrap_or_default()
}

/// Build the canonical key for a path: absolute, `/`-separated, NFC.
///
/// Trailing separators and `.` components are dropped so that
/// `/a/b/` and `/a/./b` produce the same key. Symlinks are not resolved;
/// network mounts make `canonicalize` both slow and unreliable.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use nascatalog::scanner::path_utils::path_key;
///
/// assert_eq!(path_key(Path::new("/lib/cafe\u{0301}/")), "/lib/café");
/// ```
#[must_use]
pub fn path_key(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut key = String::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(prefix) => key.push_str(&prefix.as_os_str().to_string_lossy()),
            Component::RootDir => key.push('/'),
            Component::CurDir => {}
            Component::ParentDir | Component::Normal(_) => {
                if !key.is_empty() && !key.ends_with('/') {
                    key.push('/');
                }
                key.push_str(&component.as_os_str().to_string_lossy());
            }
        }
    }

    normalize_path_str(&key.replace('\\', "/"))
}

/// Cache key of an on-disk path.
#[must_use]
pub fn path_hash(path: &Path) -> crate::cache::PathHash {
    crate::cache::PathHash::of(path)
}

/// Split a logical (client supplied) path into its segments.
///
/// The input is percent-decoded, backslashes become forward slashes, and
/// empty or `.` segments are discarded. Undecodable percent sequences leave
/// the raw string in place.
#[must_use]
pub fn logical_segments(logical: &str) -> Vec<String> {
    let decoded = urlencoding::decode(logical)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| logical.to_string());

    decoded
        .replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .map(str::to_string)
        .collect()
}

/// Map a logical path to the real on-disk path below `root`.
///
/// Each segment is matched against the real entries of the current
/// directory using [`fold_name`]. When nothing matches (or the directory
/// cannot be read) the literal segment is joined anyway, so this never
/// fails; the result may not exist. Existence checking is the caller's job.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use nascatalog::scanner::path_utils::resolve_path;
///
/// // Disk holds "Cafe\u{0301}" (NFD), client asks for NFC lower-case.
/// let real = resolve_path(Path::new("/volume/comics"), "caf%C3%A9/vol1");
/// println!("{}", real.display());
/// ```
#[must_use]
pub fn resolve_path(root: &Path, logical: &str) -> PathBuf {
    let mut current = root.to_path_buf();

    for segment in logical_segments(logical) {
        let next = match find_entry(&current, &segment) {
            Some(found) => found,
            None => {
                log::trace!(
                    "No on-disk match for segment '{}' in {}",
                    segment,
                    current.display()
                );
                current.join(&segment)
            }
        };
        current = next;
    }

    current
}

/// Find the entry of `dir` whose folded name equals the folded `target`.
fn find_entry(dir: &Path, target: &str) -> Option<PathBuf> {
    let wanted = fold_name(target);
    let entries = std::fs::read_dir(dir).ok()?;

    entries
        .filter_map(Result::ok)
        .find(|entry| fold_name(&entry.file_name().to_string_lossy()) == wanted)
        .map(|entry| entry.path())
}

/// Path of `abs` relative to `root`, `/`-separated and NFC.
///
/// Returns an empty string for the root itself. Paths outside `root` are
/// returned as their full key.
#[must_use]
pub fn relative_path(root: &Path, abs: &Path) -> String {
    let root_key = path_key(root);
    let abs_key = path_key(abs);

    if abs_key == root_key {
        return String::new();
    }

    let prefix = if root_key.ends_with('/') {
        root_key
    } else {
        format!("{}/", root_key)
    };

    match abs_key.strip_prefix(&prefix) {
        Some(rest) => rest.to_string(),
        None => abs_key,
    }
}

/// Number of segments in a relative path; the catalog root has depth 0.
#[must_use]
pub fn depth_of(rel_path: &str) -> u32 {
    let count = rel_path.split('/').filter(|s| !s.is_empty()).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Join a relative directory path and a child name with `/`.
#[must_use]
pub fn join_relative(rel_dir: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if rel_dir.is_empty() {
        normalize_path_str(name)
    } else {
        normalize_path_str(&format!("{}/{}", rel_dir.trim_end_matches('/'), name))
    }
}

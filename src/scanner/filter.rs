//! Name-based exclusion of directory entries.

use std::collections::HashSet;

use super::listing::DirItem;
use super::path_utils::fold_name;

/// Folder and file names skipped by default (NAS metadata and recycle bins).
pub const DEFAULT_EXCLUDED_NAMES: &[&str] = &["@eaDir", "#recycle", "@Recycle", ".DS_Store", "Thumbs.db"];

/// Decides which directory entries the scanner and poster search may see.
#[derive(Debug, Clone)]
pub struct NameFilter {
    excluded: HashSet<String>,
    skip_hidden: bool,
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_NAMES.iter().copied(), true)
    }
}

impl NameFilter {
    /// Build a filter from exact names (matched case- and
    /// normalization-insensitively).
    pub fn new<I, S>(excluded: I, skip_hidden: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            excluded: excluded.into_iter().map(|s| fold_name(s.as_ref())).collect(),
            skip_hidden,
        }
    }

    /// Whether `name` is in the exclusion set.
    #[must_use]
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(&fold_name(name))
    }

    /// Whether an entry should be visited.
    #[must_use]
    pub fn allows(&self, item: &DirItem) -> bool {
        if self.skip_hidden && item.is_hidden() {
            return false;
        }
        !self.excluded.contains(&item.folded_name())
    }

    /// Keep only the allowed entries of a listing.
    #[must_use]
    pub fn apply(&self, listing: Vec<DirItem>) -> Vec<DirItem> {
        listing
            .into_iter()
            .filter(|item| {
                let keep = self.allows(item);
                if !keep {
                    log::trace!("Excluding {}", item.path.display());
                }
                keep
            })
            .collect()
    }
}

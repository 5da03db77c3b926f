//! Application configuration management.
//!
//! Settings are layered with figment, later sources winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config`, else the platform config directory)
//! 3. `NASCATALOG_*` environment variables (`__` separates nested keys)
//! 4. Command-line flags, applied by the caller

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::metadata::resolver::{MAX_POSTER_SEARCH_DEPTH, MIN_POSTER_SEARCH_DEPTH};
use crate::scanner::filter::DEFAULT_EXCLUDED_NAMES;
use crate::scanner::pool::{DEFAULT_WORKERS, MAX_WORKERS};
use crate::scanner::walker::{ScannerConfig, DEFAULT_SERIES_DEPTH};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "NASCATALOG_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Library root directory.
    pub root: Option<PathBuf>,
    /// Cache database file. Defaults to the platform data directory.
    pub database: Option<PathBuf>,
    /// Thumbnail cache directory. Defaults to the platform cache directory.
    pub thumb_cache_dir: Option<PathBuf>,
    /// Depth at which directories are treated as series.
    pub series_depth: u32,
    /// Scan worker threads.
    pub workers: usize,
    /// Directory levels the poster search may descend (3 to 6).
    pub poster_search_depth: usize,
    /// Names never scanned.
    pub excluded_names: Vec<String>,
    /// First-level folders scanned from the root (empty means all).
    pub root_categories: Vec<String>,
    /// Skip names starting with a dot.
    pub skip_hidden: bool,
    /// Page size used when none is requested.
    pub default_page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            database: None,
            thumb_cache_dir: None,
            series_depth: DEFAULT_SERIES_DEPTH,
            workers: DEFAULT_WORKERS,
            poster_search_depth: crate::metadata::resolver::DEFAULT_POSTER_SEARCH_DEPTH,
            excluded_names: DEFAULT_EXCLUDED_NAMES.iter().map(|s| (*s).to_string()).collect(),
            root_categories: Vec::new(),
            skip_hidden: true,
            default_page_size: 50,
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// `file` overrides the default config file location. A missing default
    /// file is not an error; a missing explicit file is.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match file {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = Self::config_path().filter(|p| p.exists()) {
                    log::debug!("Loading config from {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Invalid configuration")?;
        Ok(config.normalized())
    }

    /// Clamp numeric settings into their supported ranges.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.workers = self.workers.clamp(1, MAX_WORKERS);
        self.series_depth = self.series_depth.max(1);
        self.poster_search_depth = self
            .poster_search_depth
            .clamp(MIN_POSTER_SEARCH_DEPTH, MAX_POSTER_SEARCH_DEPTH);
        self.default_page_size = self.default_page_size.clamp(1, crate::cache::MAX_PAGE_SIZE);
        self
    }

    /// Write the configuration as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Library root, required by every command.
    pub fn library_root(&self) -> Result<&Path> {
        self.root
            .as_deref()
            .context("No library root configured (use --root or NASCATALOG_ROOT)")
    }

    /// Cache database location.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        let dirs = project_dirs()?;
        Ok(dirs.data_dir().join("catalog.db"))
    }

    /// Thumbnail cache location.
    pub fn thumb_cache_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.thumb_cache_dir {
            return Ok(path.clone());
        }
        let dirs = project_dirs()?;
        Ok(dirs.cache_dir().join("thumbnails"))
    }

    /// Scanner settings derived from this configuration.
    #[must_use]
    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            series_depth: self.series_depth,
            poster_search_depth: self.poster_search_depth,
            excluded_names: self.excluded_names.clone(),
            skip_hidden: self.skip_hidden,
            root_categories: self.root_categories.clone(),
        }
    }

    /// Default platform-specific configuration file.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "nascatalog", "nascatalog").map(|d| d.config_dir().join("config.toml"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "nascatalog", "nascatalog")
        .context("Failed to determine project directories")
}

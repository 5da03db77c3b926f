//! Command-line interface definitions.
//!
//! Global options select the library and cache; subcommands map one-to-one
//! onto [`Catalog`](crate::catalog::Catalog) operations.
//!
//! # Example
//!
//! ```bash
//! # Populate the cache for the whole library
//! nascatalog --root /volume1/comics scan
//!
//! # Page through the series of one category
//! nascatalog --root /volume1/comics list Webtoon --page 2 --json
//!
//! # Write a cover to disk
//! nascatalog --root /volume1/comics thumb "Manga/Berserk/Vol 01.cbz" -o cover.jpg
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Scan-and-cache engine for NAS comic and webtoon libraries.
#[derive(Debug, Parser)]
#[command(name = "nascatalog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Library root directory
    #[arg(long, value_name = "DIR", global = true)]
    pub root: Option<PathBuf>,

    /// Cache database file
    #[arg(long, value_name = "FILE", global = true)]
    pub database: Option<PathBuf>,

    /// Thumbnail cache directory
    #[arg(long, value_name = "DIR", global = true)]
    pub thumb_cache_dir: Option<PathBuf>,

    /// Number of scan workers (1-64)
    #[arg(long, value_name = "N", global = true)]
    pub workers: Option<usize>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a library path and populate the cache
    Scan(ScanArgs),
    /// List the cached children of a path
    List(ListArgs),
    /// Show title, poster and metadata of a path
    Meta(PathArgs),
    /// Extract a poster image
    Thumb(ThumbArgs),
    /// Search series by title
    Search(SearchArgs),
    /// Remove cached entries with an exact title
    Purge(PurgeArgs),
    /// Show the on-disk path a logical path resolves to
    Resolve(PathArgs),
    /// List or read pages of an archive or image folder
    Pages(PagesArgs),
    /// Show cache statistics
    Stats(OutputArgs),
}

/// `--json` switch shared by most commands.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Paging options.
#[derive(Debug, Args)]
pub struct PageArgs {
    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Items per page (default from config)
    #[arg(long, value_name = "N")]
    pub page_size: Option<u32>,
}

/// Arguments for `scan`.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Logical path to scan (library root when omitted)
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// Depth at which folders are series (default from config)
    #[arg(long, value_name = "N")]
    pub series_depth: Option<u32>,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for `list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Logical path (series list when omitted)
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    #[command(flatten)]
    pub paging: PageArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// A single logical path.
#[derive(Debug, Args)]
pub struct PathArgs {
    /// Logical path relative to the library root
    #[arg(value_name = "PATH")]
    pub path: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for `thumb`.
#[derive(Debug, Args)]
pub struct ThumbArgs {
    /// Logical path whose cached poster to extract
    #[arg(value_name = "PATH", required_unless_present = "poster")]
    pub path: Option<String>,

    /// Encoded poster reference (e.g. `archive-thumb:Manga/Vol 01.cbz`)
    #[arg(long, value_name = "REF", conflicts_with = "path")]
    pub poster: Option<String>,

    /// Write the image here (prints size and type otherwise)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for `search`.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Substring to look for in titles and names
    #[arg(value_name = "QUERY")]
    pub query: String,

    #[command(flatten)]
    pub paging: PageArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for `purge`.
#[derive(Debug, Args)]
pub struct PurgeArgs {
    /// Exact title to remove
    #[arg(value_name = "TITLE", required_unless_present = "all")]
    pub title: Option<String>,

    /// Remove every cached entry instead
    #[arg(long, conflicts_with = "title")]
    pub all: bool,
}

/// Arguments for `pages`.
#[derive(Debug, Args)]
pub struct PagesArgs {
    /// Archive or image folder
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Page to read (as listed)
    #[arg(long, value_name = "PAGE", requires = "output")]
    pub read: Option<String>,

    /// File to write the page to
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

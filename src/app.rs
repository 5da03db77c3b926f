//! Command dispatch for the `nascatalog` binary.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytesize::ByteSize;
use serde::Serialize;

use crate::cache::{CacheStore, PosterRef};
use crate::catalog::{Catalog, CatalogSettings};
use crate::cli::{Cli, Commands, PagesArgs, ThumbArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::logging::init_logging;
use crate::output::{text, write_json, JsonScanOutput};
use crate::progress::Progress;
use crate::scanner::ScanReport;
use crate::signal::install_handler;

/// Run one CLI invocation and return the exit code to use.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);

    let config = load_config(&cli)?;
    let shutdown = install_handler()?;
    let catalog = open_catalog(&config)?
        .with_shutdown_flag(shutdown.get_flag())
        .with_progress(Arc::new(Progress::new(cli.quiet)));

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Scan(args) => {
            let report = catalog.trigger_scan(args.path.as_deref().unwrap_or(""), args.series_depth)?;
            let code = scan_exit_code(&report);
            if args.output.json {
                write_json(&mut out, &JsonScanOutput::new(&report, code), true)?;
            } else {
                text::write_report(&mut out, &report)?;
            }
            Ok(code)
        }
        Commands::List(args) => {
            let listing = catalog.list_children(
                args.path.as_deref().unwrap_or(""),
                args.paging.page,
                args.paging.page_size,
            )?;
            if args.output.json {
                write_json(&mut out, &listing, true)?;
            } else {
                text::write_listing(&mut out, &listing)?;
            }
            Ok(ExitCode::Success)
        }
        Commands::Meta(args) => {
            let details = catalog.entry_metadata(&args.path)?;
            if args.output.json {
                write_json(&mut out, &details, true)?;
            } else {
                text::write_details(&mut out, &details)?;
            }
            Ok(ExitCode::Success)
        }
        Commands::Thumb(args) => run_thumb(&catalog, &args, &mut out),
        Commands::Search(args) => {
            let listing = catalog.search(&args.query, args.paging.page, args.paging.page_size)?;
            if args.output.json {
                write_json(&mut out, &listing, true)?;
            } else {
                text::write_listing(&mut out, &listing)?;
            }
            Ok(ExitCode::Success)
        }
        Commands::Purge(args) => {
            if args.all {
                catalog.clear()?;
                log::info!("Cache cleared");
            } else if let Some(title) = &args.title {
                let removed = catalog.purge_by_title(title)?;
                writeln!(out, "Removed {} entries titled '{}'", removed, title)?;
            }
            Ok(ExitCode::Success)
        }
        Commands::Resolve(args) => {
            let real_path = catalog.resolve_path(&args.path);
            let resolved = Resolved {
                path: args.path.clone(),
                exists: real_path.exists(),
                real_path: real_path.display().to_string(),
            };
            if args.output.json {
                write_json(&mut out, &resolved, true)?;
            } else {
                writeln!(out, "{}", resolved.real_path)?;
            }
            Ok(ExitCode::Success)
        }
        Commands::Pages(args) => run_pages(&catalog, &args, &mut out),
        Commands::Stats(args) => {
            let stats = catalog.stats()?;
            if args.json {
                write_json(&mut out, &stats, true)?;
            } else {
                text::write_stats(&mut out, &stats)?;
            }
            Ok(ExitCode::Success)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Resolved {
    path: String,
    real_path: String,
    exists: bool,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(root) = &cli.root {
        config.root = Some(root.clone());
    }
    if let Some(database) = &cli.database {
        config.database = Some(database.clone());
    }
    if let Some(dir) = &cli.thumb_cache_dir {
        config.thumb_cache_dir = Some(dir.clone());
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    Ok(config.normalized())
}

fn open_catalog(config: &Config) -> Result<Catalog> {
    let root = config.library_root()?;
    let database = config.database_path()?;
    if let Some(parent) = database.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let store = CacheStore::open(&database)
        .with_context(|| format!("Failed to open cache {}", database.display()))?;

    let settings = CatalogSettings {
        scanner: config.scanner_config(),
        workers: config.workers,
        thumb_cache_dir: Some(config.thumb_cache_path()?),
        default_page_size: config.default_page_size,
    };
    Catalog::new(root, Arc::new(store), settings)
        .with_context(|| format!("Failed to open library {}", root.display()))
}

fn scan_exit_code(report: &ScanReport) -> ExitCode {
    if report.interrupted {
        ExitCode::Interrupted
    } else if report.is_partial() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    }
}

fn run_thumb<W: Write>(catalog: &Catalog, args: &ThumbArgs, out: &mut W) -> Result<ExitCode> {
    let poster = match (&args.poster, &args.path) {
        (Some(raw), _) => PosterRef::parse(raw).context("Empty poster reference")?,
        (None, Some(path)) => catalog
            .entry_metadata(path)?
            .poster
            .with_context(|| format!("No poster found for '{}'", path))?,
        (None, None) => anyhow::bail!("Either a path or --poster is required"),
    };

    let thumb = catalog.thumbnail(&poster)?;
    match &args.output {
        Some(file) => write_file(file, &thumb.bytes)?,
        None => writeln!(
            out,
            "{}: {} ({})",
            poster,
            thumb.mime,
            ByteSize(thumb.bytes.len() as u64)
        )?,
    }
    Ok(ExitCode::Success)
}

fn run_pages<W: Write>(catalog: &Catalog, args: &PagesArgs, out: &mut W) -> Result<ExitCode> {
    if let Some(page) = &args.read {
        let image = catalog.read_page(&args.path, page)?;
        let file = args.output.as_deref().context("--read requires --output")?;
        write_file(file, &image.bytes)?;
        log::info!("Wrote page '{}' ({}) to {}", page, image.mime, file.display());
        return Ok(ExitCode::Success);
    }

    let pages = catalog.list_pages(&args.path)?;
    if args.json {
        write_json(out, &pages, true)?;
    } else {
        for page in &pages {
            writeln!(out, "{}", page)?;
        }
    }
    Ok(ExitCode::Success)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    log::debug!("Wrote {} to {}", ByteSize(bytes.len() as u64), path.display());
    Ok(())
}

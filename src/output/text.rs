//! Plain-text rendering for terminals.

use std::io::{self, Write};

use crate::catalog::{CatalogStats, EntryDetails, ListItem, Listing};
use crate::scanner::ScanReport;

/// Write one page of a listing.
pub fn write_listing<W: Write>(writer: &mut W, listing: &Listing) -> io::Result<()> {
    for item in &listing.items {
        write_item(writer, item)?;
    }
    let pages = listing.total_items.div_ceil(u64::from(listing.page_size.max(1)));
    writeln!(
        writer,
        "-- page {}/{} ({} items)",
        listing.page,
        pages.max(1),
        listing.total_items
    )
}

fn write_item<W: Write>(writer: &mut W, item: &ListItem) -> io::Result<()> {
    let marker = if item.is_directory { "D" } else { "F" };
    match &item.metadata {
        Some(meta) if meta.title != item.name => {
            writeln!(writer, "[{}] {}  ({})", marker, meta.title, item.path)
        }
        _ => writeln!(writer, "[{}] {}", marker, item.path),
    }
}

/// Write the details of one entry.
pub fn write_details<W: Write>(writer: &mut W, details: &EntryDetails) -> io::Result<()> {
    writeln!(writer, "Title:     {}", details.title)?;
    writeln!(writer, "Path:      {}", details.path)?;
    if let Some(poster) = &details.poster {
        writeln!(writer, "Poster:    {}", poster)?;
    }
    let meta = &details.metadata;
    if !meta.writers.is_empty() {
        writeln!(writer, "Writers:   {}", meta.writers.join(", "))?;
    }
    if !meta.genres.is_empty() {
        writeln!(writer, "Genres:    {}", meta.genres.join(", "))?;
    }
    if !meta.publisher.is_empty() {
        writeln!(writer, "Publisher: {}", meta.publisher)?;
    }
    writeln!(writer, "Status:    {}", meta.status)?;
    if !meta.summary.is_empty() {
        writeln!(writer, "\n{}\n", meta.summary)?;
    }
    if !details.chapters.is_empty() {
        writeln!(writer, "Chapters ({}):", details.chapters.len())?;
        for chapter in &details.chapters {
            writeln!(writer, "  {}", chapter.name)?;
        }
    }
    if !details.cached {
        writeln!(writer, "(not cached yet)")?;
    }
    Ok(())
}

/// Write a scan summary, followed by the recorded failures.
pub fn write_report<W: Write>(writer: &mut W, report: &ScanReport) -> io::Result<()> {
    let root = if report.root.is_empty() { "/" } else { &report.root };
    writeln!(
        writer,
        "Scanned {}: {} directories, {} entries written in {} ms",
        root, report.processed, report.entries_written, report.duration_ms
    )?;
    if report.failed > 0 {
        writeln!(writer, "{} directories failed:", report.failed)?;
        for failure in &report.failures {
            writeln!(writer, "  {}: {}", failure.path.display(), failure.message)?;
        }
    }
    if report.interrupted {
        writeln!(writer, "Interrupted; {} directories skipped", report.skipped)?;
    }
    Ok(())
}

/// Write cache statistics.
pub fn write_stats<W: Write>(writer: &mut W, stats: &CatalogStats) -> io::Result<()> {
    writeln!(writer, "Root:     {}", stats.root.display())?;
    writeln!(writer, "Database: {}", stats.database.display())?;
    writeln!(writer, "Entries:  {}", stats.entries)
}

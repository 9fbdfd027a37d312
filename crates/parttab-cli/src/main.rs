//! parttab - read-only partition table inspector
//!
//! Decodes MBR, GPT and BSD disklabel structures from raw disk images
//! and prints everything recognized, one report per image.

use anyhow::{Context, Result};
use clap::Parser;
use parttab_core::{ByteSource, DiskReport, MmapSource, StreamSource, TableKind, TableReport};
use parttab_pipeline::{FormatPipeline, DEFAULT_SECTOR_SIZE};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "parttab",
    version,
    about = "Inspect partition tables (MBR, GPT, BSD disklabel) in disk images"
)]
struct Args {
    /// Logical sector size in bytes
    #[arg(long, default_value_t = DEFAULT_SECTOR_SIZE, value_parser = clap::value_parser!(u64).range(1..))]
    sector_size: u64,

    /// Emit one JSON document per image instead of text
    #[arg(long)]
    json: bool,

    /// Stream from the file instead of memory-mapping it
    #[arg(long)]
    no_mmap: bool,

    /// Disk images to inspect
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let pipeline = FormatPipeline::with_sector_size(args.sector_size);

    let mut failed = false;
    for path in &args.images {
        match inspect_image(&pipeline, path, args.no_mmap) {
            Ok(report) => {
                if args.json {
                    match serde_json::to_string_pretty(&report) {
                        Ok(doc) => println!("{doc}"),
                        Err(e) => {
                            eprintln!("{}: JSON encoding failed: {}", path.display(), e);
                            failed = true;
                        }
                    }
                } else {
                    print!("{}", render_text(&report));
                }
            }
            Err(e) => {
                eprintln!("{}: {:#}", path.display(), e);
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn inspect_image(pipeline: &FormatPipeline, path: &Path, no_mmap: bool) -> Result<DiskReport> {
    let mut source = open_source(path, no_mmap)
        .with_context(|| format!("cannot open {}", path.display()))?;
    pipeline
        .inspect(source.as_mut(), &path.display().to_string())
        .with_context(|| format!("cannot inspect {}", path.display()))
}

/// Memory-map regular files; fall back to streaming for anything the
/// mapping path refuses (devices, oversized files, `--no-mmap`).
fn open_source(path: &Path, no_mmap: bool) -> parttab_core::Result<Box<dyn ByteSource>> {
    if !no_mmap {
        match MmapSource::open(path) {
            Ok(source) => return Ok(Box::new(source)),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "mmap unavailable, streaming instead")
            }
        }
    }
    Ok(Box::new(StreamSource::open(path)?))
}

/// Render every recognized table in probe order, then one absence line
/// per format never seen on the image. An image can legitimately carry
/// several tables of the same kind (a standalone disklabel plus one
/// embedded in an MBR slice), so this walks `report.tables` rather than
/// looking tables up by kind.
fn render_text(report: &DiskReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", report.source);

    for table in &report.tables {
        let _ = writeln!(out);
        render_table(&mut out, table);
    }

    for kind in [TableKind::Mbr, TableKind::Gpt, TableKind::Bsd] {
        if report.table(kind).is_none() {
            let _ = writeln!(out);
            let _ = writeln!(out, "No {}", short_name(kind));
        }
    }
    let _ = writeln!(out);
    out
}

fn render_table(out: &mut String, table: &TableReport) {
    let _ = writeln!(out, "{}", table.kind.name());
    if let Some(descriptor) = &table.descriptor {
        match table.kind {
            TableKind::Mbr => {
                let _ = writeln!(out, "Disk serial: {descriptor}");
            }
            TableKind::Gpt => {
                let _ = writeln!(out, "Disk GUID:   {descriptor}");
            }
            TableKind::Bsd => {
                let _ = writeln!(out, "Label:       {descriptor}");
            }
        }
    }
    for warning in &table.warnings {
        let _ = writeln!(out, "Warning: {warning}");
    }

    if table.records.is_empty() {
        let _ = writeln!(out, "No partitions defined.");
        return;
    }

    let _ = writeln!(
        out,
        "{:<5} {:<12} {:<12} {:<40} {}",
        "Index", "Start", "Sectors", "Type", "Note"
    );
    let _ = writeln!(out, "{}", "-".repeat(80));
    for record in &table.records {
        let _ = writeln!(
            out,
            "{:<5} {:<12} {:<12} {:<40} {}",
            record.index, record.start, record.size, record.type_descriptor, record.note
        );
    }
}

/// Short format names used for the absence lines
fn short_name(kind: TableKind) -> &'static str {
    match kind {
        TableKind::Mbr => "MBR",
        TableKind::Gpt => "GPT",
        TableKind::Bsd => "Disklabel",
    }
}

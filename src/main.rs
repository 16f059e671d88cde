//! Scanned Page Gallery CLI
//!
//! Command-line interface for listing the catalog, exporting it to PDF and
//! preparing compressed page assets.

use clap::{Args as ClapArgs, Parser, Subcommand};
use scan_gallery::compress::{format_mb, CompressOptions};
use scan_gallery::file_ops::{compress_directory, DirectoryDelivery, DirectorySource};
use scan_gallery::{
    Catalog, CatalogConfig, ExportOptions, Exporter, PageGeometry, PageOutcome, ProgressEvent,
};
use std::path::PathBuf;
use std::time::Duration;

/// Catalog, export and compress a fixed gallery of scanned pages
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the page catalog
    List(CatalogArgs),
    /// Bind every page image into one PDF
    Export(ExportArgs),
    /// Shrink scanned PNGs into JPEG page assets
    Compress(CompressArgs),
}

#[derive(ClapArgs, Debug)]
struct CatalogArgs {
    /// Number of pages in the catalog
    #[arg(short = 'n', long, default_value = "78")]
    count: usize,

    /// Directory part of every asset path
    #[arg(long, default_value = "compressed_images")]
    directory: String,

    /// Filename prefix of every asset
    #[arg(long, default_value = "2_CamScanner 06-10-2025 08.32")]
    prefix: String,

    /// Asset file extension
    #[arg(long, default_value = "jpg")]
    extension: String,
}

impl CatalogArgs {
    fn config(&self) -> CatalogConfig {
        CatalogConfig {
            count: self.count,
            directory: self.directory.clone(),
            prefix: self.prefix.clone(),
            extension: self.extension.clone(),
        }
    }
}

#[derive(ClapArgs, Debug)]
struct ExportArgs {
    #[command(flatten)]
    catalog: CatalogArgs,

    /// Directory the asset paths are resolved against
    #[arg(short, long, default_value = ".")]
    assets: PathBuf,

    /// Directory the PDF is written to
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Page width in millimetres
    #[arg(long, default_value = "210")]
    page_width: f32,

    /// Page height in millimetres
    #[arg(long, default_value = "297")]
    page_height: f32,

    /// Margin around each image in millimetres
    #[arg(long, default_value = "10")]
    margin: f32,

    /// Pause between pages in milliseconds
    #[arg(long, default_value = "10")]
    pause_ms: u64,

    /// Compress PDF streams (reduces file size); pass `false` to turn off
    #[arg(short, long, action = clap::ArgAction::Set, default_value_t = true)]
    compress_streams: bool,
}

#[derive(ClapArgs, Debug)]
struct CompressArgs {
    /// Directory holding the scanned PNGs
    #[arg(short, long, default_value = ".")]
    input: PathBuf,

    /// Directory the JPEGs are written to
    #[arg(short, long, default_value = "compressed_images")]
    output: PathBuf,

    /// Only files whose names start with this prefix are compressed
    #[arg(short, long, default_value = "2_CamScanner")]
    prefix: String,

    /// JPEG quality (1-100)
    #[arg(short, long, default_value = "85")]
    quality: u8,

    /// Wider images are downscaled to this width
    #[arg(long, default_value = "1200")]
    max_width: u32,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn list(args: &CatalogArgs) {
    let catalog = Catalog::from_config(&args.config());
    for entry in &catalog {
        println!("{:>3}  {:<8}  {}", entry.page_number(), entry.title, entry.asset_path);
    }
}

fn export(args: &ExportArgs) -> anyhow::Result<()> {
    let catalog = Catalog::from_config(&args.catalog.config());
    let exporter = Exporter::new(ExportOptions {
        geometry: PageGeometry {
            width: args.page_width,
            height: args.page_height,
            margin: args.margin,
        },
        inter_page_pause: Duration::from_millis(args.pause_ms),
        compress_streams: args.compress_streams,
    });

    println!("Scanned Page Gallery");
    println!("====================");

    let source = DirectorySource::new(&args.assets);
    let mut delivery = DirectoryDelivery::new(&args.output);
    let mut progress = |event: ProgressEvent| {
        if let ProgressEvent::Page { current, total } = event {
            tracing::info!("Processing page {}/{}...", current, total);
        }
    };

    let report = exporter.export(&catalog, &source, &mut progress, &mut delivery)?;

    for page in &report.pages {
        if let PageOutcome::Fallback { index, reason } = page {
            println!("  Page {} - Image not available ({})", index + 1, reason);
        }
    }
    println!(
        "\nDone! Exported {} pages: {} images, {} unavailable",
        report.page_count(),
        report.image_count(),
        report.fallback_count()
    );
    if let Some(path) = delivery.written() {
        println!("Output saved to: {:?}", path);
    }

    Ok(())
}

fn compress(args: &CompressArgs) -> anyhow::Result<()> {
    let options = CompressOptions {
        quality: args.quality,
        max_width: args.max_width,
    };

    println!("Page Asset Compression");
    println!("======================");

    let summary = compress_directory(&args.input, &args.output, &args.prefix, &options)?;
    if summary.found == 0 {
        println!("No PNG files found matching '{}*.png'", args.prefix);
        return Ok(());
    }

    println!("\nSuccessfully compressed: {}/{} images", summary.succeeded, summary.found);
    println!("Total original size: {}", format_mb(summary.original_bytes));
    println!("Total compressed size: {}", format_mb(summary.compressed_bytes));
    if let Some(savings) = summary.savings_percent() {
        println!("Total space saved: {:.1}%", savings);
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match &args.command {
        Command::List(catalog) => list(catalog),
        Command::Export(export_args) => export(export_args)?,
        Command::Compress(compress_args) => compress(compress_args)?,
    }

    Ok(())
}

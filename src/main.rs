//! PDF Image Recompressor CLI
//!
//! Command-line interface for shrinking the images in a PDF.

use anyhow::{Context, Result};
use clap::Parser;
use lopdf::ObjectId;
use pdf_recompress::{
    dump_pdf_object, file_ops::compress_pdf_file, list_images, CompressOptions, DEFAULT_MAX_DIMENSION,
    DEFAULT_QUALITY,
};
use std::path::PathBuf;

/// Re-encode the raster images of a PDF as JPEG to reduce its size
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PDF file path
    #[arg(short, long)]
    input: PathBuf,

    /// Output PDF file path
    #[arg(short, long, required_unless_present_any = ["list", "dump"])]
    output: Option<PathBuf>,

    /// JPEG quality (1-100)
    #[arg(short, long, default_value_t = DEFAULT_QUALITY)]
    quality: u8,

    /// Images larger than this (in pixels, either side) are downsized
    #[arg(short, long, default_value_t = DEFAULT_MAX_DIMENSION)]
    max_dimension: u32,

    /// Set the document's /Producer
    #[arg(long)]
    producer: Option<String>,

    /// Set the document's /Creator
    #[arg(long)]
    creator: Option<String>,

    /// Name of the staged copy (<ID>_compressed.pdf); defaults to the input file stem
    #[arg(long)]
    staging_id: Option<String>,

    /// Directory for the staged copy; defaults to the system temp directory
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// Leave images that fail to decode untouched instead of aborting
    #[arg(long)]
    skip_failed_images: bool,

    /// List the images in the input and exit
    #[arg(long)]
    list: bool,

    /// Print the object graph under an object ("NUM GEN", e.g. "12 0") and exit
    #[arg(long, value_parser = parse_object_id)]
    dump: Option<ObjectId>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_object_id(s: &str) -> Result<ObjectId, String> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() != 2 {
        return Err("expected \"NUM GEN\"".to_string());
    }
    let number = parts[0].parse().map_err(|_| "Invalid object number".to_string())?;
    let generation = parts[1].parse().map_err(|_| "Invalid generation number".to_string())?;
    Ok((number, generation))
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    if args.list || args.dump.is_some() {
        let bytes = std::fs::read(&args.input)
            .with_context(|| format!("Failed to read input file: {}", args.input.display()))?;

        if let Some(id) = args.dump {
            print!("{}", dump_pdf_object(&bytes, id)?);
        }
        if args.list {
            print_inventory(&bytes)?;
        }
        return Ok(());
    }

    let output = args.output.context("--output is required")?;
    let staging_id = args.staging_id.unwrap_or_else(|| {
        args.input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string())
    });

    let options = CompressOptions {
        quality: args.quality,
        max_dimension: args.max_dimension,
        producer: args.producer,
        creator: args.creator,
        staging_dir: args.staging_dir,
        skip_failed_images: args.skip_failed_images,
    };

    println!("PDF Image Recompressor");
    println!("======================");

    let report = compress_pdf_file(&args.input, &output, &staging_id, &options)?;

    println!(
        "\nDone! Processed {} images: {} rewritten, {} unchanged, {} failed",
        report.total_images, report.rewritten_images, report.unchanged_images, report.failed_images
    );
    println!(
        "Size: {:.2}KB -> {:.2}KB",
        report.original_size as f64 / 1024.0,
        report.compressed_size as f64 / 1024.0
    );
    let duplicates = report.fingerprints.duplicate_groups().count();
    if duplicates > 0 {
        println!("{} groups of identical images found", duplicates);
    }
    println!("Output saved to: {:?}", output);

    Ok(())
}

fn print_inventory(bytes: &[u8]) -> Result<()> {
    let images = list_images(bytes)?;
    println!("{} images", images.len());
    for img in images {
        println!(
            "  {} {} R: {}x{}@{} {} {} smask:{} {} bytes [{}]",
            img.object_id.0,
            img.object_id.1,
            img.width,
            img.height,
            img.bits_per_component,
            img.filter,
            img.color_space,
            img.smask
                .map(|(n, g)| format!("{} {} R", n, g))
                .unwrap_or_else(|| "-".to_string()),
            img.size_bytes,
            img.classification
        );
    }
    Ok(())
}

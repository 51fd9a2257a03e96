//! PDF Image Recompressor Library
//!
//! Shrinks a rendered PDF by re-encoding its embedded raster images. Shared
//! between the CLI and WASM targets.
//!
//! Every indirect object is visited in object-number order; image XObjects
//! are classified, re-encoded as JPEG (downsized when they exceed a maximum
//! dimension), and rewritten only when the new encoding is strictly smaller.

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub mod classify;
pub mod color_space;
pub mod decode;
pub mod error;
pub mod finalize;
pub mod inspect;
pub mod recompress;
pub mod rewrite;
pub mod walker;

pub use classify::{Classification, ContentFingerprint, ImageDictionary};
pub use color_space::ColorSpace;
pub use error::{CompressError, ImageError};
pub use recompress::{resize_target, RecompressionResult};
pub use walker::{walk_images, FingerprintIndex, WalkSummary};

use lopdf::{Document, Object, ObjectId};
use std::path::PathBuf;

/// Default JPEG quality
pub const DEFAULT_QUALITY: u8 = 70;
/// Default maximum raster dimension in pixels
pub const DEFAULT_MAX_DIMENSION: u32 = 800;

/// Options for PDF image recompression
#[derive(Debug, Clone)]
pub struct CompressOptions {
    /// JPEG quality (1-100)
    pub quality: u8,
    /// Images wider or taller than this are downsized to fit
    pub max_dimension: u32,
    /// Override for the document's /Producer
    pub producer: Option<String>,
    /// Override for the document's /Creator
    pub creator: Option<String>,
    /// Where the staged copy of the output is written (OS temp dir if unset)
    pub staging_dir: Option<PathBuf>,
    /// Leave images that fail to decode or encode untouched instead of
    /// aborting the whole pass
    pub skip_failed_images: bool,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_dimension: DEFAULT_MAX_DIMENSION,
            producer: None,
            creator: None,
            staging_dir: None,
            skip_failed_images: false,
        }
    }
}

impl CompressOptions {
    pub fn validate(&self) -> Result<(), CompressError> {
        if self.quality == 0 || self.quality > 100 {
            return Err(CompressError::InvalidQuality);
        }
        if self.max_dimension == 0 {
            return Err(CompressError::InvalidMaxDimension);
        }
        Ok(())
    }
}

/// Terminal state of one image after the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    Rewritten,
    Unchanged,
    /// Decoding or encoding failed and the image was left as-is
    Failed,
}

/// Per-image record of the pass
#[derive(Debug, Clone)]
pub struct ImageOutcome {
    pub object_id: ObjectId,
    /// `None` when the image could not be decoded
    pub classification: Option<Classification>,
    pub state: ImageState,
    pub original_length: usize,
    pub final_length: usize,
    pub original_dimensions: (u32, u32),
    pub final_dimensions: (u32, u32),
    pub fingerprint: Option<ContentFingerprint>,
}

/// Result of a compression pass
#[derive(Debug, Clone)]
pub struct CompressionReport {
    pub total_images: usize,
    pub rewritten_images: usize,
    pub unchanged_images: usize,
    pub failed_images: usize,
    /// Input document size in bytes
    pub original_size: usize,
    /// Output document size in bytes
    pub compressed_size: usize,
    /// Images in object-number order
    pub images: Vec<ImageOutcome>,
    /// Images grouped by identical decoded contents
    pub fingerprints: FingerprintIndex,
    /// Location of the staged copy, if one was written
    pub staged_path: Option<PathBuf>,
}

impl CompressionReport {
    fn new(summary: WalkSummary, original_size: usize, compressed_size: usize) -> Self {
        let count = |state: ImageState| summary.images.iter().filter(|i| i.state == state).count();
        Self {
            total_images: summary.images.len(),
            rewritten_images: count(ImageState::Rewritten),
            unchanged_images: count(ImageState::Unchanged),
            failed_images: count(ImageState::Failed),
            original_size,
            compressed_size,
            images: summary.images,
            fingerprints: summary.fingerprints,
            staged_path: None,
        }
    }
}

/// Load a document, mapping parser failures to `LoadError`
pub fn load_document(bytes: &[u8]) -> Result<Document, CompressError> {
    Document::load_mem(bytes).map_err(|e| CompressError::LoadError(e.to_string()))
}

/// Recompress the images of a PDF and return the new PDF bytes.
///
/// `staging_id` names the staged copy `<staging_id>_compressed.pdf` and must
/// be a plain file name. On any error nothing is written.
pub fn compress_pdf_bytes(
    input_bytes: &[u8],
    staging_id: &str,
    options: &CompressOptions,
) -> Result<(Vec<u8>, CompressionReport), CompressError> {
    options.validate()?;
    finalize::validate_staging_id(staging_id)?;

    log::info!(
        "Starting PDF compression: quality {}, max dimension {}",
        options.quality,
        options.max_dimension
    );

    let mut doc = load_document(input_bytes)?;
    log::debug!("PDF document loaded ({} objects)", doc.objects.len());

    let summary = walk_images(&mut doc, options)?;
    log::info!("Found {} images in PDF", summary.images.len());
    for (fingerprint, ids) in summary.fingerprints.duplicate_groups() {
        log::debug!("Identical image data {} shared by {:?}", fingerprint, ids);
    }

    finalize::apply_metadata(&mut doc, options.producer.as_deref(), options.creator.as_deref());
    let output_bytes = finalize::serialize(&mut doc)?;

    let original_kb = input_bytes.len() as f64 / 1024.0;
    let compressed_kb = output_bytes.len() as f64 / 1024.0;
    log::info!("Original PDF size: {:.2}KB", original_kb);
    log::info!("Compressed PDF size: {:.2}KB", compressed_kb);
    log::info!("Size difference: {:.2}KB", original_kb - compressed_kb);

    let mut report = CompressionReport::new(summary, input_bytes.len(), output_bytes.len());
    report.staged_path = stage_output(&output_bytes, staging_id, options)?;

    Ok((output_bytes, report))
}

#[cfg(not(target_arch = "wasm32"))]
fn stage_output(
    output_bytes: &[u8],
    staging_id: &str,
    options: &CompressOptions,
) -> Result<Option<PathBuf>, CompressError> {
    let dir = options.staging_dir.clone().unwrap_or_else(std::env::temp_dir);
    let path = finalize::stage(output_bytes, &dir, staging_id)?;
    log::debug!("Staged output at {:?}", path);
    Ok(Some(path))
}

/// No filesystem to stage into
#[cfg(target_arch = "wasm32")]
fn stage_output(
    _output_bytes: &[u8],
    _staging_id: &str,
    _options: &CompressOptions,
) -> Result<Option<PathBuf>, CompressError> {
    Ok(None)
}

/// Information about a single image XObject
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub object_id: ObjectId,
    pub classification: Classification,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u32,
    pub color_space: String,
    pub filter: String,
    pub smask: Option<ObjectId>,
    /// Stored size in bytes
    pub size_bytes: usize,
}

/// List the image XObjects of a PDF without modifying it
pub fn list_images(pdf_bytes: &[u8]) -> Result<Vec<ImageInfo>, CompressError> {
    let doc = load_document(pdf_bytes)?;

    let images = doc
        .objects
        .iter()
        .filter_map(|(&id, object)| match object {
            Object::Stream(stream) if walker::is_image_candidate(&stream.dict) => {
                let info = ImageDictionary::read(&doc, stream);
                Some(ImageInfo {
                    object_id: id,
                    classification: info.classify(),
                    width: info.width,
                    height: info.height,
                    bits_per_component: info.bits_per_component,
                    color_space: info.color_space.to_string(),
                    filter: info.filter.to_string(),
                    smask: info.smask,
                    size_bytes: info.length,
                })
            }
            _ => None,
        })
        .collect();

    Ok(images)
}

/// Pretty-print the indirect object `id` and everything it references
pub fn dump_pdf_object(pdf_bytes: &[u8], id: ObjectId) -> Result<String, CompressError> {
    let doc = load_document(pdf_bytes)?;
    inspect::dump_indirect(&doc, id).ok_or(CompressError::ObjectNotFound(id.0, id.1))
}

#[cfg(not(target_arch = "wasm32"))]
pub mod file_ops {
    use super::*;
    use std::path::Path;

    /// Recompress a PDF from file path to file path
    pub fn compress_pdf_file(
        input_path: &Path,
        output_path: &Path,
        staging_id: &str,
        options: &CompressOptions,
    ) -> Result<CompressionReport, CompressError> {
        let input_bytes = std::fs::read(input_path)
            .map_err(|e| CompressError::LoadError(format!("{:?}: {}", input_path, e)))?;

        let (output_bytes, report) = compress_pdf_bytes(&input_bytes, staging_id, options)?;

        std::fs::write(output_path, output_bytes)
            .map_err(|e| CompressError::SaveError(format!("{:?}: {}", output_path, e)))?;

        Ok(report)
    }
}

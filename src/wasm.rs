//! WebAssembly bindings for the PDF Image Recompressor

use crate::{compress_pdf_bytes, list_images, CompressOptions, CompressionReport, ImageState};
use wasm_bindgen::prelude::*;

/// Forwards `log` records to the browser console
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = format!("[{}] {}", record.level(), record.args());
        web_sys::console::log_1(&js_sys::JsString::from(line).into());
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(log::LevelFilter::Warn);
}

/// Enable info (`verbose = false`) or debug (`verbose = true`) logging
#[wasm_bindgen]
pub fn set_verbose(verbose: bool) {
    log::set_max_level(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
}

fn options(
    quality: Option<u8>,
    max_dimension: Option<u32>,
    producer: Option<String>,
    creator: Option<String>,
) -> CompressOptions {
    let defaults = CompressOptions::default();
    CompressOptions {
        quality: quality.unwrap_or(defaults.quality),
        max_dimension: max_dimension.unwrap_or(defaults.max_dimension),
        producer,
        creator,
        ..defaults
    }
}

/// Recompress the images in a PDF
///
/// # Arguments
/// * `pdf_bytes` - The input PDF file as a byte array
/// * `quality` - JPEG quality 1-100 (default: 70)
/// * `max_dimension` - Maximum image width/height in pixels (default: 800)
/// * `producer` / `creator` - Optional document metadata overrides
///
/// # Returns
/// The recompressed PDF as a byte array, or throws an error
#[wasm_bindgen]
pub fn compress_pdf(
    pdf_bytes: &[u8],
    quality: Option<u8>,
    max_dimension: Option<u32>,
    producer: Option<String>,
    creator: Option<String>,
) -> Result<Vec<u8>, JsError> {
    let options = options(quality, max_dimension, producer, creator);
    let (output_bytes, _report) =
        compress_pdf_bytes(pdf_bytes, "wasm", &options).map_err(|e| JsError::new(&e.to_string()))?;
    Ok(output_bytes)
}

/// Recompress the images in a PDF and return the result with statistics
#[wasm_bindgen]
pub fn compress_pdf_with_info(
    pdf_bytes: &[u8],
    quality: Option<u8>,
    max_dimension: Option<u32>,
    producer: Option<String>,
    creator: Option<String>,
) -> Result<CompressResultJs, JsError> {
    let options = options(quality, max_dimension, producer, creator);
    let (output_bytes, report) =
        compress_pdf_bytes(pdf_bytes, "wasm", &options).map_err(|e| JsError::new(&e.to_string()))?;

    let report_json = serde_json::to_string(&report_to_json(&report)).unwrap_or_else(|_| "{}".to_string());

    Ok(CompressResultJs {
        pdf_bytes: output_bytes,
        total_images: report.total_images,
        rewritten_images: report.rewritten_images,
        original_size: report.original_size,
        compressed_size: report.compressed_size,
        report_json,
    })
}

/// List the images in a PDF as a JSON array
#[wasm_bindgen]
pub fn list_pdf_images(pdf_bytes: &[u8]) -> Result<String, JsError> {
    let images = list_images(pdf_bytes).map_err(|e| JsError::new(&e.to_string()))?;
    let json: Vec<serde_json::Value> = images
        .iter()
        .map(|img| {
            serde_json::json!({
                "objectId": format!("{} {}", img.object_id.0, img.object_id.1),
                "classification": img.classification.to_string(),
                "width": img.width,
                "height": img.height,
                "colorSpace": img.color_space,
                "bpc": img.bits_per_component,
                "filter": img.filter,
                "smask": img.smask.map(|(n, g)| format!("{} {}", n, g)),
                "size": img.size_bytes,
            })
        })
        .collect();
    serde_json::to_string(&json).map_err(|e| JsError::new(&e.to_string()))
}

/// Convert a report to a JSON-serializable structure
fn report_to_json(report: &CompressionReport) -> serde_json::Value {
    serde_json::json!({
        "totalImages": report.total_images,
        "rewrittenImages": report.rewritten_images,
        "unchangedImages": report.unchanged_images,
        "failedImages": report.failed_images,
        "originalSize": report.original_size,
        "compressedSize": report.compressed_size,
        "images": report.images.iter().map(|img| {
            serde_json::json!({
                "objectId": format!("{} {}", img.object_id.0, img.object_id.1),
                "classification": img.classification.map(|c| c.to_string()),
                "state": match img.state {
                    ImageState::Rewritten => "rewritten",
                    ImageState::Unchanged => "unchanged",
                    ImageState::Failed => "failed",
                },
                "originalSize": img.original_length,
                "finalSize": img.final_length,
                "originalDimensions": [img.original_dimensions.0, img.original_dimensions.1],
                "finalDimensions": [img.final_dimensions.0, img.final_dimensions.1],
                "fingerprint": img.fingerprint.map(|f| f.to_string()),
            })
        }).collect::<Vec<_>>(),
        "duplicateGroups": report.fingerprints.duplicate_groups().map(|(fingerprint, ids)| {
            serde_json::json!({
                "fingerprint": fingerprint.to_string(),
                "objectIds": ids.iter().map(|(n, g)| format!("{} {}", n, g)).collect::<Vec<_>>(),
            })
        }).collect::<Vec<_>>(),
    })
}

/// Result of PDF recompression with statistics
#[wasm_bindgen]
pub struct CompressResultJs {
    pdf_bytes: Vec<u8>,
    total_images: usize,
    rewritten_images: usize,
    original_size: usize,
    compressed_size: usize,
    report_json: String,
}

#[wasm_bindgen]
impl CompressResultJs {
    /// Get the recompressed PDF bytes
    #[wasm_bindgen(getter)]
    pub fn pdf_bytes(&self) -> Vec<u8> {
        self.pdf_bytes.clone()
    }

    /// Get the total number of images found
    #[wasm_bindgen(getter)]
    pub fn total_images(&self) -> usize {
        self.total_images
    }

    /// Get the number of images that were rewritten
    #[wasm_bindgen(getter)]
    pub fn rewritten_images(&self) -> usize {
        self.rewritten_images
    }

    /// Get the input size in bytes
    #[wasm_bindgen(getter)]
    pub fn original_size(&self) -> usize {
        self.original_size
    }

    /// Get the output size in bytes
    #[wasm_bindgen(getter)]
    pub fn compressed_size(&self) -> usize {
        self.compressed_size
    }

    /// Get the detailed report as a JSON string
    #[wasm_bindgen(getter)]
    pub fn report_json(&self) -> String {
        self.report_json.clone()
    }
}

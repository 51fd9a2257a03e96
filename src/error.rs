use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole compression pass
#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Quality must be between 1 and 100")]
    InvalidQuality,

    #[error("Maximum dimension must be greater than 0")]
    InvalidMaxDimension,

    #[error("Invalid staging identifier {0:?}")]
    InvalidStagingId(String),

    #[error("Failed to load PDF: {0}")]
    LoadError(String),

    #[error("Failed to process image {number} {generation} R: {source}")]
    Image {
        number: u32,
        generation: u16,
        #[source]
        source: ImageError,
    },

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Failed to stage output at {path:?}: {source}")]
    StagingError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Object {0} {1} R not found")]
    ObjectNotFound(u32, u16),
}

impl CompressError {
    pub(crate) fn image(id: lopdf::ObjectId, source: ImageError) -> Self {
        CompressError::Image {
            number: id.0,
            generation: id.1,
            source,
        }
    }
}

/// Errors raised while decoding or re-encoding a single image
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to inflate stream: {0}")]
    Inflate(#[from] std::io::Error),

    #[error("Pixel buffer too small: got {actual} bytes, expected {expected}")]
    PixelBufferSize { expected: usize, actual: usize },

    #[error("Failed to decode JPEG: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to encode JPEG: {0}")]
    Encode(#[from] jpeg_encoder::EncodingError),

    #[error("Image {width}x{height} exceeds the JPEG size limit")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

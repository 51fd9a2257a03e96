//! Recompression engine: re-encodes or downsizes pixel data according to an
//! image's classification.

use crate::classify::{Classification, ClassifiedImage};
use crate::color_space::ColorSpace;
use crate::error::ImageError;
use image::{DynamicImage, ImageFormat, RgbImage};

/// Newly encoded contents for an image, waiting to be committed
#[derive(Debug, Clone)]
pub struct RecompressionResult {
    /// JPEG bytes
    pub data: Vec<u8>,
    /// Set only when the image was resized
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Set when the encoded colour model differs from the declared one
    pub color_space: Option<ColorSpace>,
}

/// Settings shared by every image in a pass
#[derive(Debug, Clone, Copy)]
pub struct Recompressor {
    pub quality: u8,
    pub max_dimension: u32,
}

impl Recompressor {
    pub fn new(quality: u8, max_dimension: u32) -> Self {
        Self {
            quality,
            max_dimension,
        }
    }

    /// Produce a candidate encoding for an image, or `None` when the
    /// classification leaves it alone.
    pub fn recompress(&self, image: &ClassifiedImage<'_>) -> Result<Option<RecompressionResult>, ImageError> {
        match image.classification {
            Classification::RawGrayMask | Classification::Unsupported => Ok(None),
            Classification::RawRgb => self.recompress_raw_rgb(image).map(Some),
            Classification::Jpeg => self.recompress_jpeg(image),
        }
    }

    fn recompress_raw_rgb(&self, image: &ClassifiedImage<'_>) -> Result<RecompressionResult, ImageError> {
        let (width, height) = (image.dict.width, image.dict.height);
        let rgb = rgb_from_raw(&image.decoded, width, height)?;
        let img = DynamicImage::ImageRgb8(rgb);

        if exceeds_bound(width, height, self.max_dimension) {
            let (target_width, target_height) = resize_target(width, height, self.max_dimension);
            log::debug!(
                "  Resizing raw RGB from {}x{} to {}x{}",
                width,
                height,
                target_width,
                target_height
            );
            let resized = resample_image(&img, target_width, target_height);
            let data = encode_jpeg(&resized, self.quality)?;
            Ok(RecompressionResult {
                data,
                width: Some(target_width),
                height: Some(target_height),
                color_space: None,
            })
        } else {
            let data = encode_jpeg(&img, self.quality)?;
            Ok(RecompressionResult {
                data,
                width: None,
                height: None,
                color_space: None,
            })
        }
    }

    fn recompress_jpeg(&self, image: &ClassifiedImage<'_>) -> Result<Option<RecompressionResult>, ImageError> {
        // Declared dimensions decide whether the payload needs decoding at all
        if !exceeds_bound(image.dict.width, image.dict.height, self.max_dimension) {
            return Ok(None);
        }

        let img = image::load_from_memory_with_format(&image.decoded, ImageFormat::Jpeg)?;
        let (width, height) = (img.width(), img.height());
        if !exceeds_bound(width, height, self.max_dimension) {
            return Ok(None);
        }

        let (target_width, target_height) = resize_target(width, height, self.max_dimension);
        log::debug!(
            "  Resizing JPEG from {}x{} to {}x{}",
            width,
            height,
            target_width,
            target_height
        );
        let resized = resample_image(&img, target_width, target_height);
        let data = encode_jpeg(&resized, self.quality)?;

        let color_space = match (&resized, &image.dict.color_space) {
            (DynamicImage::ImageLuma8(_), _) | (_, ColorSpace::DeviceRgb) => None,
            _ => Some(ColorSpace::DeviceRgb),
        };

        Ok(Some(RecompressionResult {
            data,
            width: Some(target_width),
            height: Some(target_height),
            color_space,
        }))
    }
}

/// Whether either dimension is over the bound
pub fn exceeds_bound(width: u32, height: u32, max_dimension: u32) -> bool {
    width > max_dimension || height > max_dimension
}

/// Target size that fits `max_dimension` while preserving aspect ratio.
///
/// Landscape images get `max_dimension` as width; portrait and square
/// images get it as height.
pub fn resize_target(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if height == 0 {
        return (max_dimension, 1);
    }
    let aspect = width as f64 / height as f64;
    let max = max_dimension as f64;
    if aspect > 1.0 {
        (max_dimension, ((max / aspect).round() as u32).max(1))
    } else {
        (((max * aspect).round() as u32).max(1), max_dimension)
    }
}

/// Interpret packed 8-bit RGB rows as an image
fn rgb_from_raw(decoded: &[u8], width: u32, height: u32) -> Result<RgbImage, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions { width, height });
    }
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or(ImageError::InvalidDimensions { width, height })?;
    if decoded.len() < expected {
        return Err(ImageError::PixelBufferSize {
            expected,
            actual: decoded.len(),
        });
    }
    RgbImage::from_raw(width, height, decoded[..expected].to_vec()).ok_or(ImageError::PixelBufferSize {
        expected,
        actual: decoded.len(),
    })
}

/// Resample an image to target dimensions
fn resample_image(img: &DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    img.resize_exact(
        target_width,
        target_height,
        image::imageops::FilterType::Lanczos3,
    )
}

/// Encode as baseline JPEG, keeping grayscale images single-channel
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let (width, height) = (img.width(), img.height());
    if width > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err(ImageError::DimensionsTooLarge { width, height });
    }

    let mut jpeg_bytes = Vec::new();
    match img {
        DynamicImage::ImageLuma8(gray) => {
            let encoder = jpeg_encoder::Encoder::new(&mut jpeg_bytes, quality);
            encoder.encode(
                gray.as_raw(),
                width as u16,
                height as u16,
                jpeg_encoder::ColorType::Luma,
            )?;
        }
        _ => {
            let rgb = img.to_rgb8();
            let mut encoder = jpeg_encoder::Encoder::new(&mut jpeg_bytes, quality);
            encoder.set_sampling_factor(jpeg_encoder::SamplingFactor::R_4_2_0);
            encoder.encode(
                rgb.as_raw(),
                width as u16,
                height as u16,
                jpeg_encoder::ColorType::Rgb,
            )?;
        }
    }
    Ok(jpeg_bytes)
}

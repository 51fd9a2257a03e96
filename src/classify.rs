//! Image classification.
//!
//! Each image XObject is read once into an [`ImageDictionary`], its contents
//! are decoded, and it is put into exactly one [`Classification`] that drives
//! the recompression engine.

use crate::color_space::{resolve_color_space, special_family, ColorSpace};
use crate::decode::{decode_contents, Filter};
use crate::error::ImageError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::borrow::Cow;
use std::fmt;

/// How an image will be treated by the recompression engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Already a DCT (JPEG) payload
    Jpeg,
    /// Deflated 8-bit RGB pixel rows
    RawRgb,
    /// Deflated grayscale, treated as a soft mask and never touched
    RawGrayMask,
    Unsupported,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Classification::Jpeg => "jpeg",
            Classification::RawRgb => "raw-rgb",
            Classification::RawGrayMask => "raw-gray-mask",
            Classification::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// 128-bit MD5 digest of an image's decoded contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentFingerprint([u8; 16]);

impl ContentFingerprint {
    pub fn of(data: &[u8]) -> Self {
        ContentFingerprint(md5::compute(data).0)
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Structural attributes of an image XObject
#[derive(Debug, Clone)]
pub struct ImageDictionary {
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u32,
    pub color_space: ColorSpace,
    /// `Indexed`, `Separation` or `DeviceN` when the colour space is one of those
    pub special_family: Option<String>,
    pub filter: Filter,
    pub smask: Option<ObjectId>,
    pub image_mask: bool,
    /// `/Predictor` from `/DecodeParms`, if any
    pub predictor: Option<i64>,
    /// Byte length of the stored contents
    pub length: usize,
}

impl ImageDictionary {
    pub fn read(doc: &Document, stream: &Stream) -> Self {
        let dict = &stream.dict;

        let smask = match dict.get(b"SMask") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };

        let predictor = match dict.get(b"DecodeParms") {
            Ok(Object::Dictionary(parms)) => get_integer(parms, b"Predictor"),
            Ok(Object::Array(arr)) => arr.iter().find_map(|p| match p {
                Object::Dictionary(parms) => get_integer(parms, b"Predictor"),
                _ => None,
            }),
            _ => None,
        };

        let color_space = dict.get(b"ColorSpace").ok();

        ImageDictionary {
            width: get_u32(dict, b"Width").unwrap_or(0),
            height: get_u32(dict, b"Height").unwrap_or(0),
            bits_per_component: get_u32(dict, b"BitsPerComponent").unwrap_or(8),
            color_space: resolve_color_space(doc, color_space),
            special_family: special_family(doc, color_space),
            filter: Filter::from_dict(dict),
            smask,
            image_mask: matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))),
            predictor,
            length: stream.content.len(),
        }
    }

    /// Whether the raw pixel rows are laid out as packed 8-bit samples
    fn has_packed_rows(&self) -> bool {
        self.bits_per_component == 8
            && !self.image_mask
            && self.special_family.is_none()
            && self.predictor.unwrap_or(1) <= 1
    }

    pub fn classify(&self) -> Classification {
        match (&self.filter, &self.color_space) {
            (Filter::Dct, _) => Classification::Jpeg,
            (Filter::Flate, ColorSpace::DeviceRgb) if self.has_packed_rows() => Classification::RawRgb,
            (Filter::Flate, ColorSpace::DeviceGray) => Classification::RawGrayMask,
            _ => Classification::Unsupported,
        }
    }
}

fn get_integer(dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match dict.get(key) {
        Ok(Object::Integer(n)) => Some(*n),
        Ok(Object::Real(n)) => Some(*n as i64),
        _ => None,
    }
}

/// Non-negative integer that fits in `u32`; anything else reads as absent
fn get_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    get_integer(dict, key).and_then(|n| u32::try_from(n).ok())
}

/// An image after decoding and classification
#[derive(Debug)]
pub struct ClassifiedImage<'a> {
    pub dict: ImageDictionary,
    pub classification: Classification,
    /// Contents with the deflate filter undone; JPEG payloads are untouched
    pub decoded: Cow<'a, [u8]>,
    pub fingerprint: ContentFingerprint,
}

/// Decode, resolve and classify one image stream
pub fn classify_image<'a>(doc: &Document, stream: &'a Stream) -> Result<ClassifiedImage<'a>, ImageError> {
    let dict = ImageDictionary::read(doc, stream);
    let decoded = decode_contents(&dict.filter, &stream.content)?;
    let fingerprint = ContentFingerprint::of(&decoded);
    let classification = dict.classify();

    Ok(ClassifiedImage {
        dict,
        classification,
        decoded,
        fingerprint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn image(dict: Dictionary) -> Stream {
        let mut base = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2,
            "Height" => 2,
            "BitsPerComponent" => 8,
        };
        for (key, value) in dict.iter() {
            base.set(key.clone(), value.clone());
        }
        Stream::new(base, vec![0u8; 12])
    }

    fn classification_of(dict: Dictionary) -> Classification {
        let doc = Document::with_version("1.5");
        ImageDictionary::read(&doc, &image(dict)).classify()
    }

    #[test]
    fn classification_table() {
        assert_eq!(
            classification_of(dictionary! { "Filter" => "DCTDecode", "ColorSpace" => "DeviceCMYK" }),
            Classification::Jpeg
        );
        assert_eq!(
            classification_of(dictionary! { "Filter" => "FlateDecode", "ColorSpace" => "DeviceRGB" }),
            Classification::RawRgb
        );
        assert_eq!(
            classification_of(dictionary! { "Filter" => "FlateDecode", "ColorSpace" => "DeviceGray" }),
            Classification::RawGrayMask
        );
        assert_eq!(
            classification_of(dictionary! { "Filter" => "FlateDecode", "ColorSpace" => "DeviceCMYK" }),
            Classification::Unsupported
        );
        assert_eq!(
            classification_of(dictionary! { "ColorSpace" => "DeviceRGB" }),
            Classification::Unsupported
        );
        assert_eq!(
            classification_of(dictionary! { "Filter" => "JPXDecode" }),
            Classification::Unsupported
        );
    }

    #[test]
    fn missing_color_space_is_rgb() {
        assert_eq!(
            classification_of(dictionary! { "Filter" => "FlateDecode" }),
            Classification::RawRgb
        );
    }

    #[test]
    fn unusual_rgb_layouts_are_unsupported() {
        assert_eq!(
            classification_of(dictionary! {
                "Filter" => "FlateDecode",
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 16,
            }),
            Classification::Unsupported
        );
        assert_eq!(
            classification_of(dictionary! {
                "Filter" => "FlateDecode",
                "ColorSpace" => "DeviceRGB",
                "DecodeParms" => dictionary! { "Predictor" => 15, "Colors" => 3, "Columns" => 2 },
            }),
            Classification::Unsupported
        );
        assert_eq!(
            classification_of(dictionary! {
                "Filter" => "FlateDecode",
                "ImageMask" => true,
                "BitsPerComponent" => 1,
            }),
            Classification::Unsupported
        );
    }

    #[test]
    fn palette_and_tint_images_are_unsupported() {
        let indexed = Object::Array(vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(b"DeviceRGB".to_vec()),
            Object::Integer(255),
            Object::String(vec![0; 768], lopdf::StringFormat::Hexadecimal),
        ]);
        assert_eq!(
            classification_of(dictionary! { "Filter" => "FlateDecode", "ColorSpace" => indexed }),
            Classification::Unsupported
        );

        let device_n = Object::Array(vec![
            Object::Name(b"DeviceN".to_vec()),
            Object::Array(vec![Object::Name(b"Cyan".to_vec())]),
            Object::Name(b"DeviceRGB".to_vec()),
            Object::Null,
        ]);
        assert_eq!(
            classification_of(dictionary! { "Filter" => "FlateDecode", "ColorSpace" => device_n }),
            Classification::Unsupported
        );
    }

    #[test]
    fn out_of_range_dimensions_read_as_zero() {
        let doc = Document::with_version("1.5");
        let stream = image(dictionary! {
            "Filter" => "FlateDecode",
            "Width" => 1i64 << 33,
            "Height" => -4,
        });
        let info = ImageDictionary::read(&doc, &stream);
        assert_eq!((info.width, info.height), (0, 0));
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = ContentFingerprint::of(b"pixels");
        let b = ContentFingerprint::of(b"pixels");
        let c = ContentFingerprint::of(b"other pixels");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string().len(), 32);
    }

    #[test]
    fn reads_dictionary_fields() {
        let doc = Document::with_version("1.5");
        let stream = image(dictionary! {
            "Filter" => "FlateDecode",
            "SMask" => Object::Reference((7, 0)),
        });
        let info = ImageDictionary::read(&doc, &stream);
        assert_eq!((info.width, info.height), (2, 2));
        assert_eq!(info.bits_per_component, 8);
        assert_eq!(info.smask, Some((7, 0)));
        assert_eq!(info.length, 12);
        assert_eq!(info.filter, Filter::Flate);
    }
}

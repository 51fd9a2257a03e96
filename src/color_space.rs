//! Colour space resolution for image dictionaries.
//!
//! Resolution is fail-open: anything that cannot be followed resolves to
//! `DeviceRGB` instead of aborting the pass.

use crate::decode::{decode_contents, Filter};
use lopdf::{Document, Object, ObjectId};
use std::fmt;

/// Canonical colour model of an image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ColorSpace {
    #[default]
    DeviceRgb,
    DeviceGray,
    /// Any other name, e.g. `DeviceCMYK` or an ICC alternate
    Other(String),
}

impl ColorSpace {
    pub fn from_name(name: &[u8]) -> ColorSpace {
        match name {
            b"DeviceRGB" => ColorSpace::DeviceRgb,
            b"DeviceGray" => ColorSpace::DeviceGray,
            other => ColorSpace::Other(String::from_utf8_lossy(other).to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ColorSpace::DeviceRgb => "DeviceRGB",
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::Other(name) => name,
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the `/ColorSpace` entry of an image.
///
/// A direct name is returned verbatim, as is a name reached through one
/// reference. A reference is looked up; when it points at an array (e.g. `[/ICCBased 12 0 R]`) the array's reference
/// elements are followed one more level and the profile stream's
/// `/Alternate` name wins. Inline arrays are scanned the same way.
pub fn resolve_color_space(doc: &Document, descriptor: Option<&Object>) -> ColorSpace {
    match descriptor {
        Some(Object::Name(name)) => ColorSpace::from_name(name),
        Some(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => scan_array(doc, items),
            Ok(Object::Name(name)) => ColorSpace::from_name(name),
            Ok(_) => ColorSpace::default(),
            Err(e) => {
                log::debug!("ColorSpace {:?} not found ({}), using DeviceRGB", id, e);
                ColorSpace::default()
            }
        },
        Some(Object::Array(items)) => scan_array(doc, items),
        _ => ColorSpace::default(),
    }
}

/// Family name of a colour space whose samples are not device components
/// (`Indexed`, `Separation`, `DeviceN`), whether given inline or by reference.
///
/// Such images carry one sample per palette index or tint, so their rows are
/// never packed RGB even when the underlying space resolves to `DeviceRGB`.
pub fn special_family(doc: &Document, descriptor: Option<&Object>) -> Option<String> {
    let items = match descriptor {
        Some(Object::Array(items)) => items,
        Some(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };
    match items.first() {
        Some(Object::Name(name))
            if matches!(name.as_slice(), b"Indexed" | b"Separation" | b"DeviceN") =>
        {
            Some(String::from_utf8_lossy(name).to_string())
        }
        _ => None,
    }
}

/// Names inside the array are ignored; the last resolvable reference decides.
fn scan_array(doc: &Document, items: &[Object]) -> ColorSpace {
    let mut resolved = ColorSpace::default();
    for item in items {
        if let Object::Reference(id) = item {
            if doc.get_object(*id).is_ok() {
                resolved = alternate_of(doc, *id).unwrap_or_default();
            } else {
                log::debug!("ColorSpace array element {:?} not found", id);
            }
        }
    }
    resolved
}

/// Read `/Alternate` from an ICC profile stream, decoding the profile to
/// make sure it is readable.
fn alternate_of(doc: &Document, id: ObjectId) -> Option<ColorSpace> {
    let stream = match doc.get_object(id) {
        Ok(Object::Stream(s)) => s,
        _ => return None,
    };

    let alternate = match stream.dict.get(b"Alternate") {
        Ok(Object::Name(name)) => ColorSpace::from_name(name),
        _ => {
            log::debug!("ICC profile {:?} has no Alternate, using DeviceRGB", id);
            return None;
        }
    };

    let filter = Filter::from_dict(&stream.dict);
    match decode_contents(&filter, &stream.content) {
        Ok(profile) => {
            log::debug!(
                "ICC profile {:?}: Alternate {} ({} bytes)",
                id,
                alternate,
                profile.len()
            );
            Some(alternate)
        }
        Err(e) => {
            log::debug!("ICC profile {:?} could not be decoded: {}", id, e);
            None
        }
    }
}

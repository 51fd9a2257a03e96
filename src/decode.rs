//! Stream filter handling.
//!
//! Only the two filters the recompressor acts on are recognised: deflate
//! (raw pixel rows) and DCT (already a JPEG payload). Everything else is
//! carried through untouched.

use crate::error::ImageError;
use flate2::read::ZlibDecoder;
use lopdf::{Dictionary, Object};
use std::borrow::Cow;
use std::fmt;
use std::io::Read;

/// The encoding declared by a stream's `/Filter` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// No filter, contents are stored as-is
    None,
    /// `FlateDecode`
    Flate,
    /// `DCTDecode`
    Dct,
    /// Any other filter, or a chain of more than one
    Other(String),
}

impl Filter {
    /// Read the filter from a stream dictionary.
    ///
    /// A one-element filter array is the same as the bare name.
    pub fn from_dict(dict: &Dictionary) -> Filter {
        match dict.get(b"Filter") {
            Ok(Object::Name(name)) => Filter::from_name(name),
            Ok(Object::Array(arr)) => match arr.as_slice() {
                [] => Filter::None,
                [Object::Name(name)] => Filter::from_name(name),
                chain => Filter::Other(
                    chain
                        .iter()
                        .map(|f| match f {
                            Object::Name(n) => String::from_utf8_lossy(n).to_string(),
                            _ => "?".to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(","),
                ),
            },
            _ => Filter::None,
        }
    }

    fn from_name(name: &[u8]) -> Filter {
        match name {
            b"FlateDecode" => Filter::Flate,
            b"DCTDecode" => Filter::Dct,
            other => Filter::Other(String::from_utf8_lossy(other).to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Filter::None => "raw",
            Filter::Flate => "FlateDecode",
            Filter::Dct => "DCTDecode",
            Filter::Other(name) => name,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inflate zlib-wrapped deflate data
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded)?;
    Ok(decoded)
}

/// Undo the stream filter when it is deflate; every other filter is
/// returned as-is.
pub fn decode_contents<'a>(filter: &Filter, content: &'a [u8]) -> Result<Cow<'a, [u8]>, ImageError> {
    match filter {
        Filter::Flate => inflate(content).map(Cow::Owned),
        Filter::None | Filter::Dct | Filter::Other(_) => Ok(Cow::Borrowed(content)),
    }
}

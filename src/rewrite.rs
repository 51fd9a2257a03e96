//! Dictionary rewriter: commits a recompression result to an image stream.

use crate::recompress::RecompressionResult;
use lopdf::{Object, Stream};

/// What happened when a candidate encoding was offered to an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Contents and dictionary were replaced
    Rewritten { saved: usize },
    /// The candidate was not smaller; nothing changed
    Discarded { growth: usize },
}

/// Replace an image's contents with `result` if that strictly shrinks it.
///
/// The new dictionary is built off to the side and swapped in together with
/// the contents, so `Length`, `Filter` and the dimensions never disagree with
/// the stored bytes.
pub fn apply_result(stream: &mut Stream, result: RecompressionResult) -> RewriteOutcome {
    let current_len = stream.content.len();
    let new_len = result.data.len();
    if new_len >= current_len {
        return RewriteOutcome::Discarded {
            growth: new_len - current_len,
        };
    }

    let mut dict = stream.dict.clone();
    if let Some(width) = result.width {
        dict.set("Width", Object::Integer(width as i64));
    }
    if let Some(height) = result.height {
        dict.set("Height", Object::Integer(height as i64));
    }
    if let Some(color_space) = &result.color_space {
        dict.set("ColorSpace", Object::Name(color_space.as_str().as_bytes().to_vec()));
        dict.remove(b"Decode");
    }
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    dict.remove(b"DecodeParms");
    dict.set("Length", Object::Integer(new_len as i64));

    stream.dict = dict;
    stream.content = result.data;

    RewriteOutcome::Rewritten {
        saved: current_len - new_len,
    }
}

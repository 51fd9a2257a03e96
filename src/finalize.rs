//! Document finalizer: metadata overrides, serialization and staging.

use crate::error::CompressError;
use lopdf::{Dictionary, Document, Object};
use std::path::{Path, PathBuf};

/// Set `/Producer` and `/Creator` in the document information dictionary,
/// creating the dictionary when the trailer has none.
pub fn apply_metadata(doc: &mut Document, producer: Option<&str>, creator: Option<&str>) {
    if producer.is_none() && creator.is_none() {
        return;
    }

    let existing = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    if let Some(id) = existing {
        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(id) {
            set_metadata(dict, producer, creator);
            return;
        }
    }

    let mut dict = Dictionary::new();
    set_metadata(&mut dict, producer, creator);
    let info_id = doc.add_object(dict);
    doc.trailer.set("Info", Object::Reference(info_id));
}

fn set_metadata(dict: &mut Dictionary, producer: Option<&str>, creator: Option<&str>) {
    if let Some(producer) = producer {
        dict.set("Producer", lopdf::text_string(producer));
    }
    if let Some(creator) = creator {
        dict.set("Creator", lopdf::text_string(creator));
    }
}

/// Serialize the document with the classic writer
pub fn serialize(doc: &mut Document) -> Result<Vec<u8>, CompressError> {
    let mut output_bytes = Vec::new();
    doc.save_to(&mut output_bytes)
        .map_err(|e| CompressError::SaveError(e.to_string()))?;
    Ok(output_bytes)
}

/// The identifier must name a file inside the staging directory: no path
/// separators, no `.`/`..`, not empty.
pub fn validate_staging_id(identifier: &str) -> Result<(), CompressError> {
    let escapes = identifier.is_empty()
        || identifier == "."
        || identifier == ".."
        || identifier.contains(['/', '\\', '\0']);
    if escapes {
        return Err(CompressError::InvalidStagingId(identifier.to_string()));
    }
    Ok(())
}

/// Path of the staged artifact for `identifier`
pub fn staging_path(dir: &Path, identifier: &str) -> Result<PathBuf, CompressError> {
    validate_staging_id(identifier)?;
    Ok(dir.join(format!("{}_compressed.pdf", identifier)))
}

/// Write a copy of the output for inspection
pub fn stage(bytes: &[u8], dir: &Path, identifier: &str) -> Result<PathBuf, CompressError> {
    let path = staging_path(dir, identifier)?;
    std::fs::write(&path, bytes).map_err(|source| CompressError::StagingError {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

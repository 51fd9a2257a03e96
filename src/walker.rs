//! Object graph walker.
//!
//! Visits every indirect object in ascending object-number order and sends
//! each image XObject through classify -> recompress -> rewrite before moving
//! on to the next one.

use crate::classify::{classify_image, ContentFingerprint, ImageDictionary};
use crate::error::{CompressError, ImageError};
use crate::recompress::Recompressor;
use crate::rewrite::{apply_result, RewriteOutcome};
use crate::{CompressOptions, ImageOutcome, ImageState};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Images grouped by the digest of their decoded contents.
///
/// Built for diagnostics only: duplicates are detected, never merged.
#[derive(Debug, Clone, Default)]
pub struct FingerprintIndex {
    buckets: BTreeMap<ContentFingerprint, Vec<ObjectId>>,
}

impl FingerprintIndex {
    pub fn insert(&mut self, fingerprint: ContentFingerprint, id: ObjectId) {
        self.buckets.entry(fingerprint).or_default().push(id);
    }

    pub fn get(&self, fingerprint: &ContentFingerprint) -> Option<&[ObjectId]> {
        self.buckets.get(fingerprint).map(Vec::as_slice)
    }

    /// Number of distinct fingerprints
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ContentFingerprint, &[ObjectId])> {
        self.buckets.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Buckets holding more than one image
    pub fn duplicate_groups(&self) -> impl Iterator<Item = (&ContentFingerprint, &[ObjectId])> {
        self.iter().filter(|(_, ids)| ids.len() > 1)
    }
}

/// Everything the walk collected
#[derive(Debug, Default)]
pub struct WalkSummary {
    pub images: Vec<ImageOutcome>,
    pub fingerprints: FingerprintIndex,
}

/// `Type = XObject` and `Subtype = Image`
pub fn is_image_candidate(dict: &Dictionary) -> bool {
    let is_name = |key: &[u8], expected: &[u8]| matches!(dict.get(key), Ok(Object::Name(n)) if n == expected);
    is_name(b"Type", b"XObject") && is_name(b"Subtype", b"Image")
}

/// Walk the document and recompress every image candidate in place
pub fn walk_images(doc: &mut Document, options: &CompressOptions) -> Result<WalkSummary, CompressError> {
    let recompressor = Recompressor::new(options.quality, options.max_dimension);
    let mut summary = WalkSummary::default();

    // BTreeMap keys are already in (number, generation) order
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
    log::debug!("Found {} objects in PDF document", ids.len());

    for id in ids {
        let dict = match doc.objects.get(&id) {
            Some(Object::Stream(stream)) => &stream.dict,
            Some(Object::Dictionary(dict)) => dict,
            _ => {
                log::trace!("Object {} {} has no dictionary, skipping", id.0, id.1);
                continue;
            }
        };

        if !is_image_candidate(dict) {
            continue;
        }

        if !matches!(doc.objects.get(&id), Some(Object::Stream(_))) {
            log::warn!("Image object {} {} has no contents, skipping", id.0, id.1);
            continue;
        }

        match process_image(doc, id, &recompressor, &mut summary.fingerprints) {
            Ok(outcome) => summary.images.push(outcome),
            Err(e) if options.skip_failed_images => {
                log::warn!("Leaving image {} {} untouched: {}", id.0, id.1, e);
                summary.images.push(failed_outcome(doc, id));
            }
            Err(e) => return Err(CompressError::image(id, e)),
        }
    }

    Ok(summary)
}

fn process_image(
    doc: &mut Document,
    id: ObjectId,
    recompressor: &Recompressor,
    fingerprints: &mut FingerprintIndex,
) -> Result<ImageOutcome, ImageError> {
    let (mut outcome, candidate) = {
        let stream = match doc.get_object(id) {
            Ok(Object::Stream(s)) => s,
            _ => return Ok(failed_outcome(doc, id)),
        };
        let image = classify_image(doc, stream)?;
        fingerprints.insert(image.fingerprint, id);

        let info = &image.dict;
        log::debug!(
            "Found image object {} {}: {}x{}@{} Filter:{} ColorSpace:{} SMask:{} length:{} ({})",
            id.0,
            id.1,
            info.width,
            info.height,
            info.bits_per_component,
            info.filter,
            info.color_space,
            info.smask
                .map(|(n, g)| format!("{} {} R", n, g))
                .unwrap_or_else(|| "-".to_string()),
            info.length,
            image.classification
        );

        let candidate = recompressor.recompress(&image)?;
        let outcome = ImageOutcome {
            object_id: id,
            classification: Some(image.classification),
            state: ImageState::Unchanged,
            original_length: info.length,
            final_length: info.length,
            original_dimensions: (info.width, info.height),
            final_dimensions: (info.width, info.height),
            fingerprint: Some(image.fingerprint),
        };
        (outcome, candidate)
    };

    let Some(result) = candidate else {
        return Ok(outcome);
    };

    if let Ok(Object::Stream(stream)) = doc.get_object_mut(id) {
        let (width, height) = outcome.original_dimensions;
        let final_dimensions = (result.width.unwrap_or(width), result.height.unwrap_or(height));

        match apply_result(stream, result) {
            RewriteOutcome::Rewritten { saved } => {
                log::debug!(
                    "  Rewrote image {} {} as JPEG, saving {:.2} KB",
                    id.0,
                    id.1,
                    saved as f64 / 1024.0
                );
                outcome.state = ImageState::Rewritten;
                outcome.final_length = stream.content.len();
                outcome.final_dimensions = final_dimensions;
            }
            RewriteOutcome::Discarded { growth } => {
                log::debug!(
                    "  Kept image {} {}: re-encoding would grow it by {} bytes",
                    id.0,
                    id.1,
                    growth
                );
            }
        }
    }

    Ok(outcome)
}

fn failed_outcome(doc: &Document, id: ObjectId) -> ImageOutcome {
    let (dimensions, length) = match doc.get_object(id) {
        Ok(Object::Stream(stream)) => {
            let info = ImageDictionary::read(doc, stream);
            ((info.width, info.height), info.length)
        }
        _ => ((0, 0), 0),
    };
    ImageOutcome {
        object_id: id,
        classification: None,
        state: ImageState::Failed,
        original_length: length,
        final_length: length,
        original_dimensions: dimensions,
        final_dimensions: dimensions,
        fingerprint: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    #[test]
    fn candidate_requires_type_and_subtype() {
        assert!(is_image_candidate(&dictionary! { "Type" => "XObject", "Subtype" => "Image" }));
        assert!(!is_image_candidate(&dictionary! { "Subtype" => "Image" }));
        assert!(!is_image_candidate(&dictionary! { "Type" => "XObject", "Subtype" => "Form" }));
        assert!(!is_image_candidate(&dictionary! { "Type" => "Page" }));
    }

    #[test]
    fn fingerprint_buckets() {
        let mut index = FingerprintIndex::default();
        let a = ContentFingerprint::of(b"a");
        let b = ContentFingerprint::of(b"b");
        index.insert(a, (3, 0));
        index.insert(b, (4, 0));
        index.insert(a, (7, 0));

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&a), Some(&[(3, 0), (7, 0)][..]));
        let duplicates: Vec<_> = index.duplicate_groups().collect();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].0, &a);
    }

    #[test]
    fn skips_non_images_and_bare_dictionaries() {
        let mut doc = Document::with_version("1.5");
        doc.add_object(dictionary! { "Type" => "XObject", "Subtype" => "Image", "Width" => 1 });
        doc.add_object(Stream::new(dictionary! { "Type" => "XObject", "Subtype" => "Form" }, vec![1, 2, 3]));
        doc.add_object(Object::Integer(5));

        let summary = walk_images(&mut doc, &CompressOptions::default()).unwrap();
        assert!(summary.images.is_empty());
        assert!(summary.fingerprints.is_empty());
    }

    #[test]
    fn corrupt_image_aborts_unless_isolated() {
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 4,
                "Height" => 4,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            b"not deflate".to_vec(),
        ));

        let err = walk_images(&mut doc.clone(), &CompressOptions::default()).unwrap_err();
        assert!(matches!(err, CompressError::Image { number, .. } if number == id.0));

        let options = CompressOptions {
            skip_failed_images: true,
            ..CompressOptions::default()
        };
        let summary = walk_images(&mut doc, &options).unwrap();
        assert_eq!(summary.images.len(), 1);
        assert_eq!(summary.images[0].state, ImageState::Failed);
        assert_eq!(summary.images[0].original_dimensions, (4, 4));
    }
}

//! Debug pretty-printer over the object graph.
//!
//! Not used by the compression pass. References are followed so a single
//! dump shows the whole subgraph under an object, with each indirect object
//! printed at most once.

use crate::decode::{decode_contents, Filter};
use lopdf::{Document, Object, ObjectId};
use std::collections::HashSet;
use std::fmt::Write;

const MAX_DEPTH: usize = 16;
const PREVIEW_BYTES: usize = 64;

/// Render `object` and everything reachable from it
pub fn dump_object(doc: &Document, object: &Object) -> String {
    let mut dumper = Dumper {
        doc,
        out: String::new(),
        visited: HashSet::new(),
    };
    dumper.object(object, 0);
    dumper.out
}

/// Render the indirect object `id`, or `None` if it does not exist
pub fn dump_indirect(doc: &Document, id: ObjectId) -> Option<String> {
    let object = doc.get_object(id).ok()?;
    let mut dumper = Dumper {
        doc,
        out: String::new(),
        visited: HashSet::from([id]),
    };
    let _ = writeln!(dumper.out, "{} {} obj", id.0, id.1);
    dumper.object(object, 1);
    Some(dumper.out)
}

struct Dumper<'a> {
    doc: &'a Document,
    out: String,
    visited: HashSet<ObjectId>,
}

impl Dumper<'_> {
    fn line(&mut self, depth: usize, text: &str) {
        let _ = writeln!(self.out, "{}{}", "  ".repeat(depth), text);
    }

    fn object(&mut self, object: &Object, depth: usize) {
        if depth > MAX_DEPTH {
            self.line(depth, "...");
            return;
        }

        match object {
            Object::Null => self.line(depth, "null"),
            Object::Boolean(b) => self.line(depth, &b.to_string()),
            Object::Integer(n) => self.line(depth, &n.to_string()),
            Object::Real(n) => self.line(depth, &n.to_string()),
            Object::Name(name) => self.line(depth, &format!("/{}", String::from_utf8_lossy(name))),
            Object::String(bytes, _) => {
                self.line(depth, &format!("({})", String::from_utf8_lossy(bytes)))
            }
            Object::Array(items) => {
                self.line(depth, &format!("Array[{}]", items.len()));
                for item in items {
                    self.object(item, depth + 1);
                }
            }
            Object::Dictionary(dict) => {
                self.line(depth, "Dictionary");
                for (key, value) in dict.iter() {
                    self.line(depth + 1, &format!("/{}:", String::from_utf8_lossy(key)));
                    self.object(value, depth + 2);
                }
            }
            Object::Stream(stream) => {
                let filter = Filter::from_dict(&stream.dict);
                self.line(
                    depth,
                    &format!("Stream {} bytes ({})", stream.content.len(), filter),
                );
                for (key, value) in stream.dict.iter() {
                    self.line(depth + 1, &format!("/{}:", String::from_utf8_lossy(key)));
                    self.object(value, depth + 2);
                }
                let preview = match decode_contents(&filter, &stream.content) {
                    Ok(data) => preview(&data),
                    Err(e) => format!("<undecodable: {}>", e),
                };
                self.line(depth + 1, &format!("Contents: {}", preview));
            }
            Object::Reference(id) => {
                self.line(depth, &format!("{} {} R", id.0, id.1));
                if !self.visited.insert(*id) {
                    return;
                }
                match self.doc.get_object(*id) {
                    Ok(target) => self.object(target, depth + 1),
                    Err(_) => self.line(depth + 1, "<not found>"),
                }
            }
        }
    }
}

fn preview(data: &[u8]) -> String {
    let shown = &data[..data.len().min(PREVIEW_BYTES)];
    let text: String = shown
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
        .collect();
    if data.len() > PREVIEW_BYTES {
        format!("{}... ({} bytes)", text, data.len())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    #[test]
    fn dumps_nested_references() {
        let mut doc = Document::with_version("1.5");
        let profile_id = doc.add_object(Stream::new(
            dictionary! { "Alternate" => "DeviceRGB", "N" => 3 },
            b"icc profile".to_vec(),
        ));
        let array_id = doc.add_object(vec![
            Object::Name(b"ICCBased".to_vec()),
            Object::Reference(profile_id),
        ]);

        let dump = dump_indirect(&doc, array_id).unwrap();
        assert!(dump.starts_with(&format!("{} 0 obj", array_id.0)));
        assert!(dump.contains("/ICCBased"));
        assert!(dump.contains("/Alternate:"));
        assert!(dump.contains("Stream 11 bytes (raw)"));
        assert!(dump.contains("Contents: icc profile"));
    }

    #[test]
    fn reference_cycles_terminate() {
        let mut doc = Document::with_version("1.5");
        let a = doc.new_object_id();
        let b = doc.add_object(dictionary! { "Next" => Object::Reference(a) });
        doc.objects.insert(a, Object::Dictionary(dictionary! { "Next" => Object::Reference(b) }));

        let dump = dump_indirect(&doc, a).unwrap();
        assert_eq!(dump.matches("Dictionary").count(), 2);
    }

    #[test]
    fn missing_object() {
        let doc = Document::with_version("1.5");
        assert!(dump_indirect(&doc, (42, 0)).is_none());
        let dump = dump_object(&doc, &Object::Reference((42, 0)));
        assert!(dump.contains("<not found>"));
    }

    #[test]
    fn long_contents_are_truncated() {
        let text = preview(&[b'a'; 100]);
        assert!(text.ends_with("... (100 bytes)"));
    }
}

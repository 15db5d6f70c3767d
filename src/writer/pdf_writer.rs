//! PDF document writer.
//!
//! Writes a complete file: header, every object reachable from the trailer,
//! a fresh classic cross-reference table and the trailer.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::object_serializer::ObjectSerializer;
use crate::document::Document;
use crate::encryption::random_bytes;
use crate::error::{Error, Result};
use crate::object::{Dictionary, ObjectRef, PdfValue};

/// Serializes a [`Document`].
#[derive(Debug)]
pub struct PdfWriter<'d> {
    doc: &'d Document,
    serializer: ObjectSerializer,
}

impl<'d> PdfWriter<'d> {
    /// Writer for `doc`.
    pub fn new(doc: &'d Document) -> Self {
        Self {
            doc,
            serializer: ObjectSerializer::new(),
        }
    }

    /// Produce the file bytes.
    ///
    /// Strings and streams are encrypted per object when the document holds
    /// a file key. A locked document is written with its ciphertext as is.
    pub fn finish(self) -> Result<Vec<u8>> {
        let (objects, dangling) = self.collect()?;
        let handler = self.doc.encryption_state().keyed_handler();
        let encrypt_ref = self.doc.encrypt_ref();

        let (major, minor) = self.doc.version();
        let mut output = format!("%PDF-{}.{}\n", major, minor).into_bytes();
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        let mut offsets: BTreeMap<u32, (usize, u16)> = BTreeMap::new();
        for (_, (reference, mut value)) in objects {
            if !dangling.is_empty() {
                null_dangling(&mut value, &dangling);
            }
            if let Some(handler) = handler {
                if Some(reference.id) != encrypt_ref.map(|r| r.id) {
                    handler.encrypt_value(reference, &mut value)?;
                }
            }
            offsets.insert(reference.id, (output.len(), reference.gen));
            output.extend_from_slice(&self.serializer.serialize_indirect(reference.id, reference.gen, &value));
        }

        let size = offsets.keys().next_back().map_or(1, |max| max + 1);
        let xref_start = output.len();
        output.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
        for (row, (next, entry)) in xref_entries(&offsets, size).into_iter().enumerate() {
            let line = match entry {
                Some((offset, gen)) => format!("{:010} {:05} n\r\n", offset, gen),
                None => format!("{:010} {:05} f\r\n", next, if row == 0 { 65535 } else { 0 }),
            };
            output.extend_from_slice(line.as_bytes());
        }

        let trailer = self.trailer(size, &dangling);
        output.extend_from_slice(b"trailer\n");
        output.extend_from_slice(&ObjectSerializer::compact().serialize(&PdfValue::Dictionary(trailer)));
        output.extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_start).as_bytes());

        log::debug!("Serialized {} objects, {} bytes", offsets.len(), output.len());
        Ok(output)
    }

    /// Write the file bytes to `path`.
    pub fn save(self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let bytes = self.finish()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Every object reachable from the trailer, in object number order, plus
    /// the references that could not be resolved.
    fn collect(&self) -> Result<(BTreeMap<u32, (ObjectRef, PdfValue)>, HashSet<ObjectRef>)> {
        let mut found: BTreeMap<u32, (ObjectRef, PdfValue)> = BTreeMap::new();
        let mut dangling = HashSet::new();
        let mut queue: Vec<ObjectRef> = Vec::new();
        for key in ["Root", "Info", "Encrypt"] {
            if let Some(value) = self.doc.trailer().get(key) {
                collect_refs(value, &mut queue);
            }
        }

        while let Some(reference) = queue.pop() {
            if found.contains_key(&reference.id) || dangling.contains(&reference) {
                continue;
            }
            match self.doc.get_object(reference) {
                Ok(value) => {
                    collect_refs(&value, &mut queue);
                    let gen = self.doc.generation(reference.id);
                    found.insert(reference.id, (ObjectRef::new(reference.id, gen), value));
                },
                Err(Error::Locked) => return Err(Error::Locked),
                Err(e) => {
                    log::warn!("Writing null for unresolvable reference {}: {}", reference, e);
                    dangling.insert(reference);
                },
            }
        }
        Ok((found, dangling))
    }

    fn trailer(&self, size: u32, dangling: &HashSet<ObjectRef>) -> Dictionary {
        let source = self.doc.trailer();
        let mut trailer = Dictionary::new();
        trailer.insert("Size".to_string(), PdfValue::Integer(size as i64));
        for key in ["Root", "Info", "Encrypt"] {
            if let Some(value) = source.get(key) {
                if value.as_reference().is_some_and(|r| dangling.contains(&r)) {
                    continue;
                }
                trailer.insert(key.to_string(), value.clone());
            }
        }
        let id = match source.get("ID") {
            Some(id @ PdfValue::Array(_)) => id.clone(),
            _ => {
                let fresh = random_bytes(16);
                PdfValue::Array(vec![PdfValue::string(fresh.clone()), PdfValue::string(fresh)])
            },
        };
        trailer.insert("ID".to_string(), id);
        trailer
    }
}

/// Serialize a document.
pub fn write_document(doc: &Document) -> Result<Vec<u8>> {
    let bytes = PdfWriter::new(doc).finish()?;
    log::info!("Document written ({} bytes)", bytes.len());
    Ok(bytes)
}

/// References in a value. A stream's `/Length` is skipped since the writer
/// replaces it with the actual byte count.
fn collect_refs(value: &PdfValue, out: &mut Vec<ObjectRef>) {
    match value {
        PdfValue::Stream { dict, .. } => dict
            .iter()
            .filter(|(key, _)| key.as_str() != "Length")
            .for_each(|(_, v)| v.collect_references(out)),
        other => other.collect_references(out),
    }
}

fn null_dangling(value: &mut PdfValue, dangling: &HashSet<ObjectRef>) {
    match value {
        PdfValue::Reference(r) if dangling.contains(r) => *value = PdfValue::Null,
        PdfValue::Array(items) => items.iter_mut().for_each(|v| null_dangling(v, dangling)),
        PdfValue::Dictionary(dict) | PdfValue::Stream { dict, .. } => {
            dict.values_mut().for_each(|v| null_dangling(v, dangling))
        },
        _ => {},
    }
}

/// Table rows for objects `0..size`: the object number itself for used rows,
/// the next free object for free rows (`None`), which link up from object 0.
fn xref_entries(offsets: &BTreeMap<u32, (usize, u16)>, size: u32) -> Vec<(u32, Option<(usize, u16)>)> {
    let free: BTreeSet<u32> = (0..size).filter(|id| !offsets.contains_key(id)).collect();
    (0..size)
        .map(|id| match offsets.get(&id) {
            Some(entry) => (id, Some(*entry)),
            None => {
                let next = free.range(id + 1..).next().copied().unwrap_or(0);
                (next, None)
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_empty_document() {
        let bytes = write_document(&Document::new()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n"));
        assert!(contains(&bytes, b"/Type /Catalog"));
        assert!(contains(&bytes, b"xref\n0 3\n0000000000 65535 f\r\n"));
        assert!(bytes.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn test_unreachable_objects_dropped() {
        let mut doc = Document::new();
        doc.add_object(PdfValue::string(b"orphan".to_vec()));
        let bytes = write_document(&doc).unwrap();
        assert!(!contains(&bytes, b"(orphan)"));
    }

    #[test]
    fn test_dangling_written_as_null() {
        let mut doc = Document::new();
        let mut page = Dictionary::new();
        page.insert("Contents".to_string(), ObjectRef::new(77, 0).into());
        doc.add_page(page, None).unwrap();

        let bytes = write_document(&doc).unwrap();
        assert!(contains(&bytes, b"/Contents null"));
        let reloaded = Document::load(&bytes).unwrap();
        assert_eq!(reloaded.page_count().unwrap(), 1);
    }

    #[test]
    fn test_free_list_for_gaps() {
        let mut offsets = BTreeMap::new();
        offsets.insert(1, (15, 0));
        offsets.insert(3, (40, 0));
        let rows = xref_entries(&offsets, 5);
        assert_eq!(rows[0], (2, None));
        assert_eq!(rows[1], (1, Some((15, 0))));
        assert_eq!(rows[2], (4, None));
        assert_eq!(rows[4], (0, None));
    }

    #[test]
    fn test_reload_preserves_pages() {
        let mut doc = Document::new();
        for _ in 0..3 {
            doc.add_page(Dictionary::new(), None).unwrap();
        }
        let bytes = write_document(&doc).unwrap();
        let reloaded = Document::load_with_options(&bytes, crate::parser_config::ParserOptions::strict()).unwrap();
        assert_eq!(reloaded.page_count().unwrap(), 3);
    }
}

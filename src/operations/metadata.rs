//! Document information dictionary.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::document::Document;
use crate::error::Result;
use crate::object::{decode_text_string, encode_text_string, Dictionary, PdfValue};

/// The standard fields of the Info dictionary plus any other entries.
///
/// Fields that are `None` are not written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    /// `/Title`
    pub title: Option<String>,
    /// `/Author`
    pub author: Option<String>,
    /// `/Subject`
    pub subject: Option<String>,
    /// `/Creator`, the application that created the original content
    pub creator: Option<String>,
    /// `/Producer`, the application that wrote the PDF
    pub producer: Option<String>,
    /// Every other entry (`/Keywords`, `/CreationDate`, custom keys) as text
    pub extra: BTreeMap<String, String>,
}

impl DocumentInfo {
    /// Read an Info dictionary. Entries that are not text-like are skipped.
    pub fn from_dictionary(dict: &Dictionary) -> Self {
        let mut info = Self::default();
        for (key, value) in dict {
            let Some(text) = value_text(value) else {
                log::debug!("Skipping Info entry /{} ({})", key, value.type_name());
                continue;
            };
            match key.as_str() {
                "Title" => info.title = Some(text),
                "Author" => info.author = Some(text),
                "Subject" => info.subject = Some(text),
                "Creator" => info.creator = Some(text),
                "Producer" => info.producer = Some(text),
                _ => {
                    info.extra.insert(key.clone(), text);
                },
            }
        }
        info
    }

    /// Build the Info dictionary. Text is stored as PDFDocEncoding when
    /// possible, UTF-16BE otherwise.
    pub fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        let standard = [
            ("Title", &self.title),
            ("Author", &self.author),
            ("Subject", &self.subject),
            ("Creator", &self.creator),
            ("Producer", &self.producer),
        ];
        for (key, value) in standard {
            if let Some(text) = value {
                dict.insert(key.to_string(), PdfValue::string(encode_text_string(text)));
            }
        }
        for (key, text) in &self.extra {
            dict.insert(key.clone(), PdfValue::string(encode_text_string(text)));
        }
        dict
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.creator.is_none()
            && self.producer.is_none()
            && self.extra.is_empty()
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the creator.
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    /// Set the producer.
    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = Some(producer.into());
        self
    }
}

fn value_text(value: &PdfValue) -> Option<String> {
    match value {
        PdfValue::String(bytes) => Some(decode_text_string(bytes)),
        PdfValue::Name(name) => Some(name.clone()),
        PdfValue::Integer(i) => Some(i.to_string()),
        PdfValue::Real(r) => Some(r.to_string()),
        PdfValue::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Info fields plus the page count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Document information
    #[serde(flatten)]
    pub info: DocumentInfo,
    /// Number of pages
    pub page_count: usize,
}

/// Read the document information and page count.
///
/// A missing or unreadable Info dictionary yields empty fields, as does a
/// locked document; only page tree failures are errors.
pub fn read_metadata(doc: &Document) -> Result<Metadata> {
    let info = match doc.info() {
        Ok(Some(dict)) => DocumentInfo::from_dictionary(&dict),
        Ok(None) => DocumentInfo::default(),
        Err(e) => {
            log::warn!("Ignoring unreadable Info dictionary: {}", e);
            DocumentInfo::default()
        },
    };
    let page_count = doc.page_count()?;
    Ok(Metadata { info, page_count })
}

/// Copy `doc` with its Info dictionary replaced by `info`.
///
/// The Info dictionary is replaced, not patched: fields left `None` are
/// absent from the result, and an empty `info` removes the dictionary.
pub fn write_metadata(doc: &Document, info: &DocumentInfo) -> Result<Document> {
    let mut output = doc.clone();
    output.set_info(info)?;
    log::info!("Metadata replaced ({} entries)", info.to_dictionary().len());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dictionary() {
        let mut dict = Dictionary::new();
        dict.insert("Title".to_string(), PdfValue::string(b"Report".to_vec()));
        dict.insert(
            "Author".to_string(),
            PdfValue::string(vec![0xFE, 0xFF, 0x00, 0x4A, 0x00, 0xF6]),
        );
        dict.insert("CreationDate".to_string(), PdfValue::string(b"D:20240101".to_vec()));
        dict.insert("Trapped".to_string(), PdfValue::name("False"));
        dict.insert("Weird".to_string(), PdfValue::Array(vec![]));

        let info = DocumentInfo::from_dictionary(&dict);
        assert_eq!(info.title.as_deref(), Some("Report"));
        assert_eq!(info.author.as_deref(), Some("J\u{f6}"));
        assert_eq!(info.subject, None);
        assert_eq!(info.extra.get("CreationDate").map(String::as_str), Some("D:20240101"));
        assert_eq!(info.extra.get("Trapped").map(String::as_str), Some("False"));
        assert!(!info.extra.contains_key("Weird"));
    }

    #[test]
    fn test_to_dictionary_skips_none() {
        let info = DocumentInfo::default().with_title("T").with_producer("P");
        let dict = info.to_dictionary();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("Title"), Some(&PdfValue::string(b"T".to_vec())));
        assert!(dict.get("Author").is_none());
    }

    #[test]
    fn test_non_latin_title_is_utf16() {
        let dict = DocumentInfo::default().with_title("\u{65E5}\u{672C}").to_dictionary();
        let bytes = dict.get("Title").and_then(|v| v.as_string()).unwrap();
        assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
        assert_eq!(decode_text_string(bytes), "\u{65E5}\u{672C}");
    }

    #[test]
    fn test_read_metadata_without_info() {
        let metadata = read_metadata(&Document::new()).unwrap();
        assert!(metadata.info.is_empty());
        assert_eq!(metadata.page_count, 0);
    }

    #[test]
    fn test_write_replaces() {
        let first = write_metadata(
            &Document::new(),
            &DocumentInfo::default().with_title("Old").with_author("A"),
        )
        .unwrap();
        let second = write_metadata(&first, &DocumentInfo::default().with_title("New")).unwrap();

        let metadata = read_metadata(&second).unwrap();
        assert_eq!(metadata.info.title.as_deref(), Some("New"));
        assert_eq!(metadata.info.author, None);
        // source untouched
        assert_eq!(read_metadata(&first).unwrap().info.title.as_deref(), Some("Old"));
    }

    #[test]
    fn test_write_empty_clears() {
        let doc = write_metadata(&Document::new(), &DocumentInfo::default().with_title("x")).unwrap();
        let cleared = write_metadata(&doc, &DocumentInfo::default()).unwrap();
        assert!(cleared.trailer().get("Info").is_none());
    }

    #[test]
    fn test_serialize_flattened() {
        let metadata = Metadata {
            info: DocumentInfo::default().with_title("T"),
            page_count: 2,
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["title"], "T");
        assert_eq!(json["page_count"], 2);
        assert!(json["author"].is_null());
    }
}

//! Concatenate the pages of several documents.

use std::path::{Path, PathBuf};

use crate::document::Document;
use crate::error::{Error, Result};

/// Something a document can be loaded from.
pub trait DocumentSource {
    /// Name used in warnings and errors.
    fn label(&self) -> String;

    /// Load the document.
    fn load_document(&self) -> Result<Document>;
}

impl DocumentSource for Document {
    fn label(&self) -> String {
        "<document>".to_string()
    }

    fn load_document(&self) -> Result<Document> {
        Ok(self.clone())
    }
}

impl DocumentSource for Path {
    fn label(&self) -> String {
        self.display().to_string()
    }

    fn load_document(&self) -> Result<Document> {
        let data = std::fs::read(self)?;
        Document::load(&data)
    }
}

impl DocumentSource for PathBuf {
    fn label(&self) -> String {
        self.as_path().label()
    }

    fn load_document(&self) -> Result<Document> {
        self.as_path().load_document()
    }
}

impl DocumentSource for str {
    fn label(&self) -> String {
        self.to_string()
    }

    fn load_document(&self) -> Result<Document> {
        Path::new(self).load_document()
    }
}

impl DocumentSource for String {
    fn label(&self) -> String {
        self.clone()
    }

    fn load_document(&self) -> Result<Document> {
        Path::new(self).load_document()
    }
}

impl DocumentSource for [u8] {
    fn label(&self) -> String {
        format!("<{} bytes>", self.len())
    }

    fn load_document(&self) -> Result<Document> {
        Document::load(self)
    }
}

impl DocumentSource for Vec<u8> {
    fn label(&self) -> String {
        self.as_slice().label()
    }

    fn load_document(&self) -> Result<Document> {
        Document::load(self)
    }
}

impl<T: DocumentSource + ?Sized> DocumentSource for &T {
    fn label(&self) -> String {
        (**self).label()
    }

    fn load_document(&self) -> Result<Document> {
        (**self).load_document()
    }
}

/// A source left out of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeWarning {
    /// Label of the skipped source
    pub source: String,
    /// Why it could not be used
    pub reason: String,
}

/// Result of [`merge`].
#[derive(Debug)]
pub struct MergeOutcome {
    /// The merged document
    pub document: Document,
    /// Sources that were skipped
    pub warnings: Vec<MergeWarning>,
}

/// Append the pages of every source, in order, to a copy of `primary`.
///
/// The output keeps the catalog and Info of `primary`. A source that cannot
/// be loaded (or is encrypted with a non-empty user password) is skipped
/// with a [`MergeWarning`] when `skip_missing` is set; otherwise the merge
/// fails with [`Error::SourceNotFound`].
pub fn merge<S: DocumentSource>(primary: &Document, others: &[S], skip_missing: bool) -> Result<MergeOutcome> {
    if primary.is_locked() {
        return Err(Error::Locked);
    }
    let mut document = primary.clone();
    let mut warnings = Vec::new();

    for source in others {
        let label = source.label();
        let loaded = source.load_document().and_then(|doc| {
            if doc.is_locked() {
                return Err(Error::Locked);
            }
            let count = doc.page_count()?;
            Ok((doc, count))
        });
        let (doc, count) = match loaded {
            Ok(loaded) => loaded,
            Err(e) if skip_missing => {
                log::warn!("Skipping merge source {}: {}", label, e);
                warnings.push(MergeWarning {
                    source: label,
                    reason: e.to_string(),
                });
                continue;
            },
            Err(e) => {
                return Err(Error::SourceNotFound {
                    source_name: label,
                    reason: e.to_string(),
                })
            },
        };

        for index in 0..count {
            document.import_page(&doc, index)?;
        }
        log::debug!("Merged {} pages from {}", count, label);
    }

    log::info!(
        "Merged {} sources into {} pages",
        others.len() - warnings.len() + 1,
        document.page_count()?
    );
    Ok(MergeOutcome { document, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Dictionary, PdfValue};

    fn doc_with_pages(labels: &[&str]) -> Document {
        let mut doc = Document::new();
        for label in labels {
            let content = doc.add_object(PdfValue::stream(Dictionary::new(), label.as_bytes().to_vec()));
            let mut page = Dictionary::new();
            page.insert("Contents".to_string(), content.into());
            doc.add_page(page, None).unwrap();
        }
        doc
    }

    fn contents(doc: &Document) -> Vec<Vec<u8>> {
        doc.pages()
            .unwrap()
            .map(|page| doc.page_contents(&page.unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn test_merge_order() {
        let a = doc_with_pages(&["a1", "a2"]);
        let b = doc_with_pages(&["b1"]);
        let c = doc_with_pages(&["c1", "c2"]);
        let outcome = merge(&a, &[&b, &c], false).unwrap();
        assert!(outcome.warnings.is_empty());
        assert_eq!(
            contents(&outcome.document),
            vec![b"a1\n".to_vec(), b"a2\n".to_vec(), b"b1\n".to_vec(), b"c1\n".to_vec(), b"c2\n".to_vec()]
        );
        // primary untouched
        assert_eq!(a.page_count().unwrap(), 2);
    }

    #[test]
    fn test_missing_source_skipped() {
        let a = doc_with_pages(&["a"]);
        let outcome = merge(&a, &["/nonexistent/missing.pdf"], true).unwrap();
        assert_eq!(outcome.document.page_count().unwrap(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].source, "/nonexistent/missing.pdf");
    }

    #[test]
    fn test_missing_source_fails() {
        let a = doc_with_pages(&["a"]);
        let err = merge(&a, &["/nonexistent/missing.pdf"], false).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { ref source_name, .. } if source_name == "/nonexistent/missing.pdf"));
    }

    #[test]
    fn test_garbage_bytes_source() {
        let a = doc_with_pages(&["a"]);
        let garbage: Vec<u8> = b"definitely not a pdf".to_vec();
        let outcome = merge(&a, &[garbage], true).unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.document.page_count().unwrap(), 1);
    }

    #[test]
    fn test_merge_nothing() {
        let a = doc_with_pages(&["a"]);
        let outcome = merge::<Document>(&a, &[], false).unwrap();
        assert_eq!(outcome.document.page_count().unwrap(), 1);
    }
}

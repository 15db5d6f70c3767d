//! One single-page document per page.

use crate::document::Document;
use crate::error::{Error, Result};

/// The pages of a document as separate documents.
///
/// Nothing is built until the sequence is iterated, and [`Split::iter`] can
/// be called any number of times.
#[derive(Debug, Clone, Copy)]
pub struct Split<'d> {
    doc: &'d Document,
}

/// One output of a [`Split`].
#[derive(Debug)]
pub struct SplitPage {
    /// 1-based page number in the source
    pub number: usize,
    /// Single-page document
    pub document: Document,
}

/// Split `doc` into single-page documents.
pub fn split(doc: &Document) -> Split<'_> {
    Split { doc }
}

impl<'d> Split<'d> {
    /// Iterate from the first page.
    pub fn iter(&self) -> SplitIter<'d> {
        match self.doc.page_count() {
            Ok(count) => SplitIter {
                doc: self.doc,
                next: 0,
                count,
                failure: None,
            },
            Err(e) => SplitIter {
                doc: self.doc,
                next: 0,
                count: 0,
                failure: Some(e),
            },
        }
    }

    /// Number of pages, or 0 when the page tree is unreadable.
    pub fn len(&self) -> usize {
        self.doc.page_count().unwrap_or(0)
    }

    /// Whether there is nothing to split.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'d> IntoIterator for &Split<'d> {
    type Item = Result<SplitPage>;
    type IntoIter = SplitIter<'d>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the pages of a [`Split`].
///
/// An unreadable page tree is reported as a single error item.
#[derive(Debug)]
pub struct SplitIter<'d> {
    doc: &'d Document,
    next: usize,
    count: usize,
    failure: Option<Error>,
}

impl Iterator for SplitIter<'_> {
    type Item = Result<SplitPage>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.failure.take() {
            return Some(Err(e));
        }
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(single_page(self.doc, index).map(|document| SplitPage {
            number: index + 1,
            document,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.next + usize::from(self.failure.is_some());
        (left, Some(left))
    }
}

fn single_page(doc: &Document, index: usize) -> Result<Document> {
    let mut output = Document::new();
    let (major, minor) = doc.version();
    output.set_version(major, minor);
    output.import_page(doc, index)?;
    log::debug!("Split page {}", index + 1);
    Ok(output)
}

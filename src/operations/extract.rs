//! Text extraction over a set of pages.

use crate::content::{self, TextRun};
use crate::document::Document;
use crate::error::Result;

/// Extraction result for one requested page.
#[derive(Debug)]
pub struct PageText {
    /// 0-based page index as requested
    pub index: usize,
    /// Text runs in drawing order, or why the page could not be read
    pub result: Result<Vec<TextRun>>,
}

impl PageText {
    /// Concatenated text of the page, `None` when extraction failed.
    pub fn text(&self) -> Option<String> {
        self.result
            .as_ref()
            .ok()
            .map(|runs| runs.iter().map(|run| run.text.as_str()).collect())
    }

    /// Whether the page was read and shows no text.
    pub fn is_empty(&self) -> bool {
        self.result.as_ref().is_ok_and(|runs| runs.is_empty())
    }
}

/// Extract the text of the pages at `indices` (0-based), in the given order.
///
/// A failing page, including an index past the end, is recorded in its
/// [`PageText`] and the remaining pages are still processed.
pub fn extract_text(doc: &Document, indices: &[usize]) -> Vec<PageText> {
    indices
        .iter()
        .map(|&index| {
            let result = doc
                .page(index)
                .and_then(|page| content::extract_text(doc, &page))
                .map(|runs| runs.collect::<Vec<_>>());
            if let Err(e) = &result {
                log::warn!("No text for page index {}: {}", index, e);
            }
            PageText { index, result }
        })
        .collect()
}

/// Extract the text of every page.
pub fn extract_all_text(doc: &Document) -> Result<Vec<PageText>> {
    let indices: Vec<usize> = (0..doc.page_count()?).collect();
    Ok(extract_text(doc, &indices))
}

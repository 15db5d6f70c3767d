//! Content stream parsing and text interpretation.

pub mod operators;
pub mod parser;
pub mod text;

pub use operators::{Operator, TextElement};
pub use parser::{next_operator, parse_content_stream, ContentOperators};
pub use text::{TextRun, TextRuns};

use crate::document::{Document, Page};
use crate::error::Result;

/// Text runs of a page in drawing order.
///
/// Fails only when the page's content streams cannot be decoded.
pub fn extract_text<'d>(doc: &'d Document, page: &Page) -> Result<TextRuns<'d>> {
    TextRuns::new(doc, page)
}

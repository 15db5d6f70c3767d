//! Whole-document operations.
//!
//! Every operation takes its input by reference and returns a new
//! [`Document`](crate::document::Document); the input is never mutated, so a
//! failure leaves the caller's document exactly as it was.

pub mod extract;
pub mod merge;
pub mod metadata;
pub mod security;
pub mod split;

pub use extract::{extract_all_text, extract_text, PageText};
pub use merge::{merge, DocumentSource, MergeOutcome, MergeWarning};
pub use metadata::{read_metadata, write_metadata, DocumentInfo, Metadata};
pub use security::{add_password, decrypt, encrypt, remove_password};
pub use split::{split, Split, SplitIter, SplitPage};

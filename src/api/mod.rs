//! File-path API.
//!
//! [`PdfHandler`] wraps one PDF file on disk. Each method reads the file,
//! runs the matching [`operations`](crate::operations) function and writes
//! its output next to the input file, logging what it did.
//!
//! ```ignore
//! use pdf_handler::api::PdfHandler;
//! use pdf_handler::operations::DocumentInfo;
//!
//! let handler = PdfHandler::new("report.pdf")?;
//! let metadata = handler.read_metadata()?;
//! handler.write_metadata("titled.pdf", &DocumentInfo::default().with_title("Report"))?;
//! handler.add_password("123456", None)?;
//! handler.split(None)?;
//! ```

mod pdf_handler;

pub use pdf_handler::{
    PdfHandler, DEFAULT_DECRYPTED, DEFAULT_ENCRYPTED, DEFAULT_MERGED, DEFAULT_PROTECTED,
    DEFAULT_SPLIT_PREFIX, DEFAULT_UNPROTECTED, NO_TEXT_FOUND,
};

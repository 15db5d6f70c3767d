//! PDF writing.
//!
//! ```text
//! Document
//!     ↓
//! [PdfWriter] (reachable objects, xref table, trailer)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```

mod object_serializer;
mod pdf_writer;

pub use object_serializer::ObjectSerializer;
pub use pdf_writer::{write_document, PdfWriter};

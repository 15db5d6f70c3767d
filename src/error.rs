//! Error types for the PDF engine.
//!
//! Every fallible operation in the crate returns [`Result`]. The first six
//! variants form the public taxonomy callers are expected to match on; the rest
//! describe lower-level failures that surface through them.

use crate::object::ObjectRef;

/// Result type alias for PDF operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while loading, editing or writing a PDF.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file structure could not be understood, even after linear-scan recovery.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// A reference points at an object number absent from the object table.
    #[error("Dangling reference: {0}")]
    DanglingReference(ObjectRef),

    /// Page index past the end of the flattened page sequence.
    #[error("Page index {index} out of range (document has {count} pages)")]
    PageIndexOutOfRange {
        /// Requested 0-based index
        index: usize,
        /// Number of pages in the document
        count: usize,
    },

    /// The supplied password matches neither the user nor the owner password.
    #[error("Incorrect password")]
    IncorrectPassword,

    /// Stream filter outside the supported set.
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// A merge source could not be loaded.
    #[error("Source not found: {source_name} ({reason})")]
    SourceNotFound {
        /// Label of the source (usually a file path)
        source_name: String,
        /// Why loading failed
        reason: String,
    },

    /// Decrypt was requested for a document that carries no encryption dictionary.
    #[error("Document is not encrypted")]
    NotEncrypted,

    /// Content was requested from an encrypted document that has not been unlocked.
    #[error("Document is encrypted; a password is required")]
    Locked,

    /// Low-level parse failure at a byte offset.
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where the failure occurred
        offset: usize,
        /// Reason for the failure
        reason: String,
    },

    /// Object has the wrong type for the requested use.
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Corrupt filter input.
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Invalid or unsupported encryption dictionary.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Recursion depth limit exceeded while walking the object graph.
    #[error("Recursion depth limit exceeded (max: {0})")]
    RecursionLimitExceeded(u32),

    /// IO error from the file layer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::MalformedDocument`] with a formatted message.
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedDocument(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_document_error() {
        let err = Error::MalformedDocument("no trailer".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Malformed document"));
        assert!(msg.contains("no trailer"));
    }

    #[test]
    fn test_dangling_reference_error() {
        let err = Error::DanglingReference(ObjectRef::new(10, 0));
        let msg = format!("{}", err);
        assert!(msg.contains("10 0 R"));
    }

    #[test]
    fn test_page_index_error() {
        let err = Error::PageIndexOutOfRange { index: 7, count: 3 };
        let msg = format!("{}", err);
        assert!(msg.contains('7'));
        assert!(msg.contains("3 pages"));
    }

    #[test]
    fn test_source_not_found_error() {
        let err = Error::SourceNotFound {
            source_name: "missing.pdf".to_string(),
            reason: "No such file".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("missing.pdf"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn test_parse_error() {
        let err = Error::ParseError {
            offset: 1234,
            reason: "invalid token".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("1234"));
        assert!(msg.contains("invalid token"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}

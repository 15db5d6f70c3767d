//! [`PdfHandler`]: operations on a PDF file, by path.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::operations::{self, DocumentInfo, Metadata};
use crate::parser_config::ParserOptions;
use crate::writer::write_document;

/// Output of [`PdfHandler::merge`] when no name is given.
pub const DEFAULT_MERGED: &str = "merged.pdf";
/// Output of [`PdfHandler::encrypt`] when no name is given.
pub const DEFAULT_ENCRYPTED: &str = "encrypted.pdf";
/// Output of [`PdfHandler::decrypt`] when no name is given.
pub const DEFAULT_DECRYPTED: &str = "decrypted.pdf";
/// Output of [`PdfHandler::add_password`] when no name is given.
pub const DEFAULT_PROTECTED: &str = "protected.pdf";
/// Output of [`PdfHandler::remove_password`] when no name is given.
pub const DEFAULT_UNPROTECTED: &str = "unprotected.pdf";
/// File name prefix of [`PdfHandler::split`] outputs.
pub const DEFAULT_SPLIT_PREFIX: &str = "split_page";
/// Placeholder for a page without text.
pub const NO_TEXT_FOUND: &str = "[No text found]";

/// One PDF file on disk. Outputs are written to the file's directory.
#[derive(Debug, Clone)]
pub struct PdfHandler {
    path: PathBuf,
    dir: PathBuf,
    options: ParserOptions,
}

impl PdfHandler {
    /// Handler for the file at `path`, which must exist and be a file.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let reason = if !path.exists() {
            Some("file does not exist")
        } else if !path.is_file() {
            Some("not a file")
        } else {
            None
        };
        if let Some(reason) = reason {
            log::error!("Cannot open {}: {}", path.display(), reason);
            return Err(Error::SourceNotFound {
                source_name: path.display().to_string(),
                reason: reason.to_string(),
            });
        }
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        log::info!("Initialized PdfHandler with path: {}", path.display());
        Ok(Self {
            path,
            dir,
            options: ParserOptions::default(),
        })
    }

    /// Use `options` when loading the file.
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// The input file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an output named `file_name` is written.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    fn open(&self) -> Result<Document> {
        let data = fs::read(&self.path)?;
        Document::load_with_options(&data, self.options)
    }

    fn store(&self, doc: &Document, file_name: &str) -> Result<PathBuf> {
        let output = self.output_path(file_name);
        let bytes = write_document(doc)?;
        fs::write(&output, bytes)?;
        Ok(output)
    }

    /// Read the Info fields and the page count.
    pub fn read_metadata(&self) -> Result<Metadata> {
        let metadata = logged("read metadata", self.open().and_then(|doc| operations::read_metadata(&doc)))?;
        log::info!("PDF Metadata:");
        log::info!("Pages: {}", metadata.page_count);
        let info = &metadata.info;
        for (key, value) in [
            ("Author", &info.author),
            ("Creator", &info.creator),
            ("Producer", &info.producer),
            ("Subject", &info.subject),
            ("Title", &info.title),
        ] {
            log::info!("{}: {}", key, value.as_deref().unwrap_or("None"));
        }
        Ok(metadata)
    }

    /// Write a copy whose Info dictionary is `info` to `output_filename`.
    pub fn write_metadata(&self, output_filename: &str, info: &DocumentInfo) -> Result<PathBuf> {
        let output = logged(
            "write metadata",
            self.open()
                .and_then(|doc| operations::write_metadata(&doc, info))
                .and_then(|doc| self.store(&doc, output_filename)),
        )?;
        log::info!("Metadata written to {}", output.display());
        Ok(output)
    }

    /// Append the pages of `others` to this file's pages. Inputs that cannot
    /// be loaded are skipped with a warning.
    pub fn merge<P: AsRef<Path>>(&self, others: &[P], output_filename: Option<&str>) -> Result<PathBuf> {
        let sources: Vec<&Path> = others.iter().map(AsRef::as_ref).collect();
        let output = logged(
            "merge PDFs",
            self.open().and_then(|primary| {
                let outcome = operations::merge(&primary, &sources, true)?;
                self.store(&outcome.document, output_filename.unwrap_or(DEFAULT_MERGED))
            }),
        )?;
        log::info!("Merged PDF saved as {}", output.display());
        Ok(output)
    }

    /// Text of the pages at `page_numbers` (0-based) as `(page number, text)`
    /// pairs, with [`NO_TEXT_FOUND`] for pages without text. Pages past the
    /// end are skipped with a warning; a page that fails is logged and
    /// recorded in its pair without stopping the others.
    pub fn extract_text(&self, page_numbers: &[usize]) -> Result<Vec<(usize, Result<String>)>> {
        let doc = logged("extract text", self.open())?;
        let count = logged("extract text", doc.page_count())?;
        let (valid, invalid): (Vec<usize>, Vec<usize>) = page_numbers.iter().partition(|&&n| n < count);
        for number in invalid {
            log::warn!("Page number {} is out of range.", number);
        }

        let mut texts = Vec::with_capacity(valid.len());
        for page in operations::extract_text(&doc, &valid) {
            let number = page.index + 1;
            log::info!("--- Text from page {} ---", number);
            let text = page.result.map(|runs| {
                let text: String = runs.into_iter().map(|run| run.text).collect();
                if text.trim().is_empty() {
                    NO_TEXT_FOUND.to_string()
                } else {
                    text
                }
            });
            texts.push((number, logged(&format!("extract text from page {}", number), text)));
        }
        Ok(texts)
    }

    /// Encrypt with `password` as user and owner password.
    pub fn encrypt(&self, password: &str, output_filename: Option<&str>) -> Result<PathBuf> {
        let output = logged(
            "encrypt PDF",
            self.open()
                .and_then(|doc| operations::add_password(&doc, password))
                .and_then(|doc| self.store(&doc, output_filename.unwrap_or(DEFAULT_ENCRYPTED))),
        )?;
        log::info!("Encrypted PDF saved as {}", output.display());
        Ok(output)
    }

    /// Decrypt with `password`. An unencrypted input is logged and nothing
    /// is written (`Ok(None)`).
    pub fn decrypt(&self, password: &str, output_filename: Option<&str>) -> Result<Option<PathBuf>> {
        let doc = logged("decrypt PDF", self.open())?;
        let decrypted = match operations::decrypt(&doc, password) {
            Err(Error::NotEncrypted) => {
                log::info!("The PDF is not encrypted.");
                return Ok(None);
            },
            Err(Error::IncorrectPassword) => {
                log::error!("Failed to decrypt PDF. Incorrect password.");
                return Err(Error::IncorrectPassword);
            },
            other => logged("decrypt PDF", other)?,
        };
        let output = logged(
            "decrypt PDF",
            self.store(&decrypted, output_filename.unwrap_or(DEFAULT_DECRYPTED)),
        )?;
        log::info!("Decrypted PDF saved as {}", output.display());
        Ok(Some(output))
    }

    /// Write each page to `{prefix}_{n}.pdf` (1-based `n`). One result per
    /// page; a page that fails is logged and the rest are still written.
    pub fn split(&self, output_prefix: Option<&str>) -> Result<Vec<Result<PathBuf>>> {
        let prefix = output_prefix.unwrap_or(DEFAULT_SPLIT_PREFIX);
        let doc = logged("split PDF", self.open())?;
        logged("split PDF", doc.page_count())?;
        let mut outputs = Vec::new();
        for (index, part) in operations::split(&doc).iter().enumerate() {
            let output = part.and_then(|part| {
                let output = self.store(&part.document, &format!("{}_{}.pdf", prefix, part.number))?;
                log::info!("Saved page {} as {}", part.number, output.display());
                Ok(output)
            });
            outputs.push(logged(&format!("split page {}", index + 1), output));
        }
        Ok(outputs)
    }

    /// [`PdfHandler::encrypt`] with [`DEFAULT_PROTECTED`] as default output.
    pub fn add_password(&self, password: &str, output_filename: Option<&str>) -> Result<PathBuf> {
        self.encrypt(password, Some(output_filename.unwrap_or(DEFAULT_PROTECTED)))
    }

    /// [`PdfHandler::decrypt`] with [`DEFAULT_UNPROTECTED`] as default output.
    pub fn remove_password(&self, password: &str, output_filename: Option<&str>) -> Result<Option<PathBuf>> {
        self.decrypt(password, Some(output_filename.unwrap_or(DEFAULT_UNPROTECTED)))
    }
}

impl fmt::Display for PdfHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PdfHandler managing the file: {}", self.path.display())
    }
}

/// Log a failed `action` before handing the error back.
fn logged<T>(action: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        log::error!("Failed to {}: {}", action, e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let err = PdfHandler::new("/nonexistent/input.pdf").unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { .. }));
    }

    #[test]
    fn test_directory_rejected() {
        let dir = std::env::temp_dir();
        assert!(PdfHandler::new(dir).is_err());
    }

    #[test]
    fn test_output_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        fs::write(&input, write_document(&Document::new()).unwrap()).unwrap();
        let handler = PdfHandler::new(&input).unwrap();
        assert_eq!(handler.output_path(DEFAULT_MERGED), dir.path().join("merged.pdf"));
        assert_eq!(handler.to_string(), format!("PdfHandler managing the file: {}", input.display()));
    }
}

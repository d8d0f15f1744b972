//! Error types for the meteor library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for meteor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while loading documents or extracting metadata.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input path does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The bytes are not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The input is neither a PDF file nor a directory of ALTO pages.
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Error parsing an ALTO page file.
    #[error("ALTO parsing error: {0}")]
    AltoParse(String),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// The document was closed before the page was loaded.
    #[error("Document is closed")]
    DocumentClosed,

    /// Malformed resource table.
    #[error("Resource error: {0}")]
    Resource(String),

    /// A label pattern failed to compile.
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// Publisher registry failure.
    #[error("Registry error: {0}")]
    Registry(String),

    /// LLM backend failure.
    #[error("LLM error: {0}")]
    Llm(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error concerns the input document itself, as opposed to
    /// a collaborator or the configuration.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::UnknownFormat
                | Error::UnsupportedFormat(_)
                | Error::UnsupportedVersion(_)
                | Error::PdfParse(_)
                | Error::Encrypted
                | Error::AltoParse(_)
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::AltoParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::AltoParse(err.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Registry(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Llm(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );

        let err = Error::NotFound(PathBuf::from("missing.pdf"));
        assert_eq!(err.to_string(), "File not found: missing.pdf");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_input_error_classification() {
        assert!(Error::UnsupportedFormat("txt".into()).is_input_error());
        assert!(Error::AltoParse("bad".into()).is_input_error());
        assert!(!Error::Registry("down".into()).is_input_error());
        assert!(!Error::DocumentClosed.is_input_error());
    }
}

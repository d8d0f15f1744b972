//! Input format detection: PDF files and directories of ALTO pages.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// PDF format information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFormat {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
}

impl std::fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// Kind of input accepted by [`crate::Document::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFormat {
    /// A single PDF file.
    Pdf(PdfFormat),
    /// A directory holding one ALTO XML file per page, sorted by name.
    Alto(Vec<PathBuf>),
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Detect the input format of a path.
///
/// # Returns
/// * `Err(Error::NotFound)` if the path does not exist
/// * `Err(Error::UnsupportedFormat)` for files that are not PDFs and
///   directories without `.xml` files
pub fn detect_input<P: AsRef<Path>>(path: P) -> Result<InputFormat> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }

    if path.is_dir() {
        let files = alto_files(path)?;
        if files.is_empty() {
            return Err(Error::UnsupportedFormat(format!(
                "directory {} contains no ALTO files",
                path.display()
            )));
        }
        return Ok(InputFormat::Alto(files));
    }

    match detect_format_from_path(path) {
        Ok(format) => Ok(InputFormat::Pdf(format)),
        Err(Error::UnknownFormat) => Err(Error::UnsupportedFormat(format!(
            "{} is not a PDF file",
            path.display()
        ))),
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(
            Error::UnsupportedFormat(format!("{} is too short to be a PDF", path.display())),
        ),
        Err(e) => Err(e),
    }
}

/// List the `*.xml` files of a directory, sorted by file name.
pub fn alto_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("xml"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Detect PDF format from a file path.
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<PdfFormat> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut header = [0u8; 16];
    let read = reader.read(&mut header)?;
    detect_format_from_bytes(&header[..read])
}

/// Detect PDF format from bytes.
///
/// # Returns
/// * `Ok(PdfFormat)` if the data starts with a valid PDF header
/// * `Err(Error::UnknownFormat)` if the data is not a PDF
pub fn detect_format_from_bytes(data: &[u8]) -> Result<PdfFormat> {
    if data.len() < PDF_MAGIC_LEN + VERSION_LEN {
        return Err(Error::UnknownFormat);
    }

    if !data.starts_with(PDF_MAGIC) {
        return Err(Error::UnknownFormat);
    }

    let version_bytes = &data[PDF_MAGIC_LEN..PDF_MAGIC_LEN + VERSION_LEN];
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(PdfFormat { version })
}

/// Check if a version string is valid.
fn is_valid_version(version: &str) -> bool {
    if version.len() != 3 {
        return false;
    }

    let chars: Vec<char> = version.chars().collect();
    chars[0].is_ascii_digit() && chars[1] == '.' && chars[2].is_ascii_digit()
}

/// Check if bytes represent a valid PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_valid_pdf() {
        let data = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3";
        let format = detect_format_from_bytes(data).unwrap();
        assert_eq!(format.version, "1.7");
    }

    #[test]
    fn test_detect_invalid_format() {
        let data = b"<!DOCTYPE html>";
        let result = detect_format_from_bytes(data);
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_detect_too_short() {
        let data = b"%PDF";
        let result = detect_format_from_bytes(data);
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_is_pdf_bytes() {
        assert!(is_pdf_bytes(b"%PDF-1.4\n"));
        assert!(!is_pdf_bytes(b"Not a PDF"));
    }

    #[test]
    fn test_version_validation() {
        assert!(is_valid_version("1.0"));
        assert!(is_valid_version("2.0"));
        assert!(!is_valid_version("10.0"));
        assert!(!is_valid_version("abc"));
    }

    #[test]
    fn test_detect_input_missing_path() {
        let result = detect_input("/definitely/not/here.pdf");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_detect_input_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            detect_input(dir.path()),
            Err(Error::UnsupportedFormat(_))
        ));

        std::fs::write(dir.path().join("page0002.xml"), "<alto/>").unwrap();
        std::fs::write(dir.path().join("page0001.xml"), "<alto/>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        match detect_input(dir.path()).unwrap() {
            InputFormat::Alto(files) => {
                assert_eq!(files.len(), 2);
                assert!(files[0].ends_with("page0001.xml"));
            }
            other => panic!("unexpected format {:?}", other),
        }
    }

    #[test]
    fn test_detect_input_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.pdf");
        std::fs::write(&path, "hello, this is not a pdf").unwrap();
        assert!(matches!(
            detect_input(&path),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}

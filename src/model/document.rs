//! Document-level types: the windowed page text and the lazily built
//! block view of an open PDF or ALTO input.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::Page;
use crate::detect::{self, InputFormat};
use crate::error::{Error, Result};
use crate::parser::{AltoProvider, DocumentOptions, PdfProvider, SpanProvider};

/// Embedded PDF document information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfInfo {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Keywords
    pub keywords: Option<String>,

    /// Creator application
    pub creator: Option<String>,

    /// PDF producer
    pub producer: Option<String>,

    /// Raw creation date, `D:YYYYMMDDHHmmSS...`
    pub creation_date: Option<String>,

    /// Raw modification date
    pub mod_date: Option<String>,
}

impl PdfInfo {
    /// Non-empty fields as `(key, value)` pairs, keys in serialized form.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("title", &self.title),
            ("author", &self.author),
            ("subject", &self.subject),
            ("keywords", &self.keywords),
            ("creator", &self.creator),
            ("producer", &self.producer),
            ("creationDate", &self.creation_date),
            ("modDate", &self.mod_date),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (key, v))
        })
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

/// An open input document.
///
/// Page text is read eagerly for the page window; positioned blocks are
/// built per page on first request and cached. The underlying provider is
/// released by [`Document::close`] or on drop.
pub struct Document {
    provider: RefCell<Option<Box<dyn SpanProvider>>>,
    pages: BTreeMap<u32, String>,
    page_cache: RefCell<HashMap<u32, Rc<Page>>>,
    info: Option<PdfInfo>,
    page_count: usize,
}

impl Document {
    /// Open a PDF file or a directory of ALTO page files.
    pub fn open<P: AsRef<Path>>(path: P, options: &DocumentOptions) -> Result<Self> {
        let path = path.as_ref();
        let provider: Box<dyn SpanProvider> = match detect::detect_input(path)? {
            InputFormat::Pdf(format) => {
                log::debug!("Opening {} as {}", path.display(), format);
                Box::new(PdfProvider::open(path)?)
            }
            InputFormat::Alto(files) => {
                log::debug!("Opening {} as {} ALTO pages", path.display(), files.len());
                Box::new(AltoProvider::new(files, options.max_spacing))
            }
        };
        Ok(Self::from_provider(provider, options))
    }

    /// Open a PDF held in memory.
    pub fn from_pdf_bytes(data: &[u8], options: &DocumentOptions) -> Result<Self> {
        detect::detect_format_from_bytes(data).map_err(|e| match e {
            Error::UnknownFormat => Error::UnsupportedFormat("data is not a PDF".to_string()),
            other => other,
        })?;
        let provider = PdfProvider::from_bytes(data)?;
        Ok(Self::from_provider(Box::new(provider), options))
    }

    fn from_provider(provider: Box<dyn SpanProvider>, options: &DocumentOptions) -> Self {
        let numbers = provider.page_numbers();
        let mut pages = BTreeMap::new();
        for index in options.window(numbers.len()) {
            let number = numbers[index];
            let text = match provider.page_text(number) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("Failed to read text of page {}: {}", number, e);
                    String::new()
                }
            };
            pages.insert(number, text);
        }

        Self {
            page_count: provider.page_count(),
            info: provider.info(),
            pages,
            page_cache: RefCell::new(HashMap::new()),
            provider: RefCell::new(Some(provider)),
        }
    }

    /// Plain text of the windowed pages, keyed by page number.
    pub fn pages(&self) -> &BTreeMap<u32, String> {
        &self.pages
    }

    /// Text of one windowed page.
    pub fn page_text(&self, page_num: u32) -> Option<&str> {
        self.pages.get(&page_num).map(String::as_str)
    }

    /// Positioned blocks of a page, built on first request.
    pub fn page(&self, page_num: u32) -> Result<Rc<Page>> {
        if let Some(page) = self.page_cache.borrow().get(&page_num) {
            return Ok(Rc::clone(page));
        }

        let blocks = {
            let provider = self.provider.borrow();
            let provider = provider.as_ref().ok_or(Error::DocumentClosed)?;
            provider.page_blocks(page_num)?
        };
        let page = Rc::new(Page::new(page_num, blocks));
        self.page_cache
            .borrow_mut()
            .insert(page_num, Rc::clone(&page));
        Ok(page)
    }

    /// Embedded document information; `None` for ALTO input.
    pub fn pdf_info(&self) -> Option<&PdfInfo> {
        self.info.as_ref()
    }

    /// Number of pages in the whole document, not only the window.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Release the underlying provider. Safe to call repeatedly.
    pub fn close(&self) {
        if self.provider.borrow_mut().take().is_some() {
            log::debug!("Document closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.provider.borrow().is_none()
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("page_count", &self.page_count)
            .field("window", &self.pages.keys().collect::<Vec<_>>())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, TextBlock};

    struct FakeProvider {
        numbers: Vec<u32>,
    }

    impl SpanProvider for FakeProvider {
        fn page_numbers(&self) -> &[u32] {
            &self.numbers
        }

        fn page_text(&self, page_num: u32) -> Result<String> {
            if page_num == 3 {
                return Err(Error::PdfParse("broken page".to_string()));
            }
            Ok(format!("text of page {}", page_num))
        }

        fn page_blocks(&self, page_num: u32) -> Result<Vec<TextBlock>> {
            Ok(vec![TextBlock::new(
                &format!("block {}", page_num),
                BBox::new(0.0, 0.0, 10.0, 10.0),
                "F1",
                10.0,
            )])
        }
    }

    fn document(count: u32) -> Document {
        let provider = FakeProvider {
            numbers: (1..=count).collect(),
        };
        Document::from_provider(Box::new(provider), &DocumentOptions::default())
    }

    #[test]
    fn test_window_and_failed_page() {
        let doc = document(20);
        let numbers: Vec<u32> = doc.pages().keys().copied().collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 16, 17, 18, 19, 20]);
        assert_eq!(doc.page_text(3), Some(""));
        assert_eq!(doc.page_text(16), Some("text of page 16"));
        assert_eq!(doc.page_count(), 20);
        assert!(doc.pdf_info().is_none());
    }

    #[test]
    fn test_page_is_cached() {
        let doc = document(2);
        let first = doc.page(1).unwrap();
        let second = doc.page(1).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.blocks[0].text, "block 1");
    }

    #[test]
    fn test_close_is_idempotent() {
        let doc = document(2);
        doc.page(1).unwrap();
        doc.close();
        doc.close();
        assert!(doc.is_closed());
        assert!(doc.page(1).is_ok());
        assert!(matches!(doc.page(2), Err(Error::DocumentClosed)));
    }

    #[test]
    fn test_open_missing_path() {
        assert!(matches!(
            Document::open("/no/such/file.pdf", &DocumentOptions::default()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_from_bytes_rejects_non_pdf() {
        assert!(matches!(
            Document::from_pdf_bytes(b"<html></html>", &DocumentOptions::default()),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_pdf_info_fields() {
        let info = PdfInfo {
            title: Some("Rapport".to_string()),
            author: Some("  ".to_string()),
            mod_date: Some("D:2023".to_string()),
            ..Default::default()
        };
        assert_eq!(info.fields(), vec![("title", "Rapport"), ("modDate", "D:2023")]);
        assert!(PdfInfo::default().is_empty());
    }
}

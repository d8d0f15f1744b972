//! Positioned text providers for PDF and ALTO input.

mod alto;
mod layout;
mod options;
mod pdf;

pub use alto::AltoProvider;
pub use layout::{group_spans_into_lines, merge_words, TextLine, TextSpan, DEFAULT_MAX_SPACING};
pub use options::DocumentOptions;
pub use pdf::{parse_pdf_date, PdfProvider};

use crate::error::Result;
use crate::model::{PdfInfo, TextBlock};

/// Source of page text and positioned blocks for one open document.
pub(crate) trait SpanProvider {
    /// Page numbers in document order.
    fn page_numbers(&self) -> &[u32];

    fn page_count(&self) -> usize {
        self.page_numbers().len()
    }

    /// Plain text of a page, lines joined by newlines.
    fn page_text(&self, page_num: u32) -> Result<String>;

    /// Line-level text blocks of a page, in top-down coordinates.
    fn page_blocks(&self, page_num: u32) -> Result<Vec<TextBlock>>;

    /// Embedded document information, when the format has any.
    fn info(&self) -> Option<PdfInfo> {
        None
    }
}

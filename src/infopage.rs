//! Pages formatted as label/value lists or tables.
//!
//! An [`InfoPage`] marks blocks with formatting flags and learns how the
//! labels on this particular page are formatted, so that of two geometric
//! neighbors of a label the one least likely to be another label is read
//! as the value.

use std::collections::BTreeMap;

use crate::author;
use crate::model::{BlockFlags, Page, TextBlock};
use crate::resources::ResourceCatalog;
use crate::text::{self, Patterns};

/// Neighbor tolerance on info pages, in layout units.
pub const INFO_PAGE_SLACK: f32 = 10.0;

/// A page with label-formatting heuristics applied.
#[derive(Debug, Clone)]
pub struct InfoPage {
    page: Page,
    keyword_font: Option<String>,
    colon_attr: bool,
    upper_attr: bool,
}

impl InfoPage {
    /// Classify the blocks of `page` using the catalog's info-page keywords.
    pub fn new(page: &Page, catalog: &ResourceCatalog) -> Self {
        let mut page = page.clone();
        let keywords = catalog.info_page_keywords();

        for block in &mut page.blocks {
            if text::is_uppercase(&block.text) {
                block.flags |= BlockFlags::UPPERCASE;
            }
            if block.text.trim_end().ends_with(':') {
                block.flags |= BlockFlags::ENDS_WITH_COLON;
            }
            if has_keyword(&block.text, keywords) {
                block.flags |= BlockFlags::HAS_KEYWORD;
            }
        }

        let keyword_font = label_font(&page.blocks);
        if let Some(font) = &keyword_font {
            log::debug!("Info page {} labels use font '{}'", page.number, font);
            for block in page.blocks.iter_mut().filter(|b| &b.font == font) {
                block.flags |= BlockFlags::KEYWORD_FONT;
            }
        }

        let colon_attr = mostly_keywords(
            page.blocks
                .iter()
                .filter(|b| b.has_flag(BlockFlags::ENDS_WITH_COLON)),
        );
        let upper_attr = mostly_keywords(page.blocks.iter().filter(|b| {
            b.has_flag(BlockFlags::UPPERCASE) && !b.text.contains("ISBN") && !b.text.contains("ISSN")
        }));

        Self {
            page,
            keyword_font,
            colon_attr,
            upper_attr,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Font shared by most label blocks, if any.
    pub fn keyword_font(&self) -> Option<&str> {
        self.keyword_font.as_deref()
    }

    /// Whether labels on this page end with a colon.
    pub fn colon_attr(&self) -> bool {
        self.colon_attr
    }

    /// Whether labels on this page are upper-case.
    pub fn upper_attr(&self) -> bool {
        self.upper_attr
    }

    /// Text of the neighbor of `label` least likely to be a label itself.
    ///
    /// Candidates are the nearest block on the same line and the nearest
    /// block in the same column. Each label-like trait of a candidate adds
    /// a penalty; the line neighbor wins ties.
    pub fn value_neighbor(&self, label: &TextBlock) -> Option<&str> {
        let (line, column) =
            self.page
                .nearest_neighbors(label, INFO_PAGE_SLACK, INFO_PAGE_SLACK, true);
        let mut candidates: Vec<(&TextBlock, u8)> =
            line.into_iter().chain(column).map(|b| (b, 0)).collect();

        if candidates.len() > 1 {
            for (block, score) in &mut candidates {
                *score = self.label_penalty(block);
            }
            candidates.sort_by_key(|(_, score)| *score);
        }
        candidates.first().map(|(block, _)| block.text.as_str())
    }

    fn label_penalty(&self, block: &TextBlock) -> u8 {
        let mut score = 0;
        if block.has_flag(BlockFlags::KEYWORD_FONT) {
            score += 1;
        }
        if block.has_flag(BlockFlags::UPPERCASE) && self.upper_attr {
            score += 1;
        }
        if block.has_flag(BlockFlags::ENDS_WITH_COLON) && self.colon_attr {
            score += 1;
        }
        score
    }

    /// Value of the first block mentioning a title label.
    pub fn find_title(&self, patterns: &Patterns) -> Option<String> {
        let label = self
            .page
            .blocks
            .iter()
            .find(|b| patterns.has_title_label(&b.text))?;
        self.value_neighbor(label).map(str::to_string)
    }

    /// Value of the first block starting with a publisher label.
    pub fn find_publisher(&self, patterns: &Patterns) -> Option<String> {
        let label = self.page.find_publisher_block(patterns)?;
        self.value_neighbor(label).map(str::to_string)
    }

    /// Names in the value of the first block starting with an author label.
    pub fn find_author(&self, patterns: &Patterns) -> Option<Vec<String>> {
        let label = self
            .page
            .blocks
            .iter()
            .find(|b| patterns.starts_with_author_label(&b.text.to_lowercase()))?;
        let value = self.value_neighbor(label)?;
        author::extract(value, patterns)
    }
}

fn has_keyword(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k.as_str()))
}

/// More than half of the blocks carry a keyword.
fn mostly_keywords<'a>(blocks: impl Iterator<Item = &'a TextBlock>) -> bool {
    let (total, with_keyword) = blocks.fold((0usize, 0usize), |(total, hits), b| {
        (total + 1, hits + usize::from(b.has_flag(BlockFlags::HAS_KEYWORD)))
    });
    total > 0 && with_keyword * 2 > total
}

/// Font with the highest share of keyword blocks, when that share is at
/// least one half. Ties go to the font with more blocks, then to the font
/// seen first.
fn label_font(blocks: &[TextBlock]) -> Option<String> {
    // font -> (first index, blocks, keyword blocks)
    let mut fonts: BTreeMap<&str, (usize, usize, usize)> = BTreeMap::new();
    for (index, block) in blocks.iter().enumerate() {
        let entry = fonts.entry(block.font.as_str()).or_insert((index, 0, 0));
        entry.1 += 1;
        if block.has_flag(BlockFlags::HAS_KEYWORD) {
            entry.2 += 1;
        }
    }

    let mut ranked: Vec<(&str, usize, usize, usize)> = fonts
        .into_iter()
        .map(|(font, (first, total, hits))| (font, first, total, hits))
        .collect();
    // compare hits/total without floating point
    ranked.sort_by(|a, b| {
        (b.3 * a.2)
            .cmp(&(a.3 * b.2))
            .then(b.2.cmp(&a.2))
            .then(a.1.cmp(&b.1))
    });

    let (font, _, total, hits) = ranked.into_iter().next()?;
    (hits * 2 >= total).then(|| font.to_string())
}

/// The page with the most distinct info-page keywords; 0 when no page has
/// any. The first page wins ties.
pub fn find_info_page(pages: &BTreeMap<u32, String>, catalog: &ResourceCatalog) -> u32 {
    let keywords = catalog.info_page_keywords();
    let mut best = (0u32, 0usize);
    for (number, text) in pages {
        let lower = text.to_lowercase();
        let score = keywords.iter().filter(|k| lower.contains(k.as_str())).count();
        if score > best.1 {
            best = (*number, score);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    fn catalog() -> &'static ResourceCatalog {
        static CATALOG: once_cell::sync::Lazy<ResourceCatalog> =
            once_cell::sync::Lazy::new(|| ResourceCatalog::load(None).unwrap());
        &CATALOG
    }

    fn block(text: &str, font: &str, x0: f32, y0: f32) -> TextBlock {
        TextBlock::new(text, BBox::new(x0, y0, x0 + 80.0, y0 + 10.0), font, 10.0)
    }

    /// Labels in bold with colons in the left column, values to the right.
    fn table_page() -> Page {
        Page::new(
            2,
            vec![
                block("Tittel:", "Arial-Bold", 50.0, 100.0),
                block("Metadataekstrahering", "Arial", 200.0, 100.0),
                block("Forfatter:", "Arial-Bold", 50.0, 120.0),
                block("Kari Nordmann og Ola Nordmann", "Arial", 200.0, 120.0),
                block("Utgiver:", "Arial-Bold", 50.0, 140.0),
                block("Nasjonalbiblioteket", "Arial", 200.0, 140.0),
                block("ISBN:", "Arial-Bold", 50.0, 160.0),
                block("978-82-17-02298-5", "Arial", 200.0, 160.0),
            ],
        )
    }

    #[test]
    fn test_flags_and_attributes() {
        let info = InfoPage::new(&table_page(), catalog());
        assert_eq!(info.keyword_font(), Some("Arial-Bold"));
        assert!(info.colon_attr());
        assert!(!info.upper_attr());

        let label = &info.page().blocks[0];
        assert!(label.has_flag(BlockFlags::HAS_KEYWORD));
        assert!(label.has_flag(BlockFlags::KEYWORD_FONT));
        assert!(label.has_flag(BlockFlags::ENDS_WITH_COLON));
        assert!(!info.page().blocks[1].has_flag(BlockFlags::KEYWORD_FONT));
    }

    #[test]
    fn test_value_neighbor_avoids_labels() {
        let info = InfoPage::new(&table_page(), catalog());
        let patterns = catalog().patterns().unwrap();
        assert_eq!(
            info.find_title(patterns).as_deref(),
            Some("Metadataekstrahering")
        );
        assert_eq!(
            info.find_publisher(patterns).as_deref(),
            Some("Nasjonalbiblioteket")
        );
        assert_eq!(
            info.find_author(patterns),
            Some(vec!["Kari Nordmann".to_string(), "Ola Nordmann".to_string()])
        );
    }

    #[test]
    fn test_value_neighbor_penalizes_line_label() {
        // the line neighbor is itself a label, the column neighbor is a value
        let page = Page::new(
            1,
            vec![
                block("Utgiver:", "Arial-Bold", 50.0, 100.0),
                block("Emneord:", "Arial-Bold", 200.0, 100.0),
                block("Nasjonalbiblioteket", "Arial", 50.0, 115.0),
            ],
        );
        let info = InfoPage::new(&page, catalog());
        let label = &info.page().blocks[0];
        assert_eq!(info.value_neighbor(label), Some("Nasjonalbiblioteket"));
    }

    #[test]
    fn test_single_candidate_returned_as_is() {
        let page = Page::new(
            1,
            vec![
                block("Utgiver:", "Arial-Bold", 50.0, 100.0),
                block("Emneord:", "Arial-Bold", 200.0, 100.0),
            ],
        );
        let info = InfoPage::new(&page, catalog());
        let label = &info.page().blocks[0];
        assert_eq!(info.value_neighbor(label), Some("Emneord:"));
    }

    #[test]
    fn test_no_label_font_below_half() {
        let page = Page::new(
            1,
            vec![
                block("Utgiver", "Arial", 50.0, 100.0),
                block("Oslo", "Arial", 50.0, 120.0),
                block("Bergen", "Arial", 50.0, 140.0),
            ],
        );
        let info = InfoPage::new(&page, catalog());
        assert!(info.keyword_font().is_none());
    }

    #[test]
    fn test_label_font_tie_prefers_more_blocks() {
        let blocks = vec![
            block("ISBN", "Small", 0.0, 0.0),
            block("Tittel", "Large", 0.0, 20.0),
            block("Utgiver", "Large", 0.0, 40.0),
        ];
        let page = Page::new(1, blocks);
        let info = InfoPage::new(&page, catalog());
        assert_eq!(info.keyword_font(), Some("Large"));
    }

    #[test]
    fn test_find_info_page() {
        let pages: BTreeMap<u32, String> = [
            (1, "Forside med tittel".to_string()),
            (2, "Tittel\nForfatter\nISBN 978\nUtgiver".to_string()),
            (3, "ISBN og ISSN og tittel og utgiver".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(find_info_page(&pages, catalog()), 2);

        let empty: BTreeMap<u32, String> = [(1, "ingenting".to_string())].into_iter().collect();
        assert_eq!(find_info_page(&empty, catalog()), 0);
    }
}

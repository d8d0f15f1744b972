//! Page-level types and geometry heuristics.

use serde::{Deserialize, Serialize};

use super::TextBlock;
use crate::text::{self, IsxnKind, Patterns, ValueAndContext};

/// Neighbor tolerance on ordinary pages, in layout units.
pub const DEFAULT_SLACK: f32 = 5.0;

/// The blocks of one page, in reading order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Text blocks, one per line-level run
    pub blocks: Vec<TextBlock>,
}

impl Page {
    /// Create a page; empty blocks are dropped.
    pub fn new(number: u32, blocks: Vec<TextBlock>) -> Self {
        Self {
            number,
            blocks: blocks.into_iter().filter(|b| !b.is_empty()).collect(),
        }
    }

    /// Block texts joined by newlines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks aligned with `block` on its line and in its column.
    ///
    /// Line neighbors have a vertical center within `slack_y` and start to the
    /// right of `block`; column neighbors have a left edge within `slack_x`
    /// and start below it.
    pub fn neighbors_of(
        &self,
        block: &TextBlock,
        slack_x: f32,
        slack_y: f32,
        require_letters: bool,
    ) -> (Vec<&TextBlock>, Vec<&TextBlock>) {
        let accept = |b: &TextBlock| !require_letters || text::has_letters(&b.text);

        let on_line = self
            .blocks
            .iter()
            .filter(|b| {
                (b.bbox.center_y() - block.bbox.center_y()).abs() < slack_y
                    && b.bbox.x0 > block.bbox.x0
                    && accept(b)
            })
            .collect();

        let on_column = self
            .blocks
            .iter()
            .filter(|b| {
                (b.bbox.x0 - block.bbox.x0).abs() < slack_x
                    && b.bbox.y0 > block.bbox.y0
                    && accept(b)
            })
            .collect();

        (on_line, on_column)
    }

    /// Closest line neighbor (smallest `x0`) and closest column neighbor
    /// (smallest `y0`).
    pub fn nearest_neighbors(
        &self,
        block: &TextBlock,
        slack_x: f32,
        slack_y: f32,
        require_letters: bool,
    ) -> (Option<&TextBlock>, Option<&TextBlock>) {
        let (on_line, on_column) = self.neighbors_of(block, slack_x, slack_y, require_letters);
        let line = on_line
            .into_iter()
            .min_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
        let column = on_column
            .into_iter()
            .min_by(|a, b| a.bbox.y0.total_cmp(&b.bbox.y0));
        (line, column)
    }

    /// First value `transform` yields for the nearest line neighbor, then
    /// for the nearest column neighbor.
    pub fn nearest_value<T>(
        &self,
        block: &TextBlock,
        transform: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let (line, column) = self.nearest_neighbors(block, DEFAULT_SLACK, DEFAULT_SLACK, false);
        line.and_then(|b| transform(&b.text))
            .or_else(|| column.and_then(|b| transform(&b.text)))
    }

    /// Every ISBN or ISSN value on the page.
    ///
    /// The value is read from the labelled block itself or from its nearest
    /// neighbor; the label block's text is appended to the context.
    pub fn find_isxn(&self, kind: IsxnKind) -> Vec<ValueAndContext> {
        let mut values = Vec::new();
        for block in self.blocks.iter().filter(|b| b.text.contains(kind.label())) {
            let found = text::find_isxn(kind, &block.text)
                .or_else(|| self.nearest_value(block, |t| text::find_isxn(kind, t)));
            if let Some(mut isxn) = found {
                isxn.append_to_context(&block.text.to_lowercase());
                values.push(isxn);
            }
        }
        values
    }

    /// First block starting with a publisher label.
    pub fn find_publisher_block(&self, patterns: &Patterns) -> Option<&TextBlock> {
        self.blocks
            .iter()
            .find(|b| patterns.publisher_label_end(&b.text.to_lowercase()).is_some())
    }

    /// Text next to the first publisher label on the page.
    pub fn find_publisher(&self, patterns: &Patterns) -> Option<String> {
        let label = self.find_publisher_block(patterns)?;
        self.nearest_value(label, |t| Some(t.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;
    use crate::ResourceCatalog;

    fn block(text: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> TextBlock {
        TextBlock::new(text, BBox::new(x0, y0, x1, y1), "Arial", 10.0)
    }

    fn sample_page() -> Page {
        Page::new(
            2,
            vec![
                block("ISBN:", 50.0, 100.0, 80.0, 110.0),
                block("978-82-17-02298-5 (elektronisk)", 120.0, 101.0, 260.0, 111.0),
                block("Utgiver:", 50.0, 130.0, 90.0, 140.0),
                block("Nasjonalbiblioteket", 120.0, 130.0, 220.0, 140.0),
                block("Oslo", 52.0, 150.0, 80.0, 160.0),
                block("2023", 300.0, 130.0, 330.0, 140.0),
            ],
        )
    }

    #[test]
    fn test_neighbors() {
        let page = sample_page();
        let label = &page.blocks[2];
        let (line, column) = page.neighbors_of(label, DEFAULT_SLACK, DEFAULT_SLACK, false);
        let line: Vec<&str> = line.iter().map(|b| b.text.as_str()).collect();
        let column: Vec<&str> = column.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(line, vec!["Nasjonalbiblioteket", "2023"]);
        assert_eq!(column, vec!["Oslo"]);

        let (line, _) = page.neighbors_of(label, DEFAULT_SLACK, DEFAULT_SLACK, true);
        assert_eq!(line.len(), 1);
    }

    #[test]
    fn test_nearest_value_prefers_line() {
        let page = sample_page();
        let label = &page.blocks[2];
        let value = page.nearest_value(label, |t| Some(t.to_string()));
        assert_eq!(value.as_deref(), Some("Nasjonalbiblioteket"));
    }

    #[test]
    fn test_nearest_value_falls_back_to_column() {
        let page = sample_page();
        let label = &page.blocks[2];
        let value = page.nearest_value(label, |t| (t == "Oslo").then(|| t.to_string()));
        assert_eq!(value.as_deref(), Some("Oslo"));
    }

    #[test]
    fn test_find_isxn_from_neighbor() {
        let page = sample_page();
        let values = page.find_isxn(IsxnKind::Isbn);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, "978-82-17-02298-5");
        assert_eq!(
            values[0].context.as_deref(),
            Some("978-82-17-02298-5 (elektronisk)isbn:")
        );
        assert!(page.find_isxn(IsxnKind::Issn).is_empty());
    }

    #[test]
    fn test_find_publisher() {
        let catalog = ResourceCatalog::load(None).unwrap();
        let patterns = catalog.patterns().unwrap();
        let page = sample_page();
        assert_eq!(
            page.find_publisher(patterns).as_deref(),
            Some("Nasjonalbiblioteket")
        );
    }

    #[test]
    fn test_plain_text() {
        let page = Page::new(1, vec![block("a", 0.0, 0.0, 1.0, 1.0), block(" ", 0.0, 2.0, 1.0, 3.0)]);
        assert_eq!(page.blocks.len(), 1);
        assert_eq!(page.plain_text(), "a");
    }
}

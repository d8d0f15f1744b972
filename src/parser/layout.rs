//! Line grouping and block merging.
//!
//! PDF spans are grouped into lines by baseline, then consecutive spans of a
//! line sharing font and size are merged into one block. ALTO words are
//! folded left to right into blocks separated by wide gaps.

use crate::model::{BBox, TextBlock};

/// Default maximum gap between ALTO words of one block, in layout units.
pub const DEFAULT_MAX_SPACING: f32 = 80.0;

/// A text span with position and style information, in PDF user space
/// (y grows upwards).
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Width of the text
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,
}

impl TextSpan {
    /// Create a new text span; the width is estimated from the character count.
    pub fn new(text: String, x: f32, y: f32, font_size: f32, font_name: String) -> Self {
        let width = text.chars().count() as f32 * font_size * 0.5;
        Self {
            text,
            x,
            y,
            width,
            font_size,
            font_name,
        }
    }

    /// Get the bottom Y coordinate (approximate, based on font size).
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2 // Approximate descender
    }

    /// Get the top Y coordinate (approximate, based on font size).
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8 // Approximate ascender
    }

    fn right(&self) -> f32 {
        self.x + self.width
    }

    fn avg_char_width(&self) -> f32 {
        let count = self.text.chars().count();
        if count > 0 && self.width > 0.0 {
            self.width / count as f32
        } else {
            self.font_size * 0.5
        }
    }
}

/// Spans sharing a baseline, sorted left to right.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    /// Baseline of the first span
    pub y: f32,
}

impl TextLine {
    /// Create a new text line from spans.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.total_cmp(&b.x));
        let y = spans.first().map(|s| s.y).unwrap_or(0.0);
        Self { spans, y }
    }

    /// Get the combined text of all spans with appropriate spacing.
    pub fn text(&self) -> String {
        join_spans(&self.spans.iter().collect::<Vec<_>>())
    }

    /// Merge runs of spans with the same font and size whose horizontal gap
    /// is below one font size into blocks. `page_height` flips the
    /// coordinates to top-down.
    pub fn into_blocks(self, page_height: f32) -> Vec<TextBlock> {
        let mut groups: Vec<Vec<&TextSpan>> = Vec::new();
        for span in &self.spans {
            match groups.last_mut() {
                Some(group) if continues_run(group[group.len() - 1], span) => group.push(span),
                _ => groups.push(vec![span]),
            }
        }

        groups
            .into_iter()
            .map(|group| {
                let first = group[0];
                let last = group[group.len() - 1];
                let top = group.iter().map(|s| s.top()).fold(f32::MIN, f32::max);
                let bottom = group.iter().map(|s| s.bottom()).fold(f32::MAX, f32::min);
                let bbox = BBox::new(
                    first.x,
                    page_height - top,
                    last.right(),
                    page_height - bottom,
                );
                TextBlock::new(
                    &join_spans(&group),
                    bbox,
                    first.font_name.clone(),
                    first.font_size,
                )
            })
            .collect()
    }
}

fn continues_run(prev: &TextSpan, next: &TextSpan) -> bool {
    prev.font_name == next.font_name
        && (prev.font_size - next.font_size).abs() < 0.01
        && next.x - prev.right() < next.font_size
}

/// Concatenate spans, inserting a space when the gap between two spans
/// exceeds 20% of the average character width.
fn join_spans(spans: &[&TextSpan]) -> String {
    let mut result = String::new();
    for (i, span) in spans.iter().enumerate() {
        if i > 0 {
            let prev = spans[i - 1];
            let gap = span.x - prev.right();
            let needs_space = gap > span.avg_char_width() * 0.2
                && !prev.text.ends_with(is_space)
                && !span.text.starts_with(is_space)
                && !(prev.text.chars().last().is_some_and(is_spaceless_script_char)
                    && span.text.chars().next().is_some_and(is_spaceless_script_char));
            if needs_space {
                result.push(' ');
            }
        }
        result.push_str(&span.text);
    }
    result
}

fn is_space(c: char) -> bool {
    c == ' ' || c == '\u{a0}'
}

/// Group spans into lines by baseline; a span joins the current line when
/// its baseline is within 30% of its font size. Lines are returned top to
/// bottom.
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    // PDF y grows upwards: sort descending, then left to right
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(&mut current)));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }

    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }

    lines
}

/// Fold word blocks of one line left to right: a word joins the previous
/// block when the gap between them is below `max_spacing`.
pub fn merge_words(words: Vec<TextBlock>, max_spacing: f32) -> Vec<TextBlock> {
    words.into_iter().fold(Vec::new(), |mut acc: Vec<TextBlock>, word| {
        match acc.last_mut() {
            Some(prev) if word.bbox.x0 - prev.bbox.x1 < max_spacing => {
                prev.bbox.y0 = prev.bbox.y0.min(word.bbox.y0);
                prev.bbox.y1 = prev.bbox.y1.max(word.bbox.y1);
                prev.bbox.x1 = word.bbox.x1;
                prev.text.push(' ');
                prev.text.push_str(&word.text);
            }
            _ => acc.push(word),
        }
        acc
    })
}

/// Scripts written without spaces between words.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, y: f32, size: f32, font: &str) -> TextSpan {
        TextSpan::new(text.to_string(), x, y, size, font.to_string())
    }

    fn word(text: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> TextBlock {
        TextBlock::new(text, BBox::new(x0, y0, x1, y1), "default", 1.0)
    }

    #[test]
    fn test_group_lines_by_baseline() {
        let spans = vec![
            span("second", 72.0, 680.0, 12.0, "F1"),
            span("first", 72.0, 700.0, 12.0, "F1"),
            span("line", 110.0, 701.0, 12.0, "F1"),
        ];
        let lines = group_spans_into_lines(spans);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "first line");
        assert_eq!(lines[1].text(), "second");
    }

    #[test]
    fn test_into_blocks_splits_on_font_change() {
        let line = TextLine::from_spans(vec![
            span("ISBN", 72.0, 700.0, 10.0, "Helvetica-Bold"),
            span("978-82-17-02298-5", 100.0, 700.0, 10.0, "Helvetica"),
        ]);
        let blocks = line.into_blocks(792.0);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "ISBN");
        assert_eq!(blocks[1].font, "Helvetica");
        // top-down: baseline 700 with 10pt font spans roughly 84..94
        assert!((blocks[0].bbox.y0 - 84.0).abs() < 0.01);
        assert!((blocks[0].bbox.y1 - 94.0).abs() < 0.01);
    }

    #[test]
    fn test_into_blocks_merges_close_spans() {
        let line = TextLine::from_spans(vec![
            span("Kari", 72.0, 700.0, 10.0, "F1"),
            span("Nordmann", 95.0, 700.0, 10.0, "F1"),
            span("Oslo", 400.0, 700.0, 10.0, "F1"),
        ]);
        let blocks = line.into_blocks(792.0);
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Kari Nordmann", "Oslo"]);
    }

    #[test]
    fn test_merge_words_threshold() {
        let words = vec![
            word("Nasjonal", 100.0, 50.0, 200.0, 60.0),
            word("biblioteket", 279.0, 48.0, 380.0, 62.0),
            word("2023", 460.0, 50.0, 500.0, 60.0),
        ];
        let merged = merge_words(words, DEFAULT_MAX_SPACING);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "Nasjonal biblioteket");
        assert_eq!(merged[0].bbox, BBox::new(100.0, 48.0, 380.0, 62.0));
        assert_eq!(merged[1].text, "2023");
    }

    #[test]
    fn test_merge_words_empty() {
        assert!(merge_words(Vec::new(), DEFAULT_MAX_SPACING).is_empty());
    }
}

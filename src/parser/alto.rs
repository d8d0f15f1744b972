//! ALTO XML input: one file per page, words positioned by `String` elements.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::layout::merge_words;
use super::SpanProvider;
use crate::error::{Error, Result};
use crate::model::{BBox, TextBlock};

/// Page-level containers whose text blocks are read.
const PAGE_AREAS: [&[u8]; 5] = [
    b"TopMargin",
    b"LeftMargin",
    b"RightMargin",
    b"BottomMargin",
    b"PrintSpace",
];

const DEFAULT_FONT: &str = "default";
const DEFAULT_FONT_SIZE: f32 = 1.0;

/// Span provider over a sorted list of ALTO page files.
#[derive(Debug)]
pub struct AltoProvider {
    files: Vec<(u32, PathBuf)>,
    page_numbers: Vec<u32>,
    max_spacing: f32,
}

impl AltoProvider {
    /// Build a provider from page files already sorted by name.
    ///
    /// Pages are numbered from their file names; when two names give the
    /// same number, every page is numbered by its position instead.
    pub fn new(files: Vec<PathBuf>, max_spacing: f32) -> Self {
        let mut files: Vec<(u32, PathBuf)> = files
            .into_iter()
            .enumerate()
            .map(|(i, path)| (page_number_from_path(&path, i + 1), path))
            .collect();
        let mut seen = HashSet::new();
        if !files.iter().all(|(n, _)| seen.insert(*n)) {
            log::debug!("ALTO file names give duplicate page numbers, numbering by position");
            for (i, (n, _)) in files.iter_mut().enumerate() {
                *n = i as u32 + 1;
            }
        }
        let page_numbers = files.iter().map(|(n, _)| *n).collect();
        Self {
            files,
            page_numbers,
            max_spacing,
        }
    }

    fn page_path(&self, page_num: u32) -> Result<&Path> {
        self.files
            .iter()
            .find(|(n, _)| *n == page_num)
            .map(|(_, p)| p.as_path())
            .ok_or(Error::PageOutOfRange(page_num, self.files.len() as u32))
    }

    /// Merged blocks of each text line of a page.
    fn page_lines(&self, page_num: u32) -> Result<Vec<Vec<TextBlock>>> {
        let path = self.page_path(page_num)?;
        let xml = std::fs::read_to_string(path)?;
        let page = parse_alto(&xml)
            .map_err(|e| Error::AltoParse(format!("{}: {}", path.display(), e)))?;
        Ok(page.into_lines(self.max_spacing))
    }
}

impl SpanProvider for AltoProvider {
    fn page_numbers(&self) -> &[u32] {
        &self.page_numbers
    }

    fn page_text(&self, page_num: u32) -> Result<String> {
        let lines = self.page_lines(page_num)?;
        Ok(lines
            .iter()
            .map(|blocks| {
                blocks
                    .iter()
                    .map(|b| b.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn page_blocks(&self, page_num: u32) -> Result<Vec<TextBlock>> {
        Ok(self.page_lines(page_num)?.into_iter().flatten().collect())
    }
}

/// Page number from the last four characters of the file stem, or the
/// 1-based position when those are not digits.
fn page_number_from_path(path: &Path, position: usize) -> u32 {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let chars: Vec<char> = stem.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    if tail.len() == 4 && tail.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = tail.parse() {
            return n;
        }
    }
    position as u32
}

#[derive(Debug)]
struct Word {
    text: String,
    bbox: BBox,
    style: Option<String>,
}

#[derive(Debug, Default)]
struct AltoPage {
    styles: HashMap<String, (String, f32)>,
    lines: Vec<Vec<Word>>,
}

impl AltoPage {
    fn into_lines(self, max_spacing: f32) -> Vec<Vec<TextBlock>> {
        let styles = self.styles;
        self.lines
            .into_iter()
            .map(|words| {
                let blocks = words
                    .into_iter()
                    .map(|word| {
                        let (font, size) = word
                            .style
                            .as_ref()
                            .and_then(|id| styles.get(id))
                            .cloned()
                            .unwrap_or_else(|| (DEFAULT_FONT.to_string(), DEFAULT_FONT_SIZE));
                        TextBlock::new(&word.text, word.bbox, font, size)
                    })
                    .filter(|block| !block.is_empty())
                    .collect();
                merge_words(blocks, max_spacing)
            })
            .filter(|blocks: &Vec<TextBlock>| !blocks.is_empty())
            .collect()
    }
}

/// Read styles and the words of every text line inside the page areas.
fn parse_alto(xml: &str) -> Result<AltoPage> {
    let mut reader = Reader::from_str(xml);
    let mut page = AltoPage::default();
    let mut area_depth = 0usize;
    let mut block_styles: Vec<Option<String>> = Vec::new();
    let mut in_line = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    n if is_page_area(n) => area_depth += 1,
                    b"TextBlock" if area_depth > 0 => {
                        block_styles.push(first_style_ref(&e)?);
                    }
                    b"TextLine" if area_depth > 0 => {
                        in_line = true;
                        page.lines.push(Vec::new());
                    }
                    b"String" if in_line => push_word(&mut page, &e, &block_styles)?,
                    b"TextStyle" => add_style(&mut page, &e)?,
                    _ => {}
                }
            }
            Event::Empty(e) => match e.local_name().as_ref() {
                b"String" if in_line => push_word(&mut page, &e, &block_styles)?,
                b"TextStyle" => add_style(&mut page, &e)?,
                _ => {}
            },
            Event::End(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    n if is_page_area(n) => area_depth = area_depth.saturating_sub(1),
                    b"TextBlock" if area_depth > 0 => {
                        block_styles.pop();
                    }
                    b"TextLine" => in_line = false,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(page)
}

fn push_word(page: &mut AltoPage, e: &BytesStart, block_styles: &[Option<String>]) -> Result<()> {
    let mut text = String::new();
    let (mut hpos, mut vpos, mut width, mut height) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
    let mut style = None;

    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.local_name().as_ref() {
            b"CONTENT" => text = value.to_string(),
            b"HPOS" => hpos = parse_number(&value),
            b"VPOS" => vpos = parse_number(&value),
            b"WIDTH" => width = parse_number(&value),
            b"HEIGHT" => height = parse_number(&value),
            b"STYLEREFS" => style = value.split_whitespace().next().map(str::to_string),
            _ => {}
        }
    }

    let style = style.or_else(|| block_styles.last().cloned().flatten());
    if let Some(line) = page.lines.last_mut() {
        line.push(Word {
            text,
            bbox: BBox::new(hpos, vpos, hpos + width, vpos + height),
            style,
        });
    }
    Ok(())
}

fn add_style(page: &mut AltoPage, e: &BytesStart) -> Result<()> {
    let mut id = None;
    let mut family = DEFAULT_FONT.to_string();
    let mut size = DEFAULT_FONT_SIZE;

    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.local_name().as_ref() {
            b"ID" => id = Some(value.to_string()),
            b"FONTFAMILY" => family = value.to_string(),
            b"FONTSIZE" => size = parse_number(&value),
            _ => {}
        }
    }

    if let Some(id) = id {
        page.styles.insert(id, (family, size));
    }
    Ok(())
}

fn first_style_ref(e: &BytesStart) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == b"STYLEREFS" {
            let value = attr.unescape_value()?;
            return Ok(value.split_whitespace().next().map(str::to_string));
        }
    }
    Ok(None)
}

fn is_page_area(name: &[u8]) -> bool {
    PAGE_AREAS.iter().any(|area| *area == name)
}

fn parse_number(value: &str) -> f32 {
    value.trim().parse().unwrap_or(0.0)
}

//! PDF input through lopdf: embedded info and positioned spans per page.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use super::layout::{group_spans_into_lines, TextLine, TextSpan};
use super::SpanProvider;
use crate::error::{Error, Result};
use crate::model::{PdfInfo, TextBlock};

/// US Letter height, used when no MediaBox is found.
const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// Span provider backed by a loaded PDF document.
pub struct PdfProvider {
    doc: LopdfDocument,
    pages: BTreeMap<u32, ObjectId>,
    page_numbers: Vec<u32>,
}

impl PdfProvider {
    /// Load a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path.as_ref())?;
        Self::from_document(doc)
    }

    /// Load a PDF from memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Self::from_document(doc)
    }

    fn from_document(doc: LopdfDocument) -> Result<Self> {
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        let pages = doc.get_pages();
        let page_numbers = pages.keys().copied().collect();
        Ok(Self {
            doc,
            pages,
            page_numbers,
        })
    }

    fn page_id(&self, page_num: u32) -> Result<ObjectId> {
        self.pages
            .get(&page_num)
            .copied()
            .ok_or(Error::PageOutOfRange(page_num, self.pages.len() as u32))
    }

    /// Lines of a page, top to bottom.
    fn page_lines(&self, page_num: u32) -> Result<Vec<TextLine>> {
        let spans = self.extract_page_spans(page_num)?;
        Ok(group_spans_into_lines(spans))
    }

    /// Extract text spans from a page with position and font information.
    fn extract_page_spans(&self, page_num: u32) -> Result<Vec<TextSpan>> {
        let page_id = self.page_id(page_num)?;
        let lopdf_fonts = self.doc.get_page_fonts(page_id)?;

        let mut fonts = HashMap::new();
        for (name, font) in &lopdf_fonts {
            let base_font = font
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string())
                .unwrap_or_else(|| String::from_utf8_lossy(name).to_string());
            fonts.insert(name.clone(), base_font);
        }

        let content = self.get_page_content(page_id)?;
        self.parse_content_stream(&content, &fonts, &lopdf_fonts)
    }

    /// Get page content stream.
    fn get_page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;
        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            // a page without content stream is blank
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r)? {
                Object::Stream(s) => stream_content(s),
                Object::Array(arr) => Ok(self.concat_streams(arr)),
                _ => Err(Error::PdfParse("Invalid content stream".to_string())),
            },
            Object::Array(arr) => Ok(self.concat_streams(arr)),
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn concat_streams(&self, refs: &[Object]) -> Vec<u8> {
        let mut content = Vec::new();
        for obj in refs {
            if let Object::Reference(r) = obj {
                if let Ok(Object::Stream(s)) = self.doc.get_object(*r) {
                    match stream_content(s) {
                        Ok(data) => {
                            content.extend_from_slice(&data);
                            content.push(b' ');
                        }
                        Err(e) => log::debug!("Skipping undecodable content stream: {}", e),
                    }
                }
            }
        }
        content
    }

    /// Walk the content stream, tracking the text matrix and the current font.
    fn parse_content_stream(
        &self,
        content: &[u8],
        fonts: &HashMap<Vec<u8>, String>,
        lopdf_fonts: &BTreeMap<Vec<u8>, &Dictionary>,
    ) -> Result<Vec<TextSpan>> {
        if content.is_empty() {
            return Ok(Vec::new());
        }
        let content = lopdf::content::Content::decode(content)?;

        let mut spans = Vec::new();
        let mut current_font = String::new();
        let mut current_font_key: Vec<u8> = Vec::new();
        let mut current_font_size: f32 = 12.0;
        let mut text_matrix = TextMatrix::default();
        let mut in_text_block = false;

        for op in content.operations {
            match op.operator.as_str() {
                "BT" => {
                    in_text_block = true;
                    text_matrix = TextMatrix {
                        leading: text_matrix.leading,
                        ..TextMatrix::default()
                    };
                }
                "ET" => {
                    in_text_block = false;
                }
                "Tf" => {
                    if op.operands.len() >= 2 {
                        if let Object::Name(font_key) = &op.operands[0] {
                            current_font_key = font_key.clone();
                            current_font = fonts
                                .get(font_key.as_slice())
                                .cloned()
                                .unwrap_or_else(|| String::from_utf8_lossy(font_key).to_string());
                        }
                        current_font_size = get_number(&op.operands[1]).unwrap_or(12.0);
                    }
                }
                "TL" => {
                    if let Some(leading) = op.operands.first().and_then(get_number) {
                        text_matrix.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    if op.operands.len() >= 2 {
                        let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                        let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                        if op.operator == "TD" {
                            text_matrix.leading = -ty;
                        }
                        text_matrix.translate(tx, ty);
                    }
                }
                "Tm" => {
                    if op.operands.len() >= 6 {
                        text_matrix.set(
                            get_number(&op.operands[0]).unwrap_or(1.0),
                            get_number(&op.operands[1]).unwrap_or(0.0),
                            get_number(&op.operands[2]).unwrap_or(0.0),
                            get_number(&op.operands[3]).unwrap_or(1.0),
                            get_number(&op.operands[4]).unwrap_or(0.0),
                            get_number(&op.operands[5]).unwrap_or(0.0),
                        );
                    }
                }
                "T*" => {
                    text_matrix.next_line();
                }
                "Tj" | "TJ" | "'" | "\"" => {
                    if matches!(op.operator.as_str(), "'" | "\"") {
                        text_matrix.next_line();
                    }
                    if !in_text_block {
                        continue;
                    }

                    let encoding = lopdf_fonts
                        .get(&current_font_key)
                        .and_then(|f| f.get_font_encoding(&self.doc).ok());
                    let decode = |bytes: &[u8]| match &encoding {
                        Some(enc) => LopdfDocument::decode_text(enc, bytes).unwrap_or_default(),
                        None => decode_text_simple(bytes),
                    };

                    let text = match op.operator.as_str() {
                        "TJ" => match op.operands.first() {
                            Some(Object::Array(arr)) => decode_tj_array(arr, decode),
                            _ => String::new(),
                        },
                        "\"" => match op.operands.get(2) {
                            Some(Object::String(bytes, _)) => decode(bytes),
                            _ => String::new(),
                        },
                        _ => match op.operands.first() {
                            Some(Object::String(bytes, _)) => decode(bytes),
                            _ => String::new(),
                        },
                    };

                    if !text.trim().is_empty() {
                        let (x, y) = text_matrix.get_position();
                        let effective_size = current_font_size * text_matrix.get_scale();
                        spans.push(TextSpan::new(
                            text,
                            x,
                            y,
                            effective_size,
                            current_font.clone(),
                        ));
                    }
                }
                _ => {}
            }
        }

        Ok(spans)
    }

    /// Page height from the MediaBox, looked up through the page tree.
    fn page_height(&self, page_id: ObjectId) -> f32 {
        let mut current = Some(page_id);
        // guard against cyclic parent links
        for _ in 0..32 {
            let Some(id) = current else { break };
            let Ok(dict) = self.doc.get_dictionary(id) else {
                break;
            };
            if let Some(height) = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| self.resolve(obj))
                .and_then(media_box_height)
            {
                return height;
            }
            current = dict.get(b"Parent").and_then(Object::as_reference).ok();
        }
        DEFAULT_PAGE_HEIGHT
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(r) => self.doc.get_object(*r).ok(),
            other => Some(other),
        }
    }

    fn info_dictionary(&self) -> Option<&Dictionary> {
        let info = self.doc.trailer.get(b"Info").ok()?;
        match self.resolve(info)? {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}

impl SpanProvider for PdfProvider {
    fn page_numbers(&self) -> &[u32] {
        &self.page_numbers
    }

    fn page_text(&self, page_num: u32) -> Result<String> {
        let lines = self.page_lines(page_num)?;
        Ok(lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn page_blocks(&self, page_num: u32) -> Result<Vec<TextBlock>> {
        let height = self.page_height(self.page_id(page_num)?);
        let lines = self.page_lines(page_num)?;
        Ok(lines
            .into_iter()
            .flat_map(|line| line.into_blocks(height))
            .collect())
    }

    fn info(&self) -> Option<PdfInfo> {
        let dict = self.info_dictionary()?;
        Some(PdfInfo {
            title: get_string_from_dict(dict, b"Title"),
            author: get_string_from_dict(dict, b"Author"),
            subject: get_string_from_dict(dict, b"Subject"),
            keywords: get_string_from_dict(dict, b"Keywords"),
            creator: get_string_from_dict(dict, b"Creator"),
            producer: get_string_from_dict(dict, b"Producer"),
            creation_date: get_string_from_dict(dict, b"CreationDate"),
            mod_date: get_string_from_dict(dict, b"ModDate"),
        })
    }
}

/// Decode a TJ array; large negative adjustments become word spaces.
fn decode_tj_array(items: &[Object], decode: impl Fn(&[u8]) -> String) -> String {
    // 200 thousandths of an em, about a word space in most fonts
    const SPACE_THRESHOLD: f32 = 200.0;

    let mut combined = String::new();
    for item in items {
        match item {
            Object::String(bytes, _) => combined.push_str(&decode(bytes)),
            Object::Integer(_) | Object::Real(_) => {
                let adjustment = -get_number(item).unwrap_or(0.0);
                let ends_with_space = combined.ends_with(' ') || combined.ends_with('\u{a0}');
                if adjustment > SPACE_THRESHOLD && !combined.is_empty() && !ends_with_space {
                    combined.push(' ');
                }
            }
            _ => {}
        }
    }
    combined
}

/// Raw bytes of a content stream. Unfiltered streams are used as stored.
fn stream_content(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }
    Ok(stream.decompressed_content()?)
}

fn media_box_height(obj: &Object) -> Option<f32> {
    let array = obj.as_array().ok()?;
    if array.len() < 4 {
        return None;
    }
    let y0 = get_number(&array[1])?;
    let y1 = get_number(&array[3])?;
    let height = (y1 - y0).abs();
    (height > 0.0).then_some(height)
}

/// Text matrix for tracking position in content stream.
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32, // X translation
    f: f32, // Y translation
    leading: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
            leading: 12.0,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.e = e;
        self.f = f;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }

    fn get_position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn get_scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

/// Helper to extract number from PDF object.
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Simple text decoding fallback when no encoding is available.
fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        return decode_utf16be(&bytes[2..]);
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

fn decode_utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let value = match dict.get(key).ok()? {
        Object::String(bytes, _) => decode_text_simple(bytes),
        Object::Name(bytes) => String::from_utf8_lossy(bytes).to_string(),
        _ => return None,
    };
    let value = value.trim_matches('\0').trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Parse a PDF date (`D:YYYYMMDDHHmmSS...`); at least the year is required,
/// missing parts default to the start of the period.
pub fn parse_pdf_date(raw: &str) -> Option<chrono::NaiveDateTime> {
    let digits: String = raw
        .strip_prefix("D:")
        .unwrap_or(raw)
        .chars()
        .take(12)
        .collect();
    if digits.len() < 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let year: i32 = digits.get(0..4)?.parse().ok()?;
    let part = |range: std::ops::Range<usize>, default: u32| -> Option<u32> {
        match digits.get(range) {
            Some(s) => s.parse().ok(),
            None => Some(default),
        }
    };
    let month = part(4..6, 1)?;
    let day = part(6..8, 1)?;
    let hour = part(8..10, 0)?;
    let minute = part(10..12, 0)?;

    chrono::NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use lopdf::content::{Content, Operation};
    use lopdf::dictionary;

    #[derive(Clone, Copy, PartialEq)]
    enum Contents {
        /// One unfiltered stream
        Plain,
        /// One FlateDecode stream
        Compressed,
        /// An array of two unfiltered streams
        Split,
    }

    fn build_pdf(operations: Vec<Operation>, media_box_on_parent: bool) -> Vec<u8> {
        build_pdf_with(operations, media_box_on_parent, Contents::Plain)
    }

    fn build_pdf_with(
        operations: Vec<Operation>,
        media_box_on_parent: bool,
        contents: Contents,
    ) -> Vec<u8> {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let contents_obj: Object = if contents == Contents::Split {
            let (head, tail) = operations.split_at(operations.len() / 2);
            let ids: Vec<Object> = [head, tail]
                .iter()
                .map(|ops| {
                    let content = Content {
                        operations: ops.to_vec(),
                    };
                    let id =
                        doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
                    id.into()
                })
                .collect();
            ids.into()
        } else {
            let content = Content { operations };
            doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()))
                .into()
        };
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => contents_obj,
        };
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 1,
            "Resources" => resources_id,
        };
        let media_box: Vec<Object> = vec![0.into(), 0.into(), 595.into(), 842.into()];
        if media_box_on_parent {
            pages.set("MediaBox", media_box);
        } else {
            page.set("MediaBox", media_box);
        }
        let page_id = doc.add_object(page);
        pages.set("Kids", vec![page_id.into()]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Sample report"),
            "ModDate" => Object::string_literal("D:20230415120000Z"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        if contents == Contents::Compressed {
            doc.compress();
        }

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    /// Text operations padded with graphics state pairs, so the stream is
    /// large enough to be worth compressing.
    fn padded_text_ops() -> Vec<Operation> {
        let mut operations = Vec::new();
        for _ in 0..200 {
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new("Q", vec![]));
        }
        operations.extend(text_ops());
        operations
    }

    fn page_content_stream(provider: &PdfProvider) -> &Stream {
        let page_id = provider.page_id(1).unwrap();
        let page = provider.doc.get_dictionary(page_id).unwrap();
        let id = page.get(b"Contents").unwrap().as_reference().unwrap();
        provider.doc.get_object(id).unwrap().as_stream().unwrap()
    }

    fn text_ops() -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal("Big Title")]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![0.into(), (-40).into()]),
            Operation::new(
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("Kari"),
                    Object::Integer(-300),
                    Object::string_literal("Nordmann"),
                ])],
            ),
            Operation::new("ET", vec![]),
        ]
    }

    #[test]
    fn test_page_text_and_blocks() {
        let pdf = build_pdf(text_ops(), false);
        let provider = PdfProvider::from_bytes(&pdf).unwrap();
        assert_eq!(provider.page_numbers(), &[1]);

        let text = provider.page_text(1).unwrap();
        assert_eq!(text, "Big Title\nKari Nordmann");

        let blocks = provider.page_blocks(1).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "Big Title");
        assert_eq!(blocks[0].font, "Helvetica");
        assert!((blocks[0].font_size - 24.0).abs() < 0.01);
        // flipped against the 842pt MediaBox
        assert!(blocks[0].bbox.y0 < blocks[1].bbox.y0);
        assert!((blocks[0].bbox.y1 - (842.0 - 700.0 + 24.0 * 0.2)).abs() < 0.01);
    }

    #[test]
    fn test_unfiltered_and_compressed_streams_agree() {
        let plain = PdfProvider::from_bytes(&build_pdf(padded_text_ops(), false)).unwrap();
        assert!(page_content_stream(&plain).dict.get(b"Filter").is_err());

        let compressed = build_pdf_with(padded_text_ops(), false, Contents::Compressed);
        let compressed = PdfProvider::from_bytes(&compressed).unwrap();
        assert!(page_content_stream(&compressed).dict.get(b"Filter").is_ok());

        assert_eq!(plain.page_text(1).unwrap(), "Big Title\nKari Nordmann");
        assert_eq!(compressed.page_text(1).unwrap(), plain.page_text(1).unwrap());
    }

    #[test]
    fn test_content_stream_array() {
        let pdf = build_pdf_with(text_ops(), false, Contents::Split);
        let provider = PdfProvider::from_bytes(&pdf).unwrap();
        assert_eq!(provider.page_text(1).unwrap(), "Big Title\nKari Nordmann");
        assert_eq!(provider.page_blocks(1).unwrap().len(), 2);
    }

    #[test]
    fn test_inherited_media_box() {
        let pdf = build_pdf(text_ops(), true);
        let provider = PdfProvider::from_bytes(&pdf).unwrap();
        let page_id = provider.page_id(1).unwrap();
        assert_eq!(provider.page_height(page_id), 842.0);
    }

    #[test]
    fn test_info_dictionary() {
        let pdf = build_pdf(text_ops(), false);
        let provider = PdfProvider::from_bytes(&pdf).unwrap();
        let info = provider.info().unwrap();
        assert_eq!(info.title.as_deref(), Some("Sample report"));
        assert_eq!(info.mod_date.as_deref(), Some("D:20230415120000Z"));
        assert!(info.author.is_none());
    }

    #[test]
    fn test_page_out_of_range() {
        let pdf = build_pdf(text_ops(), false);
        let provider = PdfProvider::from_bytes(&pdf).unwrap();
        assert!(matches!(
            provider.page_text(3),
            Err(Error::PageOutOfRange(3, 1))
        ));
    }

    #[test]
    fn test_parse_pdf_date() {
        let date = parse_pdf_date("D:20240115103045").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 15);
        assert_eq!(date.minute(), 30);
    }

    #[test]
    fn test_parse_pdf_date_partial() {
        let date = parse_pdf_date("D:2024").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 1, 1));
        assert!(parse_pdf_date("D:20241345").is_none());
        assert!(parse_pdf_date("garbage").is_none());
    }

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x41, 0x00, 0xC5]), "AÅ");
        assert_eq!(decode_text_simple(&[0x4E, 0xE6]), "Næ");
    }
}

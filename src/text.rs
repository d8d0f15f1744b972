//! Pattern library: string predicates and extractors shared by the finders.
//!
//! Language-independent patterns are compiled once per process. Patterns
//! built from resource labels live in [`Patterns`], which is obtained from
//! [`ResourceCatalog::patterns`](crate::ResourceCatalog::patterns).

use std::collections::BTreeMap;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;
use crate::resources::{Label, ResourceCatalog};

/// Which international standard number to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsxnKind {
    Isbn,
    Issn,
}

impl IsxnKind {
    /// The literal label as printed in documents.
    pub fn label(&self) -> &'static str {
        match self {
            IsxnKind::Isbn => "ISBN",
            IsxnKind::Issn => "ISSN",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            IsxnKind::Isbn => &ISBN,
            IsxnKind::Issn => &ISSN,
        }
    }
}

/// A value found in text together with the text around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueAndContext {
    pub value: String,
    pub context: Option<String>,
}

impl ValueAndContext {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            context: None,
        }
    }

    pub fn append_to_context(&mut self, extra: &str) {
        self.context
            .get_or_insert_with(String::new)
            .push_str(extra);
    }
}

static ISSN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D(\d{4}[–-][\dX]{4})\D").unwrap());
static ISBN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D([\d–-]{13,17})\D").unwrap());
static NOU: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bNOU\b").unwrap());
static PARENTHESIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.*?\)").unwrap());
static DOUBLE_CAPITAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{2,}\b").unwrap());
static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").unwrap());

const NAME_WORD: &str = r"\p{Lu}[‘’‛′']?\p{Ll}*[-|‐]?\p{Lu}?[‘’‛′']?\p{Ll}*\.?";

/// Two or more capitalized words separated by single spaces.
static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b{w}(?: {w})+\b", w = NAME_WORD)).unwrap());

/// A date carrying a year, optionally preceded by a day and/or month.
static DATE_WITH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:\d{1,2}\.?\s*)?(?:jan(?:uar|uary)?|feb(?:ruar|ruary)?|mar(?:s|ch)?|apr(?:il)?|mai|may|jun[ei]?|jul[iy]?|aug(?:ust)?|sep(?:t|tember)?|o[kc]t(?:ober)?|nov(?:ember)?|de[sc](?:ember)?)\.?\s+|\d{1,2}[./-]\d{1,2}[./-])?((?:1[5-9]|20)\d{2})\b",
    )
    .unwrap()
});

/// Label-derived patterns for one language selection.
#[derive(Debug)]
pub struct Patterns {
    title_label: Option<Regex>,
    publisher_label: Option<Regex>,
    author_label: Option<Regex>,
    report: Option<Regex>,
    report_type: Option<Regex>,
    photo: Option<Regex>,
    binding_split: Regex,
    special_char_and_binding: Regex,
    electronic_marker: Regex,
    print_marker: Regex,
}

impl Patterns {
    /// Compile the label patterns of a catalog.
    pub fn compile(catalog: &ResourceCatalog) -> Result<Self> {
        let binding = catalog.label_alternation(Label::BindingWords);
        let binding_split = match &binding {
            Some(bw) => format!(r"\b(?:{})\b|&|,", bw),
            None => "&|,".to_string(),
        };
        let special_char_and_binding = match &binding {
            Some(bw) => format!(r"[;:,.]|\b(?:{})\b|&+", bw),
            None => "[;:,.]|&+".to_string(),
        };
        let marker = |label: Label, letter: char| match catalog.label_alternation(label) {
            Some(alt) => format!(r"{}|\b{}\b", alt, letter),
            None => format!(r"\b{}\b", letter),
        };

        Ok(Self {
            title_label: compile_label(catalog, Label::Title, |alt| format!("(?i)(?:{})", alt))?,
            publisher_label: compile_label(catalog, Label::Publisher, |alt| {
                format!("(?i)^(?:{}):?", alt)
            })?,
            author_label: compile_label(catalog, Label::Author, |alt| {
                format!("(?i)^(?:{}):?", alt)
            })?,
            report: compile_label(catalog, Label::Report, |alt| {
                format!(r"(?i)^(\w+)\W(?:{})\W", alt)
            })?,
            report_type: compile_label(catalog, Label::ReportType, |alt| {
                format!(r"(?i)\b({})\b", alt)
            })?,
            photo: compile_label(catalog, Label::Photo, |alt| format!(r"(?i)\b(?:{})\b", alt))?,
            binding_split: Regex::new(&binding_split)?,
            special_char_and_binding: Regex::new(&special_char_and_binding)?,
            electronic_marker: Regex::new(&marker(Label::ElectronicIsxn, 'e'))?,
            print_marker: Regex::new(&marker(Label::PrintIsxn, 'p'))?,
        })
    }

    /// Whether the text mentions a title label anywhere.
    pub fn has_title_label(&self, text: &str) -> bool {
        self.title_label
            .as_ref()
            .is_some_and(|re| re.is_match(text))
    }

    /// Byte length of a publisher label at the start of `text`.
    pub fn publisher_label_end(&self, text: &str) -> Option<usize> {
        self.publisher_label
            .as_ref()
            .and_then(|re| re.find(text))
            .map(|m| m.end())
    }

    /// Whether `text` starts with an author label.
    pub fn starts_with_author_label(&self, text: &str) -> bool {
        self.author_label
            .as_ref()
            .is_some_and(|re| re.is_match(text))
    }

    /// Upper-case prefix of a `<PREFIX>-report` style line.
    pub fn find_report_prefix(&self, text: &str) -> Option<String> {
        let re = self.report.as_ref()?;
        let haystack = format!("{}.", text);
        let caps = re.captures(&haystack)?;
        let prefix = caps.get(1)?.as_str();
        is_uppercase(prefix).then(|| prefix.to_string())
    }

    /// Document type word on a page, mapped to its canonical type.
    pub fn find_doc_type(&self, catalog: &ResourceCatalog, page_text: &str) -> Option<String> {
        if let Some(word) = self
            .report_type
            .as_ref()
            .and_then(|re| re.captures(page_text))
            .and_then(|caps| caps.get(1))
        {
            return Some(catalog.doc_type(word.as_str()));
        }
        NOU.is_match(page_text).then(|| "nou".to_string())
    }

    /// Whether the text carries a photo or design credit label.
    pub fn has_photo_label(&self, text: &str) -> bool {
        self.photo.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Split a name list on binding words, `&` and `,`.
    pub fn split_on_binding_words<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.binding_split.split(text).collect()
    }

    /// Remove `;:,.`, binding words and ampersands, then tidy spaces.
    pub fn strip_special_chars_and_binding_words(&self, text: &str) -> String {
        self.special_char_and_binding
            .replace_all(text, "")
            .replace("  ", " ")
            .trim()
            .to_string()
    }

    /// Electronic markers minus print markers found in an ISXN context.
    pub fn score_isxn_context(&self, context: Option<&str>) -> i32 {
        let Some(context) = context.filter(|c| !c.is_empty()) else {
            return 0;
        };
        let electronic = self.electronic_marker.find_iter(context).count() as i32;
        let print = self.print_marker.find_iter(context).count() as i32;
        electronic - print
    }
}

/// Compile a label pattern, or `None` when the label group is empty.
fn compile_label(
    catalog: &ResourceCatalog,
    label: Label,
    template: impl Fn(&str) -> String,
) -> Result<Option<Regex>> {
    match catalog.label_alternation(label) {
        Some(alt) => Ok(Some(Regex::new(&template(&alt))?)),
        None => Ok(None),
    }
}

/// NFC-normalize, replace no-break spaces and trim.
pub fn normalize_block_text(text: &str) -> String {
    let text: String = text.nfc().collect();
    text.replace('\u{a0}', " ").trim().to_string()
}

/// Whether the text contains at least one letter.
pub fn has_letters(text: &str) -> bool {
    text.chars().any(char::is_alphabetic)
}

/// Collapse every whitespace run into a single space.
pub fn clean_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace every run of non-word characters by a single space.
pub fn substitute_non_alphanumeric(text: &str) -> String {
    NON_ALPHANUMERIC.replace_all(text, " ").trim().to_string()
}

/// Text has at least one cased character and no lower-case ones.
pub fn is_uppercase(text: &str) -> bool {
    let mut cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

/// Remove parenthesized spans, including the parentheses.
pub fn remove_parenthesis(text: &str) -> String {
    PARENTHESIS.replace_all(text, "").into_owned()
}

/// Whether the text contains a word of two or more ASCII capitals.
pub fn has_double_capital(text: &str) -> bool {
    DOUBLE_CAPITAL.is_match(text)
}

/// Extract an ISBN or ISSN from a text.
pub fn find_isxn(kind: IsxnKind, text: &str) -> Option<ValueAndContext> {
    let haystack = format!(".{}.", text);
    let caps = kind.pattern().captures(&haystack)?;
    let value = caps.get(1)?.as_str().replace('–', "-");
    Some(ValueAndContext {
        value,
        context: Some(text.to_lowercase()),
    })
}

/// All person-name matches in a text, in order.
///
/// A match directly followed by optional spaces and `(` is rejected; the
/// match is then retried with its last word cut before a hyphen or with its
/// trailing words removed, as long as two words remain.
pub fn find_names(text: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut pos = 0;
    while pos <= text.len() {
        let Some(m) = NAME.find_at(text, pos) else {
            break;
        };
        match accept_name(text, m.start(), m.as_str()) {
            Some(end) => {
                names.push(&text[m.start()..end]);
                pos = end;
            }
            None => {
                let first_word = m.as_str().find(' ').unwrap_or(m.len());
                pos = m.start() + first_word;
            }
        }
    }
    names
}

fn accept_name(text: &str, start: usize, matched: &str) -> Option<usize> {
    let words: Vec<&str> = matched.split(' ').collect();
    for count in (2..=words.len()).rev() {
        let head = words[..count - 1].join(" ");
        let last = words[count - 1];
        // the whole last word first, then the word cut before each hyphen
        let cuts = std::iter::once(last.len()).chain(
            last.char_indices()
                .rev()
                .filter(|&(_, c)| c == '-' || c == '‐')
                .map(|(i, _)| i),
        );
        for cut in cuts {
            let mut candidate = format!("{} {}", head, &last[..cut]);
            if count < words.len() || cut < last.len() {
                // a shortened match still has to end on a word boundary
                while candidate.ends_with('.') {
                    candidate.pop();
                }
                if !candidate.chars().last().is_some_and(char::is_alphanumeric) {
                    continue;
                }
            }
            let end = start + candidate.len();
            if !text[end..].trim_start_matches(' ').starts_with('(') {
                return Some(end);
            }
        }
    }
    None
}

/// First date carrying a year: `(matched byte range, year)`.
pub fn find_date_with_year(text: &str) -> Option<(Range<usize>, i32)> {
    let caps = DATE_WITH_YEAR.captures(text)?;
    let range = caps.get(0)?.range();
    let year = caps.get(1)?.as_str().parse().ok()?;
    Some((range, year))
}

/// First of the leading `max_pages` pages whose token string contains the
/// token string of `needle`, delimited by spaces.
pub fn find_in_pages(needle: &str, pages: &BTreeMap<u32, String>, max_pages: usize) -> Option<u32> {
    let needle = substitute_non_alphanumeric(needle);
    if needle.is_empty() {
        return None;
    }
    let needle = format!(" {} ", needle);
    pages
        .iter()
        .take(max_pages)
        .find(|(_, text)| format!(" {} ", substitute_non_alphanumeric(text)).contains(&needle))
        .map(|(number, _)| *number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ResourceCatalog {
        ResourceCatalog::load(None).unwrap()
    }

    fn pages(entries: &[(u32, &str)]) -> BTreeMap<u32, String> {
        entries.iter().map(|(n, t)| (*n, t.to_string())).collect()
    }

    #[test]
    fn test_title_search_with_perfect_match() {
        let p = pages(&[(1, "02/2023 Report \n\nA possible title from pdfinfo\n\nwith an undertitle")]);
        assert_eq!(find_in_pages("A possible title from pdfinfo", &p, 3), Some(1));
    }

    #[test]
    fn test_title_search_allows_non_alphanumeric() {
        let p = pages(&[(1, "02/2023 Report \n\nA possible title:\nfrom-\npdfinfo\n\nwith an undertitle")]);
        assert_eq!(find_in_pages("A possible title from pdfinfo", &p, 3), Some(1));
    }

    #[test]
    fn test_title_search_requires_word_boundaries() {
        let p = pages(&[(1, "02/2023 Report \n\nA possible title from pdfinformation")]);
        assert_eq!(find_in_pages("A possible title from pdfinfo", &p, 1), None);

        let p = pages(&[(1, "Å possible title from what we got in pdfinfo")]);
        assert_eq!(find_in_pages("Å possible title from pdfinfo", &p, 1), None);
    }

    #[test]
    fn test_title_search_limited_to_leading_pages() {
        let p = pages(&[(1, "a"), (2, "b"), (3, "c"), (9, "the title")]);
        assert_eq!(find_in_pages("the title", &p, 3), None);
        assert_eq!(find_in_pages("the title", &p, 4), Some(9));
    }

    #[test]
    fn test_report_prefix() {
        let catalog = catalog();
        let patterns = catalog.patterns().unwrap();
        assert_eq!(patterns.find_report_prefix("NAV-report").as_deref(), Some("NAV"));
        assert_eq!(patterns.find_report_prefix("NAV-rapport").as_deref(), Some("NAV"));
        assert_eq!(
            patterns
                .find_report_prefix("NIBIO RAPPORT  |  VOL. 3  |  NR. 45")
                .as_deref(),
            Some("NIBIO")
        );
        assert_eq!(patterns.find_report_prefix("FHI"), None);
        assert_eq!(patterns.find_report_prefix("This FHI report"), None);
        assert_eq!(patterns.find_report_prefix("ÅRSRAPPORT"), None);
    }

    #[test]
    fn test_letters() {
        assert!(!has_letters("2020/02"));
        assert!(has_letters("2020/02 Report from"));
        assert!(!has_letters(""));
    }

    #[test]
    fn test_is_uppercase() {
        assert!(is_uppercase("NAV"));
        assert!(is_uppercase("ISBN 978"));
        assert!(!is_uppercase("Nav"));
        assert!(!is_uppercase("2023"));
    }

    #[test]
    fn test_find_isxn() {
        let isbn = find_isxn(IsxnKind::Isbn, "ISBN 978-82-17-02298-5 (trykt)").unwrap();
        assert_eq!(isbn.value, "978-82-17-02298-5");
        assert_eq!(isbn.context.as_deref(), Some("isbn 978-82-17-02298-5 (trykt)"));

        let issn = find_isxn(IsxnKind::Issn, "ISSN 2464–1162").unwrap();
        assert_eq!(issn.value, "2464-1162");

        assert!(find_isxn(IsxnKind::Isbn, "ISBN").is_none());
    }

    #[test]
    fn test_doc_type() {
        let catalog = catalog();
        let patterns = catalog.patterns().unwrap();
        assert_eq!(
            patterns.find_doc_type(&catalog, "Evaluering av tiltak").as_deref(),
            Some("evaluation")
        );
        assert_eq!(
            patterns.find_doc_type(&catalog, "NOU 2023: 4").as_deref(),
            Some("nou")
        );
        assert_eq!(patterns.find_doc_type(&catalog, "Ingenting her"), None);
    }

    #[test]
    fn test_isxn_context_score() {
        let catalog = catalog();
        let patterns = catalog.patterns().unwrap();
        assert!(patterns.score_isxn_context(Some("isbn 978 (elektronisk)")) > 0);
        assert!(patterns.score_isxn_context(Some("isbn 978 (trykt)")) < 0);
        assert_eq!(patterns.score_isxn_context(None), 0);
    }

    #[test]
    fn test_find_names() {
        assert_eq!(
            find_names("Anne Mette Ødegård, Rolf K. Andersen og Bjorn Dapi"),
            vec!["Anne Mette Ødegård", "Rolf K. Andersen", "Bjorn Dapi"]
        );
    }

    #[test]
    fn test_find_names_before_parenthesis() {
        assert_eq!(find_names("Per Olsen Hansen (red.)"), vec!["Per Olsen"]);
        assert!(find_names("Kari Nordmann (red.)").is_empty());
    }

    #[test]
    fn test_find_names_cut_at_hyphen_before_parenthesis() {
        assert_eq!(find_names("Ola Kari-Nordmann (NB)"), vec!["Ola Kari"]);
        assert_eq!(
            find_names("Jacobine Camilla-Collett og Ola Kari-Nordmann"),
            vec!["Jacobine Camilla-Collett", "Ola Kari-Nordmann"]
        );
    }

    #[test]
    fn test_date_with_year() {
        assert_eq!(find_date_with_year("Nasjonalbiblioteket 2023"), Some((20..24, 2023)));
        assert_eq!(find_date_with_year("NB, mars 2021").map(|d| d.1), Some(2021));
        assert_eq!(find_date_with_year("Nasjonalbiblioteket"), None);
    }

    #[test]
    fn test_normalize_block_text() {
        assert_eq!(normalize_block_text("  Ba\u{a0}nk \n"), "Ba nk");
        assert_eq!(normalize_block_text("A\u{30a}se"), "Åse");
    }
}

//! Language-tagged resource tables.
//!
//! The tables ship with the crate as JSON and are keyed by ISO 639-3 code
//! (`mul` holds language-independent entries). A [`ResourceCatalog`] is a
//! merged view over a language selection; it owns the compiled
//! [`Patterns`](crate::text::Patterns) built from its labels.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use once_cell::sync::{Lazy, OnceCell};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::text::Patterns;

const LABELS_JSON: &str = include_str!("data/labels.json");
const STOPWORDS_JSON: &str = include_str!("data/stopwords.json");
const INFO_PAGE_KEYWORDS_JSON: &str = include_str!("data/info_page_keywords.json");
const DOC_TYPE_MAPPING_JSON: &str = include_str!("data/doc_type_mapping.json");

/// Compiled pattern sets for the embedded tables, keyed by language selection.
static PATTERN_CACHE: Lazy<Mutex<HashMap<String, Arc<Patterns>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Label groups stored in the label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Title,
    Publisher,
    Author,
    Report,
    ReportType,
    BindingWords,
    Photo,
    ElectronicIsxn,
    PrintIsxn,
}

impl Label {
    /// Key used in `labels.json`.
    pub fn key(&self) -> &'static str {
        match self {
            Label::Title => "title",
            Label::Publisher => "publisher",
            Label::Author => "author",
            Label::Report => "report",
            Label::ReportType => "reportType",
            Label::BindingWords => "bindingWords",
            Label::Photo => "photo",
            Label::ElectronicIsxn => "e_isxn",
            Label::PrintIsxn => "p_isxn",
        }
    }
}

/// Raw language-keyed tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceTables {
    pub labels: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub stopwords: BTreeMap<String, Vec<String>>,
    pub info_page_keywords: BTreeMap<String, Vec<String>>,
    pub doc_type_mapping: BTreeMap<String, BTreeMap<String, String>>,
}

impl ResourceTables {
    /// Parse the tables embedded in the crate.
    pub fn embedded() -> Result<Self> {
        Ok(Self {
            labels: parse_table("labels", LABELS_JSON)?,
            stopwords: parse_table("stopwords", STOPWORDS_JSON)?,
            info_page_keywords: parse_table("info_page_keywords", INFO_PAGE_KEYWORDS_JSON)?,
            doc_type_mapping: parse_table("doc_type_mapping", DOC_TYPE_MAPPING_JSON)?,
        })
    }

    /// Every language code present in any table, sorted.
    pub fn languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = self
            .labels
            .keys()
            .chain(self.stopwords.keys())
            .chain(self.info_page_keywords.keys())
            .chain(self.doc_type_mapping.keys())
            .cloned()
            .collect();
        langs.sort();
        langs.dedup();
        langs
    }
}

fn parse_table<T: serde::de::DeserializeOwned>(name: &str, json: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|e| Error::Resource(format!("malformed {} table: {}", name, e)))
}

/// Merged, language-filtered view over the resource tables.
#[derive(Debug)]
pub struct ResourceCatalog {
    languages: Vec<String>,
    cache_key: Option<String>,
    labels: HashMap<Label, Vec<String>>,
    stopwords: Vec<String>,
    info_page_keywords: Vec<String>,
    doc_type_mapping: HashMap<String, String>,
    patterns: OnceCell<Arc<Patterns>>,
}

impl ResourceCatalog {
    /// Build a catalog from the embedded tables.
    ///
    /// `None` selects every language. Unknown codes are ignored.
    pub fn load(languages: Option<&[String]>) -> Result<Self> {
        let tables = ResourceTables::embedded()?;
        let mut catalog = Self::from_tables(&tables, languages);
        catalog.cache_key = Some(catalog.languages.join(","));
        Ok(catalog)
    }

    /// Build a catalog from caller-supplied tables.
    ///
    /// Patterns compiled for such a catalog are never shared through the
    /// process-wide cache.
    pub fn from_tables(tables: &ResourceTables, languages: Option<&[String]>) -> Self {
        let available = tables.languages();
        let selected: Vec<String> = match languages {
            Some(wanted) => {
                let mut seen = Vec::new();
                for lang in wanted {
                    let lang = lang.trim().to_lowercase();
                    if available.contains(&lang) && !seen.contains(&lang) {
                        seen.push(lang);
                    } else if !available.contains(&lang) {
                        log::debug!("No resources for language '{}'", lang);
                    }
                }
                seen
            }
            None => available,
        };

        let mut labels: HashMap<Label, Vec<String>> = HashMap::new();
        let mut stopwords = Vec::new();
        let mut info_page_keywords = Vec::new();
        let mut doc_type_mapping = HashMap::new();

        for lang in &selected {
            if let Some(groups) = tables.labels.get(lang) {
                for label in ALL_LABELS {
                    if let Some(values) = groups.get(label.key()) {
                        labels
                            .entry(label)
                            .or_default()
                            .extend(values.iter().cloned());
                    }
                }
            }
            if let Some(words) = tables.stopwords.get(lang) {
                stopwords.extend(words.iter().map(|w| w.to_lowercase()));
            }
            if let Some(words) = tables.info_page_keywords.get(lang) {
                info_page_keywords.extend(words.iter().map(|w| w.to_lowercase()));
            }
            if let Some(mapping) = tables.doc_type_mapping.get(lang) {
                for (word, doc_type) in mapping {
                    doc_type_mapping
                        .entry(word.to_lowercase())
                        .or_insert_with(|| doc_type.clone());
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        info_page_keywords.retain(|k| seen.insert(k.clone()));

        Self {
            languages: selected,
            cache_key: None,
            labels,
            stopwords,
            info_page_keywords,
            doc_type_mapping,
            patterns: OnceCell::new(),
        }
    }

    /// Selected language codes, in selection order.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Label alternatives of one group across the selected languages.
    pub fn labels(&self, label: Label) -> &[String] {
        self.labels.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Alternation of a label group (`a|b|c`), or `None` when the group is empty.
    pub fn label_alternation(&self, label: Label) -> Option<String> {
        let values = self.labels(label);
        if values.is_empty() {
            None
        } else {
            Some(values.join("|"))
        }
    }

    /// Lower-cased words that disqualify a person name.
    pub fn stopwords(&self) -> &[String] {
        &self.stopwords
    }

    /// Lower-cased keywords typical of an info page.
    pub fn info_page_keywords(&self) -> &[String] {
        &self.info_page_keywords
    }

    /// Map a lower-cased document-type word to its canonical type.
    /// Unmapped words are returned unchanged.
    pub fn doc_type(&self, word: &str) -> String {
        let word = word.to_lowercase();
        self.doc_type_mapping
            .get(&word)
            .cloned()
            .unwrap_or(word)
    }

    /// Whether any stopword is a substring of the lower-cased text.
    pub fn contains_stopword(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.stopwords.iter().any(|w| lower.contains(w.as_str()))
    }

    /// Compiled pattern set for this catalog, built on first use.
    pub fn patterns(&self) -> Result<&Patterns> {
        let patterns = self.patterns.get_or_try_init(|| self.compile_patterns())?;
        Ok(patterns.as_ref())
    }

    fn compile_patterns(&self) -> Result<Arc<Patterns>> {
        let Some(key) = &self.cache_key else {
            return Ok(Arc::new(Patterns::compile(self)?));
        };

        let mut cache = PATTERN_CACHE
            .lock()
            .map_err(|_| Error::Other("pattern cache poisoned".to_string()))?;
        if let Some(patterns) = cache.get(key) {
            return Ok(Arc::clone(patterns));
        }
        log::debug!("Compiling patterns for languages [{}]", key);
        let patterns = Arc::new(Patterns::compile(self)?);
        cache.insert(key.clone(), Arc::clone(&patterns));
        Ok(patterns)
    }
}

const ALL_LABELS: [Label; 9] = [
    Label::Title,
    Label::Publisher,
    Label::Author,
    Label::Report,
    Label::ReportType,
    Label::BindingWords,
    Label::Photo,
    Label::ElectronicIsxn,
    Label::PrintIsxn,
];

//! Extraction through an OpenAI-compatible chat-completions service.

use std::collections::BTreeMap;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

use super::{ExtractContext, ExtractionBackend};
use crate::error::{Error, Result};
use crate::model::{Candidate, Document, Field, Metadata, Origin, PdfInfo, PersonName};

const SYSTEM_PROMPT: &str =
    "You are a skilled librarian specialized in meticulous cataloguing of digital documents.";
const INSTRUCTION: &str = "Extract metadata from this document. Return as JSON.";
const MAX_TOKENS: u32 = 1024;
const TIMEOUT: Duration = Duration::from_secs(120);

/// Paragraphs at least this long are dropped, except a few on the first pages.
const LONG_PARAGRAPH: usize = 250;
const LONG_PARAGRAPHS_ON_FIRST_PAGES: usize = 2;

static TOC_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{4,}").unwrap());
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*").unwrap());

/// Connection settings for the chat-completions service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LlmConfig {
    /// Base URL; `/chat/completions` is appended
    pub api_url: String,
    /// Bearer token, sent when non-empty
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
}

impl LlmConfig {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: None,
            model: model.into(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_url.trim_end_matches('/'))
    }
}

/// Backend asking a language model for the metadata.
#[derive(Debug)]
pub struct LlmExtractor {
    config: LlmConfig,
    client: reqwest::blocking::Client,
}

impl LlmExtractor {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_url.trim().is_empty() {
            return Err(Error::Llm("no API URL configured".to_string()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .build()?;
        Ok(Self { config, client })
    }

    /// Send the document and return the model's message content.
    fn request(&self, document: &Value) -> Result<String> {
        let message = format!("{}\n\n{}", INSTRUCTION, serde_json::to_string(document)?);
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": message},
            ],
            "temperature": 0.0,
            "max_tokens": MAX_TOKENS,
        });

        let mut request = self.client.post(self.config.endpoint()).json(&body);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(key);
        }
        let response: ChatResponse = request.send()?.error_for_status()?.json()?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Llm("response has no choices".to_string()))
    }
}

impl ExtractionBackend for LlmExtractor {
    fn extract(&self, doc: &Document, ctx: &ExtractContext<'_>) -> Result<Metadata> {
        let document = document_payload(doc.pdf_info(), doc.pages());
        let content = match self.request(&document) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("LLM request failed: {}", e);
                return Ok(Metadata::new());
            }
        };
        match parse_response(&content, ctx) {
            Ok(metadata) => Ok(metadata),
            Err(e) => {
                log::warn!("Unusable LLM response: {}", e);
                Ok(Metadata::new())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Fields understood in the model's answer; everything else is ignored.
///
/// Each field is read on its own: `null`, a single value where a list is
/// expected or a list where a single value is expected never discards the
/// other fields.
#[derive(Debug, Default, Deserialize)]
struct LlmAnswer {
    #[serde(default, deserialize_with = "lenient_string")]
    language: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    creator: Vec<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    year: Option<i64>,
    #[serde(default, deserialize_with = "lenient_strings")]
    publisher: Vec<String>,
    #[serde(rename = "e-isbn", default, deserialize_with = "lenient_strings")]
    e_isbn: Vec<String>,
    #[serde(rename = "e-issn", default, deserialize_with = "lenient_strings")]
    e_issn: Vec<String>,
}

/// Non-empty strings of a string, number or list value.
fn strings_of(value: Value) -> Vec<String> {
    let values = match value {
        Value::String(s) => vec![s],
        Value::Number(n) => vec![n.to_string()],
        Value::Array(items) => items.into_iter().flat_map(strings_of).collect(),
        _ => Vec::new(),
    };
    values.into_iter().filter(|s| !s.trim().is_empty()).collect()
}

fn lenient_strings<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(strings_of(Value::deserialize(deserializer)?))
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(strings_of(Value::deserialize(deserializer)?).into_iter().next())
}

fn lenient_year<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let year = strings_of(Value::deserialize(deserializer)?)
        .into_iter()
        .find_map(|s| s.trim().parse::<i64>().ok());
    Ok(year)
}

/// JSON sent to the model: non-empty embedded info and the filtered text
/// of the windowed pages.
pub(crate) fn document_payload(info: Option<&PdfInfo>, pages: &BTreeMap<u32, String>) -> Value {
    let mut pdfinfo = Map::new();
    if let Some(info) = info {
        for (key, value) in info.fields() {
            pdfinfo.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    let mut page_texts = Map::new();
    for (&number, text) in pages {
        page_texts.insert(number.to_string(), Value::String(filter_page_text(number, text)));
    }

    json!({"pdfinfo": pdfinfo, "pages": page_texts})
}

/// Keep short paragraphs, plus the first long ones on pages 1 and 2; drop
/// table-of-contents lines.
fn filter_page_text(number: u32, text: &str) -> String {
    let mut long_budget = if number <= 2 {
        LONG_PARAGRAPHS_ON_FIRST_PAGES
    } else {
        0
    };

    let mut kept = Vec::new();
    for paragraph in PARAGRAPH_BREAK.split(text) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() || TOC_LINE.is_match(paragraph) {
            continue;
        }
        if paragraph.chars().count() < LONG_PARAGRAPH {
            kept.push(paragraph);
        } else if long_budget > 0 {
            long_budget -= 1;
            kept.push(paragraph);
        }
    }
    kept.join("\n")
}

/// Candidates from the model's JSON answer, tagged `LLM`.
pub(crate) fn parse_response(content: &str, ctx: &ExtractContext<'_>) -> Result<Metadata> {
    let answer: LlmAnswer = serde_json::from_str(strip_code_fence(content))?;
    let mut metadata = Metadata::new();

    if let Some(language) = answer.language {
        metadata.add_candidate(Field::Language, Candidate::new(language, Origin::Llm));
    }
    if let Some(title) = answer.title {
        metadata.add_candidate(Field::Title, Candidate::new(title, Origin::Llm));
    }
    for creator in answer.creator {
        // "Last, First"
        let person = match creator.split_once(", ") {
            Some((last, first)) => PersonName::new(first.trim(), last.trim()),
            None => PersonName::new("", creator.trim()),
        };
        metadata.add_candidate(Field::Author, Candidate::new(person, Origin::Llm));
    }
    if let Some(year) = answer.year {
        metadata.add_candidate(Field::Year, Candidate::new(year, Origin::Llm));
    }
    for publisher in answer.publisher {
        let entries = ctx.search_registry(&publisher);
        metadata.add_candidate(
            Field::Publisher,
            Candidate::new(publisher, Origin::Llm).with_registry_entries(entries),
        );
    }
    for isbn in answer.e_isbn {
        metadata.add_candidate(Field::Isbn, Candidate::new(isbn.replace('-', ""), Origin::Llm));
    }
    for issn in answer.e_issn {
        metadata.add_candidate(Field::Issn, Candidate::new(issn, Origin::Llm));
    }

    Ok(metadata)
}

/// Models often wrap JSON answers in a markdown code fence.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

//! Candidate values and their provenance.

use serde::{Deserialize, Serialize};

use crate::registry::RegistryEntry;

/// Where a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Origin {
    FrontPage,
    Page,
    InfoPage,
    Pdfinfo,
    Copyright,
    RapportPrefix,
    LanguageModel,
    Llm,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::FrontPage => "FRONT_PAGE",
            Origin::Page => "PAGE",
            Origin::InfoPage => "INFO_PAGE",
            Origin::Pdfinfo => "PDFINFO",
            Origin::Copyright => "COPYRIGHT",
            Origin::RapportPrefix => "RAPPORT_PREFIX",
            Origin::LanguageModel => "LANGUAGE_MODEL",
            Origin::Llm => "LLM",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person's name split into given names and surname.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonName {
    pub firstname: String,
    pub lastname: String,
}

impl PersonName {
    pub fn new(firstname: impl Into<String>, lastname: impl Into<String>) -> Self {
        Self {
            firstname: firstname.into(),
            lastname: lastname.into(),
        }
    }
}

/// Value carried by a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CandidateValue {
    Number(i64),
    Text(String),
    PersonName(PersonName),
}

impl CandidateValue {
    /// The text of a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CandidateValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for CandidateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateValue::Number(n) => write!(f, "{}", n),
            CandidateValue::Text(s) => f.write_str(s),
            CandidateValue::PersonName(p) => write!(f, "{} {}", p.firstname, p.lastname),
        }
    }
}

impl From<String> for CandidateValue {
    fn from(s: String) -> Self {
        CandidateValue::Text(s)
    }
}

impl From<&str> for CandidateValue {
    fn from(s: &str) -> Self {
        CandidateValue::Text(s.to_string())
    }
}

impl From<i64> for CandidateValue {
    fn from(n: i64) -> Self {
        CandidateValue::Number(n)
    }
}

impl From<PersonName> for CandidateValue {
    fn from(p: PersonName) -> Self {
        CandidateValue::PersonName(p)
    }
}

/// One proposed value for a metadata field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub value: CandidateValue,
    pub origin: Origin,
    #[serde(default, rename = "pageNumber", skip_serializing_if = "Option::is_none")]
    pub page_nr: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, rename = "registryEntries", skip_serializing_if = "Vec::is_empty")]
    pub registry_entries: Vec<RegistryEntry>,
}

impl Candidate {
    pub fn new(value: impl Into<CandidateValue>, origin: Origin) -> Self {
        Self {
            value: value.into(),
            origin,
            page_nr: None,
            context: None,
            registry_entries: Vec::new(),
        }
    }

    /// Set the page the value was found on.
    pub fn on_page(mut self, page_nr: u32) -> Self {
        self.page_nr = Some(page_nr);
        self
    }

    /// Attach surrounding text.
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    /// Attach registry matches, best first.
    pub fn with_registry_entries(mut self, entries: Vec<RegistryEntry>) -> Self {
        self.registry_entries = entries;
        self
    }

    /// Text of the value, if it is a plain string.
    pub fn text(&self) -> Option<&str> {
        self.value.as_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_serialization() {
        assert_eq!(
            serde_json::to_string(&Origin::RapportPrefix).unwrap(),
            "\"RAPPORT_PREFIX\""
        );
        assert_eq!(serde_json::to_string(&Origin::Pdfinfo).unwrap(), "\"PDFINFO\"");
        assert_eq!(Origin::LanguageModel.to_string(), "LANGUAGE_MODEL");
    }

    #[test]
    fn test_candidate_builder() {
        let candidate = Candidate::new("Nasjonalbiblioteket", Origin::Copyright)
            .on_page(2)
            .with_registry_entries(vec![RegistryEntry::new(42, "Nasjonalbiblioteket")]);
        assert_eq!(candidate.text(), Some("Nasjonalbiblioteket"));
        assert_eq!(candidate.page_nr, Some(2));
        assert_eq!(candidate.registry_entries[0].auth_id, 42);
    }

    #[test]
    fn test_value_serialization() {
        let value = CandidateValue::from(PersonName::new("Henrik J.", "Ibsen"));
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            serde_json::json!({"firstname": "Henrik J.", "lastname": "Ibsen"})
        );
        assert_eq!(
            serde_json::to_value(CandidateValue::from(2023i64)).unwrap(),
            serde_json::json!(2023)
        );
    }
}

//! The final, serializable extraction result.

use serde::{Deserialize, Serialize};

use super::candidate::{Candidate, CandidateValue, Origin};

/// Provenance as serialized in results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultOrigin {
    #[serde(rename = "type")]
    pub kind: Origin,
    #[serde(rename = "pageNumber", default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

/// A scalar result value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Number(n) => write!(f, "{}", n),
            ScalarValue::Text(s) => f.write_str(s),
        }
    }
}

/// The chosen value of a single-valued field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultValue {
    pub value: ScalarValue,
    pub origin: ResultOrigin,
    /// Registry identifier, publishers only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_id: Option<i64>,
    /// Publisher name as printed in the document, when `value` is the
    /// registry's preferred name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_in_doc: Option<String>,
}

/// One chosen author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultAuthor {
    pub firstname: String,
    pub lastname: String,
    pub origin: ResultOrigin,
}

/// Best value per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    pub year: Option<ResultValue>,
    pub language: Option<ResultValue>,
    pub title: Option<ResultValue>,
    pub publisher: Option<ResultValue>,
    pub publication_type: Option<ResultValue>,
    pub authors: Vec<ResultAuthor>,
    pub isbn: Option<ResultValue>,
    pub issn: Option<ResultValue>,
}

impl Results {
    /// Serialize to a pretty-printed JSON string.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Candidate {
    fn result_origin(&self) -> ResultOrigin {
        ResultOrigin {
            kind: self.origin,
            page_number: self.page_nr.filter(|n| *n > 0),
        }
    }

    /// Result form of a scalar candidate; registry matches replace the
    /// value by the registry's preferred name. `None` for person names.
    pub fn to_result_value(&self) -> Option<ResultValue> {
        let value = match &self.value {
            CandidateValue::Number(n) => ScalarValue::Number(*n),
            CandidateValue::Text(s) => ScalarValue::Text(s.clone()),
            CandidateValue::PersonName(_) => return None,
        };
        let origin = self.result_origin();
        Some(match self.registry_entries.first() {
            Some(entry) => ResultValue {
                value: ScalarValue::Text(entry.name.clone()),
                origin,
                auth_id: Some(entry.auth_id),
                value_in_doc: Some(value.to_string()),
            },
            None => ResultValue {
                value,
                origin,
                auth_id: None,
                value_in_doc: None,
            },
        })
    }

    /// Result form of a person-name candidate.
    pub fn to_result_author(&self) -> Option<ResultAuthor> {
        match &self.value {
            CandidateValue::PersonName(name) => Some(ResultAuthor {
                firstname: name.firstname.clone(),
                lastname: name.lastname.clone(),
                origin: self.result_origin(),
            }),
            _ => None,
        }
    }
}

//! Candidate collection and arbitration.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::candidate::{Candidate, Origin};
use super::results::{ResultAuthor, Results};
use crate::text::{self, Patterns};

/// Metadata fields that receive candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Author,
    Publisher,
    Year,
    Language,
    Isbn,
    Issn,
    DocumentType,
}

/// All candidates found in one document, per field, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    candidates: BTreeMap<Field, Vec<Candidate>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_candidate(&mut self, field: Field, candidate: Candidate) {
        log::debug!(
            "{:?} candidate '{}' from {}{}",
            field,
            candidate.value,
            candidate.origin,
            candidate
                .page_nr
                .map(|n| format!(" (page {})", n))
                .unwrap_or_default()
        );
        self.candidates.entry(field).or_default().push(candidate);
    }

    /// Candidates for a field, in discovery order.
    pub fn candidates(&self, field: Field) -> &[Candidate] {
        self.candidates.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.values().all(Vec::is_empty)
    }

    /// Total number of candidates over all fields.
    pub fn len(&self) -> usize {
        self.candidates.values().map(Vec::len).sum()
    }

    /// Whether a publisher candidate with exactly this text exists.
    pub fn has_publisher(&self, name: &str) -> bool {
        self.candidates(Field::Publisher)
            .iter()
            .any(|c| c.text() == Some(name))
    }

    pub fn has_publisher_from_infopage(&self) -> bool {
        self.candidates(Field::Publisher)
            .iter()
            .any(|c| c.origin == Origin::InfoPage)
    }

    /// Reduce the candidates to one answer per field.
    ///
    /// `patterns` supplies the electronic/print markers used to rank ISBN
    /// and ISSN values.
    pub fn choose_best(&self, patterns: &Patterns) -> Results {
        Results {
            year: self.rank_years().and_then(Candidate::to_result_value),
            language: self
                .candidates(Field::Language)
                .first()
                .and_then(Candidate::to_result_value),
            title: self.choose_title().and_then(Candidate::to_result_value),
            publisher: self.choose_publisher().and_then(Candidate::to_result_value),
            publication_type: self
                .candidates(Field::DocumentType)
                .first()
                .and_then(Candidate::to_result_value),
            authors: self.choose_authors(),
            isbn: self
                .choose_isxn(Field::Isbn, patterns)
                .and_then(Candidate::to_result_value),
            issn: self
                .choose_isxn(Field::Issn, patterns)
                .and_then(Candidate::to_result_value),
        }
    }

    fn rank_years(&self) -> Option<&Candidate> {
        let mut years: Vec<&Candidate> = self.candidates(Field::Year).iter().collect();
        years.sort_by_key(|c| Reverse(year_rank(c.origin)));
        years.first().copied()
    }

    fn choose_title(&self) -> Option<&Candidate> {
        let titles = self.candidates(Field::Title);
        [Origin::Pdfinfo, Origin::FrontPage, Origin::Llm]
            .into_iter()
            .find_map(|origin| {
                titles
                    .iter()
                    .find(|c| c.origin == origin && c.text().is_some_and(text::has_letters))
            })
    }

    fn choose_publisher(&self) -> Option<&Candidate> {
        let publishers = self.candidates(Field::Publisher);
        publishers
            .iter()
            .find(|c| !c.registry_entries.is_empty())
            .or_else(|| publishers.first())
    }

    fn choose_authors(&self) -> Vec<ResultAuthor> {
        let mut authors: Vec<ResultAuthor> = Vec::new();
        for author in self
            .candidates(Field::Author)
            .iter()
            .filter_map(Candidate::to_result_author)
        {
            let duplicate = authors
                .iter()
                .any(|a| a.firstname == author.firstname && a.lastname == author.lastname);
            if !duplicate {
                authors.push(author);
            }
        }
        authors
    }

    fn choose_isxn(&self, field: Field, patterns: &Patterns) -> Option<&Candidate> {
        let candidates = self.candidates(field);
        let mut scored: Vec<(&Candidate, i32)> = Vec::new();
        for candidate in candidates {
            if !scored.iter().any(|(c, _)| c.value == candidate.value) {
                let score = patterns.score_isxn_context(candidate.context.as_deref());
                scored.push((candidate, score));
            }
        }
        scored.sort_by_key(|(_, score)| Reverse(*score));
        scored.first().map(|(c, _)| *c)
    }
}

fn year_rank(origin: Origin) -> u8 {
    match origin {
        Origin::Copyright => 2,
        Origin::Pdfinfo => 1,
        _ => 0,
    }
}

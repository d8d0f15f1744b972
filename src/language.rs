//! Language identification.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Identifies the language of a text.
pub trait LanguageDetector: Send + Sync {
    /// ISO 639-1 code of the dominant language, `no` for Norwegian Bokmål.
    fn detect(&self, text: &str) -> Option<String>;
}

/// Detector that never answers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDetector;

impl LanguageDetector for NoopDetector {
    fn detect(&self, _text: &str) -> Option<String> {
        None
    }
}

/// Frequent function words per language. Words shared by closely related
/// languages are kept only where they discriminate.
const PROFILES: &[(&str, &[&str])] = &[
    (
        "no",
        &[
            "og", "i", "er", "det", "som", "til", "på", "av", "for", "med", "en", "ikke", "har",
            "de", "jeg", "vi", "seg", "var", "kan", "om", "denne", "dette", "eller", "hvor",
            "hvordan", "ved", "fra", "også", "etter", "blir", "ble", "sine", "mellom", "under",
            "hvis", "noen", "bare", "mye", "nå",
        ],
    ),
    (
        "nn",
        &[
            "og", "i", "er", "det", "som", "til", "på", "av", "for", "med", "ein", "eit", "ikkje",
            "har", "dei", "vi", "seg", "var", "kan", "om", "denne", "dette", "eller", "kvar",
            "korleis", "ved", "frå", "òg", "etter", "blir", "vart", "sine", "mellom", "under",
            "viss", "nokon", "berre", "mykje", "no",
        ],
    ),
    (
        "da",
        &[
            "og", "i", "er", "det", "som", "til", "på", "af", "for", "med", "en", "ikke", "har",
            "de", "jeg", "vi", "sig", "var", "kan", "om", "denne", "dette", "eller", "hvor",
            "hvordan", "ved", "fra", "også", "efter", "bliver", "blev", "mellem", "under", "hvis",
            "nogle", "kun", "meget", "nu",
        ],
    ),
    (
        "sv",
        &[
            "och", "i", "är", "det", "som", "till", "på", "av", "för", "med", "en", "inte", "har",
            "de", "jag", "vi", "sig", "var", "kan", "om", "denna", "detta", "eller", "var",
            "hur", "vid", "från", "också", "efter", "blir", "blev", "mellan", "under", "om",
            "några", "bara", "mycket", "nu",
        ],
    ),
    (
        "en",
        &[
            "the", "and", "of", "to", "in", "is", "that", "for", "it", "with", "as", "was", "on",
            "are", "be", "by", "this", "from", "or", "which", "an", "not", "have", "has", "were",
            "their", "been", "these", "also", "between",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "und", "in", "den", "von", "zu", "das", "mit", "sich", "des", "auf",
            "für", "ist", "im", "dem", "nicht", "ein", "eine", "als", "auch", "es", "an", "werden",
            "aus", "er", "hat", "dass", "sie", "nach", "wird", "bei", "oder", "zwischen",
        ],
    ),
    (
        "fr",
        &[
            "le", "la", "les", "de", "des", "et", "un", "une", "du", "en", "est", "que", "qui",
            "dans", "pour", "pas", "sur", "au", "avec", "par", "ce", "il", "sont", "aux", "plus",
            "ou", "entre",
        ],
    ),
];

static WORD_SETS: Lazy<Vec<(&'static str, HashSet<&'static str>)>> = Lazy::new(|| {
    PROFILES
        .iter()
        .map(|(lang, words)| (*lang, words.iter().copied().collect()))
        .collect()
});

/// Scores each language by how many tokens of the text are among its
/// function words.
#[derive(Debug, Clone)]
pub struct StopwordLanguageDetector {
    /// Minimum number of matching tokens for an answer
    min_hits: usize,
}

impl StopwordLanguageDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_hits(mut self, min_hits: usize) -> Self {
        self.min_hits = min_hits;
        self
    }
}

impl Default for StopwordLanguageDetector {
    fn default() -> Self {
        Self { min_hits: 3 }
    }
}

impl LanguageDetector for StopwordLanguageDetector {
    fn detect(&self, text: &str) -> Option<String> {
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphabetic())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();
        if tokens.is_empty() {
            return None;
        }

        let mut best: Option<(&str, usize)> = None;
        for (lang, words) in WORD_SETS.iter() {
            let hits = tokens.iter().filter(|t| words.contains(t.as_str())).count();
            if hits >= self.min_hits && best.map_or(true, |(_, top)| hits > top) {
                best = Some((lang, hits));
            }
        }
        log::debug!("Language scores settled on {:?}", best);
        best.map(|(lang, _)| lang.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_bokmal() {
        let detector = StopwordLanguageDetector::new();
        let text = "Denne rapporten beskriver hvordan metadata kan hentes ut fra dokumenter, \
                    og hvilke muligheter som finnes for automatisk registrering. Det er også \
                    mye som ikke fungerer ennå.";
        assert_eq!(detector.detect(text).as_deref(), Some("no"));
    }

    #[test]
    fn test_detect_nynorsk() {
        let detector = StopwordLanguageDetector::new();
        let text = "Denne rapporten skildrar korleis ein kan hente ut metadata frå dokument, \
                    og kvar det ikkje er mogleg. Det er òg mykje som berre fungerer delvis.";
        assert_eq!(detector.detect(text).as_deref(), Some("nn"));
    }

    #[test]
    fn test_detect_english() {
        let detector = StopwordLanguageDetector::new();
        let text = "This report describes the extraction of metadata from documents and the \
                    evaluation of which methods are useful for the library.";
        assert_eq!(detector.detect(text).as_deref(), Some("en"));
    }

    #[test]
    fn test_detect_too_little_text() {
        let detector = StopwordLanguageDetector::new();
        assert!(detector.detect("").is_none());
        assert!(detector.detect("ISBN 978-82-17-02298-5").is_none());
    }

    #[test]
    fn test_min_hits() {
        let text = "rapport om det og det";
        assert_eq!(StopwordLanguageDetector::new().detect(text).as_deref(), Some("no"));
        assert!(StopwordLanguageDetector::new()
            .with_min_hits(10)
            .detect(text)
            .is_none());
    }

    #[test]
    fn test_noop_detector() {
        assert!(NoopDetector.detect("og det er slik").is_none());
    }
}

//! Extraction backends: turn an open document into metadata candidates.

mod finder;
mod llm;

pub use finder::Finder;
pub use llm::{LlmConfig, LlmExtractor};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::language::LanguageDetector;
use crate::model::{Document, Metadata};
use crate::registry::{PublisherRegistry, RegistryEntry};
use crate::resources::ResourceCatalog;
use crate::text::Patterns;

/// Collaborators shared by the backends during one run.
#[derive(Clone, Copy)]
pub struct ExtractContext<'a> {
    pub catalog: &'a ResourceCatalog,
    pub registry: Option<&'a dyn PublisherRegistry>,
    pub detector: Option<&'a dyn LanguageDetector>,
}

impl<'a> ExtractContext<'a> {
    pub fn new(catalog: &'a ResourceCatalog) -> Self {
        Self {
            catalog,
            registry: None,
            detector: None,
        }
    }

    pub fn with_registry(mut self, registry: &'a dyn PublisherRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_detector(mut self, detector: &'a dyn LanguageDetector) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn patterns(&self) -> Result<&'a Patterns> {
        self.catalog.patterns()
    }

    /// Registry matches for a name; registry failures are logged and yield
    /// no matches.
    pub fn search_registry(&self, name: &str) -> Vec<RegistryEntry> {
        let Some(registry) = self.registry else {
            return Vec::new();
        };
        match registry.search(name) {
            Ok(entries) => {
                if !entries.is_empty() {
                    log::debug!("Registry matched '{}' to {} entries", name, entries.len());
                }
                entries
            }
            Err(e) => {
                log::warn!("Registry lookup for '{}' failed: {}", name, e);
                Vec::new()
            }
        }
    }

    /// Detected language of a text; detector failures yield `None`.
    pub fn detect_language(&self, text: &str) -> Option<String> {
        self.detector.and_then(|d| d.detect(text))
    }
}

impl fmt::Debug for ExtractContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractContext")
            .field("languages", &self.catalog.languages())
            .field("registry", &self.registry.is_some())
            .field("detector", &self.detector.is_some())
            .finish()
    }
}

/// A strategy producing candidates for a document.
pub trait ExtractionBackend: Send + Sync {
    fn extract(&self, doc: &Document, ctx: &ExtractContext<'_>) -> Result<Metadata>;
}

/// Available extraction strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Layout and pattern heuristics
    #[default]
    Finder,
    /// OpenAI-compatible chat-completions service
    Llm,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Finder => f.write_str("finder"),
            Backend::Llm => f.write_str("llm"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "finder" => Ok(Backend::Finder),
            "llm" => Ok(Backend::Llm),
            other => Err(format!("unknown backend '{}' (expected finder or llm)", other)),
        }
    }
}

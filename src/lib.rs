//! # meteor
//!
//! Bibliographic metadata extraction from PDF files and directories of ALTO
//! pages.
//!
//! Documents are noisy, so no single signal is trusted. Each extraction step
//! proposes candidate values tagged with where they were found, and
//! field-specific rules pick one answer per field.
//!
//! ## Quick Start
//!
//! ```no_run
//! use meteor::{Meteor, MeteorOptions};
//!
//! fn main() -> meteor::Result<()> {
//!     let meteor = Meteor::new(MeteorOptions::new().with_languages(["nob", "eng"]))?;
//!     let results = meteor.run("report.pdf")?;
//!     println!("{}", results.to_json()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **PDF and ALTO input**: `lopdf` content streams or per-page ALTO XML
//! - **Layout heuristics**: label/value neighbors on info pages, font-size titles
//! - **Multilingual labels**: embedded label tables per language
//! - **Publisher registry**: optional SQLite authority lookup
//! - **LLM backend**: OpenAI-compatible chat-completions as an alternative
//! - **Batch processing**: Rayon over many documents

pub mod author;
pub mod detect;
pub mod error;
pub mod extract;
pub mod infopage;
pub mod language;
pub mod model;
pub mod parser;
pub mod registry;
pub mod resources;
pub mod text;

pub use detect::{detect_input, InputFormat, PdfFormat};
pub use error::{Error, Result};
pub use extract::{Backend, ExtractContext, ExtractionBackend, Finder, LlmConfig, LlmExtractor};
pub use language::{LanguageDetector, NoopDetector, StopwordLanguageDetector};
pub use model::{
    Candidate, CandidateValue, Document, Field, Metadata, Origin, PdfInfo, PersonName,
    ResultAuthor, ResultOrigin, ResultValue, Results, ScalarValue,
};
pub use parser::DocumentOptions;
pub use registry::{PublisherRegistry, RegistryEntry, SqliteRegistry};
pub use resources::ResourceCatalog;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

/// Configuration for a [`Meteor`] instance.
///
/// # Example
///
/// ```
/// use meteor::{Backend, MeteorOptions};
///
/// let options = MeteorOptions::new()
///     .with_languages(["nob", "nno"])
///     .with_backend(Backend::Finder);
/// assert_eq!(options.languages.as_deref().map(<[_]>::len), Some(2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MeteorOptions {
    /// Language codes of the label tables to use; `None` uses all
    pub languages: Option<Vec<String>>,
    pub backend: Backend,
    pub document: DocumentOptions,
    /// Required by [`Backend::Llm`]
    pub llm: Option<LlmConfig>,
}

impl MeteorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the label tables to these languages.
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_document_options(mut self, document: DocumentOptions) -> Self {
        self.document = document;
        self
    }

    /// Set the LLM service, used when the backend is [`Backend::Llm`].
    pub fn with_llm(mut self, config: LlmConfig) -> Self {
        self.llm = Some(config);
        self
    }
}

/// Metadata extractor.
///
/// Holds the resource catalog and collaborators shared by every run. Safe to
/// share between threads; each run opens its own [`Document`].
///
/// # Example
///
/// ```no_run
/// use meteor::{Meteor, MeteorOptions, SqliteRegistry};
///
/// let meteor = Meteor::new(MeteorOptions::default())?
///     .with_registry(SqliteRegistry::open("registry.db")?);
/// let results = meteor.run("scans/report-0042")?;
/// if let Some(publisher) = results.publisher {
///     println!("{:?} ({:?})", publisher.value, publisher.auth_id);
/// }
/// # Ok::<(), meteor::Error>(())
/// ```
pub struct Meteor {
    options: MeteorOptions,
    catalog: Arc<ResourceCatalog>,
    backend: Box<dyn ExtractionBackend>,
    registry: Option<Arc<dyn PublisherRegistry>>,
    detector: Arc<dyn LanguageDetector>,
}

impl Meteor {
    /// Load the resource tables and set up the configured backend.
    ///
    /// # Errors
    /// * `Error::Resource` / `Error::Pattern` for broken label tables
    /// * `Error::Llm` when the LLM backend is selected without a usable
    ///   service configuration
    pub fn new(options: MeteorOptions) -> Result<Self> {
        let catalog = ResourceCatalog::load(options.languages.as_deref())?;
        // compile now so a broken table fails here rather than mid-run
        catalog.patterns()?;

        let backend: Box<dyn ExtractionBackend> = match options.backend {
            Backend::Finder => Box::new(Finder::new()),
            Backend::Llm => {
                let config = options.llm.clone().ok_or_else(|| {
                    Error::Llm("the llm backend needs an API URL and model".to_string())
                })?;
                Box::new(LlmExtractor::new(config)?)
            }
        };
        log::debug!(
            "Meteor ready: backend {}, languages [{}]",
            options.backend,
            catalog.languages().join(",")
        );

        Ok(Self {
            options,
            catalog: Arc::new(catalog),
            backend,
            registry: None,
            detector: Arc::new(StopwordLanguageDetector::new()),
        })
    }

    /// Look up publishers in an authority registry.
    pub fn with_registry(mut self, registry: impl PublisherRegistry + 'static) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Replace the built-in stopword language detector.
    pub fn with_language_detector(mut self, detector: impl LanguageDetector + 'static) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    pub fn options(&self) -> &MeteorOptions {
        &self.options
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    /// Extract the best metadata of a PDF file or ALTO directory.
    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<Results> {
        let metadata = self.candidates(path)?;
        Ok(metadata.choose_best(self.catalog.patterns()?))
    }

    /// Extract the best metadata of an in-memory PDF.
    pub fn run_pdf_bytes(&self, data: &[u8]) -> Result<Results> {
        let doc = Document::from_pdf_bytes(data, &self.options.document)?;
        let metadata = self.extract(&doc);
        doc.close();
        Ok(metadata?.choose_best(self.catalog.patterns()?))
    }

    /// All candidates found in a document, before arbitration.
    pub fn candidates<P: AsRef<Path>>(&self, path: P) -> Result<Metadata> {
        let path = path.as_ref();
        log::debug!("Extracting metadata from {}", path.display());
        let doc = Document::open(path, &self.options.document)?;
        let metadata = self.extract(&doc);
        doc.close();
        metadata
    }

    /// Run many documents in parallel. Results keep the order of `paths`.
    pub fn run_many(&self, paths: &[PathBuf]) -> Vec<Result<Results>> {
        paths.par_iter().map(|path| self.run(path)).collect()
    }

    fn extract(&self, doc: &Document) -> Result<Metadata> {
        let mut ctx = ExtractContext::new(&self.catalog).with_detector(self.detector.as_ref());
        if let Some(registry) = &self.registry {
            ctx = ctx.with_registry(registry.as_ref());
        }
        self.backend.extract(doc, &ctx)
    }
}

impl std::fmt::Debug for Meteor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Meteor")
            .field("options", &self.options)
            .field("languages", &self.catalog.languages())
            .field("registry", &self.registry.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_meteor_is_send_sync() {
        assert_send_sync::<Meteor>();
    }

    #[test]
    fn test_options_builder() {
        let options = MeteorOptions::new()
            .with_languages(["nob"])
            .with_backend(Backend::Llm)
            .with_llm(LlmConfig::new("http://localhost:8000/v1", "test-model"))
            .with_document_options(DocumentOptions::new().with_window(3, 2));
        assert_eq!(options.languages, Some(vec!["nob".to_string()]));
        assert_eq!(options.backend, Backend::Llm);
        assert_eq!(options.document.window_start, 3);
        assert_eq!(options.llm.unwrap().model, "test-model");
    }

    #[test]
    fn test_llm_backend_requires_config() {
        let options = MeteorOptions::new().with_backend(Backend::Llm);
        assert!(matches!(Meteor::new(options), Err(Error::Llm(_))));
    }

    #[test]
    fn test_run_missing_input() {
        let meteor = Meteor::new(MeteorOptions::default()).unwrap();
        let err = meteor.run("does/not/exist.pdf").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_run_many_keeps_order() {
        let meteor = Meteor::new(MeteorOptions::default()).unwrap();
        let paths = vec![PathBuf::from("missing-a.pdf"), PathBuf::from("missing-b.pdf")];
        let results = meteor.run_many(&paths);
        assert_eq!(results.len(), 2);
        match &results[1] {
            Err(Error::NotFound(path)) => assert_eq!(path, &paths[1]),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

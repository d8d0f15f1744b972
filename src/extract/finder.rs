//! Heuristic extraction: a fixed sequence of independent finder steps.

use super::{ExtractContext, ExtractionBackend};
use crate::author;
use crate::error::Result;
use crate::infopage::{self, InfoPage};
use crate::model::{Candidate, Document, Field, Metadata, Origin};
use crate::parser::parse_pdf_date;
use crate::text::{self, IsxnKind, Patterns};

/// Number of leading window pages searched for embedded title and author.
const EMBEDDED_SEARCH_PAGES: usize = 3;

/// Layout and pattern based candidate finder.
#[derive(Debug, Default, Clone, Copy)]
pub struct Finder;

impl Finder {
    pub fn new() -> Self {
        Self
    }
}

impl ExtractionBackend for Finder {
    fn extract(&self, doc: &Document, ctx: &ExtractContext<'_>) -> Result<Metadata> {
        let mut run = FinderRun {
            doc,
            ctx: *ctx,
            patterns: ctx.patterns()?,
            metadata: Metadata::new(),
        };
        run.run_steps();
        Ok(run.metadata)
    }
}

type Step<'a> = fn(&mut FinderRun<'a>) -> Result<()>;

/// State of one extraction run. Later steps read candidates of earlier
/// ones, so the step order matters.
struct FinderRun<'a> {
    doc: &'a Document,
    ctx: ExtractContext<'a>,
    patterns: &'a Patterns,
    metadata: Metadata,
}

impl<'a> FinderRun<'a> {
    fn run_steps(&mut self) {
        let steps: [(&str, Step<'a>); 13] = [
            ("title from first page", Self::find_title_from_page),
            ("title from pdf info", Self::title_from_info),
            ("author from pdf info", Self::author_from_info),
            ("year from pdf info", Self::year_from_info),
            ("isbn", |run| run.find_isxn(IsxnKind::Isbn)),
            ("issn", |run| run.find_isxn(IsxnKind::Issn)),
            ("info page", Self::read_info_page),
            ("publisher label", Self::find_publisher),
            ("copyright", Self::parse_copyright),
            ("report prefix", Self::find_report_prefix),
            ("language", Self::find_language),
            ("front page authors", Self::find_authors),
            ("document type", Self::find_document_type),
        ];

        for (name, step) in steps {
            if let Err(e) = step(self) {
                log::warn!("Finder step '{}' failed: {}", name, e);
            }
        }
    }

    fn first_page(&self) -> Option<u32> {
        self.doc.pages().keys().next().copied()
    }

    fn add(&mut self, field: Field, candidate: Candidate) {
        self.metadata.add_candidate(field, candidate);
    }

    fn add_publisher(&mut self, name: &str, origin: Origin, page_nr: u32) {
        let entries = self.ctx.search_registry(name);
        self.add(
            Field::Publisher,
            Candidate::new(name, origin)
                .on_page(page_nr)
                .with_registry_entries(entries),
        );
    }

    /// Text of the largest font size on the first page that has letters.
    fn find_title_from_page(&mut self) -> Result<()> {
        let Some(first) = self.first_page() else {
            return Ok(());
        };
        let page = self.doc.page(first)?;

        let mut groups: Vec<(f32, Vec<&str>)> = Vec::new();
        for block in &page.blocks {
            match groups.iter_mut().find(|(size, _)| *size == block.font_size) {
                Some((_, texts)) => texts.push(&block.text),
                None => groups.push((block.font_size, vec![&block.text])),
            }
        }
        groups.sort_by(|a, b| b.0.total_cmp(&a.0));

        if let Some(title) = groups
            .iter()
            .map(|(_, texts)| texts.join(" "))
            .find(|joined| text::has_letters(joined))
        {
            self.add(
                Field::Title,
                Candidate::new(text::clean_whitespace(&title), Origin::FrontPage),
            );
        }
        Ok(())
    }

    fn title_from_info(&mut self) -> Result<()> {
        let doc = self.doc;
        let Some(title) = doc.pdf_info().and_then(|i| i.title.as_deref()) else {
            return Ok(());
        };
        match text::find_in_pages(title, doc.pages(), EMBEDDED_SEARCH_PAGES) {
            Some(page_nr) => self.add(
                Field::Title,
                Candidate::new(title.trim(), Origin::Pdfinfo).on_page(page_nr),
            ),
            None => log::debug!("Embedded title '{}' not found in text", title),
        }
        Ok(())
    }

    fn author_from_info(&mut self) -> Result<()> {
        let doc = self.doc;
        let Some(authors) = doc.pdf_info().and_then(|i| i.author.as_deref()) else {
            return Ok(());
        };
        if self.ctx.catalog.contains_stopword(authors) {
            log::debug!("Embedded author '{}' looks like an institution", authors);
            return Ok(());
        }
        for name in text::find_names(authors) {
            let Some(page_nr) = text::find_in_pages(name, doc.pages(), EMBEDDED_SEARCH_PAGES) else {
                continue;
            };
            if let Some(person) = author::split_name(name) {
                self.add(
                    Field::Author,
                    Candidate::new(person, Origin::Pdfinfo).on_page(page_nr),
                );
            }
        }
        Ok(())
    }

    fn year_from_info(&mut self) -> Result<()> {
        let doc = self.doc;
        let Some(info) = doc.pdf_info() else {
            return Ok(());
        };
        let year = [&info.mod_date, &info.creation_date]
            .into_iter()
            .flatten()
            .find_map(|raw| {
                let date = parse_pdf_date(raw);
                if date.is_none() {
                    log::debug!("Skipping malformed embedded date '{}'", raw);
                }
                date
            })
            .map(|date| chrono::Datelike::year(&date));
        let Some(year) = year else {
            return Ok(());
        };

        let literal = year.to_string();
        if let Some(page_nr) = doc
            .pages()
            .iter()
            .find(|(_, text)| text.contains(&literal))
            .map(|(n, _)| *n)
        {
            self.add(
                Field::Year,
                Candidate::new(i64::from(year), Origin::Pdfinfo).on_page(page_nr),
            );
        }
        Ok(())
    }

    fn find_isxn(&mut self, kind: IsxnKind) -> Result<()> {
        let doc = self.doc;
        let field = match kind {
            IsxnKind::Isbn => Field::Isbn,
            IsxnKind::Issn => Field::Issn,
        };
        for (&page_nr, page_text) in doc.pages() {
            if !page_text.contains(kind.label()) {
                continue;
            }
            let page = match doc.page(page_nr) {
                Ok(page) => page,
                Err(e) => {
                    log::warn!("Skipping page {} in {} scan: {}", page_nr, kind.label(), e);
                    continue;
                }
            };
            for found in page.find_isxn(kind) {
                let value = match kind {
                    IsxnKind::Isbn => found.value.replace('-', ""),
                    IsxnKind::Issn => found.value,
                };
                self.add(
                    field,
                    Candidate::new(value, Origin::Page)
                        .on_page(page_nr)
                        .with_context(found.context),
                );
            }
        }
        Ok(())
    }

    fn read_info_page(&mut self) -> Result<()> {
        let page_nr = infopage::find_info_page(self.doc.pages(), self.ctx.catalog);
        if page_nr == 0 {
            return Ok(());
        }
        log::debug!("Page {} looks like an info page", page_nr);
        let page = self.doc.page(page_nr)?;
        let info = InfoPage::new(&page, self.ctx.catalog);

        if let Some(title) = info.find_title(self.patterns) {
            self.add(
                Field::Title,
                Candidate::new(title, Origin::InfoPage).on_page(page_nr),
            );
        }
        if let Some(publisher) = info.find_publisher(self.patterns) {
            self.add_publisher(&publisher, Origin::InfoPage, page_nr);
        }
        for name in info.find_author(self.patterns).unwrap_or_default() {
            if let Some(person) = author::split_name(&name) {
                self.add(
                    Field::Author,
                    Candidate::new(person, Origin::InfoPage).on_page(page_nr),
                );
            }
        }
        Ok(())
    }

    /// The first line starting with a publisher label ends the scan.
    fn find_publisher(&mut self) -> Result<()> {
        let doc = self.doc;
        for (&page_nr, page_text) in doc.pages() {
            for line in page_text.lines() {
                let Some(end) = self.patterns.publisher_label_end(line) else {
                    continue;
                };
                let value = line[end..].trim();
                if !value.is_empty() {
                    self.add_publisher(value, Origin::Page, page_nr);
                } else if !self.metadata.has_publisher_from_infopage() {
                    let page = doc.page(page_nr)?;
                    if let Some(value) = page.find_publisher(self.patterns) {
                        self.add_publisher(&value, Origin::Page, page_nr);
                    }
                }
                return Ok(());
            }
        }
        Ok(())
    }

    fn parse_copyright(&mut self) -> Result<()> {
        let doc = self.doc;
        for (&page_nr, page_text) in doc.pages() {
            for line in page_text.lines() {
                let Some(index) = line.find('©') else {
                    continue;
                };
                let rest = text::clean_whitespace(&line[index + '©'.len_utf8()..]);
                let (year, publisher) = parse_copyright_line(&rest);
                if let Some(year) = year {
                    self.add(
                        Field::Year,
                        Candidate::new(i64::from(year), Origin::Copyright).on_page(page_nr),
                    );
                }
                if !publisher.is_empty() && !self.metadata.has_publisher(&publisher) {
                    self.add_publisher(&publisher, Origin::Copyright, page_nr);
                }
            }
        }
        Ok(())
    }

    fn find_report_prefix(&mut self) -> Result<()> {
        let doc = self.doc;
        for &page_nr in doc.pages().keys() {
            let page = match doc.page(page_nr) {
                Ok(page) => page,
                Err(e) => {
                    log::warn!("Skipping page {} in report prefix scan: {}", page_nr, e);
                    continue;
                }
            };
            for block in &page.blocks {
                let line = block.text.lines().next().unwrap_or_default().trim();
                if !text::has_letters(line) || line.chars().count() == 1 {
                    continue;
                }
                if self.metadata.has_publisher(line) {
                    continue;
                }
                let Some(prefix) = self.patterns.find_report_prefix(line) else {
                    continue;
                };
                if self.metadata.has_publisher(&prefix) {
                    continue;
                }
                self.add_publisher(&prefix, Origin::RapportPrefix, page_nr);
            }
        }
        Ok(())
    }

    fn find_language(&mut self) -> Result<()> {
        let joined = self
            .doc
            .pages()
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(language) = self.ctx.detect_language(&joined) {
            self.add(
                Field::Language,
                Candidate::new(language, Origin::LanguageModel),
            );
        }
        Ok(())
    }

    /// Names on the first page, minus names that are part of the title,
    /// institutions and spaced-out capitals.
    fn find_authors(&mut self) -> Result<()> {
        let Some(first) = self.first_page() else {
            return Ok(());
        };
        let page = self.doc.page(first)?;
        let joined = author::concat_name_blocks(&page.blocks, self.patterns);
        let Some(names) = author::extract(&joined, self.patterns) else {
            return Ok(());
        };

        let title = self
            .metadata
            .candidates(Field::Title)
            .first()
            .and_then(|c| c.text())
            .map(str::to_string);

        for name in names {
            if title
                .as_deref()
                .is_some_and(|t| author::name_in_title(t, &name))
            {
                log::debug!("Dropping author '{}' found in title", name);
                continue;
            }
            if self.ctx.catalog.contains_stopword(&name) || author::is_all_caps_spaced(&name) {
                continue;
            }
            if let Some(person) = author::split_name(&name) {
                self.add(Field::Author, Candidate::new(person, Origin::FrontPage));
            }
        }
        Ok(())
    }

    fn find_document_type(&mut self) -> Result<()> {
        let doc = self.doc;
        let Some(first_text) = doc.pages().values().next() else {
            return Ok(());
        };
        if let Some(doc_type) = self.patterns.find_doc_type(self.ctx.catalog, first_text) {
            self.add(
                Field::DocumentType,
                Candidate::new(doc_type, Origin::FrontPage),
            );
        }
        Ok(())
    }
}

/// Split the text after `©` into a year and a publisher guess: the text
/// before the first date, the text after it when nothing precedes the date,
/// or the whole text when there is no date.
fn parse_copyright_line(line: &str) -> (Option<i32>, String) {
    let strip = |s: &str| {
        s.replace('©', "")
            .trim_matches(|c: char| c == ' ' || c == '.' || c == ',')
            .to_string()
    };
    match text::find_date_with_year(line) {
        Some((range, year)) => {
            let before = strip(&line[..range.start]);
            if before.is_empty() {
                (Some(year), strip(&line[range.end..]))
            } else {
                (Some(year), before)
            }
        }
        None => (None, strip(line)),
    }
}

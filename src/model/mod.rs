//! Document model and extraction result types.
//!
//! A [`Document`] yields windowed page text and, per page, positioned
//! [`TextBlock`]s grouped into a [`Page`]. Extraction backends record
//! [`Candidate`]s into [`Metadata`], which reduces them to [`Results`].

mod block;
mod candidate;
mod document;
mod metadata;
mod page;
mod results;

pub use block::{BBox, BlockFlags, TextBlock};
pub use candidate::{Candidate, CandidateValue, Origin, PersonName};
pub use document::{Document, PdfInfo};
pub use metadata::{Field, Metadata};
pub use page::{Page, DEFAULT_SLACK};
pub use results::{ResultAuthor, ResultOrigin, ResultValue, Results, ScalarValue};

//! Document loading options.

use super::layout::DEFAULT_MAX_SPACING;

/// Options controlling how a document is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOptions {
    /// Number of leading pages kept in the text window
    pub window_start: usize,

    /// Number of trailing pages kept in the text window
    pub window_end: usize,

    /// Maximum horizontal gap between ALTO words merged into one block
    pub max_spacing: f32,
}

impl DocumentOptions {
    /// Create new document options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of leading and trailing pages in the text window.
    pub fn with_window(mut self, start: usize, end: usize) -> Self {
        self.window_start = start;
        self.window_end = end;
        self
    }

    /// Set the ALTO word merge distance.
    pub fn with_max_spacing(mut self, spacing: f32) -> Self {
        self.max_spacing = spacing;
        self
    }

    /// Select the windowed subset of `count` ordered items, as indices.
    pub(crate) fn window(&self, count: usize) -> Vec<usize> {
        if count <= self.window_start + self.window_end {
            return (0..count).collect();
        }
        (0..self.window_start)
            .chain(count - self.window_end..count)
            .collect()
    }
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            window_start: 5,
            window_end: 5,
            max_spacing: DEFAULT_MAX_SPACING,
        }
    }
}

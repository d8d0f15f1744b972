//! Positioned text blocks.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::text::normalize_block_text;

bitflags! {
    /// Formatting signals computed by the info-page classifier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct BlockFlags: u8 {
        /// Every cased character is upper case.
        const UPPERCASE = 1;
        /// Text ends with `:`.
        const ENDS_WITH_COLON = 1 << 1;
        /// Text contains an info-page keyword.
        const HAS_KEYWORD = 1 << 2;
        /// Block uses the page's label font.
        const KEYWORD_FONT = 1 << 3;
    }
}

/// Bounding box in top-down page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    /// Create a bounding box; corners are reordered so that `x0 <= x1` and `y0 <= y1`.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Vertical center.
    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// A run of text with its position and font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub bbox: BBox,
    pub font: String,
    pub font_size: f32,
    #[serde(default, skip_serializing_if = "BlockFlags::is_empty")]
    pub flags: BlockFlags,
}

impl TextBlock {
    /// Create a block; the text is NFC-normalized, no-break spaces become
    /// spaces and surrounding whitespace is trimmed.
    pub fn new(text: &str, bbox: BBox, font: impl Into<String>, font_size: f32) -> Self {
        Self {
            text: normalize_block_text(text),
            bbox,
            font: font.into(),
            font_size,
            flags: BlockFlags::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn has_flag(&self, flag: BlockFlags) -> bool {
        self.flags.contains(flag)
    }
}

impl std::fmt::Display for TextBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.2}, {:.2}, {:.2}, {:.2}] {} {:.2} [{:?}]\t[{}]",
            self.bbox.x0,
            self.bbox.y0,
            self.bbox.x1,
            self.bbox.y1,
            self.font,
            self.font_size,
            self.flags,
            self.text
        )
    }
}

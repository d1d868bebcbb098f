//! Text segment type.

use serde::{Deserialize, Serialize};

/// One ordered unit of extracted text: a line, paragraph, or text block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegment {
    /// Position in the document's segment sequence (0-indexed)
    pub index: usize,

    /// Raw text as extracted
    pub text: String,
}

impl TextSegment {
    /// Create a new segment.
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

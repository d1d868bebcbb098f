//! Document-level types.

use super::{ExtractedImage, TextSegment};
use crate::detect::{detect_type_from_path, DocumentType};
use crate::error::Result;
use std::path::{Path, PathBuf};

/// A document scheduled for filtering.
///
/// Lives only for the duration of one processing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path of the input file
    pub path: PathBuf,

    /// Container type resolved from the extension
    pub doc_type: DocumentType,
}

impl Document {
    /// Create a document with an explicit container type.
    pub fn new(path: impl Into<PathBuf>, doc_type: DocumentType) -> Self {
        Self {
            path: path.into(),
            doc_type,
        }
    }

    /// Resolve the container type from the path's extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let doc_type = detect_type_from_path(path)?;
        Ok(Self::new(path, doc_type))
    }
}

/// Content read out of a container by an adapter.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Ordered text segments
    pub segments: Vec<TextSegment>,

    /// Images that decoded successfully
    pub images: Vec<ExtractedImage>,

    /// Number of embedded images that failed to decode and were skipped
    pub skipped_images: usize,
}

impl Extraction {
    /// Create an empty extraction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extraction from plain strings, numbering them in order.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut extraction = Self::new();
        for text in texts {
            extraction.push_text(text);
        }
        extraction
    }

    /// Append a text segment at the next position.
    pub fn push_text(&mut self, text: impl Into<String>) {
        let index = self.segments.len();
        self.segments.push(TextSegment::new(index, text));
    }

    /// Append an image.
    pub fn push_image(&mut self, image: ExtractedImage) {
        self.images.push(image);
    }

    /// Record an image that could not be decoded.
    pub fn skip_image(&mut self) {
        self.skipped_images += 1;
    }

    /// Segment texts in document order.
    pub fn texts(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.text.clone()).collect()
    }

    /// Split into texts and raw images, dropping source information.
    pub fn into_parts(self) -> (Vec<String>, Vec<image::DynamicImage>) {
        let texts = self.segments.into_iter().map(|s| s.text).collect();
        let images = self.images.into_iter().map(|i| i.image).collect();
        (texts, images)
    }

    /// Check if nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_from_path() {
        let doc = Document::from_path("letters/draft.docx").unwrap();
        assert_eq!(doc.doc_type, DocumentType::RichText);
        assert_eq!(doc.path, PathBuf::from("letters/draft.docx"));
        assert!(Document::from_path("draft.odt").is_err());
    }

    #[test]
    fn test_extraction_ordering() {
        let mut extraction = Extraction::from_texts(["first", "", "third"]);
        extraction.push_text("fourth");

        let indices: Vec<usize> = extraction.segments.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(extraction.texts()[2], "third");
        assert!(!extraction.is_empty());
    }
}

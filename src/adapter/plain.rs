//! Plain UTF-8 text adapter.

use super::FormatAdapter;
use crate::detect::DocumentType;
use crate::error::{Error, Result};
use crate::model::Extraction;
use image::DynamicImage;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Adapter for `.txt` files: one segment per line, no images.
#[derive(Debug, Clone, Default)]
pub struct PlainTextAdapter;

impl PlainTextAdapter {
    /// Create a new plain text adapter.
    pub fn new() -> Self {
        Self
    }

    /// Split decoded text into line segments.
    pub fn extract_str(&self, content: &str) -> Extraction {
        Extraction::from_texts(content.lines())
    }

    /// Render segments the way [`FormatAdapter::write`] does: one line per
    /// kept segment, never an extra blank line after it.
    pub fn render(&self, segments: &[String]) -> String {
        let mut out = String::new();
        for segment in segments.iter().filter(|s| !s.trim().is_empty()) {
            out.push_str(segment.trim_end_matches(['\r', '\n']));
            out.push('\n');
        }
        out
    }
}

impl FormatAdapter for PlainTextAdapter {
    fn document_type(&self) -> DocumentType {
        DocumentType::Plain
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt"]
    }

    fn name(&self) -> &str {
        "plain"
    }

    fn extract(&self, path: &Path) -> Result<Extraction> {
        let bytes = fs::read(path)?;
        let content = String::from_utf8(bytes).map_err(|e| {
            Error::Encoding(format!(
                "{} is not valid UTF-8 (byte {})",
                path.display(),
                e.utf8_error().valid_up_to()
            ))
        })?;
        Ok(self.extract_str(&content))
    }

    fn write(&self, segments: &[String], images: &[DynamicImage], path: &Path) -> Result<()> {
        if !images.is_empty() {
            log::debug!("plain text output drops {} image(s)", images.len());
        }

        let mut writer = BufWriter::new(fs::File::create(path)?);
        writer.write_all(self.render(segments).as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_lines() {
        let adapter = PlainTextAdapter::new();
        let extraction = adapter.extract_str("first\r\nsecond\n\nfourth");
        assert_eq!(extraction.texts(), vec!["first", "second", "", "fourth"]);
        assert_eq!(extraction.segments[3].index, 3);
        assert!(extraction.images.is_empty());
    }

    #[test]
    fn test_render_skips_blank_segments() {
        let adapter = PlainTextAdapter::new();
        let segments = vec![
            "Hello world\n".to_string(),
            "\n".to_string(),
            "Goodbye\n\n".to_string(),
        ];
        assert_eq!(adapter.render(&segments), "Hello world\nGoodbye\n");
    }

    #[test]
    fn test_render_is_single_spaced() {
        let adapter = PlainTextAdapter::new();
        let filtered = vec!["one\n".to_string(), "two\n".to_string(), "three\n".to_string()];

        let rendered = adapter.render(&filtered);
        assert_eq!(rendered, "one\ntwo\nthree\n");
        assert_eq!(adapter.extract_str(&rendered).texts(), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_extract_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, [b'c', b'a', b'f', 0xE9]).unwrap();

        let err = PlainTextAdapter::new().extract(&path).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }
}

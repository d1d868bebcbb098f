//! Integration tests for the adapter module.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use docfilter::adapter::{AdapterRegistry, DocxAdapter, FormatAdapter, PdfAdapter, PlainTextAdapter};
use docfilter::error::Result;
use docfilter::{DocumentType, Extraction};
use image::{DynamicImage, Rgb, RgbImage};

/// Mock adapter for testing.
struct MockAdapter {
    extensions: Vec<&'static str>,
    name: &'static str,
}

impl MockAdapter {
    fn new(extensions: Vec<&'static str>, name: &'static str) -> Self {
        Self { extensions, name }
    }
}

impl FormatAdapter for MockAdapter {
    fn document_type(&self) -> DocumentType {
        DocumentType::Plain
    }

    fn supported_extensions(&self) -> &[&str] {
        &self.extensions
    }

    fn name(&self) -> &str {
        self.name
    }

    fn extract(&self, _path: &Path) -> Result<Extraction> {
        Ok(Extraction::from_texts([format!("Extracted by {}", self.name)]))
    }

    fn write(&self, _segments: &[String], _images: &[DynamicImage], path: &Path) -> Result<()> {
        fs::write(path, self.name)?;
        Ok(())
    }
}

fn segments(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| format!("{}\n", s)).collect()
}

fn sample_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(24, 12, |x, _| {
        Rgb([(x * 10) as u8, 80, 160])
    }))
}

#[test]
fn test_default_registry() {
    let registry = AdapterRegistry::with_defaults();

    assert_eq!(registry.supported_extensions(), vec!["docx", "pdf", "txt"]);
    assert!(registry.supports("PDF"));
    assert!(registry.supports(".docx"));
    assert!(!registry.supports("odt"));

    let adapter = registry.get(DocumentType::RichText).unwrap();
    assert_eq!(adapter.name(), "docx");
}

#[test]
fn test_registry_override() {
    let mut registry = AdapterRegistry::with_defaults();
    registry.register(Arc::new(MockAdapter::new(vec!["txt", "text"], "mock")));

    assert_eq!(registry.get(DocumentType::Plain).unwrap().name(), "mock");
    assert_eq!(registry.get_by_extension("text").unwrap().name(), "mock");
    assert_eq!(registry.get_by_extension(".PDF").unwrap().name(), "pdf");
}

#[test]
fn test_empty_registry() {
    let registry = AdapterRegistry::new();
    assert!(registry.get(DocumentType::Paginated).is_none());
    assert!(registry.supported_extensions().is_empty());
}

#[test]
fn test_plain_text_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    fs::write(&input, "alpha\nbeta\n\ngamma\n").unwrap();

    let adapter = PlainTextAdapter::new();
    let extraction = adapter.extract(&input).unwrap();
    assert_eq!(extraction.texts(), vec!["alpha", "beta", "", "gamma"]);

    let output = dir.path().join("notes_filtered.txt");
    let filtered = segments(&["alpha", "", "", "gamma"]);
    adapter.write(&filtered, &[sample_image()], &output).unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), "alpha\ngamma\n");
    let reread = adapter.extract(&output).unwrap();
    assert_eq!(reread.segments.len(), 2);
}

#[test]
fn test_docx_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.docx");

    let adapter = DocxAdapter::new();
    let texts = segments(&["Quarterly report", "Revenue & costs", "Outlook"]);
    adapter.write(&texts, &[sample_image()], &path).unwrap();

    let extraction = adapter.extract(&path).unwrap();
    assert_eq!(
        extraction.texts(),
        vec!["Quarterly report", "Revenue & costs", "Outlook", ""]
    );
    assert_eq!(extraction.images.len(), 1);
    assert_eq!(extraction.images[0].width(), 24);
    assert_eq!(extraction.images[0].height(), 12);
}

#[test]
fn test_docx_removed_segments_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memo.docx");

    let adapter = DocxAdapter::new();
    let texts = vec![
        "Kept\n".to_string(),
        "\n".to_string(),
        "Also kept\n".to_string(),
    ];
    adapter.write(&texts, &[], &path).unwrap();

    let extraction = adapter.extract(&path).unwrap();
    assert_eq!(extraction.texts(), vec!["Kept", "Also kept"]);
    assert!(extraction.images.is_empty());
}

#[test]
fn test_pdf_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("paper.pdf");

    let adapter = PdfAdapter::new();
    let texts = segments(&["Abstract", "Methods were applied.", "Results follow."]);
    adapter.write(&texts, &[sample_image()], &path).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));

    let extraction = adapter.extract(&path).unwrap();
    assert_eq!(
        extraction.texts(),
        vec!["Abstract", "Methods were applied.", "Results follow."]
    );
    assert_eq!(extraction.images.len(), 1);
    assert_eq!(extraction.images[0].width(), 24);
}

#[test]
fn test_pdf_extract_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = PdfAdapter::new().extract(&dir.path().join("absent.pdf"));
    assert!(result.is_err());
}

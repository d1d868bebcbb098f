//! Container type detection and output naming.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Suffix inserted before the extension of filtered output files.
pub const OUTPUT_SUFFIX: &str = "_filtered";

/// Supported document container types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    /// Plain UTF-8 text (`.txt`)
    Plain,
    /// Rich-text container with embedded images (`.docx`)
    RichText,
    /// Paginated document with embedded images (`.pdf`)
    Paginated,
}

impl DocumentType {
    /// All supported container types.
    pub const ALL: [DocumentType; 3] = [
        DocumentType::Plain,
        DocumentType::RichText,
        DocumentType::Paginated,
    ];

    /// Resolve the container type from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(DocumentType::Plain),
            "docx" => Some(DocumentType::RichText),
            "pdf" => Some(DocumentType::Paginated),
            _ => None,
        }
    }

    /// Canonical file extension for this container type.
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentType::Plain => "txt",
            DocumentType::RichText => "docx",
            DocumentType::Paginated => "pdf",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentType::Plain => write!(f, "plain"),
            DocumentType::RichText => write!(f, "rich-text"),
            DocumentType::Paginated => write!(f, "paginated"),
        }
    }
}

/// Resolve the container type of a path from its extension.
///
/// No I/O is performed, so an unsupported extension is reported even when
/// the file does not exist.
///
/// # Example
/// ```
/// use docfilter::detect::{detect_type_from_path, DocumentType};
///
/// assert_eq!(detect_type_from_path("report.PDF").unwrap(), DocumentType::Paginated);
/// assert!(detect_type_from_path("notes.rtf").is_err());
/// ```
pub fn detect_type_from_path<P: AsRef<Path>>(path: P) -> Result<DocumentType> {
    let path = path.as_ref();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    DocumentType::from_extension(ext).ok_or_else(|| {
        if ext.is_empty() {
            Error::UnsupportedFormat(format!("{} has no extension", path.display()))
        } else {
            Error::UnsupportedFormat(format!(".{}", ext.to_ascii_lowercase()))
        }
    })
}

/// Check whether a path has a supported extension.
pub fn is_supported<P: AsRef<Path>>(path: P) -> bool {
    detect_type_from_path(path).is_ok()
}

/// Build the conventional output path: `<stem>_filtered.<ext>` beside the input.
pub fn default_output_path<P: AsRef<Path>>(input: P) -> PathBuf {
    let input = input.as_ref();
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let file_name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, OUTPUT_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, OUTPUT_SUFFIX),
    };
    input.with_file_name(file_name)
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// ZIP local file header magic, the outer shell of a DOCX package.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Read the PDF version (e.g., "1.7") from the first bytes of a document.
pub fn pdf_version_from_bytes(data: &[u8]) -> Result<String> {
    if data.len() < PDF_MAGIC_LEN + VERSION_LEN || !data.starts_with(PDF_MAGIC) {
        return Err(Error::PdfParse("missing %PDF- header".to_string()));
    }

    let version_bytes = &data[PDF_MAGIC_LEN..PDF_MAGIC_LEN + VERSION_LEN];
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::PdfParse(format!("unsupported PDF version: {}", version)));
    }

    Ok(version)
}

/// Check if bytes start like a ZIP (and therefore possibly DOCX) archive.
pub fn is_zip_bytes(data: &[u8]) -> bool {
    data.starts_with(ZIP_MAGIC)
}

fn is_valid_version(version: &str) -> bool {
    let chars: Vec<char> = version.chars().collect();
    chars.len() == 3 && chars[0].is_ascii_digit() && chars[1] == '.' && chars[2].is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(
            detect_type_from_path("a/b/notes.txt").unwrap(),
            DocumentType::Plain
        );
        assert_eq!(
            detect_type_from_path("letter.DOCX").unwrap(),
            DocumentType::RichText
        );
        assert_eq!(
            detect_type_from_path("scan.pdf").unwrap(),
            DocumentType::Paginated
        );
    }

    #[test]
    fn test_detect_unsupported() {
        let err = detect_type_from_path("slides.pptx").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref ext) if ext == ".pptx"));

        let err = detect_type_from_path("README").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert!(!is_supported("image.png"));
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path("/tmp/report.pdf"),
            PathBuf::from("/tmp/report_filtered.pdf")
        );
        assert_eq!(
            default_output_path("notes.txt"),
            PathBuf::from("notes_filtered.txt")
        );
    }

    #[test]
    fn test_pdf_version() {
        assert_eq!(pdf_version_from_bytes(b"%PDF-1.7\n%test").unwrap(), "1.7");
        assert!(pdf_version_from_bytes(b"%PDF").is_err());
        assert!(pdf_version_from_bytes(b"<!DOCTYPE html>").is_err());
        assert!(pdf_version_from_bytes(b"%PDF-x.y\n").is_err());
    }

    #[test]
    fn test_zip_magic() {
        assert!(is_zip_bytes(b"PK\x03\x04rest"));
        assert!(!is_zip_bytes(b"%PDF-1.4"));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(DocumentType::Plain.to_string(), "plain");
        assert_eq!(DocumentType::RichText.to_string(), "rich-text");
        assert_eq!(DocumentType::Paginated.to_string(), "paginated");
    }
}

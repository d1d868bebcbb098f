//! # docfilter
//!
//! Content filtering for TXT, DOCX and PDF documents.
//!
//! A document is opened, its text segments and embedded images are extracted,
//! text is screened against a blocklist and a toxicity classifier, images are
//! screened by NSFW and violence classifiers plus a red-pixel heuristic, and a
//! filtered document of the same type is written back out.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docfilter::{Classifiers, DocumentProcessor, ProcessOptions};
//!
//! fn main() -> docfilter::Result<()> {
//!     let processor = DocumentProcessor::new(Classifiers::neutral(), ProcessOptions::default());
//!     let report = processor.process_default("minutes.txt")?;
//!
//!     println!("Words: {}", report.text_stats.total_words);
//!     println!("Flagged images: {}", report.image_stats.flagged_images);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Three containers**: plain text, Word (DOCX) and PDF, read and written
//! - **Pluggable classifiers**: bring any toxicity / NSFW / violence scorer
//! - **Parallel filtering**: text and image passes run concurrently with Rayon
//! - **Atomic output**: nothing is left at the destination on failure
//! - **Remote scorers**: HTTP inference endpoints behind the `remote` feature

pub mod adapter;
pub mod detect;
pub mod error;
pub mod model;
pub mod moderation;
pub mod options;
pub mod pipeline;

// Re-export commonly used types
pub use adapter::{AdapterRegistry, DocxAdapter, FormatAdapter, PdfAdapter, PlainTextAdapter};
pub use detect::{default_output_path, detect_type_from_path, is_supported, DocumentType};
pub use error::{Error, Result, Stage};
pub use model::{
    clean_ratio, Document, ExtractedImage, Extraction, ImageSource, ImageStats, ProcessingReport,
    TextSegment, TextStats, Verdict,
};
pub use moderation::{
    Classifiers, ImageFilter, ImageNsfwScorer, ImageViolenceScorer, LabelScore, NeutralScorer,
    TextFilter, TextToxicityScorer,
};
pub use options::{ImageFilterOptions, ProcessOptions, TextFilterOptions};
pub use pipeline::DocumentProcessor;

#[cfg(feature = "remote")]
pub use moderation::HttpScorer;

use std::path::Path;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Filter a document with default options, writing `<stem>_filtered.<ext>`.
///
/// # Example
///
/// ```no_run
/// use docfilter::{filter_file, Classifiers};
///
/// let report = filter_file("notes.docx", Classifiers::neutral()).unwrap();
/// println!("{}", report.output_file.display());
/// ```
pub fn filter_file<P: AsRef<Path>>(path: P, classifiers: Classifiers) -> Result<ProcessingReport> {
    DocumentProcessor::new(classifiers, ProcessOptions::default()).process_default(path)
}

/// Filter a list of text segments without touching the filesystem.
pub fn filter_texts(
    texts: &[String],
    scorer: std::sync::Arc<dyn TextToxicityScorer>,
) -> Result<(Vec<String>, TextStats)> {
    TextFilter::new(scorer).filter_with_stats(texts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_filter_texts_neutral() {
        let texts = vec!["A perfectly ordinary sentence.".to_string()];
        let (filtered, stats) = filter_texts(&texts, std::sync::Arc::new(NeutralScorer)).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(stats.toxic_contexts, 0);
        assert_eq!(stats.clean_ratio, 1.0);
    }
}

//! Document processing pipeline.
//!
//! `validate → resolve type → extract → {filter text ∥ filter images} →
//! reconstruct → report`. Output is written to a temporary file beside the
//! destination and renamed into place only once it is complete.

use crate::adapter::{AdapterRegistry, FormatAdapter};
use crate::detect::{default_output_path, detect_type_from_path};
use crate::error::{Error, Result, Stage};
use crate::model::{Document, ImageStats, ProcessingReport, TextStats};
use crate::moderation::{Classifiers, FilteredImages, ImageFilter, TextFilter};
use crate::options::ProcessOptions;
use crossbeam_channel::RecvTimeoutError;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Filters documents and writes filtered copies.
///
/// # Example
///
/// ```no_run
/// use docfilter::{Classifiers, DocumentProcessor, ProcessOptions};
///
/// fn main() -> docfilter::Result<()> {
///     let processor = DocumentProcessor::new(Classifiers::neutral(), ProcessOptions::default());
///     let report = processor.process("report.docx", "report_filtered.docx")?;
///     println!("clean ratio: {:.2}", report.text_stats.clean_ratio);
///     Ok(())
/// }
/// ```
pub struct DocumentProcessor {
    registry: Arc<AdapterRegistry>,
    text_filter: Arc<TextFilter>,
    image_filter: Arc<ImageFilter>,
    options: ProcessOptions,
}

/// Everything produced before reconstruction.
struct Filtered {
    texts: Vec<String>,
    text_stats: TextStats,
    images: Vec<DynamicImage>,
    image_stats: ImageStats,
    skipped_images: usize,
}

impl DocumentProcessor {
    /// Create a processor with the default adapters.
    ///
    /// The classifiers are shared read-only by every document processed.
    pub fn new(classifiers: Classifiers, options: ProcessOptions) -> Self {
        let text_filter = TextFilter::with_options(classifiers.toxicity, options.text.clone());
        let image_filter = ImageFilter::with_options(
            classifiers.nsfw,
            classifiers.violence,
            options.image.clone(),
        );

        log::info!("Filters initialized");
        Self {
            registry: Arc::new(AdapterRegistry::with_defaults()),
            text_filter: Arc::new(text_filter),
            image_filter: Arc::new(image_filter),
            options,
        }
    }

    /// Use a custom adapter registry.
    pub fn with_registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Get the processing options.
    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Text filter used by this processor.
    pub fn text_filter(&self) -> &TextFilter {
        &self.text_filter
    }

    /// Image filter used by this processor.
    pub fn image_filter(&self) -> &ImageFilter {
        &self.image_filter
    }

    /// Filter `input` and write the result to `output`.
    ///
    /// Input and output use the same container type. On any error no file
    /// is left at `output`.
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<ProcessingReport> {
        let input = input.as_ref();
        let output = output.as_ref();

        log::info!("Validating input file: {}", input.display());
        let doc_type = detect_type_from_path(input)?;
        if !input.is_file() {
            return Err(Error::NotFound(input.to_path_buf()));
        }
        self.options.validate()?;

        let document = Document::new(input, doc_type);
        log::info!("Document type: {}", document.doc_type);

        let adapter = self
            .registry
            .get(doc_type)
            .ok_or_else(|| Error::UnsupportedFormat(format!(".{}", doc_type.extension())))?;

        let filtered = self.run_bounded(adapter.clone(), document.path.clone())?;

        log::info!("Saving filtered content to: {}", output.display());
        save_atomically(adapter.as_ref(), &filtered.texts, &filtered.images, output)
            .map_err(|e| e.in_stage(Stage::Save))?;
        log::info!("Content saved successfully");

        Ok(ProcessingReport {
            text_stats: filtered.text_stats,
            image_stats: filtered.image_stats,
            input_file: document.path,
            output_file: output.to_path_buf(),
            document_type: doc_type,
            skipped_images: filtered.skipped_images,
        })
    }

    /// Filter `input` into `<stem>_filtered.<ext>` beside it.
    pub fn process_default<P: AsRef<Path>>(&self, input: P) -> Result<ProcessingReport> {
        let output = default_output_path(input.as_ref());
        self.process(input, output)
    }

    /// Run extraction and filtering, bounded by the configured deadline.
    fn run_bounded(&self, adapter: Arc<dyn FormatAdapter>, input: PathBuf) -> Result<Filtered> {
        let text_filter = self.text_filter.clone();
        let image_filter = self.image_filter.clone();
        let job = move || extract_and_filter(adapter.as_ref(), &text_filter, &image_filter, &input);

        match self.options.deadline {
            None => job(),
            Some(deadline) => run_with_deadline(deadline, job),
        }
    }
}

/// Run `job` on a worker thread and wait at most `deadline` for it.
///
/// On timeout the worker is abandoned; its result is discarded.
fn run_with_deadline<T, F>(deadline: Duration, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(1);

    thread::Builder::new()
        .name("docfilter-worker".to_string())
        .spawn(move || {
            let _ = tx.send(job());
        })?;

    match rx.recv_timeout(deadline) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            log::warn!("Processing exceeded deadline of {:?}", deadline);
            Err(Error::Timeout(deadline))
        }
        Err(RecvTimeoutError::Disconnected) => {
            Err(Error::Other("processing worker terminated unexpectedly".to_string()))
        }
    }
}

fn extract_and_filter(
    adapter: &dyn FormatAdapter,
    text_filter: &TextFilter,
    image_filter: &ImageFilter,
    input: &Path,
) -> Result<Filtered> {
    log::info!("Extracting document content with {} adapter", adapter.name());
    let extraction = adapter
        .extract(input)
        .map_err(|e| e.in_stage(Stage::Extract))?;
    let skipped_images = extraction.skipped_images;
    let (texts, images) = extraction.into_parts();
    log::info!(
        "Extracted {} text segments and {} images",
        texts.len(),
        images.len()
    );

    let (text_result, filtered_images): (Result<(Vec<String>, TextStats)>, FilteredImages) =
        rayon::join(
            || text_filter.filter_with_stats(&texts),
            || image_filter.filter_images(images),
        );

    let (texts, text_stats) = text_result.map_err(|e| e.in_stage(Stage::FilterText))?;
    log::info!(
        "Text filtering complete: {} words, {} filtered, {} toxic contexts",
        text_stats.total_words,
        text_stats.filtered_words,
        text_stats.toxic_contexts
    );

    let image_stats = image_filter.image_stats(&filtered_images.verdicts);
    log::info!(
        "Image filtering complete: {} of {} flagged",
        image_stats.flagged_images,
        image_stats.total_images
    );
    for (category, count) in &image_stats.categories {
        log::info!("Removed by category {}: {}", category, count);
    }

    Ok(Filtered {
        texts,
        text_stats,
        images: filtered_images.kept,
        image_stats,
        skipped_images,
    })
}

/// Write through a temporary file in the destination directory, then
/// rename it over `output`.
fn save_atomically(
    adapter: &dyn FormatAdapter,
    texts: &[String],
    images: &[DynamicImage],
    output: &Path,
) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let suffix = output
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let temp = tempfile::Builder::new()
        .prefix(".docfilter-")
        .suffix(&suffix)
        .tempfile_in(dir)?;

    adapter.write(texts, images, temp.path())?;
    temp.persist(output).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_with_deadline_returns_result() {
        let value = run_with_deadline(Duration::from_secs(5), || Ok(42)).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_run_with_deadline_times_out() {
        let result: Result<()> = run_with_deadline(Duration::from_millis(20), || {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[test]
    fn test_run_with_deadline_propagates_errors() {
        let result: Result<()> = run_with_deadline(Duration::from_secs(5), || {
            Err(Error::Classifier("offline".to_string()))
        });
        assert!(matches!(result, Err(Error::Classifier(_))));
    }

    #[test]
    fn test_unsupported_before_io() {
        let processor = DocumentProcessor::new(Classifiers::neutral(), ProcessOptions::default());
        let err = processor
            .process("does/not/exist.rtf", "out.rtf")
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_input() {
        let processor = DocumentProcessor::new(Classifiers::neutral(), ProcessOptions::default());
        let err = processor
            .process("does/not/exist.txt", "out.txt")
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

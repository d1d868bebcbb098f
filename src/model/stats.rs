//! Filtering statistics.

use super::Verdict;
use crate::detect::DocumentType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Fraction of units retained after filtering.
///
/// Defined as exactly `1.0` for an empty input. `removed` is clamped to
/// `total` so the ratio stays within `[0, 1]`.
pub fn clean_ratio(total: usize, removed: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    let removed = removed.min(total);
    (total - removed) as f64 / total as f64
}

/// Statistics collected over one text filtering pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStats {
    /// Tokens in valid segments
    pub total_words: usize,

    /// Blocklisted tokens plus every token of toxic segments
    pub filtered_words: usize,

    /// Segments removed by the toxicity classifier
    pub toxic_contexts: usize,

    /// (total_words - filtered_words) / total_words
    pub clean_ratio: f64,
}

impl TextStats {
    /// Build a snapshot from raw counts.
    pub fn new(total_words: usize, filtered_words: usize, toxic_contexts: usize) -> Self {
        Self {
            total_words,
            filtered_words,
            toxic_contexts,
            clean_ratio: clean_ratio(total_words, filtered_words),
        }
    }
}

impl Default for TextStats {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

/// Statistics collected over one image filtering pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageStats {
    /// Images reviewed
    pub total_images: usize,

    /// Images flagged as inappropriate
    pub flagged_images: usize,

    /// (total_images - flagged_images) / total_images
    pub clean_ratio: f64,

    /// Flag count per main category ("NSFW", "Violence", ...)
    pub categories: BTreeMap<String, usize>,
}

impl ImageStats {
    /// Summarise a list of per-image verdicts.
    pub fn from_verdicts(verdicts: &[Verdict]) -> Self {
        let total_images = verdicts.len();
        let flagged_images = verdicts.iter().filter(|v| v.is_removed).count();

        let mut categories = BTreeMap::new();
        for main in verdicts.iter().filter_map(|v| v.main_category()) {
            *categories.entry(main.to_string()).or_insert(0) += 1;
        }

        Self {
            total_images,
            flagged_images,
            clean_ratio: clean_ratio(total_images, flagged_images),
            categories,
        }
    }
}

impl Default for ImageStats {
    fn default() -> Self {
        Self::from_verdicts(&[])
    }
}

/// Combined result of processing one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingReport {
    /// Text filtering statistics
    pub text_stats: TextStats,

    /// Image filtering statistics
    pub image_stats: ImageStats,

    /// Input document path
    pub input_file: PathBuf,

    /// Filtered output path
    pub output_file: PathBuf,

    /// Container type of both input and output
    pub document_type: DocumentType,

    /// Embedded images that could not be decoded (not counted as removed)
    pub skipped_images: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_ratio_empty() {
        assert_eq!(clean_ratio(0, 0), 1.0);
        assert_eq!(TextStats::default().clean_ratio, 1.0);
        assert_eq!(ImageStats::default().clean_ratio, 1.0);
    }

    #[test]
    fn test_clean_ratio_bounds() {
        assert_eq!(clean_ratio(4, 1), 0.75);
        assert_eq!(clean_ratio(4, 4), 0.0);
        assert_eq!(clean_ratio(4, 9), 0.0);
    }

    #[test]
    fn test_image_stats_from_verdicts() {
        let verdicts = vec![
            Verdict::keep(),
            Verdict::remove("NSFW: porn"),
            Verdict::remove("Violence: Blood detected"),
            Verdict::remove("Violence: assault rifle, assault gun"),
        ];
        let stats = ImageStats::from_verdicts(&verdicts);

        assert_eq!(stats.total_images, 4);
        assert_eq!(stats.flagged_images, 3);
        assert_eq!(stats.clean_ratio, 0.25);
        assert_eq!(stats.categories.get("Violence"), Some(&2));
        assert_eq!(stats.categories.get("NSFW"), Some(&1));
    }
}

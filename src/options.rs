//! Filtering options and configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

/// Options for the text moderation filter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextFilterOptions {
    /// Score above which the "toxic" label removes a whole segment
    pub toxicity_threshold: f32,

    /// Share of non-alphanumeric, non-space characters that marks binary content
    pub special_char_ratio: f32,

    /// Whether to score segments in parallel
    pub parallel: bool,
}

impl TextFilterOptions {
    /// Create new text options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the toxicity threshold.
    pub fn with_toxicity_threshold(mut self, threshold: f32) -> Self {
        self.toxicity_threshold = threshold;
        self
    }

    /// Disable parallel scoring.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for TextFilterOptions {
    fn default() -> Self {
        Self {
            toxicity_threshold: 0.7,
            special_char_ratio: 0.5,
            parallel: true,
        }
    }
}

/// Options for the image moderation filter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageFilterOptions {
    /// Score above which an NSFW label flags the image
    pub nsfw_threshold: f32,

    /// Score above which a violence label flags the image
    pub violence_threshold: f32,

    /// Longest side, in pixels, after preprocessing
    pub max_dimension: u32,

    /// Share of blood-red pixels that flags an image without the classifier
    pub red_ratio_threshold: f32,

    /// Whether to review images in parallel
    pub parallel: bool,
}

impl ImageFilterOptions {
    /// Create new image options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the NSFW threshold.
    pub fn with_nsfw_threshold(mut self, threshold: f32) -> Self {
        self.nsfw_threshold = threshold;
        self
    }

    /// Set the violence threshold.
    pub fn with_violence_threshold(mut self, threshold: f32) -> Self {
        self.violence_threshold = threshold;
        self
    }

    /// Set the maximum preprocessed dimension.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Disable parallel review.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for ImageFilterOptions {
    fn default() -> Self {
        Self {
            nsfw_threshold: 0.7,
            violence_threshold: 0.7,
            max_dimension: 800,
            red_ratio_threshold: 0.2,
            parallel: true,
        }
    }
}

/// Options for a whole document processing run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProcessOptions {
    /// Text filter options
    pub text: TextFilterOptions,

    /// Image filter options
    pub image: ImageFilterOptions,

    /// Maximum time for extraction plus filtering (seconds in JSON)
    #[serde(rename = "deadline_secs", deserialize_with = "deserialize_deadline")]
    pub deadline: Option<Duration>,
}

impl ProcessOptions {
    /// Create new process options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file. Missing fields keep their defaults.
    ///
    /// ```json
    /// { "text": { "toxicity_threshold": 0.8 }, "deadline_secs": 30 }
    /// ```
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let options: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Set text filter options.
    pub fn with_text_options(mut self, text: TextFilterOptions) -> Self {
        self.text = text;
        self
    }

    /// Set image filter options.
    pub fn with_image_options(mut self, image: ImageFilterOptions) -> Self {
        self.image = image;
        self
    }

    /// Set a per-document deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Disable parallel processing in both filters.
    pub fn sequential(mut self) -> Self {
        self.text.parallel = false;
        self.image.parallel = false;
        self
    }

    /// Check that thresholds and sizes are usable.
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("text.toxicity_threshold", self.text.toxicity_threshold),
            ("text.special_char_ratio", self.text.special_char_ratio),
            ("image.nsfw_threshold", self.image.nsfw_threshold),
            ("image.violence_threshold", self.image.violence_threshold),
            ("image.red_ratio_threshold", self.image.red_ratio_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.image.max_dimension == 0 {
            return Err(Error::Config(
                "image.max_dimension must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn deserialize_deadline<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = Option::<f64>::deserialize(deserializer)?;
    match secs {
        Some(s) if s.is_finite() && s > 0.0 => Duration::try_from_secs_f64(s)
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("deadline_secs {}: {}", s, e))),
        Some(s) => Err(serde::de::Error::custom(format!(
            "deadline_secs must be positive, got {}",
            s
        ))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ProcessOptions::default();
        assert_eq!(options.text.toxicity_threshold, 0.7);
        assert_eq!(options.image.nsfw_threshold, 0.7);
        assert_eq!(options.image.violence_threshold, 0.7);
        assert_eq!(options.image.max_dimension, 800);
        assert!(options.deadline.is_none());
        assert!(options.text.parallel && options.image.parallel);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_builder() {
        let options = ProcessOptions::new()
            .with_text_options(TextFilterOptions::new().with_toxicity_threshold(0.9))
            .with_image_options(ImageFilterOptions::new().with_max_dimension(256))
            .with_deadline(Duration::from_secs(5))
            .sequential();

        assert_eq!(options.text.toxicity_threshold, 0.9);
        assert_eq!(options.image.max_dimension, 256);
        assert_eq!(options.deadline, Some(Duration::from_secs(5)));
        assert!(!options.text.parallel);
        assert!(!options.image.parallel);
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{ "image": { "nsfw_threshold": 0.5 }, "deadline_secs": 2.5 }"#;
        let options: ProcessOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.image.nsfw_threshold, 0.5);
        assert_eq!(options.image.violence_threshold, 0.7);
        assert_eq!(options.text.toxicity_threshold, 0.7);
        assert_eq!(options.deadline, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_invalid_threshold() {
        let options = ProcessOptions::new()
            .with_text_options(TextFilterOptions::new().with_toxicity_threshold(1.5));
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_negative_deadline_rejected() {
        let result: std::result::Result<ProcessOptions, _> =
            serde_json::from_str(r#"{ "deadline_secs": -1 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_huge_deadline_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filter.json");
        std::fs::write(&path, r#"{ "deadline_secs": 1e300 }"#).unwrap();

        let result = ProcessOptions::from_json_file(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

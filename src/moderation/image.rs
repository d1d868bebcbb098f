//! Image moderation: NSFW check followed by a violence check that combines a
//! blood-red colour heuristic with a classifier.
//!
//! The two classifier checks fail in opposite directions. An NSFW scoring
//! error flags the image ("Error in processing"); a violence scoring error
//! lets it through. This mirrors the behaviour existing users depend on.

use std::sync::Arc;

use image::imageops::FilterType;
use image::DynamicImage;
use rayon::prelude::*;

use super::scorer::{ImageNsfwScorer, ImageViolenceScorer};
use crate::model::{ImageStats, Verdict};
use crate::options::ImageFilterOptions;

/// NSFW labels that flag an image when scored above the threshold.
pub const NSFW_LABELS: &[&str] = &["porn", "hentai", "sexy"];

/// Substrings of violence labels that flag an image above the threshold.
pub const VIOLENCE_KEYWORDS: &[&str] = &["weapon", "knife", "gun", "blood", "injury"];

/// Category for images whose NSFW check could not be completed.
pub const ERROR_CATEGORY: &str = "Error in processing";

/// Category for images dominated by blood-red pixels.
pub const BLOOD_CATEGORY: &str = "Violence: Blood detected";

// Red band in HSV, every channel on a 0-255 scale.
const RED_HUE_MAX: u8 = 10;
const RED_SATURATION_MIN: u8 = 120;
const RED_VALUE_MIN: u8 = 70;

/// Images kept after filtering plus one verdict per input image.
#[derive(Debug, Clone, Default)]
pub struct FilteredImages {
    /// Kept images, in original relative order
    pub kept: Vec<DynamicImage>,

    /// Verdict for every input image, in input order
    pub verdicts: Vec<Verdict>,
}

impl FilteredImages {
    /// Number of images flagged.
    pub fn flagged(&self) -> usize {
        self.verdicts.iter().filter(|v| v.is_removed).count()
    }
}

/// Filters inappropriate images.
pub struct ImageFilter {
    nsfw: Arc<dyn ImageNsfwScorer>,
    violence: Arc<dyn ImageViolenceScorer>,
    options: ImageFilterOptions,
}

impl ImageFilter {
    /// Create an image filter with default options.
    pub fn new(nsfw: Arc<dyn ImageNsfwScorer>, violence: Arc<dyn ImageViolenceScorer>) -> Self {
        Self::with_options(nsfw, violence, ImageFilterOptions::default())
    }

    /// Create an image filter with custom options.
    pub fn with_options(
        nsfw: Arc<dyn ImageNsfwScorer>,
        violence: Arc<dyn ImageViolenceScorer>,
        options: ImageFilterOptions,
    ) -> Self {
        Self {
            nsfw,
            violence,
            options,
        }
    }

    /// Get the filter options.
    pub fn options(&self) -> &ImageFilterOptions {
        &self.options
    }

    /// Normalise colour mode and bound the image size.
    ///
    /// Anything other than 8-bit RGB or grayscale becomes 8-bit RGB. Images
    /// whose longer side exceeds `max_dimension` are downscaled with Lanczos3
    /// keeping the aspect ratio; smaller images are never upscaled.
    pub fn preprocess(&self, image: &DynamicImage) -> DynamicImage {
        let image = match image {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => image.clone(),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };

        let (width, height) = (image.width(), image.height());
        let longest = width.max(height);
        let max = self.options.max_dimension;
        if longest <= max || width == 0 || height == 0 {
            return image;
        }

        let ratio = max as f64 / longest as f64;
        let new_width = ((width as f64 * ratio) as u32).max(1);
        let new_height = ((height as f64 * ratio) as u32).max(1);
        image.resize_exact(new_width, new_height, FilterType::Lanczos3)
    }

    /// Fraction of pixels that fall in the blood-red HSV band.
    pub fn red_ratio(&self, image: &DynamicImage) -> f32 {
        let rgb = image.to_rgb8();
        let total = rgb.width() as usize * rgb.height() as usize;
        if total == 0 {
            return 0.0;
        }

        let red = rgb
            .pixels()
            .filter(|p| {
                let (h, s, v) = rgb_to_hsv(p[0], p[1], p[2]);
                h <= RED_HUE_MAX && s >= RED_SATURATION_MIN && v >= RED_VALUE_MIN
            })
            .count();

        red as f32 / total as f32
    }

    /// Check an image with the NSFW classifier.
    ///
    /// Classifier errors flag the image.
    pub fn check_nsfw(&self, image: &DynamicImage) -> Verdict {
        let predictions = match self.nsfw.score(image) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Error in NSFW detection: {}", e);
                return Verdict::remove(ERROR_CATEGORY);
            }
        };

        for pred in predictions {
            let label = pred.label.to_lowercase();
            if NSFW_LABELS.contains(&label.as_str()) && pred.score > self.options.nsfw_threshold {
                return Verdict::remove(format!("NSFW: {}", label));
            }
        }

        Verdict::keep()
    }

    /// Check an image for violent content.
    ///
    /// A red fraction above the threshold flags the image without consulting
    /// the classifier. Classifier errors let the image through.
    pub fn check_violence(&self, image: &DynamicImage) -> Verdict {
        let red_ratio = self.red_ratio(image);
        if red_ratio > self.options.red_ratio_threshold {
            log::debug!("red ratio {:.3} exceeds threshold", red_ratio);
            return Verdict::remove(BLOOD_CATEGORY);
        }

        let predictions = match self.violence.score(image) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Error in violence detection: {}", e);
                return Verdict::keep();
            }
        };

        for pred in predictions {
            let label = pred.label.to_lowercase();
            if VIOLENCE_KEYWORDS.iter().any(|k| label.contains(k))
                && pred.score > self.options.violence_threshold
            {
                return Verdict::remove(format!("Violence: {}", label));
            }
        }

        Verdict::keep()
    }

    /// Review one image.
    ///
    /// Returns the preprocessed image when kept, `None` when removed.
    pub fn review(&self, image: &DynamicImage) -> (Option<DynamicImage>, Verdict) {
        let processed = self.preprocess(image);

        let verdict = self.check_nsfw(&processed);
        let verdict = if verdict.is_removed {
            verdict
        } else {
            self.check_violence(&processed)
        };

        if verdict.is_removed {
            log::info!("Removed inappropriate image: {}", verdict.category_str());
            (None, verdict)
        } else {
            (Some(processed), verdict)
        }
    }

    /// Review a list of images, dropping the inappropriate ones.
    pub fn filter_images(&self, images: Vec<DynamicImage>) -> FilteredImages {
        let reviewed: Vec<(Option<DynamicImage>, Verdict)> = if self.options.parallel {
            images.par_iter().map(|img| self.review(img)).collect()
        } else {
            images.iter().map(|img| self.review(img)).collect()
        };

        let mut result = FilteredImages::default();
        for (image, verdict) in reviewed {
            if let Some(image) = image {
                result.kept.push(image);
            }
            result.verdicts.push(verdict);
        }
        result
    }

    /// Summarise per-image verdicts.
    pub fn image_stats(&self, verdicts: &[Verdict]) -> ImageStats {
        ImageStats::from_verdicts(verdicts)
    }
}

/// Convert 8-bit RGB to HSV with every channel scaled to 0-255.
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let value = max;
    let saturation = if max > 0.0 { delta * 255.0 / max } else { 0.0 };

    let hue_degrees = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    let hue_degrees = if hue_degrees < 0.0 {
        hue_degrees + 360.0
    } else {
        hue_degrees
    };
    let hue = hue_degrees * 255.0 / 360.0;

    (
        hue.round().min(255.0) as u8,
        saturation.round().min(255.0) as u8,
        value as u8,
    )
}

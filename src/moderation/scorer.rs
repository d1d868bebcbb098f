//! Classifier interfaces consumed by the moderation filters.
//!
//! The machine-learned models themselves live outside this crate. Each
//! classifier is loaded once, wrapped in an `Arc`, and shared read-only
//! across every concurrent filtering task, so implementations must be
//! `Send + Sync` and safe to call concurrently (or serialise internally).

use crate::error::Result;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One label with its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    /// Class label, e.g. "toxic" or "porn"
    pub label: String,

    /// Probability in [0, 1]
    pub score: f32,
}

impl LabelScore {
    /// Create a new label score.
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Scores text for toxicity.
///
/// The result must include a label literally named `"toxic"`.
pub trait TextToxicityScorer: Send + Sync {
    /// Score a text passage.
    fn score(&self, text: &str) -> Result<Vec<LabelScore>>;
}

/// Scores images against an NSFW vocabulary
/// (`porn`, `hentai`, `sexy`, `drawings`, `neutral`).
pub trait ImageNsfwScorer: Send + Sync {
    /// Return the top-k labels for an image.
    fn score(&self, image: &DynamicImage) -> Result<Vec<LabelScore>>;
}

/// Scores images against free-form category labels that are tested by
/// substring match (e.g. "assault rifle", "cleaver, meat cleaver").
pub trait ImageViolenceScorer: Send + Sync {
    /// Return the top-k labels for an image.
    fn score(&self, image: &DynamicImage) -> Result<Vec<LabelScore>>;
}

/// Offline stand-in that reports every input as neutral.
///
/// Useful when no model endpoint is configured: only the blocklist and the
/// colour heuristic can then remove content.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralScorer;

impl NeutralScorer {
    fn neutral() -> Vec<LabelScore> {
        vec![LabelScore::new("toxic", 0.0), LabelScore::new("neutral", 1.0)]
    }
}

impl TextToxicityScorer for NeutralScorer {
    fn score(&self, _text: &str) -> Result<Vec<LabelScore>> {
        Ok(Self::neutral())
    }
}

impl ImageNsfwScorer for NeutralScorer {
    fn score(&self, _image: &DynamicImage) -> Result<Vec<LabelScore>> {
        Ok(Self::neutral())
    }
}

impl ImageViolenceScorer for NeutralScorer {
    fn score(&self, _image: &DynamicImage) -> Result<Vec<LabelScore>> {
        Ok(Self::neutral())
    }
}

/// The three classifier handles used by a processor.
#[derive(Clone)]
pub struct Classifiers {
    /// Text toxicity classifier
    pub toxicity: Arc<dyn TextToxicityScorer>,

    /// Image NSFW classifier
    pub nsfw: Arc<dyn ImageNsfwScorer>,

    /// Image violence classifier
    pub violence: Arc<dyn ImageViolenceScorer>,
}

impl Classifiers {
    /// Bundle three classifier handles.
    pub fn new(
        toxicity: Arc<dyn TextToxicityScorer>,
        nsfw: Arc<dyn ImageNsfwScorer>,
        violence: Arc<dyn ImageViolenceScorer>,
    ) -> Self {
        Self {
            toxicity,
            nsfw,
            violence,
        }
    }

    /// Classifiers that never flag anything.
    pub fn neutral() -> Self {
        let scorer = Arc::new(NeutralScorer);
        Self::new(scorer.clone(), scorer.clone(), scorer)
    }
}

impl std::fmt::Debug for Classifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifiers").finish_non_exhaustive()
    }
}

/// Sort labels by descending score and keep the first `k`.
pub fn top_k(mut scores: Vec<LabelScore>, k: usize) -> Vec<LabelScore> {
    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scores.truncate(k);
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k() {
        let scores = vec![
            LabelScore::new("a", 0.1),
            LabelScore::new("b", 0.9),
            LabelScore::new("c", 0.5),
        ];
        let top = top_k(scores, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].label, "b");
        assert_eq!(top[1].label, "c");
    }

    #[test]
    fn test_neutral_scorer_never_toxic() {
        let scores = TextToxicityScorer::score(&NeutralScorer, "anything").unwrap();
        let toxic = scores.iter().find(|s| s.label == "toxic").unwrap();
        assert_eq!(toxic.score, 0.0);
    }
}

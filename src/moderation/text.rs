//! Text moderation: validity gate, toxicity removal, and blocklist pruning.

use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::scorer::TextToxicityScorer;
use crate::error::Result;
use crate::model::{TextStats, Verdict};
use crate::options::TextFilterOptions;

/// Words removed from otherwise acceptable segments (matched case-insensitively).
pub const BLOCKLIST: &[&str] = &["inappropriate", "offensive", "explicit"];

/// Label the toxicity classifier must report.
pub const TOXIC_LABEL: &str = "toxic";

/// Category recorded for segments removed by the toxicity classifier.
pub const TOXIC_CATEGORY: &str = "Toxic: toxic";

/// Word tokens (with inner apostrophes) or single punctuation marks.
const TOKEN_PATTERN: &str = r"\w+(?:['’]\w+)*|[^\w\s]";

/// How a segment was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Empty or whitespace-only
    Blank,
    /// Control or high-byte characters, or mostly symbols
    Binary,
    /// No alphabetic token; passed through unchanged
    Invalid,
    /// Removed entirely by the toxicity classifier
    Toxic,
    /// Kept; blocklisted words (if any) dropped
    Kept,
}

/// Outcome of reviewing one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentReview {
    /// How the segment was handled
    pub disposition: Disposition,

    /// Filtered text with a trailing line break, or a bare line break
    pub output: String,

    /// Tokens counted toward `total_words`
    pub total_words: usize,

    /// Tokens counted toward `filtered_words`
    pub filtered_words: usize,

    /// Whether the segment counts toward `toxic_contexts`
    pub toxic_context: bool,
}

impl SegmentReview {
    fn passthrough(disposition: Disposition, output: String) -> Self {
        Self {
            disposition,
            output,
            total_words: 0,
            filtered_words: 0,
            toxic_context: false,
        }
    }

    /// Removal verdict for this segment.
    pub fn verdict(&self) -> Verdict {
        match self.disposition {
            Disposition::Toxic => Verdict::remove(TOXIC_CATEGORY),
            _ => Verdict::keep(),
        }
    }
}

/// Filters inappropriate text segment by segment.
pub struct TextFilter {
    scorer: Arc<dyn TextToxicityScorer>,
    options: TextFilterOptions,
    blocklist: HashSet<String>,
    token_re: Regex,
}

impl TextFilter {
    /// Create a text filter with default options.
    pub fn new(scorer: Arc<dyn TextToxicityScorer>) -> Self {
        Self::with_options(scorer, TextFilterOptions::default())
    }

    /// Create a text filter with custom options.
    pub fn with_options(scorer: Arc<dyn TextToxicityScorer>, options: TextFilterOptions) -> Self {
        let blocklist = BLOCKLIST.iter().map(|w| normalize_word(w)).collect();
        let token_re = Regex::new(TOKEN_PATTERN).unwrap();

        Self {
            scorer,
            options,
            blocklist,
            token_re,
        }
    }

    /// Get the filter options.
    pub fn options(&self) -> &TextFilterOptions {
        &self.options
    }

    /// Check if text looks like binary data rather than prose.
    ///
    /// True when any character is a control or high-byte character
    /// (U+0000–U+0008, U+000B, U+000C, U+000E–U+001F, U+007F–U+00FF), or when
    /// non-alphanumeric, non-space characters make up more than half the text.
    pub fn is_binary_content(&self, text: &str) -> bool {
        if text.chars().any(is_binary_char) {
            return true;
        }

        let total = text.chars().count();
        if total == 0 {
            return false;
        }
        let special = text
            .chars()
            .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
            .count();
        special as f32 / total as f32 > self.options.special_char_ratio
    }

    /// Check if text should be moderated at all.
    pub fn is_valid_text(&self, text: &str) -> bool {
        if text.trim().is_empty() || self.is_binary_content(text) {
            return false;
        }
        text.split_whitespace()
            .any(|word| word.chars().any(char::is_alphabetic))
    }

    /// Split text into word and punctuation tokens.
    pub fn tokenize<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.token_re.find_iter(text).map(|m| m.as_str()).collect()
    }

    /// Check if a single token is on the blocklist.
    pub fn is_blocked(&self, token: &str) -> bool {
        self.blocklist.contains(&normalize_word(token))
    }

    /// Ask the classifier whether text is toxic.
    ///
    /// Invalid text is never sent to the classifier. Classifier errors are
    /// returned to the caller.
    pub fn check_toxicity(&self, text: &str) -> Result<bool> {
        if !self.is_valid_text(text) {
            return Ok(false);
        }
        self.score_toxic(text)
    }

    fn score_toxic(&self, text: &str) -> Result<bool> {
        let scores = self.scorer.score(text)?;
        Ok(scores
            .iter()
            .any(|s| s.label == TOXIC_LABEL && s.score > self.options.toxicity_threshold))
    }

    /// Drop blocklisted tokens and rejoin the rest with single spaces.
    pub fn prune_blocked(&self, text: &str) -> String {
        self.tokenize(text)
            .into_iter()
            .filter(|token| !self.is_blocked(token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Filter one piece of text.
    ///
    /// Invalid text is returned unchanged; toxic text becomes an empty
    /// string; otherwise blocklisted words are removed.
    pub fn filter_text(&self, text: &str) -> Result<String> {
        if !self.is_valid_text(text) {
            return Ok(text.to_string());
        }
        if self.score_toxic(text)? {
            return Ok(String::new());
        }
        Ok(self.prune_blocked(text))
    }

    /// Review one segment, computing both its filtered output and its
    /// statistics contribution with a single classifier call.
    pub fn review(&self, text: &str) -> Result<SegmentReview> {
        if !text.is_empty() && self.is_binary_content(text) {
            return Ok(SegmentReview::passthrough(
                Disposition::Binary,
                "\n".to_string(),
            ));
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(SegmentReview::passthrough(
                Disposition::Blank,
                "\n".to_string(),
            ));
        }

        // Statistics look at the raw segment, the output path at the trimmed one.
        let counted = self.is_valid_text(text);
        let filtered = self.is_valid_text(trimmed);
        if !counted && !filtered {
            return Ok(SegmentReview::passthrough(
                Disposition::Invalid,
                format!("{}\n", trimmed),
            ));
        }

        let toxic = self.score_toxic(trimmed)?;

        let (total_words, filtered_words) = if counted {
            let tokens = self.tokenize(text);
            let blocked = tokens.iter().filter(|t| self.is_blocked(t)).count();
            // Toxic segments are removed whole, so every token counts as filtered.
            let filtered_words = if toxic { tokens.len() } else { blocked };
            (tokens.len(), filtered_words)
        } else {
            (0, 0)
        };

        let (disposition, output) = if !filtered {
            (Disposition::Invalid, format!("{}\n", trimmed))
        } else if toxic {
            (Disposition::Toxic, "\n".to_string())
        } else {
            let pruned = self.prune_blocked(trimmed);
            if pruned.is_empty() {
                (Disposition::Kept, "\n".to_string())
            } else {
                (Disposition::Kept, format!("{}\n", pruned))
            }
        };

        log::debug!("segment {:?}: {} tokens", disposition, total_words);

        Ok(SegmentReview {
            disposition,
            output,
            total_words,
            filtered_words,
            toxic_context: counted && toxic,
        })
    }

    /// Review every segment, preserving input order.
    pub fn review_all(&self, texts: &[String]) -> Result<Vec<SegmentReview>> {
        if self.options.parallel {
            texts.par_iter().map(|t| self.review(t)).collect()
        } else {
            texts.iter().map(|t| self.review(t)).collect()
        }
    }

    /// Filter a sequence of segments.
    ///
    /// The result always has the same length as the input: removed, blank
    /// and binary segments become a bare line break so line structure is kept.
    pub fn filter_texts(&self, texts: &[String]) -> Result<Vec<String>> {
        Ok(self
            .review_all(texts)?
            .into_iter()
            .map(|r| r.output)
            .collect())
    }

    /// Compute statistics for a sequence of segments.
    pub fn content_stats(&self, texts: &[String]) -> Result<TextStats> {
        Ok(summarize(&self.review_all(texts)?))
    }

    /// Filter segments and compute statistics in one pass.
    pub fn filter_with_stats(&self, texts: &[String]) -> Result<(Vec<String>, TextStats)> {
        let reviews = self.review_all(texts)?;
        let stats = summarize(&reviews);
        let filtered = reviews.into_iter().map(|r| r.output).collect();
        Ok((filtered, stats))
    }
}

/// Fold per-segment reviews into a statistics snapshot.
pub fn summarize(reviews: &[SegmentReview]) -> TextStats {
    let total_words = reviews.iter().map(|r| r.total_words).sum();
    let filtered_words = reviews.iter().map(|r| r.filtered_words).sum();
    let toxic_contexts = reviews.iter().filter(|r| r.toxic_context).count();
    TextStats::new(total_words, filtered_words, toxic_contexts)
}

fn is_binary_char(c: char) -> bool {
    matches!(c,
        '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{7F}'..='\u{FF}')
}

fn normalize_word(word: &str) -> String {
    word.nfc().collect::<String>().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::scorer::{LabelScore, NeutralScorer};

    fn neutral_filter() -> TextFilter {
        TextFilter::new(Arc::new(NeutralScorer))
    }

    struct FixedScorer(f32);

    impl TextToxicityScorer for FixedScorer {
        fn score(&self, _text: &str) -> Result<Vec<LabelScore>> {
            Ok(vec![LabelScore::new("toxic", self.0)])
        }
    }

    #[test]
    fn test_binary_detection() {
        let filter = neutral_filter();
        assert!(filter.is_binary_content("abc\u{1}def"));
        assert!(filter.is_binary_content("caf\u{e9}"));
        assert!(filter.is_binary_content("#$%^&*() ab"));
        assert!(!filter.is_binary_content("Hello, world!"));
        assert!(!filter.is_binary_content("line\twith\ttabs\n"));
        assert!(!filter.is_binary_content(""));
    }

    #[test]
    fn test_validity() {
        let filter = neutral_filter();
        assert!(filter.is_valid_text("Hello world"));
        assert!(!filter.is_valid_text("   "));
        assert!(!filter.is_valid_text("12345 678"));
        assert!(!filter.is_valid_text("\u{0}\u{0}data"));
    }

    #[test]
    fn test_tokenize() {
        let filter = neutral_filter();
        assert_eq!(
            filter.tokenize("Don't stop, now."),
            vec!["Don't", "stop", ",", "now", "."]
        );
    }

    #[test]
    fn test_blocklist_case_insensitive() {
        let filter = neutral_filter();
        assert!(filter.is_blocked("Offensive"));
        assert!(filter.is_blocked("EXPLICIT"));
        assert!(!filter.is_blocked("content"));
        assert_eq!(
            filter.filter_text("An EXPLICIT remark").unwrap(),
            "An remark"
        );
    }

    #[test]
    fn test_invalid_text_unchanged() {
        let filter = TextFilter::new(Arc::new(FixedScorer(0.99)));
        assert_eq!(filter.filter_text("123 456").unwrap(), "123 456");
        assert!(!filter.check_toxicity("123 456").unwrap());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let filter = TextFilter::new(Arc::new(FixedScorer(0.7)));
        assert!(!filter.check_toxicity("borderline text").unwrap());

        let filter = TextFilter::new(Arc::new(FixedScorer(0.71)));
        assert!(filter.check_toxicity("borderline text").unwrap());
    }

    #[test]
    fn test_review_verdicts() {
        let filter = TextFilter::new(Arc::new(FixedScorer(0.9)));
        let review = filter.review("you are awful").unwrap();
        assert_eq!(review.disposition, Disposition::Toxic);
        assert_eq!(review.output, "\n");
        assert_eq!(review.verdict(), Verdict::remove(TOXIC_CATEGORY));

        let review = filter.review("").unwrap();
        assert_eq!(review.disposition, Disposition::Blank);
        assert!(!review.verdict().is_removed);
    }

    #[test]
    fn test_all_blocked_segment_becomes_placeholder() {
        let filter = neutral_filter();
        let out = filter
            .filter_texts(&["Offensive explicit".to_string()])
            .unwrap();
        assert_eq!(out, vec!["\n".to_string()]);
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let texts: Vec<String> = (0..50)
            .map(|i| format!("line {} with offensive words", i))
            .collect();
        let parallel = neutral_filter();
        let sequential =
            TextFilter::with_options(Arc::new(NeutralScorer), TextFilterOptions::new().sequential());

        assert_eq!(
            parallel.filter_texts(&texts).unwrap(),
            sequential.filter_texts(&texts).unwrap()
        );
    }
}

//! Moderation verdicts.

use serde::{Deserialize, Serialize};

/// Removal decision plus reason attached to a segment or image.
///
/// A removed verdict always carries a non-empty category; construct one
/// through [`Verdict::remove`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the unit is removed from the output
    pub is_removed: bool,

    /// Human-readable reason, e.g. "NSFW: porn" (None when kept)
    pub category: Option<String>,
}

impl Verdict {
    /// Keep the unit.
    pub fn keep() -> Self {
        Self::default()
    }

    /// Remove the unit for the given reason.
    ///
    /// An empty reason is replaced by "Unspecified" so removed verdicts are
    /// always explained.
    pub fn remove(category: impl Into<String>) -> Self {
        let category = category.into();
        let category = if category.trim().is_empty() {
            "Unspecified".to_string()
        } else {
            category
        };
        Self {
            is_removed: true,
            category: Some(category),
        }
    }

    /// The reason text, or "" when kept.
    pub fn category_str(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }

    /// Category group: the trimmed text before the first ':'.
    ///
    /// "Violence: Blood detected" groups as "Violence".
    pub fn main_category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| c.split(':').next().unwrap_or(c).trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_has_no_category() {
        let verdict = Verdict::keep();
        assert!(!verdict.is_removed);
        assert_eq!(verdict.category_str(), "");
        assert_eq!(verdict.main_category(), None);
    }

    #[test]
    fn test_main_category() {
        let verdict = Verdict::remove("Violence: Blood detected");
        assert_eq!(verdict.main_category(), Some("Violence"));

        let verdict = Verdict::remove("Error in processing");
        assert_eq!(verdict.main_category(), Some("Error in processing"));
    }

    #[test]
    fn test_remove_never_empty() {
        let verdict = Verdict::remove("  ");
        assert!(verdict.is_removed);
        assert_eq!(verdict.category_str(), "Unspecified");
    }
}

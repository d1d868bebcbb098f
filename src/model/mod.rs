//! Intermediate representation shared by every container adapter.
//!
//! Adapters normalise their container into an ordered list of
//! [`TextSegment`]s and an unordered list of [`ExtractedImage`]s; the
//! moderation filters attach a [`Verdict`] to each unit and summarise a pass
//! as [`TextStats`] / [`ImageStats`].

mod document;
mod media;
mod segment;
mod stats;
mod verdict;

pub use document::{Document, Extraction};
pub use media::{ExtractedImage, ImageSource};
pub use segment::TextSegment;
pub use stats::{clean_ratio, ImageStats, ProcessingReport, TextStats};
pub use verdict::Verdict;

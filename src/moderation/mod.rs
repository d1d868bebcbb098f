//! Content moderation for extracted text and images.

pub mod image;
pub mod scorer;
pub mod text;

#[cfg(feature = "remote")]
pub mod remote;

pub use self::image::{FilteredImages, ImageFilter};
pub use scorer::{
    top_k, Classifiers, ImageNsfwScorer, ImageViolenceScorer, LabelScore, NeutralScorer,
    TextToxicityScorer,
};
pub use text::{summarize, Disposition, SegmentReview, TextFilter};

#[cfg(feature = "remote")]
pub use remote::HttpScorer;

//! Embedded image types.

use image::DynamicImage;
use std::fmt;

/// Where an image was found inside its container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Image XObject on a PDF page
    Page {
        /// 1-indexed page number
        page: u32,
        /// 0-indexed image position on the page
        index: usize,
    },
    /// Media part inside a DOCX package (e.g., "word/media/image1.png")
    Part(String),
    /// Image supplied directly by the caller
    Unknown,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Page { page, index } => write!(f, "image {} on page {}", index, page),
            ImageSource::Part(name) => write!(f, "{}", name),
            ImageSource::Unknown => write!(f, "image"),
        }
    }
}

/// A decoded image extracted from a document.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    /// Decoded pixels
    pub image: DynamicImage,

    /// Location in the source container
    pub source: ImageSource,
}

impl ExtractedImage {
    /// Create a new extracted image.
    pub fn new(image: DynamicImage, source: ImageSource) -> Self {
        Self { image, source }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl From<DynamicImage> for ExtractedImage {
    fn from(image: DynamicImage) -> Self {
        Self::new(image, ImageSource::Unknown)
    }
}

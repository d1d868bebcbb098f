//! Error types for docfilter library.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for docfilter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage in which a fatal error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading text and images out of the input container
    Extract,
    /// Text moderation
    FilterText,
    /// Writing the filtered container
    Save,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extract => write!(f, "extract"),
            Stage::FilterText => write!(f, "text filtering"),
            Stage::Save => write!(f, "save"),
        }
    }
}

/// Error types that can occur during document filtering.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input document does not exist.
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file extension is not one of the supported container types.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Text could not be decoded.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Error parsing or building PDF structure.
    #[error("PDF error: {0}")]
    PdfParse(String),

    /// Error reading or writing a DOCX package.
    #[error("DOCX error: {0}")]
    Docx(String),

    /// A single embedded image could not be decoded.
    #[error("Image decode error: {0}")]
    DecodeFailure(String),

    /// An image could not be re-encoded for output.
    #[error("Image encode error: {0}")]
    ImageEncode(String),

    /// An external classifier call failed.
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Processing exceeded the per-document deadline.
    #[error("Processing exceeded deadline of {0:?}")]
    Timeout(Duration),

    /// A fatal error raised inside a pipeline stage.
    #[error("{stage} failed: {source}")]
    Stage {
        /// Stage that failed
        stage: Stage,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap this error with the stage it was raised in.
    ///
    /// Errors that are already stage-tagged are returned unchanged.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            Error::Stage { .. } => self,
            other => Error::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was raised in, if known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost error, stripping stage wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            _ => Error::Docx(err.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Docx(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            image::ImageError::Encoding(_) => Error::ImageEncode(err.to_string()),
            _ => Error::DecodeFailure(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnsupportedFormat(".rtf".to_string());
        assert_eq!(err.to_string(), "Unsupported file format: .rtf");

        let err = Error::NotFound(PathBuf::from("missing.txt"));
        assert_eq!(err.to_string(), "Input file not found: missing.txt");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_stage_wrapping() {
        let err = Error::Classifier("model offline".to_string()).in_stage(Stage::FilterText);
        assert_eq!(err.stage(), Some(Stage::FilterText));
        assert_eq!(
            err.to_string(),
            "text filtering failed: Classifier error: model offline"
        );
        assert!(matches!(err.root(), Error::Classifier(_)));

        // Re-wrapping keeps the original stage
        let err = err.in_stage(Stage::Save);
        assert_eq!(err.stage(), Some(Stage::FilterText));
    }
}

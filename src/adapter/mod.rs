//! Format adapters: extraction from and reconstruction into each supported
//! container type.
//!
//! Every adapter implements the same [`FormatAdapter`] contract. The
//! [`AdapterRegistry`] maps container types and file extensions to adapters
//! and is consulted once at pipeline entry.
//!
//! # Example
//!
//! ```no_run
//! use docfilter::adapter::AdapterRegistry;
//! use docfilter::DocumentType;
//! use std::path::Path;
//!
//! fn main() -> docfilter::Result<()> {
//!     let registry = AdapterRegistry::with_defaults();
//!     let adapter = registry.get(DocumentType::Plain).unwrap();
//!
//!     let extraction = adapter.extract(Path::new("notes.txt"))?;
//!     println!("{} segments", extraction.segments.len());
//!     Ok(())
//! }
//! ```

mod docx;
mod layout;
mod pdf;
mod plain;

pub use docx::DocxAdapter;
pub use pdf::PdfAdapter;
pub use plain::PlainTextAdapter;

use crate::detect::DocumentType;
use crate::error::Result;
use crate::model::Extraction;
use image::DynamicImage;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Trait for container format adapters.
///
/// Implement this trait to add support for a new container format.
pub trait FormatAdapter: Send + Sync {
    /// Container type handled by this adapter.
    fn document_type(&self) -> DocumentType;

    /// Get the supported file extensions for this adapter.
    ///
    /// Extensions should be lowercase without the leading dot (e.g., `["pdf"]`).
    fn supported_extensions(&self) -> &[&str];

    /// Get the name of this adapter.
    fn name(&self) -> &str;

    /// Read ordered text segments and decodable images from a file.
    fn extract(&self, path: &Path) -> Result<Extraction>;

    /// Write filtered segments and surviving images as a new container.
    ///
    /// Segments that are blank (removed) produce no visible content.
    fn write(&self, segments: &[String], images: &[DynamicImage], path: &Path) -> Result<()>;

    /// Check if this adapter supports the given extension.
    fn supports_extension(&self, ext: &str) -> bool {
        let ext_lower = ext.trim_start_matches('.').to_lowercase();
        self.supported_extensions().iter().any(|e| *e == ext_lower)
    }
}

/// Registry for format adapters.
pub struct AdapterRegistry {
    by_extension: HashMap<String, Arc<dyn FormatAdapter>>,
    by_type: HashMap<DocumentType, Arc<dyn FormatAdapter>>,
}

impl AdapterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            by_extension: HashMap::new(),
            by_type: HashMap::new(),
        }
    }

    /// Create a registry with the plain, rich-text and paginated adapters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PlainTextAdapter::new()));
        registry.register(Arc::new(DocxAdapter::new()));
        registry.register(Arc::new(PdfAdapter::new()));
        registry
    }

    /// Register an adapter for its container type and all its extensions.
    ///
    /// A later registration replaces an earlier one for the same keys.
    pub fn register(&mut self, adapter: Arc<dyn FormatAdapter>) {
        for ext in adapter.supported_extensions() {
            self.by_extension
                .insert(ext.to_lowercase(), adapter.clone());
        }
        self.by_type.insert(adapter.document_type(), adapter);
    }

    /// Get the adapter for a container type.
    pub fn get(&self, doc_type: DocumentType) -> Option<Arc<dyn FormatAdapter>> {
        self.by_type.get(&doc_type).cloned()
    }

    /// Get an adapter by file extension, with or without the leading dot.
    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn FormatAdapter>> {
        self.by_extension
            .get(&ext.trim_start_matches('.').to_lowercase())
            .cloned()
    }

    /// Check if an extension is supported.
    pub fn supports(&self, ext: &str) -> bool {
        self.get_by_extension(ext).is_some()
    }

    /// Get all supported extensions, sorted.
    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.by_extension.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_with_defaults() {
        let registry = AdapterRegistry::with_defaults();
        assert!(registry.supports("txt"));
        assert!(registry.supports("DOCX"));
        assert!(registry.supports(".pdf"));
        assert!(!registry.supports("rtf"));
        assert_eq!(registry.supported_extensions(), vec!["docx", "pdf", "txt"]);
    }

    #[test]
    fn test_registry_get_by_type() {
        let registry = AdapterRegistry::with_defaults();
        for doc_type in DocumentType::ALL {
            let adapter = registry.get(doc_type).unwrap();
            assert_eq!(adapter.document_type(), doc_type);
            assert!(adapter.supports_extension(doc_type.extension()));
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = AdapterRegistry::new();
        assert!(registry.get(DocumentType::Plain).is_none());
        assert!(registry.supported_extensions().is_empty());
    }
}

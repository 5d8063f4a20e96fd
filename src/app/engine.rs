use crate::app::document::DocumentError;
use std::path::Path;

/// The document capability the orchestrator drives for each entry.
pub trait TransformEngine {
    type Document;

    fn load(&self, path: &Path) -> Result<Self::Document, DocumentError>;

    /// Applies the transform file to `document` in place.
    ///
    /// `Ok(false)` means the transform ran but did not succeed; the document
    /// must not be saved. `Err` means the transform file itself could not be
    /// loaded.
    fn apply(&self, transform: &Path, document: &mut Self::Document) -> Result<bool, DocumentError>;

    fn save(&self, document: &Self::Document, path: &Path) -> Result<(), DocumentError>;
}

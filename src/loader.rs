//! Document loading seam.
//!
//! The sync engine consumes loaders through [`DocumentLoader`], keeping
//! format-specific extraction (PDF, DOCX, ...) out of the core: plug in a
//! richer implementation at the composition root to support more formats.
//! A loader returns the document as ordered text segments (pages for paged
//! formats, a single segment for flat text).

use std::path::Path;

use crate::error::{EngineError, Result};

pub trait DocumentLoader: Send + Sync {
    /// Load a file into ordered text segments.
    ///
    /// Fails with [`EngineError::Load`] on an unreadable file or unsupported
    /// content; the sync engine isolates that failure to the one file.
    fn load(&self, path: &Path) -> Result<Vec<String>>;
}

/// Loader for UTF-8 text formats (txt, md, log, ...). The whole file is one
/// segment.
pub struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn load(&self, path: &Path) -> Result<Vec<String>> {
        let bytes = std::fs::read(path).map_err(|e| EngineError::load(path, e.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| EngineError::load(path, "file is not valid UTF-8 text"))?;
        Ok(vec![text])
    }
}

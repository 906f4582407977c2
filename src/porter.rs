//! Import/export facade
//!
//! Owns the schema registry and the code engine, and strings the pieces
//! together: import a document and commit once, preload a bundled document,
//! export an object, render and stage its code, clear the share area.

use std::path::{Path, PathBuf};

use serde_json::Value as Json;
use tracing::debug;

use crate::entity::ObjectId;
use crate::error::Result;
use crate::export;
use crate::import::{self, ImportReport};
use crate::schema::SchemaRegistry;
use crate::store::ObjectStore;
use crate::transport::{self, CodeEngine, CodeImage, CodeOptions, ShareArea};

/// The port facade. Constructed explicitly with its registry and engine;
/// there is no process-wide instance.
pub struct Porter<E: CodeEngine> {
    registry: SchemaRegistry,
    engine: E,
    options: CodeOptions,
    share: ShareArea,
}

impl<E: CodeEngine> Porter<E> {
    pub fn new(registry: SchemaRegistry, engine: E) -> Self {
        Porter {
            registry,
            engine,
            options: CodeOptions::default(),
            share: ShareArea::new(),
        }
    }

    /// Override the default rendering options.
    pub fn with_options(mut self, options: CodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Root the share area at an explicit path instead of the system
    /// temporary directory.
    pub fn with_share_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.share = ShareArea::at(root);
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Import a document into the store, committing once after the whole
    /// pass succeeds.
    pub fn import_document<S: ObjectStore>(
        &self,
        store: &mut S,
        document: &Json,
    ) -> Result<ImportReport> {
        let report = import::import_document(&self.registry, store, document)?;
        store.commit()?;
        debug!(
            created = report.created,
            updated = report.updated,
            conditions = report.conditions.len(),
            "import committed"
        );
        Ok(report)
    }

    /// Import a document from its textual form, as produced by a decoded
    /// code or an exported file.
    pub fn import_text<S: ObjectStore>(&self, store: &mut S, text: &str) -> Result<ImportReport> {
        let document: Json = serde_json::from_str(text)?;
        self.import_document(store, &document)
    }

    /// Seed the store from a bundled document file.
    pub fn preload<S: ObjectStore>(&self, store: &mut S, path: &Path) -> Result<ImportReport> {
        let text = std::fs::read_to_string(path)?;
        self.import_text(store, &text)
    }

    /// Export one object's document fragment.
    pub fn export_object<S: ObjectStore>(&self, store: &S, object: ObjectId) -> Result<Json> {
        export::export_object(&self.registry, store, object)
    }

    /// Reassemble the whole graph into one document.
    pub fn export_document<S: ObjectStore>(&self, store: &S) -> Result<Json> {
        export::export_document(&self.registry, store)
    }

    /// Export one object and render it into a code image.
    pub fn export_code<S: ObjectStore>(&self, store: &S, object: ObjectId) -> Result<CodeImage> {
        let fragment = self.export_object(store, object)?;
        transport::encode_fragment(&self.engine, &fragment, &self.options)
    }

    /// Stage a rendered code in the share area for hand-off, returning the
    /// artifact path.
    pub fn stage_code(&self, image: &CodeImage) -> Result<PathBuf> {
        self.share.stage(image)
    }

    /// Remove staged artifacts once the share sink is done with them.
    pub fn clear_share_area(&self) -> Result<()> {
        self.share.clear()
    }

    /// Decode a scanned code image back into a document, ready to be
    /// imported.
    pub fn decode_code(&self, image: &CodeImage) -> Result<Json> {
        transport::decode_image(&self.engine, image)
    }
}

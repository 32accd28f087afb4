//! In-memory catalog store for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{decode_catalog, encode_catalog, Catalog, CatalogError, CatalogStore};

const LOCATION: &str = "memory://catalog";

/// Catalog store holding the encoded document in memory.
///
/// Documents go through the same codec as the file store, so byte-level
/// properties can be asserted without touching disk.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    document: Arc<RwLock<Option<Vec<u8>>>>,
    save_count: Arc<RwLock<usize>>,
    load_error: Arc<RwLock<Option<CatalogError>>>,
    save_error: Arc<RwLock<Option<CatalogError>>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store as if a previous run had saved `catalog`.
    pub async fn seed(&self, catalog: Catalog) {
        let bytes = encode_catalog(&catalog).unwrap_or_default();
        *self.document.write().await = Some(bytes);
    }

    /// Pre-populate the store with raw document bytes.
    pub async fn seed_bytes(&self, bytes: impl Into<Vec<u8>>) {
        *self.document.write().await = Some(bytes.into());
    }

    /// The persisted document bytes, if any.
    pub async fn bytes(&self) -> Option<Vec<u8>> {
        self.document.read().await.clone()
    }

    /// The persisted catalog, decoded.
    pub async fn saved(&self) -> Option<Catalog> {
        let bytes = self.document.read().await.clone()?;
        decode_catalog(&bytes, LOCATION).ok()
    }

    /// Number of successful saves.
    pub async fn save_count(&self) -> usize {
        *self.save_count.read().await
    }

    /// The next `load` fails with this error.
    pub async fn fail_next_load(&self, error: CatalogError) {
        *self.load_error.write().await = Some(error);
    }

    /// The next `save` fails with this error and leaves the document alone.
    pub async fn fail_next_save(&self, error: CatalogError) {
        *self.save_error.write().await = Some(error);
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    fn location(&self) -> String {
        LOCATION.to_string()
    }

    async fn load(&self) -> Result<Catalog, CatalogError> {
        if let Some(error) = self.load_error.write().await.take() {
            return Err(error);
        }
        match self.document.read().await.as_deref() {
            Some(bytes) => decode_catalog(bytes, LOCATION),
            None => Ok(Catalog::empty()),
        }
    }

    async fn save(&self, catalog: &Catalog) -> Result<(), CatalogError> {
        if let Some(error) = self.save_error.write().await.take() {
            return Err(error);
        }
        let bytes = encode_catalog(catalog)?;
        *self.document.write().await = Some(bytes);
        *self.save_count.write().await += 1;
        Ok(())
    }
}

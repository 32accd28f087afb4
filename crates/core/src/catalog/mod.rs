//! Capture catalog - the durable, paginated, append-only record of every
//! item captured so far.
//!
//! The catalog is loaded once at the start of a run and written back once at
//! the end. Stores own the on-disk format; the pipeline only ever sees a
//! [`Catalog`].

mod codec;
mod json_store;
mod types;

pub use codec::{decode_catalog, encode_catalog};
pub use json_store::JsonCatalogStore;
pub use types::*;

use async_trait::async_trait;

/// Trait for catalog persistence.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Human readable location, used in logs and errors.
    fn location(&self) -> String;

    /// Load the persisted catalog.
    ///
    /// Returns an empty catalog when nothing has been persisted yet and
    /// `CatalogError::Corrupt` when the document cannot be trusted.
    async fn load(&self) -> Result<Catalog, CatalogError>;

    /// Replace the persisted catalog as a whole.
    ///
    /// Readers observe either the previous document or the new one, never a
    /// partial write.
    async fn save(&self, catalog: &Catalog) -> Result<(), CatalogError>;
}

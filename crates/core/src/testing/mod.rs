//! Testing utilities and mock implementations of the pipeline collaborators.
//!
//! Lets a whole run be exercised without a browser, an asset store or a
//! filesystem.
//!
//! # Example
//!
//! ```rust,ignore
//! use snapshelf_core::testing::{MemoryCatalogStore, MockRenderer, MockUploader};
//!
//! let renderer = Arc::new(MockRenderer::with_items(&["item1", "item2"]));
//! let uploader = Arc::new(MockUploader::new());
//! let store = Arc::new(MemoryCatalogStore::new());
//!
//! // Build a RunOrchestrator over them and call run_once()...
//! ```

mod memory_catalog;
mod mock_renderer;
mod mock_uploader;

pub use memory_catalog::MemoryCatalogStore;
pub use mock_renderer::MockRenderer;
pub use mock_uploader::{MockUploader, RecordedUpload};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::{Catalog, CatalogRecord};
    use crate::discovery::DiscoveredItem;
    use crate::identity::ItemIdentity;
    use crate::renderer::ElementHandle;

    /// A record with a deterministic URL and timestamp.
    pub fn record(id: &str) -> CatalogRecord {
        CatalogRecord::new(
            ItemIdentity::new(id),
            format!("https://assets.test/webp/{}", id),
            "2024-01-01T00:00:00.000Z",
        )
    }

    /// A paginated catalog holding `ids` in order.
    pub fn catalog_of(ids: &[&str], page_size: usize) -> Catalog {
        Catalog::paginate(ids.iter().map(|id| record(id)).collect(), page_size)
    }

    /// Discovered items for `ids`, element index = page position.
    pub fn discovered(ids: &[&str]) -> Vec<DiscoveredItem> {
        ids.iter()
            .enumerate()
            .map(|(index, id)| DiscoveredItem {
                identity: ItemIdentity::new(*id),
                element: ElementHandle::new(index),
            })
            .collect()
    }
}

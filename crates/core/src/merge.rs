//! Merge & persist: the single mutation point of the catalog.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogError, CatalogRecord, CatalogStore};
use crate::identity::ItemIdentity;

#[derive(Debug, Error)]
pub enum MergeError {
    /// Upstream deduplication let a repeated identity through.
    #[error("duplicate identity {0} in merged catalog")]
    DuplicateIdentity(ItemIdentity),

    #[error("failed to persist catalog: {0}")]
    Persist(#[from] CatalogError),
}

/// Append `new` after `existing`, keeping both orders intact.
///
/// Fails if any identity would appear twice.
pub fn merge_records(
    existing: Vec<CatalogRecord>,
    new: Vec<CatalogRecord>,
) -> Result<Vec<CatalogRecord>, MergeError> {
    let mut seen: HashSet<ItemIdentity> = HashSet::with_capacity(existing.len() + new.len());
    let mut merged = Vec::with_capacity(existing.len() + new.len());

    for record in existing.into_iter().chain(new) {
        if !seen.insert(record.identity.clone()) {
            return Err(MergeError::DuplicateIdentity(record.identity));
        }
        merged.push(record);
    }

    Ok(merged)
}

/// Merge `new` into `existing`, re-paginate and save the whole document.
///
/// Runs even when `new` is empty so an unchanged catalog is rewritten with
/// identical bytes.
pub async fn merge_and_persist(
    store: &dyn CatalogStore,
    existing: &Catalog,
    new: Vec<CatalogRecord>,
    page_size: usize,
) -> Result<Catalog, MergeError> {
    let appended = new.len();
    let merged = merge_records(existing.flatten(), new)?;
    let catalog = Catalog::paginate(merged, page_size).with_extra_from(existing);

    debug!(
        location = %store.location(),
        records = catalog.record_count(),
        pages = catalog.page_count(),
        "Persisting catalog"
    );
    store.save(&catalog).await?;

    info!(
        appended,
        records = catalog.record_count(),
        pages = catalog.page_count(),
        "Catalog persisted"
    );
    Ok(catalog)
}

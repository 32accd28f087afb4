//! Types for the paginated capture catalog.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

use crate::identity::ItemIdentity;

/// One captured item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Stable item key, unique across the whole catalog.
    #[serde(rename = "publicId")]
    pub identity: ItemIdentity,
    /// Durable URL returned by the asset store.
    #[serde(rename = "url")]
    pub asset_url: String,
    /// ISO-8601 UTC instant the upload was observed to succeed.
    ///
    /// Kept as the exact string that was written so older records
    /// re-serialize byte for byte.
    #[serde(rename = "timestamp")]
    pub captured_at: String,
    /// Fields written by earlier tooling; carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogRecord {
    pub fn new(
        identity: ItemIdentity,
        asset_url: impl Into<String>,
        captured_at: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            asset_url: asset_url.into(),
            captured_at: captured_at.into(),
            extra: Map::new(),
        }
    }
}

/// A single page of the persisted document.
///
/// Pages are rebuilt from the flat record sequence on every save, so only
/// `page`, `total` and `images` survive; other page-level keys are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    /// 1-based page number.
    pub page: u32,
    /// Number of records on this page.
    pub total: u32,
    pub images: Vec<CatalogRecord>,
}

/// The full persisted catalog, partitioned into fixed-size pages.
///
/// Concatenating `pages[..].images` in order yields the append history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub pages: Vec<CatalogPage>,
    /// Top-level keys written by earlier tooling; carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Catalog {
    /// A catalog with zero pages and zero records.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Splits `records` into pages of `page_size`; the last page may be partial.
    ///
    /// Page k (1-based) holds records `[(k-1)*P, k*P)`.
    pub fn paginate(records: Vec<CatalogRecord>, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let mut pages = Vec::with_capacity(records.len().div_ceil(page_size));
        let mut records = records.into_iter().peekable();

        while records.peek().is_some() {
            let images: Vec<CatalogRecord> = records.by_ref().take(page_size).collect();
            pages.push(CatalogPage {
                page: pages.len() as u32 + 1,
                total: images.len() as u32,
                images,
            });
        }

        Self {
            pages,
            extra: Map::new(),
        }
    }

    /// Same catalog, keeping the top-level keys of `previous`.
    pub fn with_extra_from(mut self, previous: &Catalog) -> Self {
        self.extra = previous.extra.clone();
        self
    }

    /// The ordered record sequence, inverse of [`Catalog::paginate`].
    pub fn flatten(&self) -> Vec<CatalogRecord> {
        self.pages
            .iter()
            .flat_map(|p| p.images.iter().cloned())
            .collect()
    }

    /// Consuming variant of [`Catalog::flatten`].
    pub fn into_records(self) -> Vec<CatalogRecord> {
        self.pages.into_iter().flat_map(|p| p.images).collect()
    }

    pub fn record_count(&self) -> usize {
        self.pages.iter().map(|p| p.images.len()).sum()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Every identity recorded so far.
    pub fn identities(&self) -> HashSet<ItemIdentity> {
        self.pages
            .iter()
            .flat_map(|p| p.images.iter().map(|r| r.identity.clone()))
            .collect()
    }

    pub fn contains(&self, identity: &ItemIdentity) -> bool {
        self.pages
            .iter()
            .any(|p| p.images.iter().any(|r| &r.identity == identity))
    }

    /// Checks the structural invariants of a loaded document.
    ///
    /// Pages must be numbered 1..=n, each `total` must match its record count,
    /// and no identity may appear twice.
    pub fn verify(&self) -> Result<(), String> {
        let mut seen = HashSet::new();

        for (idx, page) in self.pages.iter().enumerate() {
            let expected = idx as u32 + 1;
            if page.page != expected {
                return Err(format!(
                    "page numbers not contiguous: expected page {}, found {}",
                    expected, page.page
                ));
            }
            if page.total as usize != page.images.len() {
                return Err(format!(
                    "page {} declares total {} but holds {} records",
                    page.page,
                    page.total,
                    page.images.len()
                ));
            }
            for record in &page.images {
                if !seen.insert(&record.identity) {
                    return Err(format!(
                        "identity {} appears more than once (page {})",
                        record.identity, page.page
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The persisted document exists but is not a valid catalog.
    #[error("corrupt catalog at {location}: {reason}")]
    Corrupt { location: String, reason: String },

    #[error("catalog I/O error at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode catalog: {0}")]
    Encode(String),
}

impl CatalogError {
    pub fn io(location: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            location: location.into(),
            source,
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

//! File-backed catalog store.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::codec::{decode_catalog, encode_catalog};
use super::types::{Catalog, CatalogError};
use super::CatalogStore;

/// Catalog persisted as a single JSON document on the local filesystem.
pub struct JsonCatalogStore {
    path: PathBuf,
}

impl JsonCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling temp file the new document is staged in before the rename.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("catalog.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_staged(&self, staging: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
        let mut file = File::create(staging).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for JsonCatalogStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<Catalog, CatalogError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No catalog yet, starting empty");
                return Ok(Catalog::empty());
            }
            Err(e) => return Err(CatalogError::io(self.location(), e)),
        };

        let catalog = decode_catalog(&bytes, &self.location())?;
        debug!(
            path = %self.path.display(),
            records = catalog.record_count(),
            pages = catalog.page_count(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    async fn save(&self, catalog: &Catalog) -> Result<(), CatalogError> {
        let bytes = encode_catalog(catalog)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| CatalogError::io(parent.display().to_string(), e))?;
            }
        }

        let staging = self.staging_path();
        if let Err(e) = self.write_staged(&staging, &bytes).await {
            let _ = fs::remove_file(&staging).await;
            return Err(CatalogError::io(staging.display().to_string(), e));
        }

        if let Err(e) = fs::rename(&staging, &self.path).await {
            warn!(staging = %staging.display(), error = %e, "Failed to swap in new catalog");
            let _ = fs::remove_file(&staging).await;
            return Err(CatalogError::io(self.location(), e));
        }

        debug!(
            path = %self.path.display(),
            bytes = bytes.len(),
            records = catalog.record_count(),
            "Catalog saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogRecord;
    use crate::identity::ItemIdentity;
    use tempfile::TempDir;

    fn catalog_of(ids: &[&str], page_size: usize) -> Catalog {
        Catalog::paginate(
            ids.iter()
                .map(|id| {
                    CatalogRecord::new(
                        ItemIdentity::new(*id),
                        format!("https://res.example/{}.webp", id),
                        "2024-03-01T08:00:00.000Z",
                    )
                })
                .collect(),
            page_size,
        )
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonCatalogStore::new(dir.path().join("gallery.json"));
        let catalog = store.load().await.unwrap();
        assert_eq!(catalog.page_count(), 0);
        assert_eq!(catalog.record_count(), 0);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonCatalogStore::new(dir.path().join("nested/data/gallery.json"));
        let catalog = catalog_of(&["item1", "item2", "item3"], 2);

        store.save(&catalog).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, catalog);
        assert!(!store.staging_path().exists(), "staging file must not linger");
    }

    #[tokio::test]
    async fn test_save_replaces_whole_document() {
        let dir = TempDir::new().unwrap();
        let store = JsonCatalogStore::new(dir.path().join("gallery.json"));

        store.save(&catalog_of(&["item1"], 2)).await.unwrap();
        store
            .save(&catalog_of(&["item1", "item2", "item3"], 2))
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.page_count(), 2);
        assert_eq!(loaded.record_count(), 3);
    }

    #[tokio::test]
    async fn test_load_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gallery.json");
        std::fs::write(&path, b"{\"pages\": [").unwrap();

        let store = JsonCatalogStore::new(&path);
        let err = store.load().await.unwrap_err();
        assert!(err.is_corrupt());

        // a failed load never touches the file
        assert_eq!(std::fs::read(&path).unwrap(), b"{\"pages\": [");
    }

    #[tokio::test]
    async fn test_save_into_unwritable_location_fails() {
        let dir = TempDir::new().unwrap();
        // a regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let store = JsonCatalogStore::new(blocker.join("gallery.json"));
        let err = store.save(&catalog_of(&["item1"], 2)).await.unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_document() {
        let dir = TempDir::new().unwrap();
        let store = JsonCatalogStore::new(dir.path().join("gallery.json"));
        store.save(&catalog_of(&["item1"], 2)).await.unwrap();
        let before = std::fs::read(store.path()).unwrap();

        // a directory in the way of the staging file makes the write fail
        std::fs::create_dir(store.staging_path()).unwrap();

        let err = store
            .save(&catalog_of(&["item1", "item2"], 2))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Io { .. }));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
        assert_eq!(store.load().await.unwrap().record_count(), 1);
    }

    #[test]
    fn test_staging_path_is_sibling() {
        let store = JsonCatalogStore::new("/data/gallery.json");
        assert_eq!(store.staging_path(), PathBuf::from("/data/gallery.json.tmp"));
    }
}

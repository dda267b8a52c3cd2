//! In-memory store backend.
//!
//! This is the reference implementation of `StoreBackend`.
//! It keeps a schema catalog in HashMaps behind a single RwLock.
//!
//! ## Limitations
//!
//! - **No persistence**: state lives and dies with the process.
//! - **Catalog only**: indexes are recorded as desired state, not built.
//!   There is no document data for them to cover.
//!
//! Use this backend for:
//! - Testing provisioning logic without a running store
//! - Asserting on final catalog state in integration tests

use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;

use super::{DbHandle, Ensured, IndexInfo, StoreBackend, StoreCapabilities, resolve_index_create};
use crate::Result;
use crate::schema::IndexSpec;

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory schema catalog. Cloning yields a handle to the same state.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    /// database name → collection name → indexes on it
    databases: RwLock<HashMap<String, HashMap<String, Vec<IndexInfo>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                databases: RwLock::new(HashMap::new()),
            }),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// StoreBackend impl
// ============================================================================

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_collection_if_absent(&self, db: &DbHandle, name: &str) -> Result<Ensured> {
        let mut databases = self.inner.databases.write();
        let collections = databases.entry(db.name().to_string()).or_default();
        if collections.contains_key(name) {
            return Ok(Ensured::Unchanged);
        }
        collections.insert(name.to_string(), Vec::new());
        Ok(Ensured::Created)
    }

    async fn create_index_if_absent(
        &self,
        db: &DbHandle,
        collection: &str,
        spec: &IndexSpec,
    ) -> Result<Ensured> {
        let mut databases = self.inner.databases.write();
        let collections = databases.entry(db.name().to_string()).or_default();
        // Indexing a missing collection creates it.
        let indexes = collections.entry(collection.to_string()).or_default();
        match resolve_index_create(collection, indexes, spec)? {
            Some(record) => {
                indexes.push(record);
                Ok(Ensured::Created)
            }
            None => Ok(Ensured::Unchanged),
        }
    }

    async fn collection_exists(&self, db: &DbHandle, name: &str) -> Result<bool> {
        let databases = self.inner.databases.read();
        Ok(databases.get(db.name()).is_some_and(|c| c.contains_key(name)))
    }

    async fn list_collections(&self, db: &DbHandle) -> Result<Vec<String>> {
        let databases = self.inner.databases.read();
        let mut names: Vec<String> = databases
            .get(db.name())
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }

    async fn list_indexes(&self, db: &DbHandle, collection: &str) -> Result<Vec<IndexInfo>> {
        let databases = self.inner.databases.read();
        let mut indexes: Vec<IndexInfo> = databases
            .get(db.name())
            .and_then(|c| c.get(collection))
            .cloned()
            .unwrap_or_default();
        indexes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(indexes)
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            supports_fulltext: true,
            supports_unique: true,
            persistent: false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn db() -> DbHandle {
        DbHandle::new("rev_analyzer")
    }

    #[tokio::test]
    async fn test_create_collection_then_exists() {
        let store = MemoryBackend::new();
        let outcome = store.create_collection_if_absent(&db(), "cached_reviews").await.unwrap();
        assert_eq!(outcome, Ensured::Created);
        assert!(store.collection_exists(&db(), "cached_reviews").await.unwrap());
        assert!(!store.collection_exists(&db(), "token_usage").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_collection_twice_is_unchanged() {
        let store = MemoryBackend::new();
        store.create_collection_if_absent(&db(), "cached_reviews").await.unwrap();
        let outcome = store.create_collection_if_absent(&db(), "cached_reviews").await.unwrap();
        assert_eq!(outcome, Ensured::Unchanged);
        assert_eq!(store.list_collections(&db()).await.unwrap(), vec!["cached_reviews"]);
    }

    #[tokio::test]
    async fn test_index_on_missing_collection_creates_it() {
        let store = MemoryBackend::new();
        let spec = IndexSpec::fulltext("text");
        let outcome = store.create_index_if_absent(&db(), "cached_reviews", &spec).await.unwrap();
        assert_eq!(outcome, Ensured::Created);
        assert!(store.collection_exists(&db(), "cached_reviews").await.unwrap());

        let indexes = store.list_indexes(&db(), "cached_reviews").await.unwrap();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].name, "text_text");
    }

    #[tokio::test]
    async fn test_equivalent_index_under_any_name_is_unchanged() {
        let store = MemoryBackend::new();
        store
            .create_index_if_absent(&db(), "cached_reviews", &IndexSpec::descending("created_at"))
            .await
            .unwrap();

        // Same structure, explicit different name: already covered.
        let renamed = IndexSpec::descending("created_at").named("recent");
        let outcome = store.create_index_if_absent(&db(), "cached_reviews", &renamed).await.unwrap();
        assert_eq!(outcome, Ensured::Unchanged);

        let indexes = store.list_indexes(&db(), "cached_reviews").await.unwrap();
        assert_eq!(indexes.len(), 1);
    }

    #[tokio::test]
    async fn test_same_name_different_spec_conflicts() {
        let store = MemoryBackend::new();
        store
            .create_index_if_absent(&db(), "cached_reviews", &IndexSpec::descending("created_at").named("idx"))
            .await
            .unwrap();

        let clashing = IndexSpec::ascending("user_id").named("idx");
        let err = store.create_index_if_absent(&db(), "cached_reviews", &clashing).await.unwrap_err();
        assert!(matches!(err, Error::IndexConflict { .. }));

        // The conflicting request must not have touched the catalog.
        let indexes = store.list_indexes(&db(), "cached_reviews").await.unwrap();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].name, "idx");
    }

    #[tokio::test]
    async fn test_databases_are_isolated() {
        let store = MemoryBackend::new();
        let staging = DbHandle::new("staging");
        store.create_collection_if_absent(&db(), "cached_reviews").await.unwrap();

        assert!(store.list_collections(&staging).await.unwrap().is_empty());
        assert!(!store.collection_exists(&staging, "cached_reviews").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_collections_sorted() {
        let store = MemoryBackend::new();
        for name in ["zeta", "alpha", "mid"] {
            store.create_collection_if_absent(&db(), name).await.unwrap();
        }
        assert_eq!(
            store.list_collections(&db()).await.unwrap(),
            vec!["alpha", "mid", "zeta"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_create_has_single_winner() {
        let store = MemoryBackend::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create_collection_if_absent(&DbHandle::new("rev_analyzer"), "cached_reviews").await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == Ensured::Created {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }
}

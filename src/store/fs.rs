//! Filesystem store backend.
//!
//! Persists the schema catalog as a single JSON file under a data
//! directory. Every mutation rewrites the file atomically: write to a
//! temp file in the same directory, fsync, then rename over the live
//! catalog. The in-memory copy is only updated after the rewrite lands,
//! so memory and disk never diverge.
//!
//! ## Limitations
//!
//! - **Single process**: the in-process mutex serializes mutations, but
//!   there is no cross-process lock. Two processes provisioning the same
//!   data directory can lose each other's writes.
//! - **Catalog only**: like the memory backend, indexes are recorded as
//!   desired state, not built over document data.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{DbHandle, Ensured, IndexInfo, StoreBackend, StoreCapabilities, resolve_index_create};
use crate::schema::IndexSpec;
use crate::{Error, Result};

/// Catalog file name inside the data directory.
const CATALOG_FILE: &str = "catalog.json";
/// Temp file used for atomic rewrites.
const CATALOG_TMP: &str = "catalog.json.tmp";
/// Bumped when the catalog layout changes incompatibly.
const CATALOG_FORMAT_VERSION: u32 = 1;

// ============================================================================
// Catalog documents
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Catalog {
    format_version: u32,
    /// BTreeMaps keep the file diff-stable across rewrites.
    databases: BTreeMap<String, DatabaseEntry>,
}

impl Catalog {
    fn empty() -> Self {
        Self {
            format_version: CATALOG_FORMAT_VERSION,
            databases: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DatabaseEntry {
    collections: BTreeMap<String, CollectionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionEntry {
    created_at: DateTime<Utc>,
    indexes: Vec<IndexEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    #[serde(flatten)]
    info: IndexInfo,
    created_at: DateTime<Utc>,
}

// ============================================================================
// FsBackend
// ============================================================================

/// Store backend backed by a JSON catalog on local disk.
#[derive(Debug)]
pub struct FsBackend {
    data_dir: PathBuf,
    catalog: Mutex<Catalog>,
}

impl FsBackend {
    /// Open (or initialize) a catalog under `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        let path = data_dir.join(CATALOG_FILE);
        let catalog = if path.exists() {
            let text = fs::read_to_string(&path)?;
            let catalog: Catalog = serde_json::from_str(&text)?;
            if catalog.format_version != CATALOG_FORMAT_VERSION {
                return Err(Error::Store(format!(
                    "unsupported catalog format version {} (expected {})",
                    catalog.format_version, CATALOG_FORMAT_VERSION
                )));
            }
            catalog
        } else {
            Catalog::empty()
        };

        Ok(Self {
            data_dir,
            catalog: Mutex::new(catalog),
        })
    }

    /// Path of the live catalog file.
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE)
    }

    /// Rewrite the catalog atomically: temp file, fsync, rename.
    fn persist(&self, catalog: &Catalog) -> Result<()> {
        let tmp = self.data_dir.join(CATALOG_TMP);
        let live = self.data_dir.join(CATALOG_FILE);

        let json = serde_json::to_string_pretty(catalog)?;
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        fs::rename(&tmp, &live)?;

        // Sync the directory so the rename itself is durable. The data
        // is already in place, only the directory entry may lag.
        if let Ok(dir) = File::open(&self.data_dir) {
            let _ = dir.sync_all();
        }
        Ok(())
    }
}

// ============================================================================
// StoreBackend impl
// ============================================================================

#[async_trait]
impl StoreBackend for FsBackend {
    async fn ping(&self) -> Result<()> {
        fs::metadata(&self.data_dir).map_err(|e| {
            Error::Connectivity(format!("data directory {}: {e}", self.data_dir.display()))
        })?;
        Ok(())
    }

    async fn create_collection_if_absent(&self, db: &DbHandle, name: &str) -> Result<Ensured> {
        let mut catalog = self.catalog.lock();
        let present = catalog
            .databases
            .get(db.name())
            .is_some_and(|d| d.collections.contains_key(name));
        if present {
            return Ok(Ensured::Unchanged);
        }

        let mut next = catalog.clone();
        next.databases.entry(db.name().to_string()).or_default().collections.insert(
            name.to_string(),
            CollectionEntry {
                created_at: Utc::now(),
                indexes: Vec::new(),
            },
        );
        self.persist(&next)?;
        *catalog = next;
        Ok(Ensured::Created)
    }

    async fn create_index_if_absent(
        &self,
        db: &DbHandle,
        collection: &str,
        spec: &IndexSpec,
    ) -> Result<Ensured> {
        let mut catalog = self.catalog.lock();
        let existing: Vec<IndexInfo> = catalog
            .databases
            .get(db.name())
            .and_then(|d| d.collections.get(collection))
            .map(|c| c.indexes.iter().map(|e| e.info.clone()).collect())
            .unwrap_or_default();

        let record = match resolve_index_create(collection, &existing, spec)? {
            Some(record) => record,
            None => return Ok(Ensured::Unchanged),
        };

        let mut next = catalog.clone();
        let database = next.databases.entry(db.name().to_string()).or_default();
        // Indexing a missing collection creates it.
        let entry = database
            .collections
            .entry(collection.to_string())
            .or_insert_with(|| CollectionEntry {
                created_at: Utc::now(),
                indexes: Vec::new(),
            });
        entry.indexes.push(IndexEntry {
            info: record,
            created_at: Utc::now(),
        });
        self.persist(&next)?;
        *catalog = next;
        Ok(Ensured::Created)
    }

    async fn collection_exists(&self, db: &DbHandle, name: &str) -> Result<bool> {
        let catalog = self.catalog.lock();
        Ok(catalog
            .databases
            .get(db.name())
            .is_some_and(|d| d.collections.contains_key(name)))
    }

    async fn list_collections(&self, db: &DbHandle) -> Result<Vec<String>> {
        let catalog = self.catalog.lock();
        Ok(catalog
            .databases
            .get(db.name())
            .map(|d| d.collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_indexes(&self, db: &DbHandle, collection: &str) -> Result<Vec<IndexInfo>> {
        let catalog = self.catalog.lock();
        let mut indexes: Vec<IndexInfo> = catalog
            .databases
            .get(db.name())
            .and_then(|d| d.collections.get(collection))
            .map(|c| c.indexes.iter().map(|e| e.info.clone()).collect())
            .unwrap_or_default();
        indexes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(indexes)
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            supports_fulltext: true,
            supports_unique: true,
            persistent: true,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

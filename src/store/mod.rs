//! # Store Backend Trait
//!
//! This is THE contract between provisio and any document store.
//! Every primitive the provisioning pass needs is defined here.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | In-memory catalog for testing/embedding |
//! | `FsBackend` | `fs` | JSON catalog on local disk |

pub mod fs;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::schema::{FieldSpec, IndexKind, IndexSpec};
use crate::{Error, Result};

pub use fs::FsBackend;
pub use memory::MemoryBackend;

// ============================================================================
// Backend configuration
// ============================================================================

/// Configuration for connecting to a store backend.
///
/// Lets a caller pick the backend at runtime (the CLI does) without
/// naming concrete types; `connect` yields the backend boxed.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// In-memory (no persistence)
    Memory,

    /// JSON catalog under a data directory
    Fs { data_dir: std::path::PathBuf },
}

impl BackendConfig {
    /// Open the configured backend.
    pub fn connect(&self) -> Result<Box<dyn StoreBackend>> {
        match self {
            BackendConfig::Memory => Ok(Box::new(MemoryBackend::new())),
            BackendConfig::Fs { data_dir } => Ok(Box::new(FsBackend::open(data_dir)?)),
        }
    }
}

// ============================================================================
// Database handle
// ============================================================================

/// Opaque reference to a logical database inside a store.
///
/// The handle is just the database's name. Opening, pooling, and closing
/// connections is the driver layer's job; provisioning only needs to
/// know which database to address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DbHandle(pub String);

impl DbHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DbHandle {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for DbHandle {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for DbHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Ensure outcome
// ============================================================================

/// Outcome of a single create-if-absent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    /// The object did not exist and was created.
    Created,
    /// An equivalent object already existed. Nothing was touched.
    Unchanged,
}

impl Ensured {
    pub fn is_created(&self) -> bool {
        matches!(self, Ensured::Created)
    }
}

// ============================================================================
// Index introspection
// ============================================================================

/// One index as reported by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub fields: FieldSpec,
    pub kind: IndexKind,
    pub unique: bool,
}

impl IndexInfo {
    /// The record a store should hold for a descriptor.
    pub fn from_spec(spec: &IndexSpec) -> Self {
        Self {
            name: spec.name(),
            fields: spec.fields.clone(),
            kind: spec.kind(),
            unique: spec.options.unique,
        }
    }

    /// Render the structural part (fields plus uniqueness) for error
    /// messages.
    pub fn describe(&self) -> String {
        if self.unique {
            format!("{} unique", self.fields)
        } else {
            self.fields.to_string()
        }
    }
}

// ============================================================================
// Backend capabilities
// ============================================================================

/// What a backend can do. Checked by the provisioning pass before it
/// issues a create.
///
/// All fields default to false. Backends override via `capabilities()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreCapabilities {
    pub supports_fulltext: bool,
    pub supports_unique: bool,
    /// State survives the process. False means applied state is
    /// ephemeral.
    pub persistent: bool,
}

// ============================================================================
// Create-if-absent resolution
// ============================================================================

/// Decide what `create_index_if_absent` must do, given the indexes a
/// collection already has.
///
/// Returns `Ok(None)` when an equivalent index exists under any name and
/// the call is a no-op, `Ok(Some(record))` when the index must be
/// created, and `Error::IndexConflict` when the descriptor collides with
/// an existing index it cannot coexist with.
pub(crate) fn resolve_index_create(
    collection: &str,
    existing: &[IndexInfo],
    spec: &IndexSpec,
) -> Result<Option<IndexInfo>> {
    let requested = IndexInfo::from_spec(spec);

    if let Some(named) = existing.iter().find(|i| i.name == requested.name) {
        // Same name: either structurally identical or a hard conflict.
        if named.fields == requested.fields && named.unique == requested.unique {
            return Ok(None);
        }
        return Err(conflict(collection, named, &requested));
    }

    if let Some(same_shape) = existing.iter().find(|i| i.fields == requested.fields) {
        // Same fields under another name. Identical structure counts as
        // present; a uniqueness mismatch cannot be satisfied without a
        // rebuild, so it is a conflict.
        if same_shape.unique == requested.unique {
            return Ok(None);
        }
        return Err(conflict(collection, same_shape, &requested));
    }

    Ok(Some(requested))
}

fn conflict(collection: &str, existing: &IndexInfo, requested: &IndexInfo) -> Error {
    Error::IndexConflict {
        collection: collection.to_string(),
        index: existing.name.clone(),
        existing: existing.describe(),
        requested: requested.describe(),
    }
}

// ============================================================================
// StoreBackend trait
// ============================================================================

/// The store contract.
///
/// One trait, five primitives plus a probe. Anything that can answer
/// "does this collection exist" and perform create-if-absent atomically
/// can serve as a provisioning target: an embedded catalog, a driver
/// adapter, a mock.
#[async_trait]
pub trait StoreBackend: Send + Sync + 'static {
    /// Cheap connectivity probe. `Error::Connectivity` when the store
    /// cannot be reached.
    async fn ping(&self) -> Result<()>;

    /// Create a collection unless an identically-named one exists.
    ///
    /// Must be atomic per object: with concurrent callers, exactly one
    /// creates and the rest observe `Unchanged`.
    async fn create_collection_if_absent(&self, db: &DbHandle, name: &str) -> Result<Ensured>;

    /// Create an index unless an equivalent one exists.
    ///
    /// Equivalence ignores names: a structurally identical index under a
    /// different name counts as present. A same-name index with a
    /// different structure is `Error::IndexConflict`.
    ///
    /// Indexing a missing collection creates the collection first,
    /// document-store style.
    async fn create_index_if_absent(
        &self,
        db: &DbHandle,
        collection: &str,
        spec: &IndexSpec,
    ) -> Result<Ensured>;

    /// Whether a collection exists.
    async fn collection_exists(&self, db: &DbHandle, name: &str) -> Result<bool>;

    /// All collection names in a database, sorted.
    async fn list_collections(&self, db: &DbHandle) -> Result<Vec<String>>;

    /// All indexes on a collection, sorted by name. Empty when the
    /// collection does not exist.
    async fn list_indexes(&self, db: &DbHandle, collection: &str) -> Result<Vec<IndexInfo>>;

    /// Report what this backend can do.
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::default()
    }
}

#[async_trait]
impl StoreBackend for Box<dyn StoreBackend> {
    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }

    async fn create_collection_if_absent(&self, db: &DbHandle, name: &str) -> Result<Ensured> {
        (**self).create_collection_if_absent(db, name).await
    }

    async fn create_index_if_absent(
        &self,
        db: &DbHandle,
        collection: &str,
        spec: &IndexSpec,
    ) -> Result<Ensured> {
        (**self).create_index_if_absent(db, collection, spec).await
    }

    async fn collection_exists(&self, db: &DbHandle, name: &str) -> Result<bool> {
        (**self).collection_exists(db, name).await
    }

    async fn list_collections(&self, db: &DbHandle) -> Result<Vec<String>> {
        (**self).list_collections(db).await
    }

    async fn list_indexes(&self, db: &DbHandle, collection: &str) -> Result<Vec<IndexInfo>> {
        (**self).list_indexes(db, collection).await
    }

    fn capabilities(&self) -> StoreCapabilities {
        (**self).capabilities()
    }
}

// ============================================================================
// Tests
// ============================================================================

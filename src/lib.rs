//! # provisio — Declarative Schema Provisioning
//!
//! Idempotent, fail-fast provisioning for document stores: collections
//! and secondary indexes declared as data, converged by explicit apply
//! passes.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `StoreBackend` is the contract between the
//!    provisioning pass and any store
//! 2. **Descriptors are pure data**: `Schema`, `CollectionSpec`,
//!    `IndexSpec` cross all boundaries and do no I/O
//! 3. **Idempotence over transactions**: no rollback; a failed pass is
//!    fixed by re-running it, every completed step converges
//! 4. **Handles are borrowed**: the caller owns database lifecycle,
//!    every operation takes `&DbHandle`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use provisio::{CollectionSpec, IndexSpec, Provisioner, Schema};
//!
//! # async fn example() -> provisio::Result<()> {
//! let schema = Schema::new()
//!     .with_collection(
//!         CollectionSpec::new("cached_reviews")
//!             .with_index(IndexSpec::fulltext("text"))
//!             .with_index(IndexSpec::descending("created_at")),
//!     )
//!     .with_collection(CollectionSpec::new("token_usage"));
//!
//! let prov = Provisioner::open_memory();
//! let report = prov.provision(&"rev_analyzer".into(), &schema).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Store Backends
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | Memory | `store::memory` | In-memory catalog for testing/embedding |
//! | Fs | `store::fs` | JSON catalog on local disk |

// ============================================================================
// Modules
// ============================================================================

pub mod provision;
pub mod schema;
pub mod store;

// ============================================================================
// Re-exports: Schema (the descriptors)
// ============================================================================

pub use schema::{
    CollectionSpec, FieldRole, FieldSpec, IndexKind, IndexOptions, IndexSpec, Manifest, Schema,
};

// ============================================================================
// Re-exports: Store
// ============================================================================

pub use store::{
    BackendConfig, DbHandle, Ensured, FsBackend, IndexInfo, MemoryBackend, StoreBackend,
    StoreCapabilities,
};

// ============================================================================
// Re-exports: Provisioning
// ============================================================================

pub use provision::ProvisionReport;

// ============================================================================
// Top-level Provisioner handle
// ============================================================================

/// The primary entry point. A `Provisioner` wraps a store backend and
/// drives provisioning passes against it.
pub struct Provisioner<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> Provisioner<B> {
    /// Create a Provisioner with the given backend.
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// Ensure a single collection exists.
    pub async fn ensure_collection(&self, db: &DbHandle, name: &str) -> Result<Ensured> {
        provision::ensure_collection(&self.backend, db, name).await
    }

    /// Ensure a single index exists on a collection.
    pub async fn ensure_index(
        &self,
        db: &DbHandle,
        collection: &str,
        spec: &IndexSpec,
    ) -> Result<Ensured> {
        provision::ensure_index(&self.backend, db, collection, spec).await
    }

    /// Apply a whole schema: every collection, then its indexes, in
    /// declaration order. Fail-fast, no rollback.
    pub async fn provision(&self, db: &DbHandle, schema: &Schema) -> Result<ProvisionReport> {
        provision::apply(&self.backend, db, schema).await
    }

    /// Access the underlying backend (for introspection or advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// In-memory catalog for testing and embedding.
impl Provisioner<MemoryBackend> {
    pub fn open_memory() -> Self {
        Self::with_backend(MemoryBackend::new())
    }
}

/// JSON catalog on local disk.
impl Provisioner<FsBackend> {
    pub fn open_fs(data_dir: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::with_backend(FsBackend::open(data_dir)?))
    }
}

/// Backend chosen at runtime from a [`BackendConfig`].
impl Provisioner<Box<dyn StoreBackend>> {
    pub fn connect(config: &BackendConfig) -> Result<Self> {
        Ok(Self::with_backend(config.connect()?))
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Store unreachable: {0}")]
    Connectivity(String),

    #[error("Invalid collection name {name:?}: {reason}")]
    InvalidCollectionName { name: String, reason: String },

    #[error("Invalid index spec on collection {collection:?}: {reason}")]
    InvalidIndexSpec { collection: String, reason: String },

    #[error("Index conflict on {collection:?}: {index:?} already exists (existing {existing}, requested {requested})")]
    IndexConflict {
        collection: String,
        index: String,
        existing: String,
        requested: String,
    },

    #[error("Index {index:?} on {collection:?}: {reason}")]
    Unsupported {
        collection: String,
        index: String,
        reason: String,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

//! # Schema Descriptors
//!
//! Pure data: the desired state of a database. Nothing in this module
//! talks to a store. Descriptors are built in code or parsed from a
//! manifest file, validated, then handed to the provisioning pass.

pub mod collection;
pub mod index;
pub mod manifest;

pub use collection::{CollectionSpec, MAX_COLLECTION_NAME_BYTES, validate_collection_name};
pub use index::{
    FieldRole, FieldSpec, IndexKind, IndexOptions, IndexSpec, MAX_INDEX_NAME_BYTES,
};
pub use manifest::Manifest;

use serde::{Deserialize, Serialize};

use crate::Result;

// ============================================================================
// Schema
// ============================================================================

/// Desired state of a whole database: every collection it must contain,
/// in application order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub collections: Vec<CollectionSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: add a collection.
    pub fn with_collection(mut self, collection: CollectionSpec) -> Self {
        self.collections.push(collection);
        self
    }

    /// Number of index descriptors across all collections.
    pub fn index_count(&self) -> usize {
        self.collections.iter().map(|c| c.indexes.len()).sum()
    }

    /// Validate every descriptor without touching a store.
    ///
    /// Fails on the first problem, in declaration order, which is the
    /// same order an apply pass would hit it.
    pub fn validate(&self) -> Result<()> {
        for collection in &self.collections {
            collection.validate()?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

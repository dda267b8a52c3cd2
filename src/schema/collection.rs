//! Collection descriptors and naming rules.

use serde::{Deserialize, Serialize};

use super::index::IndexSpec;
use crate::{Error, Result};

/// Longest accepted collection name, in bytes.
pub const MAX_COLLECTION_NAME_BYTES: usize = 255;

// ============================================================================
// Collection spec
// ============================================================================

/// Desired state of one collection: its name and the indexes it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), indexes: Vec::new() }
    }

    /// Builder-style: attach an index descriptor.
    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// Validate the collection name and every index descriptor.
    pub fn validate(&self) -> Result<()> {
        validate_collection_name(&self.name)?;
        for index in &self.indexes {
            index.validate(&self.name)?;
        }
        Ok(())
    }
}

// ============================================================================
// Naming rules
// ============================================================================

/// Check a collection name against the rules shared by document stores:
/// non-empty, no NUL, no `$`, not in the reserved `system.` namespace,
/// at most [`MAX_COLLECTION_NAME_BYTES`] bytes.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let invalid = |reason: String| Error::InvalidCollectionName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty".into()));
    }
    if name.contains('\0') {
        return Err(invalid("name contains NUL".into()));
    }
    if name.contains('$') {
        return Err(invalid("name contains '$'".into()));
    }
    if name.starts_with("system.") {
        return Err(invalid("the system. namespace is reserved".into()));
    }
    if name.len() > MAX_COLLECTION_NAME_BYTES {
        return Err(invalid(format!("name exceeds {MAX_COLLECTION_NAME_BYTES} bytes")));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

//! Schema manifests on disk.
//!
//! A manifest is the JSON file handed to `provisio apply`: the target
//! database name plus the full desired schema.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Schema;
use crate::Result;

/// Top-level document of a schema manifest file.
///
/// ```json
/// {
///   "database": "rev_analyzer",
///   "collections": [
///     {
///       "name": "cached_reviews",
///       "indexes": [
///         { "fields": { "text": "full_text" } },
///         { "fields": { "created_at": "descending" } }
///       ]
///     },
///     { "name": "token_usage" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Logical database the schema applies to.
    pub database: String,
    #[serde(flatten)]
    pub schema: Schema,
}

impl Manifest {
    pub fn new(database: impl Into<String>, schema: Schema) -> Self {
        Self { database: database.into(), schema }
    }

    /// Parse a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a manifest from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Render as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

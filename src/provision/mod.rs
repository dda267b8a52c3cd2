//! # Provisioning Pass
//!
//! The write path: take descriptors, make the store match them.
//!
//! Every operation here is idempotent. Running a pass twice is the same
//! as running it once; the second run reports `Unchanged` for every step
//! and performs no writes. There is no rollback. A failed pass leaves
//! every already-ensured object in place, and a re-run converges.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info};

use crate::schema::collection::validate_collection_name;
use crate::schema::{IndexKind, IndexSpec, Schema};
use crate::store::{DbHandle, Ensured, StoreBackend};
use crate::{Error, Result};

// ============================================================================
// Report
// ============================================================================

/// What a provisioning pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Database the pass ran against.
    pub database: String,
    pub collections_created: u64,
    pub collections_unchanged: u64,
    pub indexes_created: u64,
    pub indexes_unchanged: u64,
    /// Wall-clock duration of the pass.
    pub elapsed_ms: u64,
}

impl ProvisionReport {
    /// True when the pass found everything already in place.
    pub fn is_noop(&self) -> bool {
        self.collections_created == 0 && self.indexes_created == 0
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "database '{}': {} collections ({} created, {} unchanged), {} indexes ({} created, {} unchanged) in {} ms",
            self.database,
            self.collections_created + self.collections_unchanged,
            self.collections_created,
            self.collections_unchanged,
            self.indexes_created + self.indexes_unchanged,
            self.indexes_created,
            self.indexes_unchanged,
            self.elapsed_ms,
        )
    }
}

impl fmt::Display for ProvisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

// ============================================================================
// Single-object operations
// ============================================================================

/// Ensure a collection exists.
///
/// Validates the name, then issues one create-if-absent call. Succeeds
/// whether the collection was created now or already present.
pub async fn ensure_collection<B: StoreBackend>(
    backend: &B,
    db: &DbHandle,
    name: &str,
) -> Result<Ensured> {
    validate_collection_name(name)?;
    let outcome = backend.create_collection_if_absent(db, name).await?;
    match outcome {
        Ensured::Created => debug!(db = %db, collection = name, "collection created"),
        Ensured::Unchanged => debug!(db = %db, collection = name, "collection already present"),
    }
    Ok(outcome)
}

/// Ensure an index exists on a collection.
///
/// Validates the collection name and the descriptor, then checks backend
/// capabilities, all before the create-if-absent call. A missing
/// collection is created on demand, so its name is part of what this
/// call may mutate and gets the same scrutiny as in `ensure_collection`.
pub async fn ensure_index<B: StoreBackend>(
    backend: &B,
    db: &DbHandle,
    collection: &str,
    spec: &IndexSpec,
) -> Result<Ensured> {
    validate_collection_name(collection)?;
    spec.validate(collection)?;

    let caps = backend.capabilities();
    if spec.kind() == IndexKind::FullText && !caps.supports_fulltext {
        return Err(unsupported(collection, spec, "full-text indexes"));
    }
    if spec.options.unique && !caps.supports_unique {
        return Err(unsupported(collection, spec, "unique indexes"));
    }

    let outcome = backend.create_index_if_absent(db, collection, spec).await?;
    match outcome {
        Ensured::Created => {
            debug!(db = %db, collection, index = %spec.name(), "index created");
        }
        Ensured::Unchanged => {
            debug!(db = %db, collection, index = %spec.name(), "index already present");
        }
    }
    Ok(outcome)
}

fn unsupported(collection: &str, spec: &IndexSpec, what: &str) -> Error {
    Error::Unsupported {
        collection: collection.to_string(),
        index: spec.name(),
        reason: format!("backend does not support {what}"),
    }
}

// ============================================================================
// Whole-schema pass
// ============================================================================

/// Apply a whole schema to a database, in declaration order: each
/// collection, then its indexes, before moving to the next collection.
///
/// Fail-fast: the first error aborts the pass and nothing later is
/// attempted. Everything ensured before the failing descriptor stays in
/// place. Descriptors are validated as the pass reaches them, so a bad
/// descriptor late in the schema does not block the ones before it.
pub async fn apply<B: StoreBackend>(
    backend: &B,
    db: &DbHandle,
    schema: &Schema,
) -> Result<ProvisionReport> {
    let started = Instant::now();
    backend.ping().await?;

    let mut report = ProvisionReport {
        database: db.name().to_string(),
        ..ProvisionReport::default()
    };

    for collection in &schema.collections {
        match ensure_collection(backend, db, &collection.name).await? {
            Ensured::Created => report.collections_created += 1,
            Ensured::Unchanged => report.collections_unchanged += 1,
        }
        for index in &collection.indexes {
            match ensure_index(backend, db, &collection.name, index).await? {
                Ensured::Created => report.indexes_created += 1,
                Ensured::Unchanged => report.indexes_unchanged += 1,
            }
        }
    }

    report.elapsed_ms = started.elapsed().as_millis() as u64;
    info!("{}", report.summary());
    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================

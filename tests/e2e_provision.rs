//! End-to-end integration tests for the provisioning pass.
//!
//! Each test exercises: build (or parse) a schema -> apply against
//! MemoryBackend -> assert on the final catalog through the backend's
//! introspection calls.

use provisio::{
    BackendConfig, CollectionSpec, DbHandle, Ensured, IndexKind, IndexSpec, Manifest, Provisioner,
    Schema, StoreBackend,
};

fn db() -> DbHandle {
    DbHandle::new("rev_analyzer")
}

fn review_schema() -> Schema {
    Schema::new()
        .with_collection(
            CollectionSpec::new("cached_reviews")
                .with_index(IndexSpec::fulltext("text"))
                .with_index(IndexSpec::descending("created_at")),
        )
        .with_collection(CollectionSpec::new("token_usage"))
}

// ============================================================================
// 1. The canonical scenario: two collections, two indexes on the first
// ============================================================================

#[tokio::test]
async fn test_review_schema_creates_exact_state() {
    let prov = Provisioner::open_memory();
    let report = prov.provision(&db(), &review_schema()).await.unwrap();

    assert_eq!(report.collections_created, 2);
    assert_eq!(report.indexes_created, 2);

    let store = prov.backend();
    assert_eq!(
        store.list_collections(&db()).await.unwrap(),
        vec!["cached_reviews", "token_usage"]
    );

    let indexes = store.list_indexes(&db(), "cached_reviews").await.unwrap();
    assert_eq!(indexes.len(), 2);
    // Sorted by name: created_at_-1, then text_text.
    assert_eq!(indexes[0].name, "created_at_-1");
    assert_eq!(indexes[0].kind, IndexKind::Ordered);
    assert_eq!(indexes[1].name, "text_text");
    assert_eq!(indexes[1].kind, IndexKind::FullText);

    assert!(store.list_indexes(&db(), "token_usage").await.unwrap().is_empty());
}

// ============================================================================
// 2. Re-running the same schema changes nothing
// ============================================================================

#[tokio::test]
async fn test_rerun_is_noop() {
    let prov = Provisioner::open_memory();
    prov.provision(&db(), &review_schema()).await.unwrap();

    let second = prov.provision(&db(), &review_schema()).await.unwrap();
    assert!(second.is_noop());
    assert_eq!(second.collections_unchanged, 2);
    assert_eq!(second.indexes_unchanged, 2);

    let indexes = prov.backend().list_indexes(&db(), "cached_reviews").await.unwrap();
    assert_eq!(indexes.len(), 2);
}

// ============================================================================
// 3. Fail-fast: descriptors before the bad one apply, none after it
// ============================================================================

#[tokio::test]
async fn test_fail_fast_splits_the_schema() {
    let prov = Provisioner::open_memory();
    let schema = Schema::new()
        .with_collection(CollectionSpec::new("applied_first"))
        .with_collection(
            CollectionSpec::new("applied_second").with_index(IndexSpec::descending("created_at")),
        )
        .with_collection(CollectionSpec::new("bad$name"))
        .with_collection(CollectionSpec::new("never_reached"));

    let err = prov.provision(&db(), &schema).await.unwrap_err();
    assert!(err.to_string().contains("bad$name"));

    let store = prov.backend();
    assert_eq!(
        store.list_collections(&db()).await.unwrap(),
        vec!["applied_first", "applied_second"]
    );
    assert_eq!(store.list_indexes(&db(), "applied_second").await.unwrap().len(), 1);
    assert!(!store.collection_exists(&db(), "never_reached").await.unwrap());
}

// ============================================================================
// 4. Provisioning never removes what it does not mention
// ============================================================================

#[tokio::test]
async fn test_preexisting_objects_survive() {
    let prov = Provisioner::open_memory();

    // State created outside the schema about to be applied.
    prov.ensure_collection(&db(), "audit_log").await.unwrap();
    prov.ensure_index(&db(), "audit_log", &IndexSpec::ascending("actor"))
        .await
        .unwrap();

    prov.provision(&db(), &review_schema()).await.unwrap();

    let store = prov.backend();
    assert!(store.collection_exists(&db(), "audit_log").await.unwrap());
    let indexes = store.list_indexes(&db(), "audit_log").await.unwrap();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].name, "actor_1");
}

// ============================================================================
// 5. The shipped manifest drives the same pass
// ============================================================================

#[tokio::test]
async fn test_demo_manifest_applies() {
    let manifest = Manifest::from_path("demos/rev_analyzer.json").unwrap();
    assert_eq!(manifest.database, "rev_analyzer");
    manifest.schema.validate().unwrap();

    let prov = Provisioner::open_memory();
    let target = DbHandle::new(manifest.database.clone());
    let report = prov.provision(&target, &manifest.schema).await.unwrap();

    assert_eq!(report.collections_created, 2);
    assert_eq!(report.indexes_created, 2);
    assert_eq!(report.database, "rev_analyzer");
}

// ============================================================================
// 6. A conflicting index aborts the pass with both specs in the error
// ============================================================================

#[tokio::test]
async fn test_conflict_error_names_both_specs() {
    let prov = Provisioner::open_memory();
    prov.ensure_index(&db(), "cached_reviews", &IndexSpec::descending("created_at").named("recent"))
        .await
        .unwrap();

    let schema = Schema::new().with_collection(
        CollectionSpec::new("cached_reviews")
            .with_index(IndexSpec::ascending("user_id").named("recent")),
    );

    let err = prov.provision(&db(), &schema).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("recent"));
    assert!(message.contains("created_at"));
    assert!(message.contains("user_id"));
}

// ============================================================================
// 7. Equivalent index under another name satisfies the descriptor
// ============================================================================

#[tokio::test]
async fn test_equivalent_index_satisfies_without_duplicate() {
    let prov = Provisioner::open_memory();
    prov.ensure_index(&db(), "cached_reviews", &IndexSpec::descending("created_at").named("recent"))
        .await
        .unwrap();

    let outcome = prov
        .ensure_index(&db(), "cached_reviews", &IndexSpec::descending("created_at"))
        .await
        .unwrap();
    assert_eq!(outcome, Ensured::Unchanged);

    let indexes = prov.backend().list_indexes(&db(), "cached_reviews").await.unwrap();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].name, "recent");
}

// ============================================================================
// 8. A runtime-chosen backend drives the same pass
// ============================================================================

#[tokio::test]
async fn test_provision_through_backend_config() {
    let prov = Provisioner::connect(&BackendConfig::Memory).unwrap();
    let report = prov.provision(&db(), &review_schema()).await.unwrap();

    assert_eq!(report.collections_created, 2);
    assert_eq!(report.indexes_created, 2);
    assert_eq!(
        prov.backend().list_collections(&db()).await.unwrap(),
        vec!["cached_reviews", "token_usage"]
    );
}

// ============================================================================
// 9. Two databases on one backend stay independent
// ============================================================================

#[tokio::test]
async fn test_databases_provision_independently() {
    let prov = Provisioner::open_memory();
    let staging = DbHandle::new("rev_analyzer_staging");

    prov.provision(&db(), &review_schema()).await.unwrap();
    prov.provision(&staging, &Schema::new().with_collection(CollectionSpec::new("scratch")))
        .await
        .unwrap();

    let store = prov.backend();
    assert_eq!(store.list_collections(&staging).await.unwrap(), vec!["scratch"]);
    assert!(!store.collection_exists(&staging, "cached_reviews").await.unwrap());
    assert!(!store.collection_exists(&db(), "scratch").await.unwrap());
}

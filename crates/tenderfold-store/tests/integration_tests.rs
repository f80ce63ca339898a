//! Integration tests for tenderfold-store
//!
//! These tests run the version commit cycle against an on-disk database.

use tempfile::TempDir;
use tenderfold_domain::{
    DocumentVersion, ExtractedRecord, FieldPath, ProjectId, ProjectStore, ProvenanceRecord, Value,
    VersionCommit, VersionKind,
};
use tenderfold_store::{SqliteStore, StoreError};

fn record(bid_value: &str) -> ExtractedRecord {
    let mut record = ExtractedRecord::new();
    record.set_path(
        &FieldPath::parse("projectOverview.bidValue").unwrap(),
        Value::string(bid_value),
    );
    record
}

/// A commit folded onto the project's current head in `store`
fn commit(
    store: &SqliteStore,
    project: &str,
    kind: VersionKind,
    hash: &str,
    created_at: u64,
) -> VersionCommit {
    let project = ProjectId::new(project);
    let expected_head = store
        .get_head(&project)
        .unwrap()
        .map(|head| head.version_id);
    let version = DocumentVersion::new(
        project.clone(),
        kind,
        hash,
        format!("{}.pdf", hash),
        created_at,
        record(hash),
    );
    let provenance = vec![ProvenanceRecord::new(
        project,
        version.id,
        FieldPath::parse("projectOverview.bidValue").unwrap(),
        hash,
        kind,
        format!("{}.pdf", hash),
        created_at,
    )];
    VersionCommit {
        version,
        baseline: record(hash),
        provenance,
        expected_head,
    }
}

#[test]
fn test_store_initialization() {
    let store = SqliteStore::new(":memory:");
    assert!(store.is_ok(), "Store should initialize successfully");
}

#[test]
fn test_versions_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tenderfold.db");
    let project = ProjectId::new("metro-hvac");

    {
        let store = SqliteStore::new(&path).unwrap();
        store
            .put_baseline(commit(&store, "metro-hvac", VersionKind::Base, "base", 100))
            .unwrap();
        store
            .put_baseline(commit(&store, "metro-hvac", VersionKind::Amendment, "corr1", 200))
            .unwrap();
    }

    let store = SqliteStore::new(&path).unwrap();
    let versions = store.list_versions(&project).unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].kind, VersionKind::Base);
    assert_eq!(versions[1].kind, VersionKind::Amendment);
    assert_eq!(versions[1].source_file, "corr1.pdf");
    assert_eq!(versions[0].record, record("base"));

    let baseline = store.get_baseline(&project).unwrap().unwrap();
    assert_eq!(baseline, record("corr1"));
    assert_eq!(store.provenance_count(&project).unwrap(), 2);
}

#[test]
fn test_rejected_commit_writes_nothing() {
    let store = SqliteStore::new(":memory:").unwrap();
    let project = ProjectId::new("metro-hvac");
    store
        .put_baseline(commit(&store, "metro-hvac", VersionKind::Base, "base", 100))
        .unwrap();

    let stale = store.put_baseline(commit(&store, "metro-hvac", VersionKind::Amendment, "corr1", 100));
    assert!(matches!(
        stale,
        Err(StoreError::OutOfOrder {
            created_at: 100,
            latest: 100,
            ..
        })
    ));

    let duplicate = store.put_baseline(commit(&store, "metro-hvac", VersionKind::Amendment, "base", 300));
    assert!(matches!(duplicate, Err(StoreError::Duplicate { .. })));

    assert_eq!(store.list_versions(&project).unwrap().len(), 1);
    assert_eq!(store.provenance_count(&project).unwrap(), 1);
    assert_eq!(store.get_baseline(&project).unwrap().unwrap(), record("base"));
}

#[test]
fn test_commit_on_stale_head_from_second_connection_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tenderfold.db");
    let project = ProjectId::new("metro-hvac");
    let first = SqliteStore::new(&path).unwrap();
    let second = SqliteStore::new(&path).unwrap();
    first
        .put_baseline(commit(&first, "metro-hvac", VersionKind::Base, "base", 100))
        .unwrap();

    // Both connections fold onto the base before either commits
    let from_first = commit(&first, "metro-hvac", VersionKind::Amendment, "corr1", 200);
    let from_second = commit(&second, "metro-hvac", VersionKind::Amendment, "corr2", 300);
    let winner = from_first.version.id;
    first.put_baseline(from_first).unwrap();

    let result = second.put_baseline(from_second);
    assert!(
        matches!(result, Err(StoreError::Conflict { ref found, .. }) if *found == winner.to_string()),
        "unexpected result: {:?}",
        result
    );

    let head = second.get_head(&project).unwrap().unwrap();
    assert_eq!(head.version_id, winner);
    assert_eq!(head.record, record("corr1"));
    assert_eq!(second.list_versions(&project).unwrap().len(), 2);
    assert_eq!(second.provenance_count(&project).unwrap(), 2);

    // Folding onto the new head succeeds
    second
        .put_baseline(commit(&second, "metro-hvac", VersionKind::Amendment, "corr2", 300))
        .unwrap();
    assert_eq!(first.get_baseline(&project).unwrap().unwrap(), record("corr2"));
}

#[test]
fn test_find_version_by_hash_is_per_project() {
    let store = SqliteStore::new(":memory:").unwrap();
    store
        .put_baseline(commit(&store, "alpha", VersionKind::Base, "same", 100))
        .unwrap();
    store
        .put_baseline(commit(&store, "beta", VersionKind::Base, "same", 100))
        .unwrap();

    let found = store
        .find_version_by_hash(&ProjectId::new("alpha"), "same")
        .unwrap()
        .unwrap();
    assert_eq!(found.project_id, ProjectId::new("alpha"));
    assert!(store
        .find_version_by_hash(&ProjectId::new("gamma"), "same")
        .unwrap()
        .is_none());
    assert_eq!(
        store.list_projects().unwrap(),
        vec![ProjectId::new("alpha"), ProjectId::new("beta")]
    );
}

#[test]
fn test_section_history_ordering_and_prefix() {
    let store = SqliteStore::new(":memory:").unwrap();
    let project = ProjectId::new("metro-hvac");
    store
        .put_baseline(commit(&store, "metro-hvac", VersionKind::Base, "base", 100))
        .unwrap();
    store
        .put_baseline(commit(&store, "metro-hvac", VersionKind::Amendment, "corr1", 200))
        .unwrap();

    // Keys with LIKE wildcards must not widen the match
    let wildcard = ProvenanceRecord::new(
        project.clone(),
        store.list_versions(&project).unwrap()[1].id,
        FieldPath::parse("project_verview.note").unwrap(),
        "unrelated",
        VersionKind::Amendment,
        "corr1.pdf",
        200,
    );
    store.append_provenance(&[wildcard]).unwrap();

    let history = store
        .section_history(&project, &FieldPath::parse("projectOverview").unwrap())
        .unwrap();
    let contents: Vec<&str> = history.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["base", "corr1"]);
    assert_eq!(history[1].source_kind, VersionKind::Amendment);

    let literal = store
        .section_history(&project, &FieldPath::parse("project_verview").unwrap())
        .unwrap();
    assert_eq!(literal.len(), 1);
    assert_eq!(literal[0].content, "unrelated");

    let exact = store
        .section_history(&project, &FieldPath::parse("projectOverview.bidValue").unwrap())
        .unwrap();
    assert_eq!(exact.len(), 2);

    let all = store.section_history(&project, &FieldPath::root()).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn test_append_provenance_rejects_backdated_records() {
    let store = SqliteStore::new(":memory:").unwrap();
    let project = ProjectId::new("metro-hvac");
    store
        .put_baseline(commit(&store, "metro-hvac", VersionKind::Base, "base", 100))
        .unwrap();

    let mut backdated = commit(&store, "metro-hvac", VersionKind::Base, "base", 50).provenance;
    backdated[0].section_path = FieldPath::parse("legal").unwrap();
    let result = store.append_provenance(&backdated);
    assert!(matches!(result, Err(StoreError::OutOfOrder { latest: 100, .. })));
    assert_eq!(store.provenance_count(&project).unwrap(), 1);
}

#[test]
fn test_delete_project_cascades() {
    let store = SqliteStore::new(":memory:").unwrap();
    let project = ProjectId::new("metro-hvac");
    store
        .put_baseline(commit(&store, "metro-hvac", VersionKind::Base, "base", 100))
        .unwrap();
    store
        .put_baseline(commit(&store, "metro-hvac", VersionKind::Amendment, "corr1", 200))
        .unwrap();
    store
        .put_baseline(commit(&store, "other", VersionKind::Base, "base", 100))
        .unwrap();

    assert_eq!(store.delete_project(&project).unwrap(), 2);
    assert!(store.get_baseline(&project).unwrap().is_none());
    assert!(store.list_versions(&project).unwrap().is_empty());
    assert_eq!(store.provenance_count(&project).unwrap(), 0);
    assert_eq!(store.list_projects().unwrap(), vec![ProjectId::new("other")]);

    // Deleted history does not block re-ingesting the same document
    store
        .put_baseline(commit(&store, "metro-hvac", VersionKind::Base, "base", 50))
        .unwrap();
}

#![cfg(feature = "snapshot")]

use questgate::snapshot::DeserializeError;
use questgate::{OrgId, Progress, RuleRegistry, Task, TaskCatalog, TaskRuleKind};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn populated_registry() -> (TaskCatalog, RuleRegistry) {
    let mut catalog = TaskCatalog::new();
    for id in [5_u64, 9, 12] {
        catalog.insert(Task::new(id, OrgId(1), format!("task {id}")));
    }
    catalog.insert(Task::new(7_u64, OrgId(2), "task 7"));

    let mut registry = RuleRegistry::new();
    registry
        .create_expression_rule(&catalog, OrgId(1), "combo", Some("tree"), "5 AND (9 OR 12)")
        .unwrap();
    registry
        .create_task_rule(&catalog, OrgId(1), TaskRuleKind::DoAny, "either", None, "5,9")
        .unwrap();
    registry
        .create_points_rule(OrgId(1), "hundred", None, 100)
        .unwrap();
    registry
        .create_points_rule(OrgId(2), "other org", None, 10)
        .unwrap();
    (catalog, registry)
}

// ---------------------------------------------------------------------------
// Round-trip
// ---------------------------------------------------------------------------

#[test]
fn round_trip_preserves_rules() {
    let (_, registry) = populated_registry();
    let bytes = registry.export_org(OrgId(1)).unwrap();

    let mut restored = RuleRegistry::new();
    let count = restored.import_snapshot(&bytes).unwrap();
    assert_eq!(count, 3);

    let original: Vec<_> = registry.list(OrgId(1)).into_iter().cloned().collect();
    let imported: Vec<_> = restored.list(OrgId(1)).into_iter().cloned().collect();
    assert_eq!(imported, original);
}

#[test]
fn round_trip_preserves_evaluation() {
    let (_, registry) = populated_registry();
    let bytes = registry.export_org(OrgId(1)).unwrap();

    let mut restored = RuleRegistry::new();
    restored.import_snapshot(&bytes).unwrap();

    let progress = Progress::new().complete(5_u64).complete(12_u64).with_points(100);
    for (original, imported) in registry.list(OrgId(1)).iter().zip(restored.list(OrgId(1))) {
        assert_eq!(
            original.is_fulfilled(&progress),
            imported.is_fulfilled(&progress),
            "rule {} diverged after import",
            original.id()
        );
    }
}

#[test]
fn export_is_tenant_scoped() {
    let (_, registry) = populated_registry();
    let bytes = registry.export_org(OrgId(2)).unwrap();

    let mut restored = RuleRegistry::new();
    restored.import_snapshot(&bytes).unwrap();
    assert!(restored.list(OrgId(1)).is_empty());
    assert_eq!(restored.list(OrgId(2)).len(), 1);
}

#[test]
fn new_ids_continue_after_imported_ones() {
    let (_, registry) = populated_registry();
    let bytes = registry.export_org(OrgId(1)).unwrap();

    let mut restored = RuleRegistry::new();
    restored.import_snapshot(&bytes).unwrap();
    let max_imported = restored
        .list(OrgId(1))
        .iter()
        .map(|r| r.id())
        .max()
        .unwrap();

    let fresh = restored
        .create_points_rule(OrgId(1), "new", None, 5)
        .unwrap()
        .id();
    assert!(fresh > max_imported);
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

#[test]
fn import_rejects_colliding_ids() {
    let (_, mut registry) = populated_registry();
    let bytes = registry.export_org(OrgId(1)).unwrap();

    let before = registry.list(OrgId(1)).len();
    let err = registry.import_snapshot(&bytes).unwrap_err();
    assert!(matches!(err, DeserializeError::Validation(_)));
    // Nothing was inserted by the failed import.
    assert_eq!(registry.list(OrgId(1)).len(), before);
}

#[test]
fn import_rejects_tampered_bytes() {
    let (_, registry) = populated_registry();
    let mut bytes = registry.export_org(OrgId(1)).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;

    let mut restored = RuleRegistry::new();
    assert!(matches!(
        restored.import_snapshot(&bytes),
        Err(DeserializeError::ChecksumMismatch)
    ));
}

#[test]
fn import_rejects_bad_magic() {
    let (_, registry) = populated_registry();
    let mut bytes = registry.export_org(OrgId(1)).unwrap();
    bytes[0..4].copy_from_slice(b"BAAD");

    let mut restored = RuleRegistry::new();
    assert!(matches!(
        restored.import_snapshot(&bytes),
        Err(DeserializeError::BadMagic)
    ));
}

#[test]
fn import_rejects_truncated_input() {
    let (_, registry) = populated_registry();
    let bytes = registry.export_org(OrgId(1)).unwrap();

    let mut restored = RuleRegistry::new();
    assert!(matches!(
        restored.import_snapshot(&bytes[..16]),
        Err(DeserializeError::LengthMismatch { .. })
    ));
}

#[test]
fn import_rejects_future_format_version() {
    let (_, registry) = populated_registry();
    let mut bytes = registry.export_org(OrgId(1)).unwrap();
    bytes[4..6].copy_from_slice(&7_u16.to_le_bytes());

    let mut restored = RuleRegistry::new();
    assert!(matches!(
        restored.import_snapshot(&bytes),
        Err(DeserializeError::IncompatibleVersion { blob: 7, .. })
    ));
}

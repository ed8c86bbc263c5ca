use questgate::{
    OrgId, Progress, QuestgateError, RuleError, RuleRegistry, Task, TaskCatalog, TaskRuleKind,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fixtures() -> (TaskCatalog, RuleRegistry) {
    let mut catalog = TaskCatalog::new();
    catalog.insert(Task::new(5_u64, OrgId(1), "task 5"));
    (catalog, RuleRegistry::new())
}

// ---------------------------------------------------------------------------
// The closed mutable set: name, description, points
// ---------------------------------------------------------------------------

#[test]
fn name_and_description_are_mutable() {
    let (_, mut registry) = fixtures();
    let id = registry
        .create_points_rule(OrgId(1), "old name", Some("old description"), 10)
        .unwrap()
        .id();

    registry
        .update_attribute(OrgId(1), id, "name", "new name")
        .unwrap();
    registry
        .update_attribute(OrgId(1), id, "description", "new description")
        .unwrap();

    let rule = registry.get(OrgId(1), id).unwrap();
    assert_eq!(rule.name(), "new name");
    assert_eq!(rule.description(), Some("new description"));
}

#[test]
fn null_clears_description() {
    let (_, mut registry) = fixtures();
    let id = registry
        .create_points_rule(OrgId(1), "r", Some("to be removed"), 10)
        .unwrap()
        .id();

    registry
        .update_attribute(OrgId(1), id, "description", "null")
        .unwrap();
    // Verified by a subsequent read, not just the update's return value.
    assert_eq!(registry.get(OrgId(1), id).unwrap().description(), None);
}

#[test]
fn null_name_is_rejected() {
    let (_, mut registry) = fixtures();
    let id = registry
        .create_points_rule(OrgId(1), "keep me", None, 10)
        .unwrap()
        .id();

    assert!(matches!(
        registry.update_attribute(OrgId(1), id, "name", "null"),
        Err(QuestgateError::Rule(RuleError::InvalidArgument { .. }))
    ));
    assert_eq!(registry.get(OrgId(1), id).unwrap().name(), "keep me");
}

#[test]
fn points_update_changes_the_threshold() {
    let (_, mut registry) = fixtures();
    let id = registry
        .create_points_rule(OrgId(1), "r", None, 10)
        .unwrap()
        .id();

    registry
        .update_attribute(OrgId(1), id, "points", "42")
        .unwrap();
    let rule = registry.get(OrgId(1), id).unwrap();
    assert!(rule.is_fulfilled(&Progress::new().with_points(42)));
    assert!(!rule.is_fulfilled(&Progress::new().with_points(41)));
}

#[test]
fn points_update_validates_the_value() {
    let (_, mut registry) = fixtures();
    let id = registry
        .create_points_rule(OrgId(1), "r", None, 10)
        .unwrap()
        .id();

    for bad in ["0", "-10", "lots", "null"] {
        assert!(
            matches!(
                registry.update_attribute(OrgId(1), id, "points", bad),
                Err(QuestgateError::Rule(RuleError::InvalidArgument { .. }))
            ),
            "expected rejection for {bad:?}"
        );
    }
    // Threshold unchanged after every failed update.
    let rule = registry.get(OrgId(1), id).unwrap();
    assert!(rule.is_fulfilled(&Progress::new().with_points(10)));
}

#[test]
fn points_update_on_a_task_rule_is_rejected() {
    let (catalog, mut registry) = fixtures();
    let id = registry
        .create_task_rule(&catalog, OrgId(1), TaskRuleKind::DoAll, "r", None, "5")
        .unwrap()
        .id();

    assert!(matches!(
        registry.update_attribute(OrgId(1), id, "points", "42"),
        Err(QuestgateError::Rule(RuleError::InvalidArgument { .. }))
    ));
}

// ---------------------------------------------------------------------------
// Everything else is a no-op, not an error
// ---------------------------------------------------------------------------

#[test]
fn unknown_attribute_returns_the_rule_unchanged() {
    let (_, mut registry) = fixtures();
    let id = registry
        .create_points_rule(OrgId(1), "r", Some("desc"), 10)
        .unwrap()
        .id();

    let before = registry.get(OrgId(1), id).unwrap().clone();
    for attr in ["id", "belongsTo", "expression", "tasks", "color"] {
        let after = registry
            .update_attribute(OrgId(1), id, attr, "whatever")
            .unwrap();
        assert_eq!(*after, before, "attribute {attr:?} should be ignored");
    }
}

// ---------------------------------------------------------------------------
// Scope and lifecycle
// ---------------------------------------------------------------------------

#[test]
fn updates_are_tenant_scoped() {
    let (_, mut registry) = fixtures();
    let id = registry
        .create_points_rule(OrgId(1), "r", None, 10)
        .unwrap()
        .id();

    assert!(matches!(
        registry.update_attribute(OrgId(2), id, "name", "hijacked"),
        Err(QuestgateError::Rule(RuleError::NotFound { .. }))
    ));
    assert_eq!(registry.get(OrgId(1), id).unwrap().name(), "r");
}

#[test]
fn delete_removes_the_rule_for_its_org_only() {
    let (_, mut registry) = fixtures();
    let id = registry
        .create_points_rule(OrgId(1), "r", None, 10)
        .unwrap()
        .id();

    assert!(matches!(
        registry.delete(OrgId(2), id),
        Err(QuestgateError::Rule(RuleError::NotFound { .. }))
    ));
    let removed = registry.delete(OrgId(1), id).unwrap();
    assert_eq!(removed.name(), "r");
    assert!(matches!(
        registry.get(OrgId(1), id),
        Err(QuestgateError::Rule(RuleError::NotFound { .. }))
    ));
}

#[test]
fn update_after_delete_is_not_found() {
    let (_, mut registry) = fixtures();
    let id = registry
        .create_points_rule(OrgId(1), "r", None, 10)
        .unwrap()
        .id();
    registry.delete(OrgId(1), id).unwrap();

    assert!(matches!(
        registry.update_attribute(OrgId(1), id, "name", "ghost"),
        Err(QuestgateError::Rule(RuleError::NotFound { .. }))
    ));
}

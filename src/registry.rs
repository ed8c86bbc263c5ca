use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::catalog::TaskCatalog;
use crate::error::QuestgateError;
use crate::types::{
    GoalRule, OrgId, RuleError, RuleId, RuleKind, Task, TaskCondition, TaskRuleKind,
};
use crate::validate;

/// Tenant-scoped rule store plus the construction service that fills it.
///
/// Construction is all-or-nothing: every validation step runs before a rule
/// is stored, so a failure never leaves a partial rule or a half-bound tree
/// behind. Stored rules are structurally immutable; only name, description,
/// and a points rule's threshold can change afterwards.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<RuleId, GoalRule>,
    next_id: u64,
}

impl RuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an expression-built task rule.
    ///
    /// Parses the expression, collects the referenced task ids, resolves
    /// every id within `org`, binds the tree, and stores the rule. Any
    /// unresolved id rejects the whole creation with
    /// [`RuleError::UnknownTasks`] listing exactly the offending ids.
    ///
    /// # Errors
    ///
    /// [`ParseError`](crate::ParseError) for malformed expressions,
    /// [`RuleError::UnknownTasks`] for ids that do not resolve in `org`.
    pub fn create_expression_rule(
        &mut self,
        catalog: &TaskCatalog,
        org: OrgId,
        name: &str,
        description: Option<&str>,
        expression: &str,
    ) -> Result<&GoalRule, QuestgateError> {
        let tree = crate::parse::parse(expression)?;
        let ids = tree.task_ids();
        let (resolved, missing) = catalog.resolve(org, &ids);
        if !missing.is_empty() {
            warn!(%org, ?missing, "rejecting expression rule: unresolved task ids");
            return Err(RuleError::UnknownTasks { ids: missing }.into());
        }
        let bound = tree.bind(&resolved)?;

        let rule = GoalRule::new(
            self.allocate_id(),
            org,
            name,
            description,
            RuleKind::AllTasks(TaskCondition::Tree(bound)),
        );
        debug!(%org, rule = %rule.id(), "created expression rule");
        Ok(self.store(rule))
    }

    /// Create a list-built task rule from a comma-separated id list.
    ///
    /// Every token must parse as a positive integer. Ids that do not
    /// resolve within `org` are dropped from the task set; the resolved
    /// tasks keep the list's occurrence order.
    ///
    /// # Errors
    ///
    /// [`RuleError::InvalidArgument`] for a malformed id list.
    pub fn create_task_rule(
        &mut self,
        catalog: &TaskCatalog,
        org: OrgId,
        kind: TaskRuleKind,
        name: &str,
        description: Option<&str>,
        task_ids: &str,
    ) -> Result<&GoalRule, QuestgateError> {
        let ids = validate::id_list(task_ids)?;
        let (resolved, missing) = catalog.resolve(org, &ids);
        if !missing.is_empty() {
            warn!(%org, ?missing, "dropping unresolved task ids from list rule");
        }
        let tasks: Vec<Task> = ids
            .iter()
            .filter_map(|id| resolved.get(id))
            .cloned()
            .collect();

        let condition = TaskCondition::Set(tasks);
        let kind = match kind {
            TaskRuleKind::DoAll => RuleKind::AllTasks(condition),
            TaskRuleKind::DoAny => RuleKind::AnyTask(condition),
        };
        let rule = GoalRule::new(self.allocate_id(), org, name, description, kind);
        debug!(%org, rule = %rule.id(), "created task rule");
        Ok(self.store(rule))
    }

    /// Create a points rule with the given threshold.
    ///
    /// # Errors
    ///
    /// [`RuleError::InvalidArgument`] if `points` is zero.
    pub fn create_points_rule(
        &mut self,
        org: OrgId,
        name: &str,
        description: Option<&str>,
        points: u64,
    ) -> Result<&GoalRule, QuestgateError> {
        if points == 0 {
            return Err(RuleError::InvalidArgument {
                reason: "points threshold must be at least 1".into(),
            }
            .into());
        }
        let rule = GoalRule::new(self.allocate_id(), org, name, description, RuleKind::Points(points));
        debug!(%org, rule = %rule.id(), points, "created points rule");
        Ok(self.store(rule))
    }

    /// All rules belonging to `org`, in id order.
    #[must_use]
    pub fn list(&self, org: OrgId) -> Vec<&GoalRule> {
        self.rules.values().filter(|r| r.org() == org).collect()
    }

    /// Look up one rule within `org`.
    ///
    /// # Errors
    ///
    /// [`RuleError::NotFound`] if the id does not exist in `org`; a rule
    /// belonging to another organisation is indistinguishable from one that
    /// does not exist.
    pub fn get(&self, org: OrgId, id: RuleId) -> Result<&GoalRule, QuestgateError> {
        self.rules
            .get(&id)
            .filter(|r| r.org() == org)
            .ok_or_else(|| RuleError::NotFound { org, id }.into())
    }

    /// Remove a rule from `org`, returning it.
    ///
    /// # Errors
    ///
    /// [`RuleError::NotFound`] if the id does not exist in `org`.
    pub fn delete(&mut self, org: OrgId, id: RuleId) -> Result<GoalRule, QuestgateError> {
        match self.rules.remove(&id) {
            Some(rule) if rule.org() == org => {
                debug!(%org, rule = %id, "deleted rule");
                Ok(rule)
            }
            Some(rule) => {
                // Wrong tenant: restore and report as missing.
                self.rules.insert(id, rule);
                Err(RuleError::NotFound { org, id }.into())
            }
            None => Err(RuleError::NotFound { org, id }.into()),
        }
    }

    /// Change one scalar attribute of a rule.
    ///
    /// The mutable set is closed: `name`, `description`, and — for points
    /// rules only — `points`. The literal value `"null"` clears the
    /// attribute where absence is allowed (description). Unknown attribute
    /// names are ignored and the rule is returned unchanged; the id, the
    /// owning organisation, and the rule's structure are never mutable.
    ///
    /// # Errors
    ///
    /// [`RuleError::NotFound`] if the id does not exist in `org`;
    /// [`RuleError::InvalidArgument`] for a cleared name, a non-positive
    /// points value, or `points` on a rule that is not a points rule.
    pub fn update_attribute(
        &mut self,
        org: OrgId,
        id: RuleId,
        attribute: &str,
        value: &str,
    ) -> Result<&GoalRule, QuestgateError> {
        let rule = self
            .rules
            .get_mut(&id)
            .filter(|r| r.org() == org)
            .ok_or(RuleError::NotFound { org, id })?;

        let value = if value == "null" { None } else { Some(value) };
        debug!(%org, rule = %id, attribute, "updating rule attribute");
        match attribute {
            "name" => match value {
                Some(v) => rule.set_name(v),
                None => {
                    return Err(RuleError::InvalidArgument {
                        reason: "name cannot be cleared".into(),
                    }
                    .into())
                }
            },
            "description" => rule.set_description(value),
            "points" => {
                let raw = value.ok_or(RuleError::InvalidArgument {
                    reason: "points cannot be cleared".into(),
                })?;
                let points = validate::positive_int(raw)?;
                rule.set_points(points)?;
            }
            other => {
                debug!(%org, rule = %id, attribute = other, "ignoring unknown attribute");
            }
        }
        Ok(rule)
    }

    fn allocate_id(&mut self) -> RuleId {
        self.next_id += 1;
        RuleId(self.next_id)
    }

    fn store(&mut self, rule: GoalRule) -> &GoalRule {
        match self.rules.entry(rule.id()) {
            Entry::Vacant(slot) => slot.insert(rule),
            Entry::Occupied(mut slot) => {
                slot.insert(rule);
                slot.into_mut()
            }
        }
    }
}

#[cfg(feature = "snapshot")]
impl RuleRegistry {
    /// Serialize every rule belonging to `org` into the binary snapshot
    /// format.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::snapshot::SerializeError) if
    /// encoding fails.
    pub fn export_org(&self, org: OrgId) -> Result<Vec<u8>, crate::snapshot::SerializeError> {
        crate::snapshot::encode(org, &self.list(org))
    }

    /// Import rules from a snapshot previously produced by
    /// [`export_org`](Self::export_org), returning how many were added.
    ///
    /// All-or-nothing: a validation failure (including an id already
    /// present in this registry) inserts nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::snapshot::DeserializeError) on
    /// format, integrity, or validation failure.
    pub fn import_snapshot(
        &mut self,
        bytes: &[u8],
    ) -> Result<usize, crate::snapshot::DeserializeError> {
        let rules = crate::snapshot::decode(bytes)?;
        for rule in &rules {
            if self.rules.contains_key(&rule.id()) {
                return Err(crate::snapshot::DeserializeError::Validation(format!(
                    "rule id {} already present in registry",
                    rule.id()
                )));
            }
        }
        let count = rules.len();
        for rule in rules {
            self.next_id = self.next_id.max(rule.id().0);
            self.rules.insert(rule.id(), rule);
        }
        Ok(count)
    }
}

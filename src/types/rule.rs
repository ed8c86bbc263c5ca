use std::fmt;
use std::str::FromStr;

use super::bound::BoundExpr;
use super::error::RuleError;
use super::progress::Progress;
use super::task::{OrgId, Task};

/// Identifies a goal rule within its organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u64);

impl From<u64> for RuleId {
    fn from(v: u64) -> Self {
        RuleId(v)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a task rule holds: either a flat task set (list-built) or a bound
/// expression tree (expression-built). The two construction paths are
/// mutually exclusive and the shape never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCondition {
    Set(Vec<Task>),
    Tree(BoundExpr),
}

/// The rule variants and their kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Fulfilled when every referenced task is complete (flat set) or when
    /// the bound tree evaluates true (expression-built).
    AllTasks(TaskCondition),
    /// Fulfilled when at least one referenced task is complete. For a bound
    /// tree this evaluates identically to [`RuleKind::AllTasks`]: the tree
    /// already encodes its AND/OR structure, so the flat-set distinction
    /// only matters for list-built rules.
    AnyTask(TaskCondition),
    /// Fulfilled when the accumulated point total reaches the threshold.
    Points(u64),
}

/// Which task-rule variant a list-built rule should get.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRuleKind {
    DoAll,
    DoAny,
}

impl FromStr for TaskRuleKind {
    type Err = RuleError;

    /// Accepts the wire names `"DoAllTasksRule"` and `"DoAnyTasksRule"`.
    /// Anything else is rejected rather than silently defaulting.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DoAllTasksRule" => Ok(TaskRuleKind::DoAll),
            "DoAnyTasksRule" => Ok(TaskRuleKind::DoAny),
            other => Err(RuleError::InvalidArgument {
                reason: format!("unrecognized task rule type '{other}'"),
            }),
        }
    }
}

/// A goal rule: a tenant-scoped condition whose fulfillment marks a goal
/// complete for a player or group.
///
/// The structural shape (kind, task set or tree) is fixed at creation; only
/// the name, the description, and a points rule's threshold may change
/// afterwards. A rule belongs to exactly one organisation and is never
/// visible outside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalRule {
    id: RuleId,
    org: OrgId,
    name: String,
    description: Option<String>,
    kind: RuleKind,
}

impl GoalRule {
    pub(crate) fn new(
        id: RuleId,
        org: OrgId,
        name: &str,
        description: Option<&str>,
        kind: RuleKind,
    ) -> Self {
        Self {
            id,
            org,
            name: name.to_owned(),
            description: description.map(str::to_owned),
            kind,
        }
    }

    #[must_use]
    pub fn id(&self) -> RuleId {
        self.id
    }

    #[must_use]
    pub fn org(&self) -> OrgId {
        self.org
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    pub(crate) fn set_description(&mut self, description: Option<&str>) {
        self.description = description.map(str::to_owned);
    }

    /// Replace a points rule's threshold. The threshold must be >= 1 and
    /// the rule must actually be a points rule.
    pub(crate) fn set_points(&mut self, points: u64) -> Result<(), RuleError> {
        match &mut self.kind {
            RuleKind::Points(threshold) => {
                *threshold = points;
                Ok(())
            }
            _ => Err(RuleError::InvalidArgument {
                reason: format!("rule {} is not a points rule", self.id),
            }),
        }
    }

    /// Whether this rule holds for the given progress snapshot. Pure; safe
    /// to call concurrently from many evaluators.
    #[must_use]
    pub fn is_fulfilled(&self, progress: &Progress) -> bool {
        match &self.kind {
            RuleKind::AllTasks(TaskCondition::Set(tasks)) => {
                tasks.iter().all(|t| progress.is_complete(t.id))
            }
            RuleKind::AnyTask(TaskCondition::Set(tasks)) => {
                tasks.iter().any(|t| progress.is_complete(t.id))
            }
            RuleKind::AllTasks(TaskCondition::Tree(tree))
            | RuleKind::AnyTask(TaskCondition::Tree(tree)) => tree.is_met(progress),
            RuleKind::Points(threshold) => progress.points() >= *threshold,
        }
    }
}

impl fmt::Display for GoalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            RuleKind::AllTasks(_) => "all-tasks",
            RuleKind::AnyTask(_) => "any-task",
            RuleKind::Points(_) => "points",
        };
        write!(f, "rule {} '{}' ({kind}, org {})", self.id, self.name, self.org)
    }
}

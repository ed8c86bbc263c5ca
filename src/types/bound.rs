use std::collections::HashMap;
use std::fmt;

use super::error::RuleError;
use super::expr::ExprNode;
use super::progress::Progress;
use super::task::{Task, TaskId};

/// Expression tree whose leaves carry resolved [`Task`] entities.
///
/// Built from an [`ExprNode`] in a single pass once every referenced id has
/// been validated against the owning organisation, so a tree is either fully
/// unbound ([`ExprNode`]) or fully bound — there is no observable
/// half-bound state. Once built it is read-only; evaluation takes `&self`
/// and may run concurrently from many callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundExpr {
    And(Box<BoundExpr>, Box<BoundExpr>),
    Or(Box<BoundExpr>, Box<BoundExpr>),
    Task(Task),
}

impl ExprNode {
    /// Construct the bound counterpart of this tree from a map of resolved
    /// tasks.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UnknownTasks`] listing every leaf id missing
    /// from `tasks`. On the rule-construction path this cannot happen: the
    /// service resolves and checks the full id set before binding.
    pub fn bind(&self, tasks: &HashMap<TaskId, Task>) -> Result<BoundExpr, RuleError> {
        match self {
            ExprNode::And(a, b) => Ok(BoundExpr::And(
                Box::new(a.bind(tasks)?),
                Box::new(b.bind(tasks)?),
            )),
            ExprNode::Or(a, b) => Ok(BoundExpr::Or(
                Box::new(a.bind(tasks)?),
                Box::new(b.bind(tasks)?),
            )),
            ExprNode::Task(id) => match tasks.get(id) {
                Some(task) => Ok(BoundExpr::Task(task.clone())),
                None => Err(RuleError::UnknownTasks { ids: vec![*id] }),
            },
        }
    }
}

impl BoundExpr {
    /// Whether this tree holds for the given progress snapshot. AND and OR
    /// combinators map to boolean and/or over each leaf's "is this task
    /// complete" check. Pure; never mutates the tree.
    #[must_use]
    pub fn is_met(&self, progress: &Progress) -> bool {
        match self {
            BoundExpr::And(a, b) => a.is_met(progress) && b.is_met(progress),
            BoundExpr::Or(a, b) => a.is_met(progress) || b.is_met(progress),
            BoundExpr::Task(task) => progress.is_complete(task.id),
        }
    }

    /// The tasks bound at the leaves, depth-first left-to-right, duplicates
    /// preserved.
    #[must_use]
    pub fn tasks(&self) -> Vec<&Task> {
        let mut out = Vec::new();
        self.collect_tasks(&mut out);
        out
    }

    fn collect_tasks<'a>(&'a self, out: &mut Vec<&'a Task>) {
        match self {
            BoundExpr::Task(task) => out.push(task),
            BoundExpr::And(a, b) | BoundExpr::Or(a, b) => {
                a.collect_tasks(out);
                b.collect_tasks(out);
            }
        }
    }
}

impl fmt::Display for BoundExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundExpr::And(a, b) => write!(f, "({a} AND {b})"),
            BoundExpr::Or(a, b) => write!(f, "({a} OR {b})"),
            BoundExpr::Task(task) => write!(f, "{}", task.id),
        }
    }
}

use std::fmt;

use super::task::TaskId;

/// Unbound expression AST as produced by the parser. Leaves hold raw task
/// ids; no existence check has happened yet and no task entity is attached.
///
/// Transformed into a [`BoundExpr`](super::BoundExpr) once every referenced
/// id has been resolved within the owning organisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprNode {
    And(Box<ExprNode>, Box<ExprNode>),
    Or(Box<ExprNode>, Box<ExprNode>),
    Task(TaskId),
}

impl ExprNode {
    #[must_use]
    pub fn and(self, other: ExprNode) -> ExprNode {
        ExprNode::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: ExprNode) -> ExprNode {
        ExprNode::Or(Box::new(self), Box::new(other))
    }

    /// Every task id referenced by this tree, depth-first left-to-right,
    /// duplicates preserved. A task referenced twice contributes twice.
    #[must_use]
    pub fn task_ids(&self) -> Vec<TaskId> {
        let mut ids = Vec::new();
        self.collect_task_ids(&mut ids);
        ids
    }

    fn collect_task_ids(&self, out: &mut Vec<TaskId>) {
        match self {
            ExprNode::Task(id) => out.push(*id),
            ExprNode::And(a, b) | ExprNode::Or(a, b) => {
                a.collect_task_ids(out);
                b.collect_task_ids(out);
            }
        }
    }
}

/// Leaf constructor for building expression trees in code.
#[must_use]
pub fn task(id: impl Into<TaskId>) -> ExprNode {
    ExprNode::Task(id.into())
}

impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprNode::And(a, b) => write!(f, "({a} AND {b})"),
            ExprNode::Or(a, b) => write!(f, "({a} OR {b})"),
            ExprNode::Task(id) => write!(f, "{id}"),
        }
    }
}

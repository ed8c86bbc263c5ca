mod catalog;
mod error;
mod parse;
mod registry;
#[cfg(feature = "snapshot")]
pub mod snapshot;
mod types;
mod validate;

pub use catalog::TaskCatalog;
pub use error::QuestgateError;
pub use parse::{ParseError, parse};
pub use registry::RuleRegistry;
pub use types::{
    BoundExpr, ExprNode, GoalRule, OrgId, Progress, RuleError, RuleId, RuleKind, Task,
    TaskCondition, TaskId, TaskRuleKind, task,
};

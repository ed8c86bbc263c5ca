use thiserror::Error;

use super::rule::RuleId;
use super::task::{OrgId, TaskId};

/// Validation failures raised while constructing, looking up, or updating
/// goal rules. All of these are synchronous rejections of caller input;
/// none are transient, and nothing is stored when one is returned.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("unknown task ids: {}", ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    UnknownTasks { ids: Vec<TaskId> },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("rule {id} not found in organisation {org}")]
    NotFound { org: OrgId, id: RuleId },
}

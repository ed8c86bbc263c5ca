use thiserror::Error;

use crate::parse::ParseError;
use crate::types::RuleError;

/// Unified error type covering expression parsing and rule validation.
///
/// Returned by the [`RuleRegistry`](crate::RuleRegistry) service methods,
/// which mix both failure layers.
#[derive(Debug, Error)]
pub enum QuestgateError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

mod error;
mod grammar;

pub use error::ParseError;

use crate::types::ExprNode;

/// Parse a task expression string into an unbound [`ExprNode`] tree.
///
/// The grammar: positive-integer task ids as leaves, `AND`/`OR` combinators
/// (upper- or lower-case), parentheses for grouping, insignificant
/// whitespace. AND binds tighter than OR; both are left-associative. No
/// task-existence check happens here; the parser only produces structure.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is empty or not valid syntax.
pub fn parse(input: &str) -> Result<ExprNode, ParseError> {
    use winnow::Parser;

    if input.trim().is_empty() {
        return Err(ParseError::new("empty expression"));
    }
    grammar::expression
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}

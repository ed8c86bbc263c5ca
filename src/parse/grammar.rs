use winnow::ascii::dec_uint;
use winnow::combinator::{alt, cut_err, delimited, preceded, repeat};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::types::{ExprNode, TaskId};

// -- Whitespace -------------------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

// -- Leaves -----------------------------------------------------------------

/// Task identifiers are positive decimal integers; zero is rejected here
/// rather than at validation time since the grammar only admits positive ids.
fn task_id(input: &mut &str) -> ModalResult<TaskId> {
    dec_uint::<_, u64, _>
        .verify(|n: &u64| *n > 0)
        .map(TaskId)
        .context(StrContext::Expected(StrContextValue::Description(
            "task id",
        )))
        .parse_next(input)
}

// -- Expressions (precedence: OR < AND < primary) ---------------------------

fn primary(input: &mut &str) -> ModalResult<ExprNode> {
    ws.parse_next(input)?;
    alt((
        delimited('(', or_expr, (ws, ')')),
        task_id.map(ExprNode::Task),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "task id or group",
    )))
    .parse_next(input)
}

fn and_expr(input: &mut &str) -> ModalResult<ExprNode> {
    let first = primary(input)?;
    let rest: Vec<ExprNode> =
        repeat(0.., preceded((ws, alt(("AND", "and"))), cut_err(primary))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| ExprNode::And(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut &str) -> ModalResult<ExprNode> {
    let first = and_expr(input)?;
    let rest: Vec<ExprNode> =
        repeat(0.., preceded((ws, alt(("OR", "or"))), cut_err(and_expr))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| ExprNode::Or(Box::new(acc), Box::new(r))))
}

// -- Top-level parser -------------------------------------------------------

pub fn expression(input: &mut &str) -> ModalResult<ExprNode> {
    let expr = or_expr(input)?;
    ws.parse_next(input)?;
    Ok(expr)
}

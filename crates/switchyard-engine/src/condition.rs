//! Comparison semantics for conditional edges.
//!
//! `eq`/`ne` are total over every value shape, including an absent state key
//! (which normalizes to JSON `null`). The ordering operators require both
//! sides to be mutually comparable: two numbers or two strings. Anything else
//! fails the run with `UnsupportedComparison`.

use std::cmp::Ordering;

use serde_json::Value;
use switchyard_types::{CompareOp, Result, SwitchyardError};

/// Evaluate `actual <op> expected`. `None` on either side stands for a
/// missing value and compares as `null`.
pub fn compare(actual: Option<&Value>, op: CompareOp, expected: Option<&Value>) -> Result<bool> {
    let a = actual.unwrap_or(&Value::Null);
    let b = expected.unwrap_or(&Value::Null);

    match op {
        CompareOp::Eq => Ok(values_equal(a, b)),
        CompareOp::Ne => Ok(!values_equal(a, b)),
        CompareOp::Lt => Ok(ordering(a, op, b)? == Ordering::Less),
        CompareOp::Gt => Ok(ordering(a, op, b)? == Ordering::Greater),
        CompareOp::Lte => Ok(ordering(a, op, b)? != Ordering::Greater),
        CompareOp::Gte => Ok(ordering(a, op, b)? != Ordering::Less),
    }
}

/// Value equality with numbers compared numerically, so an integer `3` in
/// the state matches a float `3.0` on the edge (and vice versa), consistent
/// with the ordering operators below.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        _ => a == b,
    }
}

fn ordering(a: &Value, op: CompareOp, b: &Value) -> Result<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64(), y.as_f64());
            match x.zip(y).and_then(|(x, y)| x.partial_cmp(&y)) {
                Some(ord) => Ok(ord),
                None => Err(incomparable(a, op, b)),
            }
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(incomparable(a, op, b)),
    }
}

fn incomparable(a: &Value, op: CompareOp, b: &Value) -> SwitchyardError {
    SwitchyardError::UnsupportedComparison {
        operator: op.to_string(),
        left: a.to_string(),
        right: b.to_string(),
    }
}

//! Predicate → atomic lock breakdown.

use qadmit_core::expr::{BinOp, ColumnRef, Expr};
use qadmit_core::types::Scalar;

use crate::atomic::{AtomicLock, Constraint, Endpoint, ValueRange};

/// Break a (possibly compound) predicate into the atomic read locks it needs.
///
/// Conjunctions and disjunctions contribute the union of their children.
/// Anything whose value set cannot be expressed as one point or interval on a
/// single column (`!=`, `NOT`, `IS NULL`, column-to-column comparisons,
/// arithmetic) locks every column it mentions with [`Constraint::Any`].
/// The result contains no duplicates.
pub fn decompose(expr: &Expr) -> Vec<AtomicLock> {
    let mut out = Vec::new();
    collect(expr, &mut out);
    out
}

fn collect(expr: &Expr, out: &mut Vec<AtomicLock>) {
    match expr {
        Expr::BinaryOp {
            op: BinOp::And | BinOp::Or,
            left,
            right,
        } => {
            collect(left, out);
            collect(right, out);
        }
        Expr::BinaryOp { op, left, right } if op.is_comparison() => {
            match (left.as_ref(), right.as_ref()) {
                (Expr::Column(c), Expr::Literal(v)) => push(out, *c, comparison(*op, v)),
                (Expr::Literal(v), Expr::Column(c)) => push(out, *c, comparison(op.flip(), v)),
                _ => lock_all_columns(expr, out),
            }
        }
        Expr::Between { expr: inner, low, high } => {
            match (inner.as_ref(), low.as_ref(), high.as_ref()) {
                (Expr::Column(c), Expr::Literal(l), Expr::Literal(h)) => {
                    let constraint = ValueRange::closed(l.clone(), h.clone())
                        .map(Constraint::Range)
                        .unwrap_or(Constraint::Any);
                    push(out, *c, constraint);
                }
                _ => lock_all_columns(expr, out),
            }
        }
        Expr::Literal(_) => {}
        _ => lock_all_columns(expr, out),
    }
}

fn comparison(op: BinOp, value: &Scalar) -> Constraint {
    let v = value.clone();
    let range = match op {
        BinOp::Eq => return Constraint::Equals(v),
        BinOp::Lt => ValueRange::new(Endpoint::Unbounded, Endpoint::Excluded(v)),
        BinOp::Le => ValueRange::new(Endpoint::Unbounded, Endpoint::Included(v)),
        BinOp::Gt => ValueRange::new(Endpoint::Excluded(v), Endpoint::Unbounded),
        BinOp::Ge => ValueRange::new(Endpoint::Included(v), Endpoint::Unbounded),
        _ => return Constraint::Any,
    };
    range.map(Constraint::Range).unwrap_or(Constraint::Any)
}

fn lock_all_columns(expr: &Expr, out: &mut Vec<AtomicLock>) {
    for c in expr.columns() {
        push(out, c, Constraint::Any);
    }
}

fn push(out: &mut Vec<AtomicLock>, column: ColumnRef, constraint: Constraint) {
    let lock = AtomicLock::new(column, constraint);
    if !out.contains(&lock) {
        out.push(lock);
    }
}

//! Lightweight scalar values used in predicate literals.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "NULL"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::I32(v) => write!(f, "{v}"),
            Scalar::I64(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
            Scalar::Str(s) => write!(f, "'{s}'"),
            Scalar::Bin(b) => write!(f, "0x{}", b.iter().map(|x| format!("{x:02x}")).collect::<String>()),
        }
    }
}

/// Compare two scalars for equality, widening numerics across types.
pub fn scalar_eq(a: &Scalar, b: &Scalar) -> bool {
    use Scalar::*;
    match (a, b) {
        (Null, Null) => true,
        (Null, _) | (_, Null) => false,
        (Bool(x), Bool(y)) => x == y,
        (Str(x), Str(y)) => x == y,
        (Bin(x), Bin(y)) => x == y,
        (I32(_) | I64(_), I32(_) | I64(_)) => as_i64(a) == as_i64(b),
        (I32(_) | I64(_), F32(_) | F64(_)) | (F32(_) | F64(_), I32(_) | I64(_)) => {
            mixed_cmp(a, b) == Some(Ordering::Equal)
        }
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
            _ => false,
        },
    }
}

/// Total order over scalars.
///
/// Numerics compare by value across widths; otherwise values of different
/// types compare by a fixed type order so ranges stay well-defined.
pub fn scalar_cmp(a: &Scalar, b: &Scalar) -> Ordering {
    use Scalar::*;
    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,
        (Bool(x), Bool(y)) => x.cmp(y),
        (Str(x), Str(y)) => x.cmp(y),
        (Bin(x), Bin(y)) => x.cmp(y),
        (I32(_) | I64(_), I32(_) | I64(_)) => as_i64(a).cmp(&as_i64(b)),
        (I32(_) | I64(_), F32(_) | F64(_)) | (F32(_) | F64(_), I32(_) | I64(_)) => {
            mixed_cmp(a, b).unwrap_or(Ordering::Equal)
        }
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => scalar_type_order(a).cmp(&scalar_type_order(b)),
        },
    }
}

/// Integer against float, compared exactly. `None` when the float is NaN.
fn mixed_cmp(a: &Scalar, b: &Scalar) -> Option<Ordering> {
    match (as_i64(a), as_i64(b)) {
        (Some(i), None) => as_f64(b).and_then(|f| int_float_cmp(i, f)),
        (None, Some(i)) => as_f64(a).and_then(|f| int_float_cmp(i, f)).map(Ordering::reverse),
        _ => None,
    }
}

/// `i64 as f64` rounds above 2^53, so split the float into its integral part
/// and fraction instead of widening the integer.
fn int_float_cmp(i: i64, f: f64) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    // 2^63 is exact in f64; anything at or past it is out of i64 range.
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if f >= BOUND {
        return Some(Ordering::Less);
    }
    if f < -BOUND {
        return Some(Ordering::Greater);
    }
    let whole = f.trunc();
    match (i as i128).cmp(&(whole as i128)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(f - whole)),
        ord => Some(ord),
    }
}

fn as_i64(s: &Scalar) -> Option<i64> {
    match s {
        Scalar::I32(v) => Some(*v as i64),
        Scalar::I64(v) => Some(*v),
        _ => None,
    }
}

fn as_f64(s: &Scalar) -> Option<f64> {
    match s {
        Scalar::I32(v) => Some(*v as f64),
        Scalar::I64(v) => Some(*v as f64),
        Scalar::F32(v) => Some(*v as f64),
        Scalar::F64(v) => Some(*v),
        _ => None,
    }
}

/// Get type order for scalar (for mixed-type comparisons).
fn scalar_type_order(s: &Scalar) -> u8 {
    use Scalar::*;
    match s {
        Null => 0,
        Bool(_) => 1,
        I32(_) | I64(_) | F32(_) | F64(_) => 2,
        Str(_) => 3,
        Bin(_) => 4,
    }
}

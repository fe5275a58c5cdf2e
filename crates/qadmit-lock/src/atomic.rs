//! Atomic read locks and the value constraints they carry.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use qadmit_core::catalog::Catalog;
use qadmit_core::expr::ColumnRef;
use qadmit_core::types::{scalar_cmp, scalar_eq, Scalar};

use crate::error::{LockError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Endpoint {
    Unbounded,
    Included(Scalar),
    Excluded(Scalar),
}

/// Non-empty interval of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    low: Endpoint,
    high: Endpoint,
}

impl ValueRange {
    pub fn new(low: Endpoint, high: Endpoint) -> Result<Self> {
        if !low_reaches_high(&low, &high) {
            return Err(LockError::EmptyRange {
                low: endpoint_str(&low),
                high: endpoint_str(&high),
            });
        }
        Ok(Self { low, high })
    }

    /// `[low, high]`
    pub fn closed(low: Scalar, high: Scalar) -> Result<Self> {
        Self::new(Endpoint::Included(low), Endpoint::Included(high))
    }

    pub fn low(&self) -> &Endpoint {
        &self.low
    }

    pub fn high(&self) -> &Endpoint {
        &self.high
    }

    pub fn contains(&self, value: &Scalar) -> bool {
        let point = Endpoint::Included(value.clone());
        low_reaches_high(&self.low, &point) && low_reaches_high(&point, &self.high)
    }

    pub fn overlaps(&self, other: &ValueRange) -> bool {
        low_reaches_high(&self.low, &other.high) && low_reaches_high(&other.low, &self.high)
    }
}

/// True if some value is both at-or-above `low` and at-or-below `high`.
///
/// Open intervals over integers such as `(1, 2)` count as non-empty; this
/// only ever errs towards reporting a conflict.
fn low_reaches_high(low: &Endpoint, high: &Endpoint) -> bool {
    match (low, high) {
        (Endpoint::Unbounded, _) | (_, Endpoint::Unbounded) => true,
        (Endpoint::Included(l), Endpoint::Included(h)) => scalar_cmp(l, h) != Ordering::Greater,
        (Endpoint::Included(l) | Endpoint::Excluded(l), Endpoint::Included(h) | Endpoint::Excluded(h)) => {
            scalar_cmp(l, h) == Ordering::Less
        }
    }
}

fn endpoint_str(e: &Endpoint) -> String {
    match e {
        Endpoint::Unbounded => "unbounded".into(),
        Endpoint::Included(v) => format!("{v} (inclusive)"),
        Endpoint::Excluded(v) => format!("{v} (exclusive)"),
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.low {
            Endpoint::Unbounded => write!(f, "(-inf")?,
            Endpoint::Included(v) => write!(f, "[{v}")?,
            Endpoint::Excluded(v) => write!(f, "({v}")?,
        }
        f.write_str(", ")?;
        match &self.high {
            Endpoint::Unbounded => write!(f, "+inf)"),
            Endpoint::Included(v) => write!(f, "{v}]"),
            Endpoint::Excluded(v) => write!(f, "{v})"),
        }
    }
}

/// Value constraint of an atomic lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// Point read of one value.
    Equals(Scalar),
    /// Read of every value in an interval.
    Range(ValueRange),
    /// Read of the whole attribute.
    Any,
}

impl Constraint {
    /// Range and Any guard a region of values; Equals is a shared point read.
    pub fn is_region(&self) -> bool {
        !matches!(self, Constraint::Equals(_))
    }

    /// Whether the two value sets share at least one value.
    pub fn overlaps(&self, other: &Constraint) -> bool {
        match (self, other) {
            (Constraint::Any, _) | (_, Constraint::Any) => true,
            (Constraint::Equals(a), Constraint::Equals(b)) => scalar_eq(a, b),
            (Constraint::Equals(v), Constraint::Range(r))
            | (Constraint::Range(r), Constraint::Equals(v)) => r.contains(v),
            (Constraint::Range(a), Constraint::Range(b)) => a.overlaps(b),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Equals(v) => write!(f, "= {v}"),
            Constraint::Range(r) => write!(f, "in {r}"),
            Constraint::Any => f.write_str("any"),
        }
    }
}

/// A read lock on one attribute of one relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicLock {
    pub column: ColumnRef,
    pub constraint: Constraint,
}

impl AtomicLock {
    pub fn new(column: ColumnRef, constraint: Constraint) -> Self {
        Self { column, constraint }
    }

    pub fn any(column: ColumnRef) -> Self {
        Self::new(column, Constraint::Any)
    }

    /// Two locks conflict when they cover the same attribute, at least one
    /// of them is a region lock, and their value sets overlap.
    pub fn conflicts_with(&self, other: &AtomicLock) -> bool {
        self.column == other.column
            && (self.constraint.is_region() || other.constraint.is_region())
            && self.constraint.overlaps(&other.constraint)
    }

    pub fn describe(&self, catalog: &dyn Catalog) -> String {
        format!("{} {}", catalog.column_name(self.column), self.constraint)
    }
}

impl fmt::Display for AtomicLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.constraint)
    }
}

//! Strongly-typed identifiers.
//!
//! All ids are transparent newtypes over unsigned integers so they serialize
//! as plain numbers on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $inner:ty) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            pub const fn new(v: $inner) -> Self {
                Self(v)
            }

            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(v: $inner) -> Self {
                Self(v)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Unique id of a submitted query.
    QueryId,
    u64
);
define_id!(
    /// Catalog relation id.
    RelationId,
    u32
);
define_id!(
    /// Attribute id, local to its relation.
    AttributeId,
    u32
);
define_id!(
    /// Storage block id.
    BlockId,
    u64
);
define_id!(
    /// Partition id within a relation's partition scheme.
    PartitionId,
    u64
);
define_id!(
    /// Worker thread index.
    WorkerId,
    u64
);

/// Index of an operator node in a query's DAG.
pub type OpIndex = usize;

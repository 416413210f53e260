mod filter;

pub use filter::Filter;

use {
    common::pub_fields_struct,
    core::fmt::{self, Display},
    def::Interval,
    std::{any::Any, sync::Arc},
};

pub_fields_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct SegmentId {
        table: String,
        interval: Interval,
        partition: u32,
    }
}

impl SegmentId {
    pub fn new(table: impl Into<String>, interval: Interval, partition: u32) -> Self {
        Self {
            table: table.into(),
            interval,
            partition,
        }
    }
}

impl Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.table, self.interval, self.partition)
    }
}

/// A queryable slice of a table. The scan engine provides the physical
/// implementations; this layer only wraps them into logical views.
pub trait Segment: Send + Sync {
    fn id(&self) -> &SegmentId;

    fn as_any(&self) -> &dyn Any;
}

pub type SegmentReference = Arc<dyn Segment>;

// Built once per query, applied per segment.
pub type SegmentMapFn = Box<dyn Fn(SegmentReference) -> SegmentReference + Send + Sync>;

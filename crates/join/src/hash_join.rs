use {
    crate::{filter::JoinFilterPreAnalysis, joinable::JoinableClause},
    segment::{Filter, Segment, SegmentId, SegmentReference},
    std::{any::Any, sync::Arc},
};

/// Logical segment presenting `base` with join clauses layered on top.
pub struct HashJoinSegment {
    base: SegmentReference,
    base_filter: Option<Filter>,
    clauses: Vec<JoinableClause>,
    pre_analysis: Arc<JoinFilterPreAnalysis>,
}

impl HashJoinSegment {
    pub fn new(
        base: SegmentReference,
        base_filter: Option<Filter>,
        clauses: Vec<JoinableClause>,
        pre_analysis: Arc<JoinFilterPreAnalysis>,
    ) -> Self {
        Self {
            base,
            base_filter,
            clauses,
            pre_analysis,
        }
    }

    pub fn base(&self) -> &SegmentReference {
        &self.base
    }

    pub fn base_filter(&self) -> Option<&Filter> {
        self.base_filter.as_ref()
    }

    pub fn clauses(&self) -> &[JoinableClause] {
        &self.clauses
    }

    pub fn pre_analysis(&self) -> &Arc<JoinFilterPreAnalysis> {
        &self.pre_analysis
    }
}

impl Segment for HashJoinSegment {
    fn id(&self) -> &SegmentId {
        self.base.id()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

use {
    super::clause::PreJoinableClause,
    crate::{
        datasource::DataSource,
        query::{Query, QuerySegmentSpec},
    },
    common::pub_fields_struct,
    def::DimFilter,
};

pub_fields_struct! {
    /// Canonical analyzed form of a data-source tree: the base to scan,
    /// a filter applicable while scanning it, and the join clauses to
    /// layer on top, in application order.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct DataSourceAnalysis {
        base_data_source: DataSource,
        // Innermost query, once analysis descends through a
        // query-wrapping source.
        base_query: Option<Query>,
        join_base_table_filter: Option<DimFilter>,
        pre_joinable_clauses: Vec<PreJoinableClause>,
    }
}

impl DataSourceAnalysis {
    // Records `query` only if none is known yet and it has a
    // per-segment interval spec.
    pub fn maybe_with_base_query(self, query: Query) -> Self {
        if self.base_query.is_none() && query.segment_spec().is_some() {
            return Self {
                base_query: Some(query),
                ..self
            };
        }
        self
    }

    pub fn is_join(&self) -> bool {
        !self.pre_joinable_clauses.is_empty()
    }

    pub fn is_concrete_based(&self) -> bool {
        self.base_data_source.is_concrete()
    }

    pub fn base_query_segment_spec(&self) -> Option<&QuerySegmentSpec> {
        self.base_query
            .as_ref()
            .and_then(|query| query.segment_spec())
    }
}

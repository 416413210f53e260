use {
    crate::datasource::DataSource, common::pub_fields_struct, def::JoinType,
    join::condition::JoinConditionAnalysis,
};

pub_fields_struct! {
    /// One flattened join step, before its right side is resolved into a
    /// runtime joinable.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct PreJoinableClause {
        data_source: DataSource,
        prefix: String,
        join_type: JoinType,
        condition: JoinConditionAnalysis,
    }
}

use {
    crate::{condition::JoinConditionAnalysis, prefix::is_prefixed_by},
    common::pub_fields_struct,
    core::fmt,
    def::JoinType,
    std::{collections::BTreeSet, sync::Arc},
};

/// Runtime view of a join's right-hand side, resolved by the engine's
/// joinable factory.
pub trait Joinable: Send + Sync {
    fn available_columns(&self) -> Vec<String>;

    /// All distinct values of `column`, when they can be enumerated
    /// without exceeding `max` values.
    fn column_values(&self, column: &str, max: usize) -> Option<BTreeSet<String>>;
}

pub_fields_struct! {
    #[derive(Clone)]
    struct JoinableClause {
        prefix: String,
        joinable: Arc<dyn Joinable>,
        join_type: JoinType,
        condition: JoinConditionAnalysis,
    }
}

impl JoinableClause {
    pub fn includes_column(&self, column: &str) -> bool {
        is_prefixed_by(column, &self.prefix)
    }
}

impl fmt::Debug for JoinableClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinableClause")
            .field("prefix", &self.prefix)
            .field("join_type", &self.join_type)
            .field("condition", &self.condition)
            .finish_non_exhaustive()
    }
}

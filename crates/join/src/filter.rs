use {
    crate::{expr::Expr, joinable::JoinableClause},
    common::pub_fields_struct,
    def::{JoinType, VirtualColumns},
    log::debug,
    segment::Filter,
    std::collections::HashSet,
};

pub const DEFAULT_FILTER_REWRITE_MAX_SIZE: usize = 10_000;

pub_fields_struct! {
    // Sourced from the query context.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct JoinFilterRewriteConfig {
        enable_filter_push_down: bool,
        enable_filter_rewrite: bool,
        enable_rewrite_join_to_filter: bool,
        filter_rewrite_max_size: usize,
    }
}

impl Default for JoinFilterRewriteConfig {
    fn default() -> Self {
        Self {
            enable_filter_push_down: true,
            enable_filter_rewrite: true,
            enable_rewrite_join_to_filter: true,
            filter_rewrite_max_size: DEFAULT_FILTER_REWRITE_MAX_SIZE,
        }
    }
}

pub_fields_struct! {
    #[derive(Debug, Clone)]
    struct JoinFilterPreAnalysisKey {
        config: JoinFilterRewriteConfig,
        clauses: Vec<JoinableClause>,
        virtual_columns: VirtualColumns,
        filter: Option<Filter>,
    }
}

/// Push-down and rewrite decisions precomputed once per query, consumed
/// unchanged by per-segment join construction.
#[derive(Debug, Clone)]
pub struct JoinFilterPreAnalysis {
    key: JoinFilterPreAnalysisKey,
}

impl JoinFilterPreAnalysis {
    pub fn key(&self) -> &JoinFilterPreAnalysisKey {
        &self.key
    }
}

pub fn compute_join_filter_pre_analysis(key: JoinFilterPreAnalysisKey) -> JoinFilterPreAnalysis {
    JoinFilterPreAnalysis { key }
}

/// Rewrites a leading run of `clauses` into equivalent filters on the
/// base. Conversion stops at the first clause that cannot be rewritten;
/// later clauses may read columns it introduces.
pub fn convert_joins_to_filters(
    clauses: Vec<JoinableClause>,
    required_columns: &HashSet<String>,
    max_size: usize,
) -> (Vec<Filter>, Vec<JoinableClause>) {
    let mut filters = Vec::new();
    let mut remaining = Vec::new();
    let mut convertible = true;

    for clause in clauses {
        if convertible {
            match convert_join_to_filter(&clause, required_columns, max_size) {
                Some(filter) => {
                    debug!(
                        "converted join clause with prefix {:?} into a filter",
                        clause.prefix
                    );
                    filters.push(filter);
                    continue;
                }
                None => convertible = false,
            }
        }
        remaining.push(clause);
    }

    (filters, remaining)
}

fn convert_join_to_filter(
    clause: &JoinableClause,
    required_columns: &HashSet<String>,
    max_size: usize,
) -> Option<Filter> {
    if clause.join_type != JoinType::Inner {
        return None;
    }
    if clause.condition.equi_conditions().is_empty() {
        return None;
    }
    if required_columns
        .iter()
        .any(|column| clause.includes_column(column))
    {
        return None;
    }

    let mut filters = Vec::new();
    for condition in clause.condition.equi_conditions() {
        let dimension = match &condition.left_expr {
            Some(Expr::Column(name)) => name.clone(),
            _ => return None,
        };
        let values = clause
            .joinable
            .column_values(&condition.right_column, max_size)?;

        filters.push(Some(Filter::In { dimension, values }));
    }

    Filter::maybe_and(filters)
}

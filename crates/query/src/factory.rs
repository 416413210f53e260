use {
    crate::{
        datasource::DataSource,
        error::{NoJoinClausesSnafu, NotJoinableSnafu, Result},
        planning::{DataSourceAnalysis, PreJoinableClause},
    },
    def::cache::CacheKeyBuilder,
    join::{condition::JoinConditionAnalysis, Joinable, JoinableClause},
    log::debug,
    snafu::prelude::*,
    std::{fmt, sync::Arc},
};

// Cache-key operation tag for joins.
pub const JOIN_OPERATION: u8 = 0x1c;

/// Resolves data sources into runtime joinables. Implementations decide
/// which sources they can index and how.
pub trait JoinableFactory: Send + Sync {
    fn build(
        &self,
        data_source: &DataSource,
        condition: &JoinConditionAnalysis,
    ) -> Option<Arc<dyn Joinable>>;

    /// Cache-key bytes for joining against `data_source`, when its
    /// content is stable enough to cache.
    fn compute_join_cache_key(
        &self,
        data_source: &DataSource,
        condition: &JoinConditionAnalysis,
    ) -> Option<Vec<u8>>;
}

#[derive(Clone)]
pub struct JoinableFactoryWrapper {
    factory: Arc<dyn JoinableFactory>,
}

impl JoinableFactoryWrapper {
    pub fn new(factory: Arc<dyn JoinableFactory>) -> Self {
        Self { factory }
    }

    pub fn compute_join_cache_key(
        &self,
        data_source: &DataSource,
        condition: &JoinConditionAnalysis,
    ) -> Option<Vec<u8>> {
        self.factory.compute_join_cache_key(data_source, condition)
    }

    /// Cache-key bytes covering every join clause of an analyzed data
    /// source. An empty key signals that a clause's right side cannot be
    /// cached and caching must be skipped; asking for a key without any
    /// clauses is a usage error.
    pub fn compute_join_data_source_cache_key(
        &self,
        analysis: &DataSourceAnalysis,
    ) -> Result<Vec<u8>> {
        let clauses = &analysis.pre_joinable_clauses;
        ensure!(
            !clauses.is_empty(),
            NoJoinClausesSnafu {
                data_source: analysis.base_data_source.to_string(),
            }
        );

        let mut builder = CacheKeyBuilder::new(JOIN_OPERATION);
        if let Some(filter) = &analysis.join_base_table_filter {
            builder = builder.append_cacheable(filter);
        }

        for clause in clauses {
            let bytes = match self
                .factory
                .compute_join_cache_key(&clause.data_source, &clause.condition)
            {
                Some(bytes) => bytes,
                None => {
                    debug!(
                        "skipping caching for join since {} does not support it",
                        clause.data_source
                    );
                    return Ok(Vec::new());
                }
            };

            builder = builder
                .append_bytes(&bytes)
                .append_string(clause.condition.original_expression())
                .append_string(&clause.prefix)
                .append_string(clause.join_type.name());
        }

        Ok(builder.build())
    }

    // Fails on the first right side no joinable can be built for.
    pub fn create_joinable_clauses(
        &self,
        clauses: &[PreJoinableClause],
    ) -> Result<Vec<JoinableClause>> {
        clauses
            .iter()
            .map(|clause| {
                let joinable = self
                    .factory
                    .build(&clause.data_source, &clause.condition)
                    .context(NotJoinableSnafu {
                        data_source: clause.data_source.to_string(),
                    })?;

                Ok(JoinableClause {
                    prefix: clause.prefix.clone(),
                    joinable,
                    join_type: clause.join_type,
                    condition: clause.condition.clone(),
                })
            })
            .collect()
    }
}

impl fmt::Debug for JoinableFactoryWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinableFactoryWrapper").finish_non_exhaustive()
    }
}

use {
    super::DataSource,
    crate::{
        error::{
            ConditionSnafu, Error, LeftFilterNotSupportedSnafu, MissingJoinableFactorySnafu,
            PrefixSnafu, Result,
        },
        factory::JoinableFactoryWrapper,
        planning::{DataSourceAnalysis, PreJoinableClause},
        query::Query,
    },
    common::time::accumulate_nanos,
    def::{DimFilter, JoinType},
    join::{
        condition::JoinConditionAnalysis,
        filter::{compute_join_filter_pre_analysis, convert_joins_to_filters, JoinFilterPreAnalysisKey},
        prefix::validate_prefix,
        HashJoinSegment,
    },
    segment::{Filter, SegmentMapFn, SegmentReference},
    serde::{Deserialize, Serialize},
    snafu::prelude::*,
    std::{
        collections::HashSet,
        fmt::{self, Display},
        hash::{Hash, Hasher},
        sync::{atomic::AtomicU64, Arc},
    },
};

/// A join of two sources, with the right side's columns exposed under a
/// prefix. Instances always hold the flattened analysis of their left
/// spine, computed when they are built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "JoinSpec", into = "JoinSpec")]
pub struct JoinDataSource {
    left: Box<DataSource>,
    right: Box<DataSource>,
    right_prefix: String,
    condition: JoinConditionAnalysis,
    join_type: JoinType,
    left_filter: Option<DimFilter>,
    joinable_factory: Option<JoinableFactoryWrapper>,
    analysis: Arc<DataSourceAnalysis>,
}

impl JoinDataSource {
    /// Builds a join, parsing `condition` under `right_prefix`.
    pub fn create(
        left: DataSource,
        right: DataSource,
        right_prefix: &str,
        condition: &str,
        join_type: JoinType,
        left_filter: Option<DimFilter>,
        joinable_factory: Option<JoinableFactoryWrapper>,
    ) -> Result<Self> {
        let condition =
            JoinConditionAnalysis::from_expression(condition, right_prefix).context(ConditionSnafu)?;

        Self::create_from_analysis(
            left,
            right,
            right_prefix,
            condition,
            join_type,
            left_filter,
            joinable_factory,
        )
    }

    pub fn create_from_analysis(
        left: DataSource,
        right: DataSource,
        right_prefix: &str,
        condition: JoinConditionAnalysis,
        join_type: JoinType,
        left_filter: Option<DimFilter>,
        joinable_factory: Option<JoinableFactoryWrapper>,
    ) -> Result<Self> {
        validate_prefix(right_prefix).context(PrefixSnafu)?;
        let left_filter = validate_left_filter(&left, left_filter)?;

        let root_clause = PreJoinableClause {
            data_source: right.clone(),
            prefix: right_prefix.to_owned(),
            join_type,
            condition: condition.clone(),
        };
        let analysis = flatten(&left, left_filter.clone(), root_clause)?;

        Ok(Self {
            left: Box::new(left),
            right: Box::new(right),
            right_prefix: right_prefix.to_owned(),
            condition,
            join_type,
            left_filter,
            joinable_factory,
            analysis: Arc::new(analysis),
        })
    }

    pub fn left(&self) -> &DataSource {
        &self.left
    }

    pub fn right(&self) -> &DataSource {
        &self.right
    }

    pub fn right_prefix(&self) -> &str {
        &self.right_prefix
    }

    pub fn condition_analysis(&self) -> &JoinConditionAnalysis {
        &self.condition
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn left_filter(&self) -> Option<&DimFilter> {
        self.left_filter.as_ref()
    }

    pub fn analysis(&self) -> &DataSourceAnalysis {
        &self.analysis
    }

    pub fn children(&self) -> Vec<&DataSource> {
        vec![&*self.left, &*self.right]
    }

    pub fn with_children(&self, children: Vec<DataSource>) -> Result<Self> {
        let [left, right] = super::take_children(children)?;

        Self::create_from_analysis(
            left,
            right,
            &self.right_prefix,
            self.condition.clone(),
            self.join_type,
            self.left_filter.clone(),
            self.joinable_factory.clone(),
        )
    }

    pub fn is_cacheable(&self, is_broker: bool) -> bool {
        self.left.is_cacheable(is_broker) && self.right.is_cacheable(is_broker)
    }

    pub fn is_global(&self) -> bool {
        self.left.is_global() && self.right.is_global()
    }

    /// Joins restrict time only when both sides do; an unrestricted
    /// side reintroduces the full range into the joined rows.
    pub fn has_time_filter(&self) -> bool {
        self.left.has_time_filter() && self.right.has_time_filter()
    }

    // Left-side columns read by the join condition.
    pub fn virtual_column_candidates(&self) -> HashSet<&str> {
        self.condition
            .equi_conditions()
            .iter()
            .filter_map(|condition| condition.left_expr.as_ref())
            .flat_map(|expr| expr.required_bindings())
            .collect()
    }

    /// The same join carrying `factory`. Deserialized joins start out
    /// without one.
    pub fn with_joinable_factory(&self, factory: JoinableFactoryWrapper) -> Self {
        Self {
            joinable_factory: Some(factory),
            ..self.clone()
        }
    }

    pub fn cache_key(&self) -> Result<Vec<u8>> {
        let factory = self
            .joinable_factory
            .as_ref()
            .context(MissingJoinableFactorySnafu {
                data_source: self.to_string(),
            })?;

        factory.compute_join_data_source_cache_key(&self.analysis)
    }

    pub fn create_segment_map_function(
        &self,
        query: &Query,
        cpu_time_accumulator: &AtomicU64,
    ) -> Result<SegmentMapFn> {
        accumulate_nanos(cpu_time_accumulator, || {
            self.build_segment_map_function(query, cpu_time_accumulator)
        })
    }

    fn build_segment_map_function(
        &self,
        query: &Query,
        cpu_time_accumulator: &AtomicU64,
    ) -> Result<SegmentMapFn> {
        let analysis = &self.analysis;

        if analysis.pre_joinable_clauses.is_empty() {
            return Ok(Box::new(|segment| segment));
        }

        // Rewrites follow the innermost query when analysis recorded
        // one, not whatever outer query is being served.
        let query = analysis.base_query.as_ref().unwrap_or(query);

        let factory = self
            .joinable_factory
            .as_ref()
            .context(MissingJoinableFactorySnafu {
                data_source: self.to_string(),
            })?;

        let joinable_clauses = factory.create_joinable_clauses(&analysis.pre_joinable_clauses)?;
        let config = query.context().filter_rewrite_config();

        let base_filter = analysis.join_base_table_filter.as_ref().map(Filter::from);

        let (converted_filters, clauses_to_use) = match query.required_columns() {
            Some(required) if config.enable_rewrite_join_to_filter => {
                convert_joins_to_filters(joinable_clauses, &required, config.filter_rewrite_max_size)
            }
            _ => (Vec::new(), joinable_clauses),
        };

        let mut filter_parts = vec![base_filter];
        filter_parts.extend(converted_filters.into_iter().map(Some));
        let base_filter_to_use = Filter::maybe_and(filter_parts);

        let pre_analysis = Arc::new(compute_join_filter_pre_analysis(JoinFilterPreAnalysisKey {
            config,
            clauses: clauses_to_use.clone(),
            virtual_columns: query.virtual_columns().clone(),
            filter: Filter::maybe_and(vec![
                base_filter_to_use.clone(),
                query.filter().map(Filter::from),
            ]),
        }));

        // A left side that is itself a join already contributed its
        // clauses to this flattened list; mapping through it would nest
        // hash-join views.
        let base_map_fn: SegmentMapFn = match self.left.as_ref() {
            DataSource::Join(_) => Box::new(|segment| segment),
            left => left.create_segment_map_function(query, cpu_time_accumulator)?,
        };

        Ok(Box::new(move |segment| -> SegmentReference {
            Arc::new(HashJoinSegment::new(
                base_map_fn(segment),
                base_filter_to_use.clone(),
                clauses_to_use.clone(),
                Arc::clone(&pre_analysis),
            ))
        }))
    }

    /// Rebuilds the flattened join chain on top of `new_base`, keeping
    /// every clause and re-running construction-time validation. The
    /// base filter belongs to the innermost join and is attached there.
    pub fn with_updated_data_source(&self, new_base: DataSource) -> Result<DataSource> {
        let mut base_filter = self.analysis.join_base_table_filter.clone();
        let mut current = new_base;

        for clause in &self.analysis.pre_joinable_clauses {
            current = Self::create_from_analysis(
                current,
                clause.data_source.clone(),
                &clause.prefix,
                clause.condition.clone(),
                clause.join_type,
                base_filter.take(),
                self.joinable_factory.clone(),
            )?
            .into();
        }

        Ok(current)
    }
}

/// Unwinds a join's left spine into the base beneath it, the innermost
/// join's left filter, and every clause in application order. Filter and
/// unnest wrappers are stepped through.
fn flatten(
    left: &DataSource,
    left_filter: Option<DimFilter>,
    root_clause: PreJoinableClause,
) -> Result<DataSourceAnalysis> {
    let mut clauses = vec![root_clause];
    let mut base_filter = left_filter;
    let mut current = left;

    loop {
        match current {
            DataSource::Join(join) => {
                clauses.push(PreJoinableClause {
                    data_source: (*join.right).clone(),
                    prefix: join.right_prefix.clone(),
                    join_type: join.join_type,
                    condition: join.condition.clone(),
                });
                current = &*join.left;
                base_filter = validate_left_filter(current, join.left_filter.clone())?;
            }
            DataSource::Filtered(filtered) => current = filtered.base(),
            DataSource::Unnest(unnest) => current = unnest.base(),
            _ => break,
        }
    }

    // Clauses were collected outermost first.
    clauses.reverse();

    Ok(DataSourceAnalysis {
        base_data_source: current.clone(),
        base_query: None,
        join_base_table_filter: base_filter,
        pre_joinable_clauses: clauses,
    })
}

// Left filters push into the base scan, so only a concrete leaf (a
// direct table reference) may carry one.
fn validate_left_filter(left: &DataSource, left_filter: Option<DimFilter>) -> Result<Option<DimFilter>> {
    ensure!(
        left_filter.is_none() || (left.is_concrete() && left.children().is_empty()),
        LeftFilterNotSupportedSnafu {
            data_source: left.to_string(),
        }
    );

    Ok(left_filter)
}

// Identity and hashing cover the fields describing what the join
// computes. The factory handle is an injected capability and the
// analysis is derived, so both stay out.
impl PartialEq for JoinDataSource {
    fn eq(&self, other: &Self) -> bool {
        self.left == other.left
            && self.right == other.right
            && self.right_prefix == other.right_prefix
            && self.condition == other.condition
            && self.join_type == other.join_type
            && self.left_filter == other.left_filter
    }
}

impl Eq for JoinDataSource {}

impl Hash for JoinDataSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.left.hash(state);
        self.right.hash(state);
        self.right_prefix.hash(state);
        self.condition.hash(state);
        self.join_type.hash(state);
        self.left_filter.hash(state);
    }
}

impl Display for JoinDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} {} JOIN {} ON {})",
            self.left, self.join_type, self.right, self.condition
        )
    }
}

// Wire form. Conditions travel as their original text and factories do
// not travel at all, so deserialized joins go through the validating
// constructor and come back without a factory.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinSpec {
    left: DataSource,
    right: DataSource,
    right_prefix: String,
    condition: String,
    join_type: JoinType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    left_filter: Option<DimFilter>,
}

impl TryFrom<JoinSpec> for JoinDataSource {
    type Error = Error;

    fn try_from(spec: JoinSpec) -> Result<Self> {
        Self::create(
            spec.left,
            spec.right,
            &spec.right_prefix,
            &spec.condition,
            spec.join_type,
            spec.left_filter,
            None,
        )
    }
}

impl From<JoinDataSource> for JoinSpec {
    fn from(source: JoinDataSource) -> Self {
        Self {
            left: *source.left,
            right: *source.right,
            right_prefix: source.right_prefix,
            condition: source.condition.original_expression().to_owned(),
            join_type: source.join_type,
            left_filter: source.left_filter,
        }
    }
}

use {
    super::DataSource,
    crate::{
        error::{Result, SubQueryNotAnalyzableSnafu, UnionQueryDataSourceSnafu},
        planning::DataSourceAnalysis,
        query::Query,
    },
    segment::SegmentMapFn,
    serde::{Deserialize, Serialize},
    std::{
        collections::HashSet,
        fmt::{self, Display},
        sync::atomic::AtomicU64,
    },
};

/// A source producing the rows of an inner query; how subqueries nest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryDataSource {
    query: Box<Query>,
}

impl QueryDataSource {
    pub fn new(query: Query) -> Self {
        Self {
            query: Box::new(query),
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn children(&self) -> Vec<&DataSource> {
        match self.query.data_source() {
            Some(data_source) => vec![data_source],
            None => Vec::new(),
        }
    }

    pub(crate) fn collect_table_names<'a>(&'a self, names: &mut HashSet<&'a str>) {
        self.query.collect_table_names(names);
    }

    pub fn is_global(&self) -> bool {
        self.query
            .data_source()
            .map_or(false, DataSource::is_global)
    }

    // Either the inner query restricts its intervals or its own data
    // source carries a time filter.
    pub fn has_time_filter(&self) -> bool {
        self.query.restricts_time()
            || self
                .query
                .data_source()
                .map_or(false, DataSource::has_time_filter)
    }

    /// Descends into the inner query's data source, recording the
    /// innermost query along the way. Only query kinds scanning a single
    /// base can be descended into.
    pub fn get_analysis(&self) -> Result<DataSourceAnalysis> {
        let data_source = match self.query.data_source() {
            Some(data_source) if self.query.segment_spec().is_some() => data_source,
            _ => {
                return SubQueryNotAnalyzableSnafu {
                    kind: self.query.kind(),
                }
                .fail()
            }
        };

        let analysis = data_source.get_analysis()?;
        Ok(analysis.maybe_with_base_query((*self.query).clone()))
    }

    // Built for the inner query, not whatever outer query is served.
    pub fn create_segment_map_function(
        &self,
        cpu_time_accumulator: &AtomicU64,
    ) -> Result<SegmentMapFn> {
        match self.query.data_source() {
            Some(data_source) => {
                data_source.create_segment_map_function(&self.query, cpu_time_accumulator)
            }
            None => Ok(Box::new(|segment| segment)),
        }
    }

    pub fn with_updated_data_source(&self, new_source: DataSource) -> Result<Self> {
        let inner = match self.query.data_source() {
            Some(data_source) => data_source.with_updated_data_source(new_source)?,
            None => return UnionQueryDataSourceSnafu.fail(),
        };

        Ok(Self::new(self.query.with_data_source(inner)?))
    }
}

impl Display for QueryDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query({})", self.query.kind())
    }
}

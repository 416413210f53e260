use {
    crate::{
        context::QueryContext,
        datasource::DataSource,
        error::{Result, UnionQueryDataSourceSnafu},
    },
    common::pub_fields_struct,
    def::{DimFilter, Interval, VirtualColumns, ETERNITY},
    serde::{Deserialize, Serialize},
    std::collections::HashSet,
};

static NO_VIRTUAL_COLUMNS: VirtualColumns = VirtualColumns::empty();

/// The intervals a query reads. Exactly the eternity interval places no
/// restriction on time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuerySegmentSpec(Vec<Interval>);

impl QuerySegmentSpec {
    pub fn new(intervals: Vec<Interval>) -> Self {
        Self(intervals)
    }

    pub fn eternity() -> Self {
        Self(vec![ETERNITY])
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.0
    }

    pub fn restricts_time(&self) -> bool {
        self.0 != [ETERNITY]
    }
}

pub_fields_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ScanQuery {
        data_source: DataSource,
        intervals: QuerySegmentSpec,
        /// Columns to project. Empty means "all", in which case the
        /// required set is unknown.
        columns: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<DimFilter>,
        #[serde(default, skip_serializing_if = "VirtualColumns::is_empty")]
        virtual_columns: VirtualColumns,
        #[serde(default)]
        context: QueryContext,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct GroupByQuery {
        data_source: DataSource,
        intervals: QuerySegmentSpec,
        dimensions: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<DimFilter>,
        #[serde(default, skip_serializing_if = "VirtualColumns::is_empty")]
        virtual_columns: VirtualColumns,
        #[serde(default)]
        context: QueryContext,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    struct UnionQuery {
        queries: Vec<Query>,
        #[serde(default)]
        context: QueryContext,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "queryType", rename_all = "camelCase")]
pub enum Query {
    Scan(ScanQuery),
    GroupBy(GroupByQuery),
    Union(UnionQuery),
}

impl Query {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scan(_) => "scan",
            Self::GroupBy(_) => "groupBy",
            Self::Union(_) => "union",
        }
    }

    /// `None` for union queries, which read one source per member.
    pub fn data_source(&self) -> Option<&DataSource> {
        match self {
            Self::Scan(query) => Some(&query.data_source),
            Self::GroupBy(query) => Some(&query.data_source),
            Self::Union(_) => None,
        }
    }

    pub fn with_data_source(&self, data_source: DataSource) -> Result<Self> {
        match self {
            Self::Scan(query) => Ok(Self::Scan(ScanQuery {
                data_source,
                ..query.clone()
            })),
            Self::GroupBy(query) => Ok(Self::GroupBy(GroupByQuery {
                data_source,
                ..query.clone()
            })),
            Self::Union(_) => UnionQueryDataSourceSnafu.fail(),
        }
    }

    pub fn filter(&self) -> Option<&DimFilter> {
        match self {
            Self::Scan(query) => query.filter.as_ref(),
            Self::GroupBy(query) => query.filter.as_ref(),
            Self::Union(_) => None,
        }
    }

    pub fn virtual_columns(&self) -> &VirtualColumns {
        match self {
            Self::Scan(query) => &query.virtual_columns,
            Self::GroupBy(query) => &query.virtual_columns,
            Self::Union(_) => &NO_VIRTUAL_COLUMNS,
        }
    }

    /// The exact output column set, when the query can name it. Only
    /// scans with an explicit projection can; `None` disables
    /// column-driven rewrites.
    pub fn required_columns(&self) -> Option<HashSet<String>> {
        match self {
            Self::Scan(query) if !query.columns.is_empty() => {
                Some(query.columns.iter().cloned().collect())
            }
            _ => None,
        }
    }

    pub fn context(&self) -> &QueryContext {
        match self {
            Self::Scan(query) => &query.context,
            Self::GroupBy(query) => &query.context,
            Self::Union(query) => &query.context,
        }
    }

    pub fn segment_spec(&self) -> Option<&QuerySegmentSpec> {
        match self {
            Self::Scan(query) => Some(&query.intervals),
            Self::GroupBy(query) => Some(&query.intervals),
            Self::Union(_) => None,
        }
    }

    pub fn restricts_time(&self) -> bool {
        match self {
            Self::Scan(query) => query.intervals.restricts_time(),
            Self::GroupBy(query) => query.intervals.restricts_time(),
            Self::Union(query) => query.queries.iter().all(Self::restricts_time),
        }
    }

    pub(crate) fn collect_table_names<'a>(&'a self, names: &mut HashSet<&'a str>) {
        match self {
            Self::Scan(query) => query.data_source.collect_table_names(names),
            Self::GroupBy(query) => query.data_source.collect_table_names(names),
            Self::Union(query) => {
                for member in &query.queries {
                    member.collect_table_names(names);
                }
            }
        }
    }
}

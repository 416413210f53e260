mod filtered;
mod join;
mod query;
mod table;
mod union;
mod unnest;

pub use self::{
    filtered::FilteredDataSource,
    join::JoinDataSource,
    query::QueryDataSource,
    table::{GlobalTableDataSource, TableDataSource},
    union::UnionDataSource,
    unnest::UnnestDataSource,
};

use {
    crate::{
        error::{ChildCountSnafu, NoAttachmentPointSnafu, Result},
        planning::DataSourceAnalysis,
        query::Query,
    },
    segment::SegmentMapFn,
    serde::{Deserialize, Serialize},
    snafu::prelude::*,
    std::{
        collections::HashSet,
        fmt::{self, Display},
        sync::atomic::AtomicU64,
    },
};

/// A node of the composable data-source tree a query reads from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DataSource {
    #[serde(rename = "table")]
    Table(TableDataSource),
    #[serde(rename = "globalTable")]
    GlobalTable(GlobalTableDataSource),
    #[serde(rename = "query")]
    Query(QueryDataSource),
    #[serde(rename = "join")]
    Join(JoinDataSource),
    #[serde(rename = "filter")]
    Filtered(FilteredDataSource),
    #[serde(rename = "unnest")]
    Unnest(UnnestDataSource),
    #[serde(rename = "union")]
    Union(UnionDataSource),
}

impl DataSource {
    pub fn table(name: impl Into<String>) -> Self {
        Self::Table(TableDataSource::new(name))
    }

    pub fn global_table(name: impl Into<String>) -> Self {
        Self::GlobalTable(GlobalTableDataSource::new(name))
    }

    pub fn union(members: Vec<DataSource>) -> Self {
        Self::Union(UnionDataSource::new(members))
    }

    pub fn table_names(&self) -> HashSet<&str> {
        let mut names = HashSet::new();
        self.collect_table_names(&mut names);
        names
    }

    pub(crate) fn collect_table_names<'a>(&'a self, names: &mut HashSet<&'a str>) {
        match self {
            Self::Table(table) => {
                names.insert(table.name());
            }
            Self::GlobalTable(table) => {
                names.insert(table.name());
            }
            Self::Query(query) => query.collect_table_names(names),
            other => {
                for child in other.children() {
                    child.collect_table_names(names);
                }
            }
        }
    }

    pub fn children(&self) -> Vec<&DataSource> {
        match self {
            Self::Table(_) | Self::GlobalTable(_) => Vec::new(),
            Self::Query(query) => query.children(),
            Self::Join(join) => join.children(),
            Self::Filtered(filtered) => vec![filtered.base()],
            Self::Unnest(unnest) => vec![unnest.base()],
            Self::Union(union) => union.members().iter().collect(),
        }
    }

    /// Rebuilds this node around replacement children, which must match
    /// the arity of [`Self::children`].
    pub fn with_children(&self, children: Vec<DataSource>) -> Result<DataSource> {
        match self {
            Self::Table(_) | Self::GlobalTable(_) => {
                ensure_child_count(0, children.len())?;
                Ok(self.clone())
            }
            Self::Query(query) => {
                let [child] = take_children(children)?;
                Ok(QueryDataSource::new(query.query().with_data_source(child)?).into())
            }
            Self::Join(join) => join.with_children(children).map(Into::into),
            Self::Filtered(filtered) => {
                let [base] = take_children(children)?;
                Ok(FilteredDataSource::new(base, filtered.filter().cloned()).into())
            }
            Self::Unnest(unnest) => {
                let [base] = take_children(children)?;
                Ok(unnest.rebased(base).into())
            }
            Self::Union(union) => {
                ensure_child_count(union.members().len(), children.len())?;
                Ok(Self::union(children))
            }
        }
    }

    // Broker-side caching additionally admits broadcast tables.
    pub fn is_cacheable(&self, is_broker: bool) -> bool {
        match self {
            Self::Table(_) => true,
            Self::GlobalTable(_) => is_broker,
            Self::Query(_) => false,
            Self::Join(join) => join.is_cacheable(is_broker),
            Self::Filtered(filtered) => filtered.base().is_cacheable(is_broker),
            Self::Unnest(unnest) => unnest.base().is_cacheable(is_broker),
            Self::Union(union) => union
                .members()
                .iter()
                .all(|member| member.is_cacheable(is_broker)),
        }
    }

    pub fn is_global(&self) -> bool {
        match self {
            Self::Table(_) => false,
            Self::GlobalTable(_) => true,
            Self::Query(query) => query.is_global(),
            Self::Join(join) => join.is_global(),
            Self::Filtered(filtered) => filtered.base().is_global(),
            Self::Unnest(unnest) => unnest.base().is_global(),
            Self::Union(union) => union.members().iter().all(Self::is_global),
        }
    }

    /// Whether the source is directly scannable segment data, needing no
    /// planner work such as subquery inlining or joinable resolution.
    pub fn is_concrete(&self) -> bool {
        match self {
            Self::Table(_) | Self::GlobalTable(_) => true,
            Self::Query(_) | Self::Join(_) => false,
            Self::Filtered(filtered) => filtered.base().is_concrete(),
            Self::Unnest(unnest) => unnest.base().is_concrete(),
            Self::Union(union) => union.members().iter().all(Self::is_concrete),
        }
    }

    /// Whether evaluating this source restricts the time range it reads,
    /// through interval specs or filters on the time column.
    pub fn has_time_filter(&self) -> bool {
        match self {
            Self::Table(_) | Self::GlobalTable(_) => false,
            Self::Query(query) => query.has_time_filter(),
            Self::Join(join) => join.has_time_filter(),
            Self::Filtered(filtered) => filtered.has_time_filter(),
            Self::Unnest(unnest) => unnest.base().has_time_filter(),
            Self::Union(union) => union.members().iter().all(Self::has_time_filter),
        }
    }

    /// Bytes identifying this source in per-segment cache keys. `None`
    /// means the variant contributes no key of its own; an empty key on
    /// a join means caching must be skipped for the query.
    pub fn cache_key(&self) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Table(_) | Self::GlobalTable(_) => Ok(Some(Vec::new())),
            Self::Join(join) => join.cache_key().map(Some),
            Self::Query(_) | Self::Filtered(_) | Self::Unnest(_) | Self::Union(_) => Ok(None),
        }
    }

    pub fn get_analysis(&self) -> Result<DataSourceAnalysis> {
        match self {
            Self::Join(join) => Ok(join.analysis().clone()),
            Self::Query(query) => query.get_analysis(),
            Self::Filtered(filtered) => filtered.base().get_analysis(),
            Self::Unnest(unnest) => unnest.base().get_analysis(),
            other => Ok(DataSourceAnalysis {
                base_data_source: other.clone(),
                base_query: None,
                join_base_table_filter: None,
                pre_joinable_clauses: Vec::new(),
            }),
        }
    }

    /// A function preparing base segments for scanning this source under
    /// `query`. CPU time spent building it is added to
    /// `cpu_time_accumulator`.
    pub fn create_segment_map_function(
        &self,
        query: &Query,
        cpu_time_accumulator: &AtomicU64,
    ) -> Result<SegmentMapFn> {
        match self {
            Self::Table(_) | Self::GlobalTable(_) | Self::Union(_) => {
                Ok(Box::new(|segment| segment))
            }
            Self::Query(wrapper) => wrapper.create_segment_map_function(cpu_time_accumulator),
            Self::Join(join) => join.create_segment_map_function(query, cpu_time_accumulator),
            Self::Filtered(filtered) => filtered
                .base()
                .create_segment_map_function(query, cpu_time_accumulator),
            Self::Unnest(unnest) => unnest
                .base()
                .create_segment_map_function(query, cpu_time_accumulator),
        }
    }

    /// Re-attaches this node's wrapper structure around a replacement
    /// base. Unions have no single attachment point and refuse.
    pub fn with_updated_data_source(&self, new_source: DataSource) -> Result<DataSource> {
        match self {
            Self::Table(_) | Self::GlobalTable(_) => Ok(new_source),
            Self::Query(query) => query.with_updated_data_source(new_source).map(Into::into),
            Self::Join(join) => join.with_updated_data_source(new_source),
            Self::Filtered(filtered) => {
                Ok(FilteredDataSource::new(new_source, filtered.filter().cloned()).into())
            }
            Self::Unnest(unnest) => Ok(unnest.rebased(new_source).into()),
            Self::Union(_) => NoAttachmentPointSnafu.fail(),
        }
    }
}

fn ensure_child_count(expected: usize, actual: usize) -> Result<()> {
    ensure!(expected == actual, ChildCountSnafu { expected, actual });
    Ok(())
}

fn take_children<const N: usize>(children: Vec<DataSource>) -> Result<[DataSource; N]> {
    <[DataSource; N]>::try_from(children).map_err(|children| {
        ChildCountSnafu {
            expected: N,
            actual: children.len(),
        }
        .build()
    })
}

impl Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(table) => table.fmt(f),
            Self::GlobalTable(table) => table.fmt(f),
            Self::Query(query) => query.fmt(f),
            Self::Join(join) => join.fmt(f),
            Self::Filtered(filtered) => filtered.fmt(f),
            Self::Unnest(unnest) => unnest.fmt(f),
            Self::Union(union) => union.fmt(f),
        }
    }
}

impl From<TableDataSource> for DataSource {
    fn from(source: TableDataSource) -> Self {
        Self::Table(source)
    }
}

impl From<GlobalTableDataSource> for DataSource {
    fn from(source: GlobalTableDataSource) -> Self {
        Self::GlobalTable(source)
    }
}

impl From<QueryDataSource> for DataSource {
    fn from(source: QueryDataSource) -> Self {
        Self::Query(source)
    }
}

impl From<JoinDataSource> for DataSource {
    fn from(source: JoinDataSource) -> Self {
        Self::Join(source)
    }
}

impl From<FilteredDataSource> for DataSource {
    fn from(source: FilteredDataSource) -> Self {
        Self::Filtered(source)
    }
}

impl From<UnnestDataSource> for DataSource {
    fn from(source: UnnestDataSource) -> Self {
        Self::Unnest(source)
    }
}

impl From<UnionDataSource> for DataSource {
    fn from(source: UnionDataSource) -> Self {
        Self::Union(source)
    }
}

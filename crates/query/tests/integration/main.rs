use {
    def::{DimFilter, Interval, JoinType, VirtualColumn, VirtualColumns, TIME_COLUMN},
    join::{condition::JoinConditionAnalysis, HashJoinSegment, Joinable},
    query::{
        datasource::{
            DataSource, FilteredDataSource, JoinDataSource, QueryDataSource, UnnestDataSource,
        },
        factory::{JoinableFactory, JoinableFactoryWrapper},
        Error, GroupByQuery, Query, QueryContext, QuerySegmentSpec, ScanQuery, UnionQuery,
    },
    segment::{Filter, Segment, SegmentId, SegmentReference},
    serde_json::json,
    std::{
        any::Any,
        collections::{BTreeSet, HashSet},
        sync::{
            atomic::{AtomicU64, Ordering},
            Arc,
        },
    },
};

struct TestSegment(SegmentId);

impl Segment for TestSegment {
    fn id(&self) -> &SegmentId {
        &self.0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct FixedJoinable {
    columns: Vec<(&'static str, Vec<&'static str>)>,
}

impl Joinable for FixedJoinable {
    fn available_columns(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| (*name).into()).collect()
    }

    fn column_values(&self, column: &str, max: usize) -> Option<BTreeSet<String>> {
        let (_, values) = self.columns.iter().find(|(name, _)| *name == column)?;
        (values.len() <= max).then(|| values.iter().map(|value| (*value).into()).collect())
    }
}

// Resolves any named table into a small fixed joinable. Tables listed
// as uncacheable get no cache key.
struct CatalogFactory {
    uncacheable: &'static [&'static str],
}

impl JoinableFactory for CatalogFactory {
    fn build(
        &self,
        data_source: &DataSource,
        _condition: &JoinConditionAnalysis,
    ) -> Option<Arc<dyn Joinable>> {
        table_name(data_source)?;

        Some(Arc::new(FixedJoinable {
            columns: vec![("code", vec!["DE", "FR"]), ("iso", vec!["de", "fr"])],
        }))
    }

    fn compute_join_cache_key(
        &self,
        data_source: &DataSource,
        condition: &JoinConditionAnalysis,
    ) -> Option<Vec<u8>> {
        let name = table_name(data_source)?;
        if self.uncacheable.contains(&name) {
            return None;
        }

        Some(format!("{}|{}", name, condition.original_expression()).into_bytes())
    }
}

fn table_name(data_source: &DataSource) -> Option<&str> {
    match data_source {
        DataSource::Table(table) => Some(table.name()),
        DataSource::GlobalTable(table) => Some(table.name()),
        _ => None,
    }
}

fn factory(uncacheable: &'static [&'static str]) -> JoinableFactoryWrapper {
    JoinableFactoryWrapper::new(Arc::new(CatalogFactory { uncacheable }))
}

fn selector(dimension: &str, value: &str) -> DimFilter {
    DimFilter::Selector {
        dimension: dimension.into(),
        value: value.into(),
    }
}

fn time_bound() -> DimFilter {
    DimFilter::Bound {
        dimension: TIME_COLUMN.into(),
        lower: Some("0".into()),
        upper: None,
    }
}

fn scan(data_source: DataSource) -> Query {
    scan_with(data_source, &[], QueryContext::default())
}

fn scan_with(data_source: DataSource, columns: &[&str], context: QueryContext) -> Query {
    Query::Scan(ScanQuery {
        data_source,
        intervals: QuerySegmentSpec::eternity(),
        columns: columns.iter().map(|column| (*column).into()).collect(),
        filter: None,
        virtual_columns: VirtualColumns::empty(),
        context,
    })
}

fn join(
    left: DataSource,
    right: DataSource,
    prefix: &str,
    condition: &str,
    join_type: JoinType,
    left_filter: Option<DimFilter>,
    factory: Option<JoinableFactoryWrapper>,
) -> JoinDataSource {
    JoinDataSource::create(left, right, prefix, condition, join_type, left_filter, factory)
        .unwrap()
}

fn segment(table: &str) -> SegmentReference {
    Arc::new(TestSegment(SegmentId::new(
        table,
        Interval::new(0, 1000),
        0,
    )))
}

#[test]
fn flattening_walks_wrappers_down_to_the_base() {
    let inner = join(
        DataSource::table("flights"),
        DataSource::table("airports"),
        "a.",
        "origin == a.code",
        JoinType::Inner,
        Some(selector("active", "true")),
        None,
    );
    let wrapped = DataSource::Unnest(UnnestDataSource::new(
        DataSource::Filtered(FilteredDataSource::new(
            inner.into(),
            Some(selector("carrier", "AF")),
        )),
        VirtualColumn::new("tag", "mv_to_array(tags)"),
        None,
    ));
    let outer = join(
        wrapped,
        DataSource::table("codes"),
        "c.",
        "country == c.iso",
        JoinType::Left,
        None,
        None,
    );

    let analysis = outer.analysis();
    assert_eq!(analysis.base_data_source, DataSource::table("flights"));
    assert_eq!(
        analysis.join_base_table_filter,
        Some(selector("active", "true")),
    );

    let prefixes: Vec<_> = analysis
        .pre_joinable_clauses
        .iter()
        .map(|clause| clause.prefix.as_str())
        .collect();
    assert_eq!(prefixes, ["a.", "c."]);
    assert_eq!(
        analysis.pre_joinable_clauses[1].data_source,
        DataSource::table("codes"),
    );
}

#[test]
fn join_chains_rebuild_onto_a_replacement_base() {
    let inner = join(
        DataSource::table("flights"),
        DataSource::table("airports"),
        "a.",
        "origin == a.code",
        JoinType::Inner,
        Some(selector("active", "true")),
        None,
    );
    let outer = join(
        inner.into(),
        DataSource::table("codes"),
        "c.",
        "country == c.iso",
        JoinType::Left,
        None,
        None,
    );

    let updated = outer
        .with_updated_data_source(DataSource::global_table("flights_v2"))
        .unwrap();

    let rebuilt = match &updated {
        DataSource::Join(rebuilt) => rebuilt,
        other => panic!("expected a join, got {other}"),
    };

    let analysis = rebuilt.analysis();
    assert_eq!(
        analysis.base_data_source,
        DataSource::global_table("flights_v2"),
    );
    assert_eq!(
        analysis.join_base_table_filter,
        Some(selector("active", "true")),
    );

    let prefixes: Vec<_> = analysis
        .pre_joinable_clauses
        .iter()
        .map(|clause| clause.prefix.as_str())
        .collect();
    assert_eq!(prefixes, ["a.", "c."]);

    // The filter lands on the innermost rebuilt join.
    let innermost = match rebuilt.left() {
        DataSource::Join(innermost) => innermost,
        other => panic!("expected a join, got {other}"),
    };
    assert_eq!(innermost.left_filter(), Some(&selector("active", "true")));
    assert_eq!(rebuilt.left_filter(), None);
}

#[test]
fn structurally_equal_joins_share_a_cache_key() {
    let make = |join_type| {
        join(
            DataSource::table("flights"),
            DataSource::table("codes"),
            "c.",
            "code == c.code",
            join_type,
            None,
            Some(factory(&[])),
        )
    };

    let key = make(JoinType::Inner).cache_key().unwrap();
    assert!(!key.is_empty());
    assert_eq!(key, make(JoinType::Inner).cache_key().unwrap());
    assert_ne!(key, make(JoinType::Left).cache_key().unwrap());
}

#[test]
fn an_uncacheable_right_side_zeroes_the_cache_key() {
    let single = join(
        DataSource::table("flights"),
        DataSource::table("codes"),
        "c.",
        "code == c.code",
        JoinType::Inner,
        None,
        Some(factory(&["codes"])),
    );
    assert!(single.cache_key().unwrap().is_empty());

    // A later uncacheable clause zeroes the whole chain's key.
    let inner = join(
        DataSource::table("flights"),
        DataSource::table("airports"),
        "a.",
        "origin == a.code",
        JoinType::Inner,
        None,
        None,
    );
    let chained = join(
        inner.into(),
        DataSource::table("codes"),
        "c.",
        "country == c.iso",
        JoinType::Inner,
        None,
        Some(factory(&["codes"])),
    );
    assert!(chained.cache_key().unwrap().is_empty());
}

#[test]
fn the_base_filter_participates_in_the_cache_key() {
    let make = |left_filter| {
        join(
            DataSource::table("flights"),
            DataSource::table("codes"),
            "c.",
            "code == c.code",
            JoinType::Inner,
            left_filter,
            Some(factory(&[])),
        )
    };

    let unfiltered = make(None).cache_key().unwrap();
    let filtered = make(Some(selector("active", "true"))).cache_key().unwrap();

    assert!(!unfiltered.is_empty() && !filtered.is_empty());
    assert_ne!(unfiltered, filtered);
}

#[test]
fn composed_segments_expose_the_join_view() {
    let inner = join(
        DataSource::table("flights"),
        DataSource::table("airports"),
        "a.",
        "origin == a.code",
        JoinType::Inner,
        None,
        None,
    );
    let outer = join(
        inner.into(),
        DataSource::table("codes"),
        "c.",
        "country == c.iso",
        JoinType::Left,
        None,
        Some(factory(&[])),
    );

    let data_source = DataSource::from(outer);
    let query = scan(data_source.clone());
    let cpu = AtomicU64::new(0);
    let map_fn = data_source.create_segment_map_function(&query, &cpu).unwrap();

    let base = segment("flights");
    let mapped = map_fn(Arc::clone(&base));
    assert_eq!(mapped.id(), base.id());

    let view = mapped
        .as_any()
        .downcast_ref::<HashJoinSegment>()
        .expect("should map to a hash-join view");

    // The flattened clauses wrap the physical segment exactly once.
    assert!(Arc::ptr_eq(view.base(), &base));
    assert_eq!(view.clauses().len(), 2);
    assert_eq!(view.clauses()[0].prefix, "a.");
    assert_eq!(view.clauses()[1].prefix, "c.");
    assert!(view.base_filter().is_none());

    // One filter pre-analysis serves every segment mapped by this function.
    let second = map_fn(segment("flights_2"));
    let second_view = second.as_any().downcast_ref::<HashJoinSegment>().unwrap();
    assert!(Arc::ptr_eq(view.pre_analysis(), second_view.pre_analysis()));

    assert!(cpu.load(Ordering::Relaxed) > 0);
}

#[test]
fn projecting_only_base_columns_turns_joins_into_filters() {
    let data_source = DataSource::from(join(
        DataSource::table("flights"),
        DataSource::table("codes"),
        "c.",
        "country == c.code",
        JoinType::Inner,
        None,
        Some(factory(&[])),
    ));
    let query = scan_with(
        data_source.clone(),
        &["country", "origin"],
        QueryContext::default(),
    );

    let map_fn = data_source
        .create_segment_map_function(&query, &AtomicU64::new(0))
        .unwrap();
    let mapped = map_fn(segment("flights"));
    let view = mapped.as_any().downcast_ref::<HashJoinSegment>().unwrap();

    assert!(view.clauses().is_empty());
    assert_eq!(
        view.base_filter(),
        Some(&Filter::In {
            dimension: "country".into(),
            values: ["DE", "FR"].map(String::from).into_iter().collect(),
        }),
    );
}

#[test]
fn unprojected_queries_keep_their_join_clauses() {
    let data_source = DataSource::from(join(
        DataSource::table("flights"),
        DataSource::table("codes"),
        "c.",
        "country == c.code",
        JoinType::Inner,
        None,
        Some(factory(&[])),
    ));

    // No projection means the required column set is unknown.
    let query = scan(data_source.clone());
    let map_fn = data_source
        .create_segment_map_function(&query, &AtomicU64::new(0))
        .unwrap();
    let mapped = map_fn(segment("flights"));
    let view = mapped.as_any().downcast_ref::<HashJoinSegment>().unwrap();

    assert_eq!(view.clauses().len(), 1);
    assert!(view.base_filter().is_none());
}

#[test]
fn disabling_the_rewrite_keeps_the_join_clauses() {
    let data_source = DataSource::from(join(
        DataSource::table("flights"),
        DataSource::table("codes"),
        "c.",
        "country == c.code",
        JoinType::Inner,
        None,
        Some(factory(&[])),
    ));
    let context = QueryContext {
        enable_rewrite_join_to_filter: false,
        ..QueryContext::default()
    };
    let query = scan_with(data_source.clone(), &["country"], context);

    let map_fn = data_source
        .create_segment_map_function(&query, &AtomicU64::new(0))
        .unwrap();
    let mapped = map_fn(segment("flights"));
    let view = mapped.as_any().downcast_ref::<HashJoinSegment>().unwrap();

    assert_eq!(view.clauses().len(), 1);
    assert!(view.base_filter().is_none());
}

#[test]
fn group_by_queries_never_project_a_required_set() {
    let query = Query::GroupBy(GroupByQuery {
        data_source: DataSource::table("flights"),
        intervals: QuerySegmentSpec::eternity(),
        dimensions: vec!["country".into()],
        filter: None,
        virtual_columns: VirtualColumns::empty(),
        context: QueryContext::default(),
    });

    assert_eq!(query.required_columns(), None);
    assert_eq!(serde_json::to_value(&query).unwrap()["queryType"], "groupBy");
}

#[test]
fn query_wrappers_delegate_to_the_inner_query() {
    let join_source = DataSource::from(join(
        DataSource::table("flights"),
        DataSource::table("codes"),
        "c.",
        "country == c.code",
        JoinType::Inner,
        None,
        Some(factory(&[])),
    ));
    let inner_query = Query::Scan(ScanQuery {
        data_source: join_source,
        intervals: QuerySegmentSpec::new(vec![Interval::new(0, 1000)]),
        columns: vec!["country".into()],
        filter: None,
        virtual_columns: VirtualColumns::empty(),
        context: QueryContext::default(),
    });
    let wrapper = QueryDataSource::new(inner_query.clone());

    let analysis = wrapper.get_analysis().unwrap();
    assert_eq!(analysis.base_data_source, DataSource::table("flights"));
    assert_eq!(analysis.pre_joinable_clauses.len(), 1);
    assert_eq!(analysis.base_query, Some(inner_query.clone()));
    assert_eq!(
        analysis.base_query_segment_spec(),
        Some(&QuerySegmentSpec::new(vec![Interval::new(0, 1000)])),
    );

    // Nesting keeps the innermost query as the base query.
    let outer = QueryDataSource::new(scan(DataSource::Query(wrapper)));
    let analysis = outer.get_analysis().unwrap();
    assert_eq!(analysis.base_query, Some(inner_query));

    // Table names and globality read through the wrapper layers.
    let wrapped = DataSource::Query(outer);
    assert_eq!(wrapped.table_names(), HashSet::from(["flights", "codes"]));
    assert!(!wrapped.is_global());
    let broadcast = DataSource::Query(QueryDataSource::new(scan(
        DataSource::global_table("codes"),
    )));
    assert!(broadcast.is_global());
}

#[test]
fn union_sub_queries_cannot_be_analyzed() {
    let union_query = Query::Union(UnionQuery {
        queries: vec![scan(DataSource::table("flights"))],
        context: QueryContext::default(),
    });
    let wrapper = QueryDataSource::new(union_query);

    assert!(matches!(
        wrapper.get_analysis().unwrap_err(),
        Error::SubQueryNotAnalyzable { .. },
    ));
}

#[test]
fn time_filters_combine_asymmetrically() {
    let time_filtered =
        |name: &str| DataSource::Filtered(FilteredDataSource::new(DataSource::table(name), Some(time_bound())));

    // A query wrapper restricts time when either side does.
    let by_intervals = DataSource::Query(QueryDataSource::new(Query::Scan(ScanQuery {
        data_source: DataSource::table("flights"),
        intervals: QuerySegmentSpec::new(vec![Interval::new(0, 1000)]),
        columns: vec![],
        filter: None,
        virtual_columns: VirtualColumns::empty(),
        context: QueryContext::default(),
    })));
    assert!(by_intervals.has_time_filter());

    let by_source = DataSource::Query(QueryDataSource::new(scan(time_filtered("flights"))));
    assert!(by_source.has_time_filter());

    // A join restricts time only when both sides do.
    let one_sided = DataSource::from(join(
        time_filtered("flights"),
        DataSource::table("codes"),
        "c.",
        "country == c.code",
        JoinType::Inner,
        None,
        None,
    ));
    assert!(!one_sided.has_time_filter());

    let both_sided = DataSource::from(join(
        time_filtered("flights"),
        time_filtered("codes"),
        "c.",
        "country == c.code",
        JoinType::Inner,
        None,
        None,
    ));
    assert!(both_sided.has_time_filter());
}

#[test]
fn the_wire_format_round_trips() {
    let data_source = DataSource::from(join(
        DataSource::table("flights"),
        DataSource::global_table("codes"),
        "c.",
        "code == c.code",
        JoinType::Inner,
        Some(selector("active", "true")),
        Some(factory(&[])),
    ));

    let value = serde_json::to_value(&data_source).unwrap();
    assert_eq!(
        value,
        json!({
            "type": "join",
            "left": {"type": "table", "name": "flights"},
            "right": {"type": "globalTable", "name": "codes"},
            "rightPrefix": "c.",
            "condition": "code == c.code",
            "joinType": "INNER",
            "leftFilter": {"type": "selector", "dimension": "active", "value": "true"},
        }),
    );

    let restored: DataSource = serde_json::from_value(value).unwrap();
    assert_eq!(restored, data_source);

    let query = scan_with(DataSource::table("flights"), &["origin"], QueryContext::default());
    assert_eq!(
        serde_json::to_value(&query).unwrap(),
        json!({
            "queryType": "scan",
            "dataSource": {"type": "table", "name": "flights"},
            "intervals": [{"start": i64::MIN, "end": i64::MAX}],
            "columns": ["origin"],
            "context": {
                "enableJoinFilterPushDown": true,
                "enableJoinFilterRewrite": true,
                "enableRewriteJoinToFilter": true,
                "joinFilterRewriteMaxSize": 10000,
            },
        }),
    );

    let unnest = DataSource::Unnest(UnnestDataSource::new(
        DataSource::table("flights"),
        VirtualColumn::new("tag", "mv_to_array(tags)"),
        None,
    ));
    assert_eq!(
        serde_json::to_value(&unnest).unwrap(),
        json!({
            "type": "unnest",
            "base": {"type": "table", "name": "flights"},
            "virtualColumn": {"name": "tag", "expression": "mv_to_array(tags)"},
        }),
    );

    let union = DataSource::union(vec![DataSource::table("a"), DataSource::table("b")]);
    assert_eq!(
        serde_json::to_value(&union).unwrap(),
        json!({
            "type": "union",
            "dataSources": [
                {"type": "table", "name": "a"},
                {"type": "table", "name": "b"},
            ],
        }),
    );
}

#[test]
fn deserialized_joins_reattach_a_factory() {
    let data_source = DataSource::from(join(
        DataSource::table("flights"),
        DataSource::table("codes"),
        "c.",
        "code == c.code",
        JoinType::Inner,
        None,
        Some(factory(&[])),
    ));

    let json = serde_json::to_string(&data_source).unwrap();
    let restored: DataSource = serde_json::from_str(&json).unwrap();

    let restored_join = match restored {
        DataSource::Join(restored_join) => restored_join,
        other => panic!("expected a join, got {other}"),
    };
    assert!(matches!(
        restored_join.cache_key().unwrap_err(),
        Error::MissingJoinableFactory { .. },
    ));

    let key = restored_join
        .with_joinable_factory(factory(&[]))
        .cache_key()
        .unwrap();
    assert!(!key.is_empty());
}

#[test]
fn unions_offer_no_single_attachment_point() {
    let union = DataSource::union(vec![
        DataSource::table("flights"),
        DataSource::table("trains"),
    ]);

    assert!(matches!(
        union
            .with_updated_data_source(DataSource::table("boats"))
            .unwrap_err(),
        Error::NoAttachmentPoint { .. },
    ));
    assert!(matches!(
        union.with_children(vec![DataSource::table("boats")]).unwrap_err(),
        Error::ChildCount { expected: 2, actual: 1, .. },
    ));

    // Leaves swap themselves out; wrappers re-wrap the replacement.
    assert_eq!(
        DataSource::table("flights")
            .with_updated_data_source(DataSource::table("boats"))
            .unwrap(),
        DataSource::table("boats"),
    );
    let filtered = DataSource::Filtered(FilteredDataSource::new(
        DataSource::table("flights"),
        Some(selector("active", "true")),
    ));
    assert_eq!(
        filtered
            .with_updated_data_source(DataSource::table("boats"))
            .unwrap(),
        DataSource::Filtered(FilteredDataSource::new(
            DataSource::table("boats"),
            Some(selector("active", "true")),
        )),
    );
}

#[test]
fn cacheability_and_concreteness_follow_the_variant_rules() {
    let table = DataSource::table("flights");
    let global = DataSource::global_table("codes");
    let wrapper = DataSource::Query(QueryDataSource::new(scan(table.clone())));

    assert!(table.is_cacheable(false) && table.is_cacheable(true));
    assert!(global.is_cacheable(true) && !global.is_cacheable(false));
    assert!(!wrapper.is_cacheable(true));

    let mixed = DataSource::from(join(
        table.clone(),
        global.clone(),
        "c.",
        "code == c.code",
        JoinType::Inner,
        None,
        None,
    ));
    assert!(mixed.is_cacheable(true) && !mixed.is_cacheable(false));
    assert!(!mixed.is_global());
    assert!(!mixed.is_concrete());

    let broadcast_only = DataSource::from(join(
        global.clone(),
        DataSource::global_table("zones"),
        "z.",
        "code == z.code",
        JoinType::Inner,
        None,
        None,
    ));
    assert!(broadcast_only.is_global());

    let union = DataSource::union(vec![table.clone(), global.clone()]);
    assert!(union.is_concrete());

    assert_eq!(table.cache_key().unwrap(), Some(Vec::new()));
    assert_eq!(
        DataSource::Filtered(FilteredDataSource::new(table, None)).cache_key().unwrap(),
        None,
    );
}

use {snafu::prelude::*, std::backtrace::Backtrace};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("expected [{}] children, got [{}]", expected, actual))]
    ChildCount {
        expected: usize,
        actual: usize,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "left filter is only supported if left data source is direct table access, got: {}",
        data_source
    ))]
    LeftFilterNotSupported {
        data_source: String,
        backtrace: Backtrace,
    },

    #[snafu(display("invalid join prefix"))]
    Prefix {
        #[snafu(backtrace)]
        source: join::prefix::Error,
    },

    #[snafu(display("invalid join condition"))]
    Condition {
        #[snafu(backtrace)]
        source: join::condition::Error,
    },

    #[snafu(display(r#"cannot analyze a subquery of kind "{}""#, kind))]
    SubQueryNotAnalyzable { kind: String, backtrace: Backtrace },

    #[snafu(display("no join clauses to build a cache key for data source [{}]", data_source))]
    NoJoinClauses {
        data_source: String,
        backtrace: Backtrace,
    },

    #[snafu(display(r#"cannot join data source "{}""#, data_source))]
    NotJoinable {
        data_source: String,
        backtrace: Backtrace,
    },

    #[snafu(display("join over {} has no joinable factory attached", data_source))]
    MissingJoinableFactory {
        data_source: String,
        backtrace: Backtrace,
    },

    #[snafu(display("a union data source has no single attachment point to update"))]
    NoAttachmentPoint { backtrace: Backtrace },

    #[snafu(display("cannot replace the data source of a union query"))]
    UnionQueryDataSource { backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, Error>;

use {def::TIME_COLUMN, snafu::prelude::*, std::backtrace::Backtrace};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("join clause cannot have an empty prefix"))]
    EmptyPrefix { backtrace: Backtrace },

    #[snafu(display(
        r#"join clause cannot have prefix "{}", since it would shadow the {} column"#,
        prefix,
        TIME_COLUMN
    ))]
    ShadowsTimeColumn { prefix: String, backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn validate_prefix(prefix: &str) -> Result<()> {
    ensure!(!prefix.is_empty(), EmptyPrefixSnafu);
    ensure!(
        prefix != TIME_COLUMN && !is_prefixed_by(TIME_COLUMN, prefix),
        ShadowsTimeColumnSnafu { prefix }
    );

    Ok(())
}

// A bare prefix is not a member of its own namespace.
pub fn is_prefixed_by(column: &str, prefix: &str) -> bool {
    column.len() > prefix.len() && column.starts_with(prefix)
}

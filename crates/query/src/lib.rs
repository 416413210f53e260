pub mod context;
pub mod datasource;
mod error;
pub mod factory;
pub mod planning;
mod query;

pub use {
    context::QueryContext,
    error::{Error, Result},
    query::{GroupByQuery, Query, QuerySegmentSpec, ScanQuery, UnionQuery},
};

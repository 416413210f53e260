mod analysis;
mod clause;

pub use self::{analysis::DataSourceAnalysis, clause::PreJoinableClause};

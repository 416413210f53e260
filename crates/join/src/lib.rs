pub mod condition;
mod expr;
pub mod filter;
mod hash_join;
mod joinable;
pub mod prefix;

pub use {
    condition::{EquiCondition, JoinConditionAnalysis},
    expr::Expr,
    hash_join::HashJoinSegment,
    joinable::{Joinable, JoinableClause},
};

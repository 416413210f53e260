pub mod cache;
mod filter;
mod interval;
mod join;
mod virtual_column;

pub use {
    filter::DimFilter,
    interval::{Interval, ETERNITY},
    join::JoinType,
    virtual_column::{VirtualColumn, VirtualColumns},
};

// Reserved name of the time column every segment carries. Join prefixes
// must never shadow it.
pub const TIME_COLUMN: &str = "__time";

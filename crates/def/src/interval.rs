use {
    common::pub_fields_struct,
    core::fmt::{self, Display},
    serde::{Deserialize, Serialize},
};

/// A query restricted to exactly this interval is considered unfiltered
/// on time.
pub const ETERNITY: Interval = Interval {
    start: i64::MIN,
    end: i64::MAX,
};

pub_fields_struct! {
    // Half-open [start, end) range of epoch milliseconds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    struct Interval {
        start: i64,
        end: i64,
    }
}

impl Interval {
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub const fn is_eternity(&self) -> bool {
        self.start == ETERNITY.start && self.end == ETERNITY.end
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

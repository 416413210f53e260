use {
    super::DataSource,
    def::{DimFilter, TIME_COLUMN},
    serde::{Deserialize, Serialize},
    std::fmt::{self, Display},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilteredDataSource {
    base: Box<DataSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filter: Option<DimFilter>,
}

impl FilteredDataSource {
    pub fn new(base: DataSource, filter: Option<DimFilter>) -> Self {
        Self {
            base: Box::new(base),
            filter,
        }
    }

    pub fn base(&self) -> &DataSource {
        &self.base
    }

    pub fn filter(&self) -> Option<&DimFilter> {
        self.filter.as_ref()
    }

    pub fn has_time_filter(&self) -> bool {
        self.base.has_time_filter()
            || self
                .filter
                .as_ref()
                .map_or(false, |filter| filter.references(TIME_COLUMN))
    }
}

impl Display for FilteredDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter({})", self.base)
    }
}

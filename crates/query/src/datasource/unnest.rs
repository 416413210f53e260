use {
    super::DataSource,
    def::{DimFilter, VirtualColumn},
    serde::{Deserialize, Serialize},
    std::fmt::{self, Display},
};

// Expands rows by unnesting a multi-value expression column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnnestDataSource {
    base: Box<DataSource>,
    virtual_column: VirtualColumn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unnest_filter: Option<DimFilter>,
}

impl UnnestDataSource {
    pub fn new(
        base: DataSource,
        virtual_column: VirtualColumn,
        unnest_filter: Option<DimFilter>,
    ) -> Self {
        Self {
            base: Box::new(base),
            virtual_column,
            unnest_filter,
        }
    }

    pub fn base(&self) -> &DataSource {
        &self.base
    }

    pub fn virtual_column(&self) -> &VirtualColumn {
        &self.virtual_column
    }

    pub fn unnest_filter(&self) -> Option<&DimFilter> {
        self.unnest_filter.as_ref()
    }

    pub fn rebased(&self, base: DataSource) -> Self {
        Self::new(
            base,
            self.virtual_column.clone(),
            self.unnest_filter.clone(),
        )
    }
}

impl Display for UnnestDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unnest({})", self.base)
    }
}

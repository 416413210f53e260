use {
    super::DataSource,
    serde::{Deserialize, Serialize},
    std::fmt::{self, Display},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnionDataSource {
    data_sources: Vec<DataSource>,
}

impl UnionDataSource {
    pub fn new(data_sources: Vec<DataSource>) -> Self {
        Self { data_sources }
    }

    pub fn members(&self) -> &[DataSource] {
        &self.data_sources
    }
}

impl Display for UnionDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("union(")?;
        for (i, member) in self.data_sources.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            member.fmt(f)?;
        }
        f.write_str(")")
    }
}

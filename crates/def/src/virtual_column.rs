use {
    common::pub_fields_struct,
    serde::{Deserialize, Serialize},
};

pub_fields_struct! {
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    struct VirtualColumn {
        name: String,
        expression: String,
    }
}

impl VirtualColumn {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
        }
    }
}

/// The ordered virtual-column set of a query. Opaque to join analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualColumns(Vec<VirtualColumn>);

impl VirtualColumns {
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn new(columns: Vec<VirtualColumn>) -> Self {
        Self(columns)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VirtualColumn> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|column| column.name.as_str())
    }
}

use {def::DimFilter, std::collections::BTreeSet};

/// Runtime form of a filter, ready to hand to the scan engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Selector {
        dimension: String,
        value: String,
    },

    In {
        dimension: String,
        values: BTreeSet<String>,
    },

    Bound {
        dimension: String,
        lower: Option<String>,
        upper: Option<String>,
    },

    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Conjoins the filters that are present. A single survivor stays
    /// unwrapped.
    pub fn maybe_and(filters: Vec<Option<Filter>>) -> Option<Filter> {
        let mut present: Vec<_> = filters.into_iter().flatten().collect();

        match present.len() {
            0 => None,
            1 => present.pop(),
            _ => Some(Self::And(present)),
        }
    }
}

impl From<&DimFilter> for Filter {
    fn from(filter: &DimFilter) -> Self {
        match filter {
            DimFilter::Selector { dimension, value } => Self::Selector {
                dimension: dimension.clone(),
                value: value.clone(),
            },
            DimFilter::In { dimension, values } => Self::In {
                dimension: dimension.clone(),
                values: values.clone(),
            },
            DimFilter::Bound {
                dimension,
                lower,
                upper,
            } => Self::Bound {
                dimension: dimension.clone(),
                lower: lower.clone(),
                upper: upper.clone(),
            },
            DimFilter::And { fields } => Self::And(fields.iter().map(Into::into).collect()),
            DimFilter::Or { fields } => Self::Or(fields.iter().map(Into::into).collect()),
            DimFilter::Not { field } => Self::Not(Box::new(field.as_ref().into())),
        }
    }
}

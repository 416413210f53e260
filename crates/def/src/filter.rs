use {
    crate::cache::{CacheKeyBuilder, Cacheable},
    serde::{Deserialize, Serialize},
    std::collections::BTreeSet,
};

const SELECTOR_CACHE_ID: u8 = 0x0;
const IN_CACHE_ID: u8 = 0x1;
const BOUND_CACHE_ID: u8 = 0x2;
const AND_CACHE_ID: u8 = 0x3;
const OR_CACHE_ID: u8 = 0x4;
const NOT_CACHE_ID: u8 = 0x5;

/// Filter model carried by queries; compiled into the runtime form at
/// the segment layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DimFilter {
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
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lower: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upper: Option<String>,
    },

    And {
        fields: Vec<DimFilter>,
    },

    Or {
        fields: Vec<DimFilter>,
    },

    Not {
        field: Box<DimFilter>,
    },
}

impl DimFilter {
    pub fn references(&self, column: &str) -> bool {
        match self {
            Self::Selector { dimension, .. }
            | Self::In { dimension, .. }
            | Self::Bound { dimension, .. } => dimension == column,
            Self::And { fields } | Self::Or { fields } => {
                fields.iter().any(|field| field.references(column))
            }
            Self::Not { field } => field.references(column),
        }
    }

    fn composite_key(id: u8, fields: &[DimFilter]) -> Vec<u8> {
        let mut builder = CacheKeyBuilder::new(id);
        for field in fields {
            builder = builder.append_cacheable(field);
        }
        builder.build()
    }
}

impl Cacheable for DimFilter {
    fn cache_key(&self) -> Vec<u8> {
        match self {
            Self::Selector { dimension, value } => CacheKeyBuilder::new(SELECTOR_CACHE_ID)
                .append_string(dimension)
                .append_string(value)
                .build(),
            Self::In { dimension, values } => CacheKeyBuilder::new(IN_CACHE_ID)
                .append_string(dimension)
                .append_strings(values.iter().map(String::as_str))
                .build(),
            Self::Bound {
                dimension,
                lower,
                upper,
            } => {
                let mut builder = CacheKeyBuilder::new(BOUND_CACHE_ID).append_string(dimension);
                for edge in [lower, upper] {
                    builder = match edge {
                        Some(value) => builder.append_byte(1).append_string(value),
                        None => builder.append_byte(0),
                    };
                }
                builder.build()
            }
            Self::And { fields } => Self::composite_key(AND_CACHE_ID, fields),
            Self::Or { fields } => Self::composite_key(OR_CACHE_ID, fields),
            Self::Not { field } => CacheKeyBuilder::new(NOT_CACHE_ID)
                .append_cacheable(field.as_ref())
                .build(),
        }
    }
}

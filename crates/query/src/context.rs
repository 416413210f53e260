use {
    join::filter::{JoinFilterRewriteConfig, DEFAULT_FILTER_REWRITE_MAX_SIZE},
    serde::{Deserialize, Serialize},
};

// Unknown context keys are dropped on deserialization, missing ones fall
// back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryContext {
    pub enable_join_filter_push_down: bool,
    pub enable_join_filter_rewrite: bool,
    pub enable_rewrite_join_to_filter: bool,
    pub join_filter_rewrite_max_size: usize,
}

impl Default for QueryContext {
    fn default() -> Self {
        Self {
            enable_join_filter_push_down: true,
            enable_join_filter_rewrite: true,
            enable_rewrite_join_to_filter: true,
            join_filter_rewrite_max_size: DEFAULT_FILTER_REWRITE_MAX_SIZE,
        }
    }
}

impl QueryContext {
    pub fn filter_rewrite_config(&self) -> JoinFilterRewriteConfig {
        JoinFilterRewriteConfig {
            enable_filter_push_down: self.enable_join_filter_push_down,
            enable_filter_rewrite: self.enable_join_filter_rewrite,
            enable_rewrite_join_to_filter: self.enable_rewrite_join_to_filter,
            filter_rewrite_max_size: self.join_filter_rewrite_max_size,
        }
    }
}

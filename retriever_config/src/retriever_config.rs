use crate::groups;

/// Primary configuration struct containing all config sections
#[derive(Debug, Clone, Default)]
pub struct RetrieverConfig {
    pub client: groups::client::ConfigValues,
    pub cache: groups::cache::ConfigValues,
    pub log: groups::log::ConfigValues,
}

impl RetrieverConfig {
    /// Create a new RetrieverConfig instance with default values and environment variable overrides applied.
    /// This is equivalent to `RetrieverConfig::default().with_env_overrides()`.
    pub fn new() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment variable overrides to all configuration sections.
    /// Environment variables follow the pattern: IPFS_RETRIEVER_{GROUP_NAME}_{FIELD_NAME}
    pub fn with_env_overrides(mut self) -> Self {
        self.client.apply_env_overrides();
        self.cache.apply_env_overrides();
        self.log.apply_env_overrides();
        self
    }

    /// All environment variable names this configuration reads.
    pub fn env_var_names() -> impl Iterator<Item = &'static str> {
        groups::client::ConfigValues::env_var_names()
            .iter()
            .chain(groups::cache::ConfigValues::env_var_names())
            .chain(groups::log::ConfigValues::env_var_names())
            .copied()
    }
}

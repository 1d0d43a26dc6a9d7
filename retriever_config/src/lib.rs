mod aliases;
pub use aliases::ENVIRONMENT_NAME_ALIASES;

pub mod macros;
pub mod retriever_config;

pub mod groups;

mod types;
pub use types::{ApiFlavor, BackoffStrategy};
// Re-exported for use by the config_group macro
pub use utils::configuration_utils::ParsableConfigValue;
pub use retriever_config::RetrieverConfig;

pub type ClientConfig = groups::client::ConfigValues;
pub type CacheConfig = groups::cache::ConfigValues;
pub type LogConfig = groups::log::ConfigValues;

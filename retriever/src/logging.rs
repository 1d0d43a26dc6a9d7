use retriever_config::LogConfig;
use tracing_subscriber::EnvFilter;

use crate::errors::{RetrievalError, Result};

/// Install a global `tracing` subscriber writing to stderr, for binaries.
///
/// The library itself only emits events; nothing is printed unless the embedding program installs a subscriber,
/// through this function or its own.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| RetrievalError::ConfigurationError(format!("invalid log filter {:?}: {e}", config.filter)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.with_ansi(config.ansi).try_init()
    };

    installed.map_err(|e| RetrievalError::ConfigurationError(format!("failed to install log subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_rejected() {
        let mut config = LogConfig::default();
        config.filter = "retriever=notalevel".into();
        assert!(matches!(init_logging(&config), Err(RetrievalError::ConfigurationError(_))));
    }
}

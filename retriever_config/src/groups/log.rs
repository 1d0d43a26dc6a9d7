crate::config_group!({

    /// Filter directives for the log subscriber, in `tracing_subscriber::EnvFilter` syntax.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_LOG_FILTER` (or `RUST_LOG`) to set this value.
    ref filter: String = "warn".to_string();

    /// Emit logs as JSON lines instead of human readable text.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_LOG_JSON` to set this value.
    ref json: bool = false;

    /// Include ANSI colors in human readable output.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_LOG_ANSI` to set this value.
    ref ansi: bool = true;
});

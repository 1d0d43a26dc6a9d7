use utils::ByteSize;

crate::config_group!({

    /// Keep fetched payloads in memory, keyed by address, and coalesce concurrent fetches of one address.
    ///
    /// The default value is false.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CACHE_ENABLED` to set this value.
    ref enabled: bool = false;

    /// The maximum number of payloads held in the cache.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CACHE_MAX_ENTRIES` to set this value.
    ref max_entries: usize = 256;

    /// Payloads larger than this are returned to the caller but not cached.
    ///
    /// The default value is 1MiB.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CACHE_MAX_ENTRY_SIZE` to set this value.
    ref max_entry_size: ByteSize = ByteSize::mib(1);
});

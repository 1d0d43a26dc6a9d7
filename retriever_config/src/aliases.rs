/// Alternative environment variable names, checked in order when the primary name is unset.
pub const ENVIRONMENT_NAME_ALIASES: &[(&str, &str)] = &[
    ("IPFS_RETRIEVER_CLIENT_ENDPOINT", "IPFS_GATEWAY"),
    ("IPFS_RETRIEVER_CLIENT_ENDPOINT", "IPFS_API_URL"),
    ("IPFS_RETRIEVER_LOG_FILTER", "RUST_LOG"),
];

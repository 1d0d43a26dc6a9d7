use std::fmt;
use std::path::PathBuf;

use retriever_config::{ApiFlavor, ClientConfig};

/// Where payloads are retrieved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A node's path gateway.
    Gateway(String),
    /// A node's RPC API.
    Rpc(String),
    /// A directory store on the local file system.
    FileSystem(PathBuf),
}

impl Endpoint {
    pub fn from_config(config: &ClientConfig) -> Self {
        // Intercept local:// to read from a directory store instead of the network.
        // This is useful for testing and development.
        if let Some(local_path) = config.endpoint.strip_prefix("local://") {
            return Endpoint::FileSystem(PathBuf::from(local_path));
        }

        match config.api {
            ApiFlavor::Gateway => Endpoint::Gateway(config.endpoint.clone()),
            ApiFlavor::Rpc => Endpoint::Rpc(config.endpoint.clone()),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Gateway(url) => write!(f, "gateway {url}"),
            Endpoint::Rpc(url) => write!(f, "rpc {url}"),
            Endpoint::FileSystem(path) => write!(f, "local://{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_config() {
        let mut config = ClientConfig::default();
        assert_eq!(Endpoint::from_config(&config), Endpoint::Gateway("http://127.0.0.1:8080".into()));

        config.api = ApiFlavor::Rpc;
        config.endpoint = "http://127.0.0.1:5001".into();
        assert_eq!(Endpoint::from_config(&config), Endpoint::Rpc("http://127.0.0.1:5001".into()));

        config.endpoint = "local:///tmp/store".into();
        let endpoint = Endpoint::from_config(&config);
        assert_eq!(endpoint, Endpoint::FileSystem(PathBuf::from("/tmp/store")));
        assert_eq!(endpoint.to_string(), "local:///tmp/store");
    }
}

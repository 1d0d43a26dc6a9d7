use std::sync::Arc;

use ipfs_client::{LocalClient, RemoteClient, StorageClient};
use retriever_config::ClientConfig;
use tracing::info;

use crate::configurations::Endpoint;
use crate::errors::Result;

pub(crate) fn create_storage_client(config: &ClientConfig) -> Result<Arc<dyn StorageClient>> {
    let endpoint = Endpoint::from_config(config);
    info!(%endpoint, "Creating storage client");

    match endpoint {
        Endpoint::Gateway(_) | Endpoint::Rpc(_) => Ok(RemoteClient::new(config)?),
        Endpoint::FileSystem(ref path) => {
            std::fs::create_dir_all(path)?;
            Ok(LocalClient::new(path)?)
        },
    }
}

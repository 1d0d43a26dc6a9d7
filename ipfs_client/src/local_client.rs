use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use cid_codec::{ContentIdentifier, NativeAddress, encode, identifier_of};
use sha2::{Digest, Sha256};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, error};

use crate::error::{IpfsClientError, Result};
use crate::interface::StorageClient;

/// A directory-backed content store, for local development and tests.
///
/// Each payload is stored in its own file named after the CIDv0 form of its address, so v0 and v1 addresses of the
/// same digest resolve to the same entry.
pub struct LocalClient {
    base_dir: PathBuf,
    _tmp_dir: Option<TempDir>, // Must be last
}

impl LocalClient {
    /// Create a local client hosted in a temporary directory for testing.
    pub fn temporary() -> Result<Arc<Self>> {
        let tmp_dir = TempDir::new()?;
        let path = tmp_dir.path().to_owned();
        Ok(Arc::new(Self::new_internal(path, Some(tmp_dir))?))
    }

    /// Create a local client hosted in a directory. The directory persists across instances of LocalClient.
    pub fn new(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new_internal(path, None)?))
    }

    fn new_internal(path: impl AsRef<Path>, tmp_dir: Option<TempDir>) -> Result<Self> {
        let base_dir = std::path::absolute(path)?;
        if !base_dir.exists() {
            std::fs::create_dir_all(&base_dir)?;
        }

        Ok(Self {
            base_dir,
            _tmp_dir: tmp_dir,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn get_path_for_entry(&self, address: &NativeAddress) -> Result<PathBuf> {
        let canonical = encode(&identifier_of(address)?)?;
        Ok(self.base_dir.join(canonical.to_string()))
    }

    /// Store `data` under the address of its sha2-256 digest, returning that address.
    pub async fn put(&self, data: &[u8]) -> Result<NativeAddress> {
        let digest: [u8; 32] = Sha256::digest(data).into();
        let address = encode(&ContentIdentifier::from_bytes(digest))?;
        let path = self.get_path_for_entry(&address)?;

        if tokio::fs::try_exists(&path).await? {
            debug!("{address} already present in local store");
            return Ok(address);
        }

        // Write to a uniquely named file then rename so readers never see a partial entry.
        let base_dir = self.base_dir.clone();
        let contents = data.to_vec();
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = NamedTempFile::new_in(&base_dir)?;
            tmp.write_all(&contents)?;
            match tmp.persist(&target) {
                Ok(_) => Ok(()),
                // Another writer stored the same content first.
                Err(_) if target.is_file() => Ok(()),
                Err(e) => Err(e.error.into()),
            }
        })
        .await
        .map_err(IpfsClientError::internal)??;

        debug!(%address, size = data.len(), "Stored entry in local store");
        Ok(address)
    }

    /// Returns the addresses of all entries in the store.
    pub fn get_all_entries(&self) -> Result<Vec<NativeAddress>> {
        let entries = self
            .base_dir
            .read_dir()?
            .filter_map(|x| x.ok())
            .filter_map(|x| x.file_name().into_string().ok())
            .filter_map(|name| match name.parse::<NativeAddress>() {
                Ok(address) => Some(address),
                Err(_) => {
                    debug!("File '{name:?}' in local store not in valid format, ignoring.");
                    None
                },
            })
            .collect();
        Ok(entries)
    }

    pub fn contains(&self, address: &NativeAddress) -> bool {
        self.get_path_for_entry(address).is_ok_and(|p| p.is_file())
    }

    /// Deletes an entry. Deleting an absent entry is not an error.
    pub fn delete(&self, address: &NativeAddress) -> Result<()> {
        match std::fs::remove_file(self.get_path_for_entry(address)?) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl StorageClient for LocalClient {
    async fn get(&self, address: &NativeAddress) -> Result<Bytes> {
        let file_path = self.get_path_for_entry(address)?;

        match tokio::fs::read(&file_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(IpfsClientError::NotFound(format!("{address} not in local store {:?}", self.base_dir)))
            },
            Err(e) => {
                error!("Unable to read {file_path:?} from local store: {e}");
                Err(e.into())
            },
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use cid_codec::{ContentCodec, encode_v1};

    use super::*;

    #[tokio::test]
    async fn test_basic_put_get() {
        let client = LocalClient::temporary().unwrap();
        let address = client.put(br#"{"value": 42}"#).await.unwrap();

        let returned_data = client.get(&address).await.unwrap();
        assert_eq!(&returned_data[..], br#"{"value": 42}"#);
        assert!(client.contains(&address));
    }

    #[tokio::test]
    async fn test_address_is_digest_of_content() {
        let client = LocalClient::temporary().unwrap();
        let address = client.put(b"hello world").await.unwrap();

        // sha2-256("hello world")
        let expected =
            ContentIdentifier::from_hex("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9").unwrap();
        assert_eq!(identifier_of(&address).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_v1_address_reads_same_entry() {
        let client = LocalClient::temporary().unwrap();
        let address = client.put(b"payload").await.unwrap();
        let v1 = encode_v1(&identifier_of(&address).unwrap(), ContentCodec::Raw).unwrap();

        assert_eq!(&client.get(&v1).await.unwrap()[..], b"payload");
    }

    #[tokio::test]
    async fn test_missing_entry() {
        let client = LocalClient::temporary().unwrap();
        let address = encode(&ContentIdentifier::from_bytes([3u8; 32])).unwrap();

        let result = client.get(&address).await;
        assert!(matches!(result, Err(IpfsClientError::NotFound(_))));
        assert!(!client.contains(&address));
    }

    #[tokio::test]
    async fn test_entries_and_delete() {
        let client = LocalClient::temporary().unwrap();
        let hello = client.put(b"hello").await.unwrap();

        // put the same value a second time. This should be ok.
        assert_eq!(client.put(b"hello").await.unwrap(), hello);
        let world = client.put(b"world").await.unwrap();

        let mut entries = client.get_all_entries().unwrap();
        entries.sort_by_key(|a| a.to_string());
        let mut expected = vec![hello, world];
        expected.sort_by_key(|a| a.to_string());
        assert_eq!(entries, expected);

        client.delete(&hello).unwrap();
        // we can delete non-existent things
        client.delete(&hello).unwrap();

        assert_eq!(client.get_all_entries().unwrap(), vec![world]);
        assert!(matches!(client.get(&hello).await, Err(IpfsClientError::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_of_same_content() {
        let client = LocalClient::temporary().unwrap();

        for round in 0..20u32 {
            let data = format!("{{\"round\": {round}}}").into_bytes();
            let tasks: Vec<_> = (0..8)
                .map(|_| {
                    let client = client.clone();
                    let data = data.clone();
                    tokio::spawn(async move { client.put(&data).await })
                })
                .collect();

            let mut addresses = Vec::new();
            for t in tasks {
                addresses.push(t.await.unwrap().unwrap());
            }
            addresses.dedup();
            assert_eq!(addresses.len(), 1);
            assert_eq!(&client.get(&addresses[0]).await.unwrap()[..], &data[..]);
        }

        // No temporary files left behind.
        let files = std::fs::read_dir(client.base_dir()).unwrap().count();
        assert_eq!(files, 20);
        assert_eq!(client.get_all_entries().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let address = LocalClient::new(dir.path()).unwrap().put(b"kept").await.unwrap();

        let reopened = LocalClient::new(dir.path()).unwrap();
        assert_eq!(&reopened.get(&address).await.unwrap()[..], b"kept");
    }
}

use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::debug;
use rst_common::with_tokio::tokio::sync::Mutex;

use rstdev_storage::engine::rocksdb::executor::Executor;
use rstdev_storage::engine::rocksdb::types::{
    Instruction as DbInstruction, OutputOpts as DbOutput,
};

use prople_courier_core::store::types::{Namespace, StoreBuilder, StoreError};

use crate::db::{index_key, Bucket, DbError};

/// `RocksStore` keeps every namespace inside a single RocksDB column family
///
/// Values are stored under `{namespace}:{key}`. Each namespace also owns an index bucket,
/// appended through the `merge_index` operator, which is the source of `keys` and `values`.
/// Keys are listed in their first insertion order.
#[derive(Clone)]
pub struct RocksStore {
    db: Executor,
    index_lock: Arc<Mutex<()>>,
}

impl RocksStore {
    pub fn new(db: Executor) -> Self {
        Self {
            db,
            index_lock: Arc::new(Mutex::new(())),
        }
    }

    fn build_entry_key(&self, namespace: Namespace, key: &str) -> String {
        format!("{}:{}", namespace.as_str(), key)
    }

    async fn get_raw(&self, key: String) -> Result<Option<Vec<u8>>, StoreError> {
        let output = self
            .db
            .exec(DbInstruction::GetCf { key })
            .await
            .map_err(|err| StoreError::StoreUnavailable(err.to_string()))?;

        match output {
            DbOutput::SingleByte { value } => Ok(value),
            _ => Err(StoreError::StoreUnavailable(
                "unknown output type".to_string(),
            )),
        }
    }
}

#[async_trait]
impl StoreBuilder for RocksStore {
    async fn get(&self, namespace: Namespace, key: String) -> Result<Option<Vec<u8>>, StoreError> {
        self.get_raw(self.build_entry_key(namespace, &key)).await
    }

    async fn set(&self, namespace: Namespace, key: String, value: Vec<u8>) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::ValidationError("store: key is empty".to_string()));
        }

        let entry_key = self.build_entry_key(namespace, &key);

        let _guard = self.index_lock.lock().await;
        let exists = self.get_raw(entry_key.clone()).await?.is_some();

        let _ = self
            .db
            .exec(DbInstruction::SaveCf {
                key: entry_key,
                value,
            })
            .await
            .map_err(|err| StoreError::StoreUnavailable(err.to_string()))?;

        if !exists {
            let _ = self
                .db
                .exec(DbInstruction::MergeCf {
                    key: index_key(namespace.as_str()),
                    value: key.clone().into_bytes(),
                })
                .await
                .map_err(|err| StoreError::StoreUnavailable(err.to_string()))?;

            debug!("store: {} indexed in {}", key, namespace);
        }

        Ok(())
    }

    async fn keys(&self, namespace: Namespace) -> Result<Vec<String>, StoreError> {
        let index = self.get_raw(index_key(namespace.as_str())).await?;
        let keys = match index {
            Some(bytes) => {
                let bucket: Bucket<String> = bytes
                    .try_into()
                    .map_err(|err: DbError| StoreError::StoreUnavailable(err.to_string()))?;

                bucket.items()
            }
            None => Vec::new(),
        };

        Ok(keys)
    }

    async fn values(&self, namespace: Namespace) -> Result<Vec<Vec<u8>>, StoreError> {
        let keys = self.keys(namespace).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let entry_keys = keys
            .iter()
            .map(|key| self.build_entry_key(namespace, key))
            .collect();

        let output = self
            .db
            .exec(DbInstruction::MultiGetCf { keys: entry_keys })
            .await
            .map_err(|err| StoreError::StoreUnavailable(err.to_string()))?;

        match output {
            DbOutput::MultiBytes { values } => {
                let mut collected = Vec::new();
                for value in values {
                    let bytes = value.map_err(|err| StoreError::StoreUnavailable(err.to_string()))?;
                    if let Some(bytes) = bytes {
                        collected.push(bytes);
                    }
                }

                Ok(collected)
            }
            _ => Err(StoreError::StoreUnavailable(
                "unknown output type".to_string(),
            )),
        }
    }
}

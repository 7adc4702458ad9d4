use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_tokio::tokio::sync::RwLock;

use super::types::{Namespace, StoreBuilder, StoreError};

type Buckets = HashMap<Namespace, BTreeMap<String, Vec<u8>>>;

/// `MemoryStore` keeps all namespaces in process memory
///
/// Cloning it shares the same underlying data. Keys are always listed in their
/// lexical order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    buckets: Arc<RwLock<Buckets>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBuilder for MemoryStore {
    async fn get(&self, namespace: Namespace, key: String) -> Result<Option<Vec<u8>>, StoreError> {
        let buckets = self.buckets.read().await;
        let value = buckets
            .get(&namespace)
            .and_then(|bucket| bucket.get(&key))
            .cloned();

        Ok(value)
    }

    async fn set(&self, namespace: Namespace, key: String, value: Vec<u8>) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::ValidationError("store: key is empty".to_string()));
        }

        let mut buckets = self.buckets.write().await;
        buckets.entry(namespace).or_default().insert(key, value);
        Ok(())
    }

    async fn keys(&self, namespace: Namespace) -> Result<Vec<String>, StoreError> {
        let buckets = self.buckets.read().await;
        let keys = buckets
            .get(&namespace)
            .map(|bucket| bucket.keys().cloned().collect())
            .unwrap_or_default();

        Ok(keys)
    }

    async fn values(&self, namespace: Namespace) -> Result<Vec<Vec<u8>>, StoreError> {
        let buckets = self.buckets.read().await;
        let values = buckets
            .get(&namespace)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default();

        Ok(values)
    }
}

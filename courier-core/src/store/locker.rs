use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use rst_common::with_tokio::tokio::sync::{Mutex, OwnedMutexGuard};

/// `KeyLocker` serializes operations that target the same logical key
///
/// Operations on different keys never wait for each other. The returned guard keeps
/// the key locked until it is dropped.
#[derive(Clone, Default)]
pub struct KeyLocker {
    locks: Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl KeyLocker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            locks.entry(key.to_string()).or_default().clone()
        };

        lock.lock_owned().await
    }
}

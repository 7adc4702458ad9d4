use rstdev_storage::engine::rocksdb::lib::rust_rocksdb::merge_operator::MergeOperands;

use super::{Bucket, DbError};

pub const MERGE_INDEX_ID: &str = "merge_index";

/// `merge_index` appends namespace keys into the index bucket stored under a `merge_index:` key
///
/// Values stored under any other key are kept untouched
pub fn merge_index(
    new_key: &[u8],
    existing: Option<&[u8]>,
    operands: &MergeOperands,
) -> Option<Vec<u8>> {
    let is_index = String::from_utf8(new_key.to_vec())
        .map(|key| key.starts_with(MERGE_INDEX_ID))
        .unwrap_or(false);

    if !is_index {
        return existing.map(|val| val.to_vec());
    }

    let mut bucket: Bucket<String> = match existing {
        Some(val) => val.to_vec().try_into().ok()?,
        None => Bucket::new(),
    };

    for op in operands {
        if let Ok(key) = String::from_utf8(op.to_vec()) {
            bucket.add(key);
        }
    }

    let output: Result<Vec<u8>, DbError> = bucket.try_into();
    output.ok()
}

pub fn index_key(namespace: &str) -> String {
    format!("{}:{}", MERGE_INDEX_ID, namespace)
}

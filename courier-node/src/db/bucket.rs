use rst_common::standard::serde::de::DeserializeOwned;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use super::types::DbError;

/// `Bucket` is a JSON encoded collection kept under a single database key
///
/// The state store uses it to index the keys of each namespace
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct Bucket<T>
where
    T: TryInto<Vec<u8>> + Serialize,
{
    collections: Vec<T>,
}

impl<T> Bucket<T>
where
    T: TryInto<Vec<u8>> + Serialize + DeserializeOwned + PartialEq,
{
    pub fn new() -> Self {
        Self {
            collections: Vec::new(),
        }
    }

    /// `add` appends the value only once, the bucket behaves like an ordered set
    pub fn add(&mut self, val: T) {
        if !self.collections.contains(&val) {
            self.collections.push(val)
        }
    }

    pub fn contains(&self, val: &T) -> bool {
        self.collections.contains(val)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn items(self) -> Vec<T> {
        self.collections
    }
}

impl<T> Default for Bucket<T>
where
    T: TryInto<Vec<u8>> + Serialize + DeserializeOwned + PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TryInto<Vec<u8>> for Bucket<T>
where
    T: TryInto<Vec<u8>> + Serialize,
{
    type Error = DbError;
    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| DbError::BucketError(err.to_string()))
    }
}

impl<T> TryFrom<Vec<u8>> for Bucket<T>
where
    T: TryInto<Vec<u8>> + Serialize + DeserializeOwned,
{
    type Error = DbError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&value).map_err(|err| DbError::BucketError(err.to_string()))
    }
}

impl<T> ToJSON for Bucket<T>
where
    T: TryInto<Vec<u8>> + Serialize,
{
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

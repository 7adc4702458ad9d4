use super::types::{Namespace, StoreBuilder, StoreError};

/// `EntityRepo` binds a [`StoreBuilder`] to a single [`Namespace`]
///
/// Entities are converted from and to bytes through their own `TryFrom<Vec<u8>>` and
/// `TryInto<Vec<u8>>` implementations, so each domain keeps its own error type.
#[derive(Clone)]
pub struct EntityRepo<TStore>
where
    TStore: StoreBuilder,
{
    store: TStore,
    namespace: Namespace,
}

impl<TStore> EntityRepo<TStore>
where
    TStore: StoreBuilder,
{
    pub fn new(store: TStore, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub async fn save<TEntity, TError>(&self, key: &str, entity: TEntity) -> Result<(), TError>
    where
        TEntity: TryInto<Vec<u8>, Error = TError>,
        TError: From<StoreError>,
    {
        let bytes: Vec<u8> = entity.try_into()?;
        self.store
            .set(self.namespace, key.to_string(), bytes)
            .await
            .map_err(TError::from)
    }

    pub async fn find<TEntity, TError>(&self, key: &str) -> Result<Option<TEntity>, TError>
    where
        TEntity: TryFrom<Vec<u8>, Error = TError>,
        TError: From<StoreError>,
    {
        let found = self
            .store
            .get(self.namespace, key.to_string())
            .await
            .map_err(TError::from)?;

        match found {
            Some(bytes) => TEntity::try_from(bytes).map(Some),
            None => Ok(None),
        }
    }

    pub async fn list<TEntity, TError>(&self) -> Result<Vec<TEntity>, TError>
    where
        TEntity: TryFrom<Vec<u8>, Error = TError>,
        TError: From<StoreError>,
    {
        let values = self
            .store
            .values(self.namespace)
            .await
            .map_err(TError::from)?;

        values.into_iter().map(TEntity::try_from).collect()
    }

    pub async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.store.keys(self.namespace).await
    }
}

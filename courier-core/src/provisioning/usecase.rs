use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::{debug, info};

use crate::store::types::{Namespace, StoreBuilder};
use crate::store::{EntityRepo, KeyLocker};

use super::types::{
    AgentRole, ProvisionConfig, ProvisionKey, ProvisionOptions, ProvisioningAPI,
    ProvisioningError, RelayBuilder,
};
use super::ProvisioningRecord;

#[derive(Clone)]
pub struct Usecase<TStore, TRelay>
where
    TStore: StoreBuilder,
    TRelay: RelayBuilder,
{
    repo: EntityRepo<TStore>,
    relay: TRelay,
    locker: KeyLocker,
}

impl<TStore, TRelay> Usecase<TStore, TRelay>
where
    TStore: StoreBuilder,
    TRelay: RelayBuilder,
{
    pub fn new(store: TStore, relay: TRelay) -> Self {
        Self {
            repo: EntityRepo::new(store, Namespace::Provisions),
            relay,
            locker: KeyLocker::new(),
        }
    }

    fn validate_identity(
        role: &AgentRole,
        endpoint: &str,
        seed: &str,
    ) -> Result<(), ProvisioningError> {
        if role.as_ref().is_empty() {
            return Err(ProvisioningError::ValidationError(
                "role was missing".to_string(),
            ));
        }

        if endpoint.is_empty() {
            return Err(ProvisioningError::ValidationError(
                "endpoint was missing".to_string(),
            ));
        }

        if seed.is_empty() {
            return Err(ProvisioningError::ValidationError(
                "seed was missing".to_string(),
            ));
        }

        Ok(())
    }

    fn failed(key: &ProvisionKey, err: ProvisioningError) -> ProvisioningError {
        match err {
            ProvisioningError::ProvisioningFailed { .. } => err,
            _ => ProvisioningError::ProvisioningFailed {
                key: key.to_string(),
                message: err.to_string(),
            },
        }
    }
}

#[async_trait]
impl<TStore, TRelay> ProvisioningAPI for Usecase<TStore, TRelay>
where
    TStore: StoreBuilder,
    TRelay: RelayBuilder,
{
    type EntityAccessor = ProvisioningRecord;

    async fn ensure_provisioned(
        &self,
        role: AgentRole,
        endpoint: String,
        seed: String,
        options: ProvisionOptions,
    ) -> Result<ProvisioningRecord, ProvisioningError> {
        Self::validate_identity(&role, &endpoint, &seed)?;
        if options.wallet_key.is_empty() {
            return Err(ProvisioningError::ValidationError(
                "wallet_key was missing".to_string(),
            ));
        }

        let key = ProvisionKey::new(&role, &endpoint, &seed);
        let _guard = self.locker.lock(key.as_ref()).await;

        let existing: Option<ProvisioningRecord> = self.repo.find(key.as_ref()).await?;
        if let Some(record) = existing {
            debug!("provisioning record found: {}", key);
            return Ok(record);
        }

        let relay_identity = match options.relay_identity.clone() {
            Some(identity) => identity,
            None => self
                .relay
                .discover_identity(endpoint.clone())
                .await
                .map_err(|err| Self::failed(&key, err))?,
        };

        let config = ProvisionConfig::build(role, endpoint, seed, relay_identity, options);
        let record = self
            .relay
            .register(config)
            .await
            .map_err(|err| Self::failed(&key, err))?;

        self.repo.save(key.as_ref(), record.clone()).await?;
        info!("agent provisioned: {}", key);

        Ok(record)
    }

    async fn update_webhook(
        &self,
        role: AgentRole,
        endpoint: String,
        seed: String,
        url: String,
    ) -> Result<ProvisioningRecord, ProvisioningError> {
        Self::validate_identity(&role, &endpoint, &seed)?;
        if url.is_empty() {
            return Err(ProvisioningError::ValidationError(
                "url was missing".to_string(),
            ));
        }

        let key = ProvisionKey::new(&role, &endpoint, &seed);
        let _guard = self.locker.lock(key.as_ref()).await;

        let existing: Option<ProvisioningRecord> = self.repo.find(key.as_ref()).await?;
        let mut record =
            existing.ok_or_else(|| ProvisioningError::NotProvisioned(key.to_string()))?;

        self.relay
            .update_webhook(record.clone(), url.clone())
            .await
            .map_err(|err| ProvisioningError::WebhookError(err.to_string()))?;

        record.set_webhook_url(url);
        self.repo.save(key.as_ref(), record.clone()).await?;
        info!("webhook updated: {}", key);

        Ok(record)
    }

    async fn get_record(
        &self,
        role: AgentRole,
        endpoint: String,
        seed: String,
    ) -> Result<Option<ProvisioningRecord>, ProvisioningError> {
        let key = ProvisionKey::new(&role, &endpoint, &seed);
        self.repo.find(key.as_ref()).await
    }

    async fn list_records(&self) -> Result<Vec<ProvisioningRecord>, ProvisioningError> {
        self.repo.list().await
    }
}

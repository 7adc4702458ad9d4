use derive_more::{AsRef, Display, From, Into};
use sha2::{Digest, Sha256};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};

use crate::store::compose_key;
use crate::store::types::StoreError;

use super::ProvisioningRecord;

pub const DEFAULT_PAYMENT_METHOD: &str = "null";
pub const DEFAULT_PROTOCOL_TYPE: &str = "4.0";

const WALLET_SUFFIX_LEN: usize = 12;

/// `seed_digest` is the hex encoded SHA-256 of an enterprise seed, the seed itself never
/// appears in store keys, wallet names or logs
pub fn seed_digest(seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProvisioningError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("provisioning failed for {key}: {message}")]
    ProvisioningFailed { key: String, message: String },

    #[error("agent not provisioned: {0}")]
    NotProvisioned(String),

    #[error("webhook error: {0}")]
    WebhookError(String),

    #[error("unable to generate json: {0}")]
    GenerateJSONError(String),

    #[error("unable to unserialize: {0}")]
    UnserializeError(String),

    #[error("store error: {0}")]
    StoreError(#[from] StoreError),
}

/// `AgentRole` is the logical role name of a local agent, like `faber` or `alice`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into, AsRef)]
#[serde(crate = "self::serde")]
pub struct AgentRole(String);

impl From<&str> for AgentRole {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// `ProvisionKey` is the composite lookup key of a [`ProvisioningRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRef)]
#[serde(crate = "self::serde")]
pub struct ProvisionKey(String);

impl ProvisionKey {
    pub fn new(role: &AgentRole, endpoint: &str, seed: &str) -> Self {
        Self(compose_key(&[role.to_string().as_str(), endpoint, seed_digest(seed).as_str()]))
    }
}

/// `RelayIdentity` is the agency's public identifier pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RelayIdentity {
    pub did: String,
    pub verkey: String,
}

/// `WalletStorage` selects a non default wallet storage backend, like `postgres_storage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct WalletStorage {
    pub wallet_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_config: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_credentials: Option<Value>,
}

/// `ProvisionOptions` contains every registration option except the lookup identity
/// (role, endpoint and seed)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProvisionOptions {
    pub(crate) wallet_name: Option<String>,
    pub(crate) wallet_key: String,
    pub(crate) payment_method: Option<String>,
    pub(crate) relay_identity: Option<RelayIdentity>,
    pub(crate) webhook_url: Option<String>,
    pub(crate) storage: Option<WalletStorage>,
    pub(crate) protocol_type: Option<String>,
    pub(crate) institution_name: Option<String>,
    pub(crate) institution_logo_url: Option<String>,
}

impl ProvisionOptions {
    pub fn new(wallet_key: String) -> Self {
        Self {
            wallet_key,
            ..Default::default()
        }
    }

    pub fn wallet_name(mut self, name: String) -> Self {
        self.wallet_name = Some(name);
        self
    }

    pub fn payment_method(mut self, method: String) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn relay_identity(mut self, identity: RelayIdentity) -> Self {
        self.relay_identity = Some(identity);
        self
    }

    pub fn webhook_url(mut self, url: String) -> Self {
        self.webhook_url = Some(url);
        self
    }

    pub fn storage(mut self, storage: WalletStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn protocol_type(mut self, protocol_type: String) -> Self {
        self.protocol_type = Some(protocol_type);
        self
    }

    pub fn institution(mut self, name: String, logo_url: Option<String>) -> Self {
        self.institution_name = Some(name);
        self.institution_logo_url = logo_url;
        self
    }
}

/// `ProvisionConfig` is the complete registration request sent to the agency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProvisionConfig {
    pub role: AgentRole,
    pub agency_url: String,
    pub agency_did: String,
    pub agency_verkey: String,
    pub wallet_name: String,
    pub wallet_key: String,
    pub payment_method: String,
    pub enterprise_seed: String,
    pub protocol_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<WalletStorage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution_logo_url: Option<String>,
}

impl ProvisionConfig {
    pub fn build(
        role: AgentRole,
        endpoint: String,
        seed: String,
        relay: RelayIdentity,
        options: ProvisionOptions,
    ) -> Self {
        let wallet_name = options
            .wallet_name
            .unwrap_or_else(|| {
                let digest = seed_digest(&seed);
                format!("{}_wallet_{}", role, &digest[..WALLET_SUFFIX_LEN])
            });

        Self {
            role,
            agency_url: endpoint,
            agency_did: relay.did,
            agency_verkey: relay.verkey,
            wallet_name,
            wallet_key: options.wallet_key,
            payment_method: options
                .payment_method
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            enterprise_seed: seed,
            protocol_type: options
                .protocol_type
                .unwrap_or_else(|| DEFAULT_PROTOCOL_TYPE.to_string()),
            webhook_url: options.webhook_url,
            storage: options.storage,
            institution_name: options.institution_name,
            institution_logo_url: options.institution_logo_url,
        }
    }

    pub fn key(&self) -> ProvisionKey {
        ProvisionKey::new(&self.role, &self.agency_url, &self.enterprise_seed)
    }
}

/// `AgentKeys` contains the pairwise identifiers assigned by the agency during registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct AgentKeys {
    pub sdk_to_remote_did: String,
    pub sdk_to_remote_verkey: String,
    pub remote_to_sdk_did: String,
    pub remote_to_sdk_verkey: String,
    pub institution_did: String,
    pub institution_verkey: String,
}

pub trait ProvisioningEntityAccessor {
    fn get_id(&self) -> String;
    fn get_key(&self) -> String;
    fn get_role(&self) -> AgentRole;
    fn get_agency_endpoint(&self) -> String;
    fn get_relay_identity(&self) -> RelayIdentity;
    fn get_seed(&self) -> String;
    fn get_wallet_name(&self) -> String;
    fn get_webhook_url(&self) -> Option<String>;
    fn get_agent_keys(&self) -> AgentKeys;
    fn get_institution_did(&self) -> String;
    fn get_protocol_type(&self) -> String;
    fn get_created_at(&self) -> DateTime<Utc>;
}

/// `ProvisioningAPI` is the public provisioning contract
#[async_trait]
pub trait ProvisioningAPI: Clone {
    type EntityAccessor: ProvisioningEntityAccessor;

    /// `ensure_provisioned` returns the existing record for the given role, endpoint and seed,
    /// or registers the agent to the agency and persists a new one
    async fn ensure_provisioned(
        &self,
        role: AgentRole,
        endpoint: String,
        seed: String,
        options: ProvisionOptions,
    ) -> Result<Self::EntityAccessor, ProvisioningError>;

    /// `update_webhook` forwards a new webhook url for an already provisioned agent
    async fn update_webhook(
        &self,
        role: AgentRole,
        endpoint: String,
        seed: String,
        url: String,
    ) -> Result<Self::EntityAccessor, ProvisioningError>;

    async fn get_record(
        &self,
        role: AgentRole,
        endpoint: String,
        seed: String,
    ) -> Result<Option<Self::EntityAccessor>, ProvisioningError>;

    async fn list_records(&self) -> Result<Vec<Self::EntityAccessor>, ProvisioningError>;
}

/// `RelayBuilder` is the agency registration capability
#[async_trait]
pub trait RelayBuilder: Clone + Sync + Send {
    async fn discover_identity(&self, endpoint: String) -> Result<RelayIdentity, ProvisioningError>;

    async fn register(&self, config: ProvisionConfig) -> Result<ProvisioningRecord, ProvisioningError>;

    async fn update_webhook(
        &self,
        record: ProvisioningRecord,
        url: String,
    ) -> Result<(), ProvisioningError>;
}

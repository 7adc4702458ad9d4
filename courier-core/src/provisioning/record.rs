use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::standard::uuid::Uuid;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use super::types::{
    AgentKeys, AgentRole, ProvisionConfig, ProvisioningEntityAccessor, ProvisioningError,
    RelayIdentity,
};

/// `ProvisioningRecord` is the durable result of an agent registration
///
/// It never changes after creation except for the webhook url, which can be replaced
/// through the agency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProvisioningRecord {
    pub(crate) id: String,
    pub(crate) key: String,
    pub(crate) role: AgentRole,

    #[serde(rename = "agencyEndpoint")]
    pub(crate) agency_endpoint: String,

    #[serde(rename = "agencyIdentity")]
    pub(crate) agency_identity: RelayIdentity,

    pub(crate) seed: String,

    #[serde(rename = "walletName")]
    pub(crate) wallet_name: String,

    #[serde(rename = "webhookUrl")]
    pub(crate) webhook_url: Option<String>,

    #[serde(rename = "agentKeys")]
    pub(crate) agent_keys: AgentKeys,

    #[serde(rename = "institutionName")]
    pub(crate) institution_name: Option<String>,

    #[serde(rename = "institutionLogoUrl")]
    pub(crate) institution_logo_url: Option<String>,

    #[serde(rename = "protocolType")]
    pub(crate) protocol_type: String,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,
}

impl ProvisioningRecord {
    pub fn new(config: &ProvisionConfig, agent_keys: AgentKeys) -> Self {
        let uid = Uuid::new_v4().to_string();
        Self {
            id: uid,
            key: config.key().to_string(),
            role: config.role.clone(),
            agency_endpoint: config.agency_url.clone(),
            agency_identity: RelayIdentity {
                did: config.agency_did.clone(),
                verkey: config.agency_verkey.clone(),
            },
            seed: config.enterprise_seed.clone(),
            wallet_name: config.wallet_name.clone(),
            webhook_url: config.webhook_url.clone(),
            agent_keys,
            institution_name: config.institution_name.clone(),
            institution_logo_url: config.institution_logo_url.clone(),
            protocol_type: config.protocol_type.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn set_webhook_url(&mut self, url: String) -> &mut Self {
        self.webhook_url = Some(url);
        self
    }
}

impl ToJSON for ProvisioningRecord {
    fn to_json(&self) -> Result<String, BaseError> {
        let json_str =
            serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))?;

        Ok(json_str)
    }
}

impl TryInto<Vec<u8>> for ProvisioningRecord {
    type Error = ProvisioningError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        let json = serde_json::to_vec(&self)
            .map_err(|err| ProvisioningError::GenerateJSONError(err.to_string()))?;
        Ok(json)
    }
}

impl TryFrom<Vec<u8>> for ProvisioningRecord {
    type Error = ProvisioningError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let record: ProvisioningRecord = serde_json::from_slice(&value)
            .map_err(|err| ProvisioningError::UnserializeError(err.to_string()))?;
        Ok(record)
    }
}

impl ProvisioningEntityAccessor for ProvisioningRecord {
    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_key(&self) -> String {
        self.key.to_owned()
    }

    fn get_role(&self) -> AgentRole {
        self.role.to_owned()
    }

    fn get_agency_endpoint(&self) -> String {
        self.agency_endpoint.to_owned()
    }

    fn get_relay_identity(&self) -> RelayIdentity {
        self.agency_identity.to_owned()
    }

    fn get_seed(&self) -> String {
        self.seed.to_owned()
    }

    fn get_wallet_name(&self) -> String {
        self.wallet_name.to_owned()
    }

    fn get_webhook_url(&self) -> Option<String> {
        self.webhook_url.to_owned()
    }

    fn get_agent_keys(&self) -> AgentKeys {
        self.agent_keys.to_owned()
    }

    fn get_institution_did(&self) -> String {
        self.agent_keys.institution_did.to_owned()
    }

    fn get_protocol_type(&self) -> String {
        self.protocol_type.to_owned()
    }

    fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at.to_owned()
    }
}

use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::standard::uuid::Uuid;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::connection::types::ConnectionKey;
use crate::polling::graph::StateGraph;
use crate::session::SessionPayload;
use crate::store::compose_key;

use super::types::{CredentialError, CredentialOffer, HolderEntityAccessor, HolderState};

/// `HolderCredential` is the holder's view of a single credential exchange
///
/// It is created from an accepted offer, the credential object inside `session` is
/// created by the identity library before the request is sent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct HolderCredential {
    pub(crate) id: String,

    #[serde(rename = "sourceId")]
    pub(crate) source_id: String,

    #[serde(rename = "connectionKey")]
    pub(crate) connection_key: ConnectionKey,

    pub(crate) state: HolderState,
    pub(crate) offer: CredentialOffer,
    pub(crate) session: SessionPayload,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "updatedAt")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl HolderCredential {
    pub fn new(
        connection_key: ConnectionKey,
        source_id: String,
        offer: CredentialOffer,
        session: SessionPayload,
    ) -> Self {
        let uid = Uuid::new_v4().to_string();
        Self {
            id: uid,
            source_id,
            connection_key,
            state: HolderState::Initialized,
            offer,
            session,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> String {
        compose_key(&[self.connection_key.to_string().as_str(), &self.source_id])
    }

    pub fn transition(&mut self, next: HolderState) -> Result<&mut Self, CredentialError> {
        let allowed = match (self.state, next) {
            (HolderState::Initialized, HolderState::RequestSent) => true,
            (current, next) => current.can_transition(&next),
        };

        if !allowed {
            return Err(CredentialError::InvalidStateTransition {
                key: self.key(),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }

        self.state = next;
        self.updated_at = Utc::now();
        Ok(self)
    }

    pub fn set_session(&mut self, session: SessionPayload) -> &mut Self {
        self.session = session;
        self.updated_at = Utc::now();
        self
    }
}

impl ToJSON for HolderCredential {
    fn to_json(&self) -> Result<String, BaseError> {
        let json_str =
            serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))?;

        Ok(json_str)
    }
}

impl TryInto<Vec<u8>> for HolderCredential {
    type Error = CredentialError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        let json = serde_json::to_vec(&self)
            .map_err(|err| CredentialError::GenerateJSONError(err.to_string()))?;
        Ok(json)
    }
}

impl TryFrom<Vec<u8>> for HolderCredential {
    type Error = CredentialError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let credential: HolderCredential = serde_json::from_slice(&value)
            .map_err(|err| CredentialError::UnserializeError(err.to_string()))?;
        Ok(credential)
    }
}

impl HolderEntityAccessor for HolderCredential {
    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_key(&self) -> String {
        self.key()
    }

    fn get_source_id(&self) -> String {
        self.source_id.to_owned()
    }

    fn get_connection_key(&self) -> ConnectionKey {
        self.connection_key.to_owned()
    }

    fn get_state(&self) -> HolderState {
        self.state
    }

    fn get_offer(&self) -> CredentialOffer {
        self.offer.to_owned()
    }

    fn get_session(&self) -> SessionPayload {
        self.session.to_owned()
    }

    fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at.to_owned()
    }

    fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at.to_owned()
    }
}

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

use super::types::{CredentialError, CredentialOffer, IssuerEntityAccessor, IssuerState};

/// `IssuerCredential` is the issuer's view of a single credential exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct IssuerCredential {
    pub(crate) id: String,

    #[serde(rename = "sourceId")]
    pub(crate) source_id: String,

    #[serde(rename = "connectionKey")]
    pub(crate) connection_key: ConnectionKey,

    pub(crate) state: IssuerState,
    pub(crate) offer: CredentialOffer,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) session: Option<SessionPayload>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "updatedAt")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl IssuerCredential {
    pub fn new(connection_key: ConnectionKey, source_id: String, offer: CredentialOffer) -> Self {
        let uid = Uuid::new_v4().to_string();
        Self {
            id: uid,
            source_id,
            connection_key,
            state: IssuerState::Created,
            offer,
            session: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> String {
        compose_key(&[self.connection_key.to_string().as_str(), &self.source_id])
    }

    pub fn transition(&mut self, next: IssuerState) -> Result<&mut Self, CredentialError> {
        let allowed = match (self.state, next) {
            (IssuerState::Created, IssuerState::OfferSent) => true,
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
        self.session = Some(session);
        self.updated_at = Utc::now();
        self
    }

    pub fn require_session(&self) -> Result<SessionPayload, CredentialError> {
        self.session
            .clone()
            .ok_or_else(|| CredentialError::InvalidStateTransition {
                key: self.key(),
                from: self.state.to_string(),
                to: IssuerState::RequestReceived.to_string(),
            })
    }
}

impl ToJSON for IssuerCredential {
    fn to_json(&self) -> Result<String, BaseError> {
        let json_str =
            serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))?;

        Ok(json_str)
    }
}

impl TryInto<Vec<u8>> for IssuerCredential {
    type Error = CredentialError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        let json = serde_json::to_vec(&self)
            .map_err(|err| CredentialError::GenerateJSONError(err.to_string()))?;
        Ok(json)
    }
}

impl TryFrom<Vec<u8>> for IssuerCredential {
    type Error = CredentialError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let credential: IssuerCredential = serde_json::from_slice(&value)
            .map_err(|err| CredentialError::UnserializeError(err.to_string()))?;
        Ok(credential)
    }
}

impl IssuerEntityAccessor for IssuerCredential {
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

    fn get_state(&self) -> IssuerState {
        self.state
    }

    fn get_offer(&self) -> CredentialOffer {
        self.offer.to_owned()
    }

    fn get_session(&self) -> Option<SessionPayload> {
        self.session.to_owned()
    }

    fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at.to_owned()
    }

    fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use table_test::table_test;

    fn generate_credential() -> IssuerCredential {
        let offer = CredentialOffer::new(
            "offer-1".to_string(),
            "cred-def-1".to_string(),
            "degree".to_string(),
        )
        .attribute("name", "alice");

        IssuerCredential::new(ConnectionKey::new("did:faber", "alice"), "degree".to_string(), offer)
    }

    #[test]
    fn test_key() {
        let cred = generate_credential();
        assert_eq!(cred.get_key(), "did:faber%7Calice|degree");
        assert_eq!(cred.get_state(), IssuerState::Created)
    }

    #[test]
    fn test_transitions() {
        let table = vec![
            ((IssuerState::Created, IssuerState::OfferSent), true),
            ((IssuerState::Created, IssuerState::Issued), false),
            ((IssuerState::OfferSent, IssuerState::RequestReceived), true),
            ((IssuerState::RequestReceived, IssuerState::Issued), true),
            ((IssuerState::OfferSent, IssuerState::Rejected), true),
            ((IssuerState::Issued, IssuerState::Rejected), false),
        ];

        for (validator, (from, to), expected) in table_test!(table) {
            let mut cred = generate_credential();
            cred.state = from;

            let result = cred.transition(to);
            validator
                .given(&format!("from: {:?}, to: {:?}", from, to))
                .when("transition")
                .then(&format!("allowed: {}", expected))
                .assert_eq(expected, !result.is_err());
        }
    }

    #[test]
    fn test_bytes_conversion() {
        let cred = generate_credential();
        let bytes: Result<Vec<u8>, CredentialError> = cred.clone().try_into();
        assert!(!bytes.is_err());

        let restored = IssuerCredential::try_from(bytes.unwrap()).unwrap();
        assert_eq!(restored.get_id(), cred.get_id());
        assert_eq!(restored.get_offer(), cred.get_offer())
    }
}

use rst_common::standard::serde::{self, de::DeserializeOwned, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::standard::uuid::Uuid;
use rst_common::with_errors::thiserror::{self, Error};

use prople_courier_core::connection::types::ConnectionError;
use prople_courier_core::credential::types::CredentialError;
use prople_courier_core::proof::types::ProofError;
use prople_courier_core::provisioning::types::ProvisioningError;
use prople_courier_core::session::SessionPayload;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AgencyError {
    #[error("unknown agency endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("unknown route: {0}")]
    UnknownRoute(String),

    #[error("unknown thread: {0}")]
    UnknownThread(String),

    #[error("invalid session: {0}")]
    InvalidSession(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl From<AgencyError> for ProvisioningError {
    fn from(value: AgencyError) -> Self {
        ProvisioningError::ValidationError(value.to_string())
    }
}

impl From<AgencyError> for ConnectionError {
    fn from(value: AgencyError) -> Self {
        ConnectionError::TransportError(value.to_string())
    }
}

impl From<AgencyError> for CredentialError {
    fn from(value: AgencyError) -> Self {
        CredentialError::CryptoError(value.to_string())
    }
}

impl From<AgencyError> for ProofError {
    fn from(value: AgencyError) -> Self {
        ProofError::CryptoError(value.to_string())
    }
}

/// `Side` is the position of an agent inside a pairwise relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum Side {
    Inviter,
    Invitee,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Inviter => Side::Invitee,
            Side::Invitee => Side::Inviter,
        }
    }
}

/// `ConnectionSession` is the loopback's own representation of a connection object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionSession {
    #[serde(rename = "pairwiseDid")]
    pub pairwise_did: String,

    #[serde(rename = "sourceId")]
    pub source_id: String,

    pub side: Side,
    pub connected: bool,
}

/// `ThreadSession` is the loopback's representation of a credential or proof object
///
/// The route is only known after the first message of the thread has been sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ThreadSession {
    #[serde(rename = "threadId")]
    pub thread_id: String,

    #[serde(rename = "sourceId")]
    pub source_id: String,

    #[serde(rename = "pairwiseDid")]
    pub pairwise_did: Option<String>,
}

impl ThreadSession {
    pub fn route(&self) -> Result<String, AgencyError> {
        self.pairwise_did.clone().ok_or_else(|| {
            AgencyError::InvalidSession(format!("thread {} was not sent", self.thread_id))
        })
    }
}

pub fn to_session<T: Serialize>(value: &T) -> Result<SessionPayload, AgencyError> {
    serde_json::to_value(value)
        .map(SessionPayload::new)
        .map_err(|err| AgencyError::InvalidSession(err.to_string()))
}

pub fn from_session<T: DeserializeOwned>(session: &SessionPayload) -> Result<T, AgencyError> {
    serde_json::from_value(session.value().clone())
        .map_err(|err| AgencyError::InvalidSession(err.to_string()))
}

/// `generate_identifier` builds a random DID and verkey pair
///
/// The loopback performs no cryptography, both values are only unique identifiers
pub fn generate_identifier() -> (String, String) {
    let did = Uuid::new_v4().to_string().replace('-', "");
    let verkey = Uuid::new_v4().to_string().replace('-', "");

    (did[..22].to_string(), verkey)
}

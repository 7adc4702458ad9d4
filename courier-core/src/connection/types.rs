use derive_more::{AsRef, Display};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::with_errors::thiserror::{self, Error};

use crate::polling::graph::StateGraph;
use crate::polling::{PollFailure, PollOptions, StopSignal};
use crate::session::{Observed, SessionPayload};
use crate::store::compose_key;
use crate::store::types::StoreError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConnectionError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invalid invitation: {0}")]
    InvalidInvitation(String),

    #[error("connection not found: {0}")]
    NotFound(String),

    #[error("connection {key} is not ready, current state: {state}")]
    ConnectionNotReady { key: String, state: State },

    #[error("connection {key}: invalid transition from {from} to {to}")]
    InvalidStateTransition { key: String, from: State, to: State },

    #[error("connection {key} rejected by counterparty, state: {state}")]
    StateTransitionRejected { key: String, state: State },

    #[error("connection {key}: poll timeout after {attempts} attempts, last state: {last_state}")]
    PollTimeout {
        key: String,
        attempts: u32,
        last_state: String,
    },

    #[error("connection {key}: poll cancelled after {attempts} attempts, last state: {last_state}")]
    PollCancelled {
        key: String,
        attempts: u32,
        last_state: String,
    },

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("unable to generate json: {0}")]
    GenerateJSONError(String),

    #[error("unable to unserialize: {0}")]
    UnserializeError(String),

    #[error("store error: {0}")]
    StoreError(#[from] StoreError),
}

impl PollFailure for ConnectionError {
    fn poll_timeout(key: String, attempts: u32, last_state: String) -> Self {
        ConnectionError::PollTimeout {
            key,
            attempts,
            last_state,
        }
    }

    fn poll_cancelled(key: String, attempts: u32, last_state: String) -> Self {
        ConnectionError::PollCancelled {
            key,
            attempts,
            last_state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(crate = "self::serde")]
pub enum State {
    Null,
    Invited,
    Requested,
    Responded,
    Accepted,
    Rejected,
}

impl StateGraph for State {
    fn successor(&self) -> Option<Self> {
        match self {
            State::Invited => Some(State::Requested),
            State::Requested => Some(State::Responded),
            State::Responded => Some(State::Accepted),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            State::Null => 0,
            State::Invited => 1,
            State::Requested => 2,
            State::Responded => 3,
            State::Accepted => 4,
            State::Rejected => 5,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, State::Accepted | State::Rejected)
    }

    fn is_failure(&self) -> bool {
        matches!(self, State::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(crate = "self::serde")]
pub enum Role {
    Inviter,
    Invitee,
}

impl Role {
    /// `entry_state` is the first state after `Null`, it depends on the side of the handshake
    pub fn entry_state(&self) -> State {
        match self {
            Role::Inviter => State::Invited,
            Role::Invitee => State::Requested,
        }
    }
}

/// `ConnectionKey` identifies a connection by its own agent DID and the counterparty name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRef)]
#[serde(crate = "self::serde")]
pub struct ConnectionKey(String);

impl ConnectionKey {
    pub fn new(self_did: &str, counterparty: &str) -> Self {
        Self(compose_key(&[self_did, counterparty]))
    }
}

impl From<&str> for ConnectionKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConnectionKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// `Invitation` is the out of band payload published by the inviter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Invitation {
    #[serde(rename = "@id")]
    pub id: String,

    pub label: String,

    #[serde(rename = "recipientKeys")]
    pub recipient_keys: Vec<String>,

    #[serde(rename = "routingKeys", default)]
    pub routing_keys: Vec<String>,

    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

impl Invitation {
    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.id.is_empty() {
            return Err(ConnectionError::InvalidInvitation(
                "@id was missing".to_string(),
            ));
        }

        if self.recipient_keys.is_empty() || self.recipient_keys.iter().any(|key| key.is_empty())
        {
            return Err(ConnectionError::InvalidInvitation(
                "recipientKeys was missing".to_string(),
            ));
        }

        if self.service_endpoint.is_empty() {
            return Err(ConnectionError::InvalidInvitation(
                "serviceEndpoint was missing".to_string(),
            ));
        }

        Ok(())
    }
}

impl TryFrom<&str> for Invitation {
    type Error = ConnectionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let invitation: Invitation = serde_json::from_str(value)
            .map_err(|err| ConnectionError::InvalidInvitation(err.to_string()))?;

        invitation.validate()?;
        Ok(invitation)
    }
}

/// `Handshake` is the transport result of creating an invitation
#[derive(Debug, Clone, PartialEq)]
pub struct Handshake {
    pub invitation: Invitation,
    pub session: SessionPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectOptions {
    pub use_public_did: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            use_public_did: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Message {
    #[serde(rename = "msgType")]
    pub msg_type: String,

    #[serde(rename = "msgTitle")]
    pub title: String,

    pub content: String,
}

impl Message {
    pub fn new(title: String, content: String) -> Self {
        Self {
            msg_type: "basicmessage".to_string(),
            title,
            content,
        }
    }
}

pub trait ConnectionEntityAccessor {
    fn get_id(&self) -> String;
    fn get_key(&self) -> ConnectionKey;
    fn get_source_id(&self) -> String;
    fn get_self_did(&self) -> String;
    fn get_counterparty(&self) -> String;
    fn get_role(&self) -> Role;
    fn get_state(&self) -> State;
    fn get_session(&self) -> Option<SessionPayload>;
    fn get_invitation(&self) -> Option<Invitation>;
    fn get_created_at(&self) -> DateTime<Utc>;
    fn get_updated_at(&self) -> DateTime<Utc>;
}

/// `ConnectionAPI` is the public connection contract
#[async_trait]
pub trait ConnectionAPI: Clone {
    type EntityAccessor: ConnectionEntityAccessor;

    /// `create_invitation` starts a new handshake as the inviter, `Null -> Invited`
    async fn create_invitation(
        &self,
        self_did: String,
        counterparty: String,
    ) -> Result<Self::EntityAccessor, ConnectionError>;

    /// `accept_invitation` joins a published invitation as the invitee, `Null -> Requested`
    async fn accept_invitation(
        &self,
        self_did: String,
        counterparty: String,
        invitation: String,
    ) -> Result<Self::EntityAccessor, ConnectionError>;

    /// `connect_as_inviter` resumes a stored, non rejected connection, or creates a new invitation
    async fn connect_as_inviter(
        &self,
        self_did: String,
        counterparty: String,
    ) -> Result<Self::EntityAccessor, ConnectionError>;

    /// `connect_as_invitee` resumes a stored, non rejected connection, or accepts the invitation
    async fn connect_as_invitee(
        &self,
        self_did: String,
        counterparty: String,
        invitation: String,
    ) -> Result<Self::EntityAccessor, ConnectionError>;

    async fn update_state(&self, key: ConnectionKey)
        -> Result<Self::EntityAccessor, ConnectionError>;

    async fn poll_acceptance(
        &self,
        key: ConnectionKey,
        options: PollOptions,
        stop: Option<StopSignal>,
    ) -> Result<Self::EntityAccessor, ConnectionError>;

    async fn send_message(&self, key: ConnectionKey, message: Message)
        -> Result<(), ConnectionError>;

    /// `download_messages` takes every message the counterparty delivered since the last download
    async fn download_messages(&self, key: ConnectionKey)
        -> Result<Vec<Message>, ConnectionError>;

    async fn invite_details(&self, key: ConnectionKey) -> Result<String, ConnectionError>;

    async fn get_connection(&self, key: ConnectionKey)
        -> Result<Self::EntityAccessor, ConnectionError>;

    async fn list_connections(
        &self,
        state: Option<State>,
    ) -> Result<Vec<Self::EntityAccessor>, ConnectionError>;
}

/// `TransportBuilder` is the pairwise connection capability provided by the agency client
#[async_trait]
pub trait TransportBuilder: Clone + Sync + Send {
    async fn create_invitation(
        &self,
        self_did: String,
        source_id: String,
    ) -> Result<Handshake, ConnectionError>;

    async fn accept_invitation(
        &self,
        self_did: String,
        source_id: String,
        invitation: Invitation,
    ) -> Result<SessionPayload, ConnectionError>;

    async fn connect(
        &self,
        session: SessionPayload,
        options: ConnectOptions,
    ) -> Result<SessionPayload, ConnectionError>;

    async fn refresh_state(&self, session: SessionPayload)
        -> Result<Observed<State>, ConnectionError>;

    async fn send(&self, session: SessionPayload, message: Message) -> Result<(), ConnectionError>;

    async fn download_messages(&self, session: SessionPayload)
        -> Result<Vec<Message>, ConnectionError>;
}

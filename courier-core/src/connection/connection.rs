use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::standard::uuid::Uuid;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::polling::graph::StateGraph;
use crate::session::SessionPayload;

use super::types::{
    ConnectionEntityAccessor, ConnectionError, ConnectionKey, Invitation, Role, State,
};

/// `Connection` is the local view of a pairwise handshake
///
/// The `session` is the transport's own serialized object. It is replaced on every
/// transport call, and it is the only thing needed to resume the handshake later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Connection {
    pub(crate) id: String,

    #[serde(rename = "sourceId")]
    pub(crate) source_id: String,

    #[serde(rename = "selfDid")]
    pub(crate) self_did: String,

    pub(crate) counterparty: String,
    pub(crate) role: Role,
    pub(crate) state: State,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) session: Option<SessionPayload>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) invitation: Option<Invitation>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "updatedAt")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(self_did: String, counterparty: String, role: Role) -> Self {
        let uid = Uuid::new_v4().to_string();
        Self {
            id: uid,
            source_id: counterparty.clone(),
            self_did,
            counterparty,
            role,
            state: State::Null,
            session: None,
            invitation: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(&self.self_did, &self.counterparty)
    }

    /// `transition` moves this connection to the `next` state, it fails without changing anything
    /// when `next` is not a legal successor
    pub fn transition(&mut self, next: State) -> Result<&mut Self, ConnectionError> {
        let allowed = match self.state {
            State::Null => next == self.role.entry_state() || next.is_failure(),
            current => current.can_transition(&next),
        };

        if !allowed {
            return Err(ConnectionError::InvalidStateTransition {
                key: self.key().to_string(),
                from: self.state,
                to: next,
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

    pub fn set_invitation(&mut self, invitation: Invitation) -> &mut Self {
        self.invitation = Some(invitation);
        self
    }

    /// `ensure_ready` checks that the handshake has completed
    pub fn ensure_ready(&self) -> Result<SessionPayload, ConnectionError> {
        match (&self.state, &self.session) {
            (State::Accepted, Some(session)) => Ok(session.clone()),
            _ => Err(ConnectionError::ConnectionNotReady {
                key: self.key().to_string(),
                state: self.state,
            }),
        }
    }

    pub fn require_session(&self) -> Result<SessionPayload, ConnectionError> {
        self.session
            .clone()
            .ok_or_else(|| ConnectionError::ConnectionNotReady {
                key: self.key().to_string(),
                state: self.state,
            })
    }
}

impl ToJSON for Connection {
    fn to_json(&self) -> Result<String, BaseError> {
        let json_str =
            serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))?;

        Ok(json_str)
    }
}

impl TryInto<Vec<u8>> for Connection {
    type Error = ConnectionError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        let json = serde_json::to_vec(&self)
            .map_err(|err| ConnectionError::GenerateJSONError(err.to_string()))?;
        Ok(json)
    }
}

impl TryFrom<Vec<u8>> for Connection {
    type Error = ConnectionError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let connection: Connection = serde_json::from_slice(&value)
            .map_err(|err| ConnectionError::UnserializeError(err.to_string()))?;
        Ok(connection)
    }
}

impl ConnectionEntityAccessor for Connection {
    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_key(&self) -> ConnectionKey {
        self.key()
    }

    fn get_source_id(&self) -> String {
        self.source_id.to_owned()
    }

    fn get_self_did(&self) -> String {
        self.self_did.to_owned()
    }

    fn get_counterparty(&self) -> String {
        self.counterparty.to_owned()
    }

    fn get_role(&self) -> Role {
        self.role
    }

    fn get_state(&self) -> State {
        self.state
    }

    fn get_session(&self) -> Option<SessionPayload> {
        self.session.to_owned()
    }

    fn get_invitation(&self) -> Option<Invitation> {
        self.invitation.to_owned()
    }

    fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at.to_owned()
    }

    fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at.to_owned()
    }
}

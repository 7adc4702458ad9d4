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

use super::types::{
    DisclosedProofEntityAccessor, ProofError, ProofPayload, ProofRequest, ProverState,
    SelectedCredentials, SelfAttested,
};

/// `DisclosedProof` is the prover's view of a single proof exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct DisclosedProof {
    pub(crate) id: String,

    #[serde(rename = "sourceId")]
    pub(crate) source_id: String,

    #[serde(rename = "connectionKey")]
    pub(crate) connection_key: ConnectionKey,

    pub(crate) state: ProverState,
    pub(crate) request: ProofRequest,

    #[serde(default)]
    pub(crate) selected: SelectedCredentials,

    #[serde(rename = "selfAttested", default)]
    pub(crate) self_attested: SelfAttested,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) proof: Option<ProofPayload>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) session: Option<SessionPayload>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "updatedAt")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl DisclosedProof {
    pub fn new(connection_key: ConnectionKey, source_id: String, request: ProofRequest) -> Self {
        let uid = Uuid::new_v4().to_string();
        Self {
            id: uid,
            source_id,
            connection_key,
            state: ProverState::RequestReceived,
            request,
            selected: SelectedCredentials::new(),
            self_attested: SelfAttested::new(),
            proof: None,
            session: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> String {
        compose_key(&[self.connection_key.to_string().as_str(), &self.source_id])
    }

    pub fn transition(&mut self, next: ProverState) -> Result<&mut Self, ProofError> {
        let allowed = match (self.state, next) {
            (ProverState::RequestReceived, ProverState::CredentialsSelected) => true,
            (ProverState::CredentialsSelected, ProverState::ProofGenerated) => true,
            (ProverState::ProofGenerated, ProverState::ProofSent) => true,
            (current, next) => current.can_transition(&next),
        };

        if !allowed {
            return Err(self.invalid_transition(next));
        }

        self.state = next;
        self.updated_at = Utc::now();
        Ok(self)
    }

    pub fn invalid_transition(&self, next: ProverState) -> ProofError {
        ProofError::InvalidStateTransition {
            key: self.key(),
            from: self.state.to_string(),
            to: next.to_string(),
        }
    }

    pub fn set_selected(&mut self, selected: SelectedCredentials) -> &mut Self {
        self.selected = selected;
        self
    }

    pub fn set_proof(&mut self, proof: ProofPayload, self_attested: SelfAttested) -> &mut Self {
        self.proof = Some(proof);
        self.self_attested = self_attested;
        self
    }

    pub fn set_session(&mut self, session: SessionPayload) -> &mut Self {
        self.session = Some(session);
        self.updated_at = Utc::now();
        self
    }
}

impl ToJSON for DisclosedProof {
    fn to_json(&self) -> Result<String, BaseError> {
        let json_str =
            serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))?;

        Ok(json_str)
    }
}

impl TryInto<Vec<u8>> for DisclosedProof {
    type Error = ProofError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        let json = serde_json::to_vec(&self)
            .map_err(|err| ProofError::GenerateJSONError(err.to_string()))?;
        Ok(json)
    }
}

impl TryFrom<Vec<u8>> for DisclosedProof {
    type Error = ProofError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let proof: DisclosedProof = serde_json::from_slice(&value)
            .map_err(|err| ProofError::UnserializeError(err.to_string()))?;
        Ok(proof)
    }
}

impl DisclosedProofEntityAccessor for DisclosedProof {
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

    fn get_state(&self) -> ProverState {
        self.state
    }

    fn get_request(&self) -> ProofRequest {
        self.request.to_owned()
    }

    fn get_selected(&self) -> SelectedCredentials {
        self.selected.to_owned()
    }

    fn get_self_attested(&self) -> SelfAttested {
        self.self_attested.to_owned()
    }

    fn get_proof(&self) -> Option<ProofPayload> {
        self.proof.to_owned()
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

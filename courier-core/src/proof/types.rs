use std::collections::BTreeMap;

use derive_more::{Display, From, Into};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_errors::thiserror::{self, Error};

use crate::connection::types::{ConnectionError, ConnectionKey};
use crate::polling::graph::StateGraph;
use crate::polling::{PollFailure, PollOptions, StopSignal};
use crate::session::{Observed, SessionPayload};
use crate::store::types::StoreError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProofError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invalid proof request: {0}")]
    InvalidProofRequest(String),

    #[error("no proof requests from connection: {0}")]
    NoProofRequests(String),

    #[error("proof {key}: no credential satisfies attribute: {attribute}")]
    UnsatisfiedAttribute { key: String, attribute: String },

    #[error("proof not found: {0}")]
    NotFound(String),

    #[error("proof {key}: invalid transition from {from} to {to}")]
    InvalidStateTransition {
        key: String,
        from: String,
        to: String,
    },

    #[error("proof {key} rejected, state: {state}")]
    StateTransitionRejected { key: String, state: String },

    #[error("proof {key}: poll timeout after {attempts} attempts, last state: {last_state}")]
    PollTimeout {
        key: String,
        attempts: u32,
        last_state: String,
    },

    #[error("proof {key}: poll cancelled after {attempts} attempts, last state: {last_state}")]
    PollCancelled {
        key: String,
        attempts: u32,
        last_state: String,
    },

    #[error("crypto error: {0}")]
    CryptoError(String),

    #[error("unable to generate json: {0}")]
    GenerateJSONError(String),

    #[error("unable to unserialize: {0}")]
    UnserializeError(String),

    #[error("connection error: {0}")]
    ConnectionError(#[from] ConnectionError),

    #[error("store error: {0}")]
    StoreError(#[from] StoreError),
}

impl PollFailure for ProofError {
    fn poll_timeout(key: String, attempts: u32, last_state: String) -> Self {
        ProofError::PollTimeout {
            key,
            attempts,
            last_state,
        }
    }

    fn poll_cancelled(key: String, attempts: u32, last_state: String) -> Self {
        ProofError::PollCancelled {
            key,
            attempts,
            last_state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(crate = "self::serde")]
pub enum ProverState {
    RequestReceived,
    CredentialsSelected,
    ProofGenerated,
    ProofSent,
    Verified,
    Rejected,
}

impl StateGraph for ProverState {
    fn successor(&self) -> Option<Self> {
        match self {
            ProverState::ProofSent => Some(ProverState::Verified),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ProverState::RequestReceived => 0,
            ProverState::CredentialsSelected => 1,
            ProverState::ProofGenerated => 2,
            ProverState::ProofSent => 3,
            ProverState::Verified => 4,
            ProverState::Rejected => 5,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, ProverState::Verified | ProverState::Rejected)
    }

    fn is_failure(&self) -> bool {
        matches!(self, ProverState::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(crate = "self::serde")]
pub enum VerifierState {
    Created,
    RequestSent,
    ProofReceived,
    Verified,
    Rejected,
}

impl StateGraph for VerifierState {
    fn successor(&self) -> Option<Self> {
        match self {
            VerifierState::RequestSent => Some(VerifierState::ProofReceived),
            VerifierState::ProofReceived => Some(VerifierState::Verified),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            VerifierState::Created => 0,
            VerifierState::RequestSent => 1,
            VerifierState::ProofReceived => 2,
            VerifierState::Verified => 3,
            VerifierState::Rejected => 4,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, VerifierState::Verified | VerifierState::Rejected)
    }

    fn is_failure(&self) -> bool {
        matches!(self, VerifierState::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct AttributeSpec {
    pub name: String,

    #[serde(default)]
    pub restrictions: Vec<Value>,
}

/// `ProofRequest` is the structured request sent by a verifier
///
/// Requested attributes are keyed by their referent, the iteration order of the map is
/// the order used to select credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProofRequest {
    #[serde(rename = "@id")]
    pub id: String,

    pub name: String,

    #[serde(rename = "requestedAttributes")]
    pub requested_attributes: BTreeMap<String, AttributeSpec>,
}

impl ProofRequest {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            requested_attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(mut self, referent: &str, name: &str, restrictions: Vec<Value>) -> Self {
        self.requested_attributes.insert(
            referent.to_string(),
            AttributeSpec {
                name: name.to_string(),
                restrictions,
            },
        );
        self
    }

    pub fn validate(&self) -> Result<(), ProofError> {
        if self.id.is_empty() {
            return Err(ProofError::InvalidProofRequest(
                "@id was missing".to_string(),
            ));
        }

        if self.requested_attributes.is_empty() {
            return Err(ProofError::InvalidProofRequest(
                "requestedAttributes was missing".to_string(),
            ));
        }

        if let Some((referent, _)) = self
            .requested_attributes
            .iter()
            .find(|(_, spec)| spec.name.is_empty())
        {
            return Err(ProofError::InvalidProofRequest(format!(
                "attribute name was missing: {}",
                referent
            )));
        }

        Ok(())
    }
}

impl TryFrom<Value> for ProofRequest {
    type Error = ProofError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let request: ProofRequest = serde_json::from_value(value)
            .map_err(|err| ProofError::InvalidProofRequest(err.to_string()))?;

        request.validate()?;
        Ok(request)
    }
}

/// `CredentialCandidate` is a wallet credential able to satisfy a requested attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialCandidate {
    #[serde(rename = "credId")]
    pub cred_id: String,

    #[serde(rename = "credDefId")]
    pub cred_def_id: String,

    pub attributes: BTreeMap<String, String>,
}

pub type Candidates = BTreeMap<String, Vec<CredentialCandidate>>;
pub type SelectedCredentials = BTreeMap<String, CredentialCandidate>;
pub type SelfAttested = BTreeMap<String, String>;

/// `ProofPayload` is the generated presentation, opaque to this layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From, Into)]
#[serde(crate = "self::serde")]
pub struct ProofPayload(Value);

impl ProofPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }
}

pub trait DisclosedProofEntityAccessor {
    fn get_id(&self) -> String;
    fn get_key(&self) -> String;
    fn get_source_id(&self) -> String;
    fn get_connection_key(&self) -> ConnectionKey;
    fn get_state(&self) -> ProverState;
    fn get_request(&self) -> ProofRequest;
    fn get_selected(&self) -> SelectedCredentials;
    fn get_self_attested(&self) -> SelfAttested;
    fn get_proof(&self) -> Option<ProofPayload>;
    fn get_session(&self) -> Option<SessionPayload>;
    fn get_created_at(&self) -> DateTime<Utc>;
    fn get_updated_at(&self) -> DateTime<Utc>;
}

pub trait VerifierProofEntityAccessor {
    fn get_id(&self) -> String;
    fn get_key(&self) -> String;
    fn get_source_id(&self) -> String;
    fn get_connection_key(&self) -> ConnectionKey;
    fn get_state(&self) -> VerifierState;
    fn get_request(&self) -> ProofRequest;
    fn get_session(&self) -> Option<SessionPayload>;
    fn get_created_at(&self) -> DateTime<Utc>;
    fn get_updated_at(&self) -> DateTime<Utc>;
}

/// `ProofAPI` is the public proof exchange contract, for both the prover and the verifier
#[async_trait]
pub trait ProofAPI: Clone {
    type ProverAccessor: DisclosedProofEntityAccessor;
    type VerifierAccessor: VerifierProofEntityAccessor;

    /// `get_requests` returns every pending proof request, an empty list is a valid result
    async fn get_requests(&self, connection: ConnectionKey)
        -> Result<Vec<ProofRequest>, ProofError>;

    /// `receive_request` creates the prover's proof from the first pending request
    async fn receive_request(
        &self,
        connection: ConnectionKey,
        source_id: String,
    ) -> Result<Self::ProverAccessor, ProofError>;

    /// `select_credentials` picks the first wallet candidate of each requested attribute
    async fn select_credentials(&self, key: String) -> Result<Self::ProverAccessor, ProofError>;

    async fn generate_proof(
        &self,
        key: String,
        self_attested: SelfAttested,
    ) -> Result<Self::ProverAccessor, ProofError>;

    async fn send_proof(&self, key: String) -> Result<Self::ProverAccessor, ProofError>;

    async fn update_prover_state(&self, key: String) -> Result<Self::ProverAccessor, ProofError>;

    async fn await_verified(
        &self,
        key: String,
        options: PollOptions,
        stop: Option<StopSignal>,
    ) -> Result<Self::ProverAccessor, ProofError>;

    /// `request_proof` is the verifier's first step, `Created -> RequestSent`
    async fn request_proof(
        &self,
        connection: ConnectionKey,
        source_id: String,
        request: ProofRequest,
    ) -> Result<Self::VerifierAccessor, ProofError>;

    /// `update_verifier_state` verifies the received proof as soon as it has been observed
    async fn update_verifier_state(&self, key: String)
        -> Result<Self::VerifierAccessor, ProofError>;

    /// `await_verification` polls until the verifier reaches `Verified` or `Rejected`,
    /// both are returned as a result
    async fn await_verification(
        &self,
        key: String,
        options: PollOptions,
        stop: Option<StopSignal>,
    ) -> Result<Self::VerifierAccessor, ProofError>;

    async fn get_disclosed_proof(&self, key: String) -> Result<Self::ProverAccessor, ProofError>;

    async fn get_verifier_proof(&self, key: String)
        -> Result<Self::VerifierAccessor, ProofError>;
}

/// `ProofCryptoBuilder` is the proof capability of the identity library
#[async_trait]
pub trait ProofCryptoBuilder: Clone + Sync + Send {
    async fn fetch_proof_requests(&self, connection: SessionPayload) -> Result<Vec<Value>, ProofError>;

    async fn query_wallet_credentials(&self, request: ProofRequest) -> Result<Candidates, ProofError>;

    async fn generate_proof(
        &self,
        request: ProofRequest,
        selected: SelectedCredentials,
        self_attested: SelfAttested,
    ) -> Result<ProofPayload, ProofError>;

    async fn send_proof(
        &self,
        connection: SessionPayload,
        request: ProofRequest,
        proof: ProofPayload,
    ) -> Result<SessionPayload, ProofError>;

    async fn refresh_prover_state(
        &self,
        session: SessionPayload,
    ) -> Result<Observed<ProverState>, ProofError>;

    async fn send_proof_request(
        &self,
        connection: SessionPayload,
        source_id: String,
        request: ProofRequest,
    ) -> Result<SessionPayload, ProofError>;

    async fn refresh_verifier_state(
        &self,
        session: SessionPayload,
    ) -> Result<Observed<VerifierState>, ProofError>;

    /// `verify_proof` must return either `Verified` or `Rejected`
    async fn verify_proof(
        &self,
        session: SessionPayload,
    ) -> Result<Observed<VerifierState>, ProofError>;
}

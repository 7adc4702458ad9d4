use std::collections::BTreeMap;

use derive_more::Display;

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
pub enum CredentialError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invalid offer: {0}")]
    InvalidOffer(String),

    #[error("no offers available from connection: {0}")]
    NoOffersAvailable(String),

    #[error("credential not found: {0}")]
    NotFound(String),

    #[error("credential {key}: invalid transition from {from} to {to}")]
    InvalidStateTransition {
        key: String,
        from: String,
        to: String,
    },

    #[error("credential {key} rejected by counterparty, state: {state}")]
    StateTransitionRejected { key: String, state: String },

    #[error("credential {key}: poll timeout after {attempts} attempts, last state: {last_state}")]
    PollTimeout {
        key: String,
        attempts: u32,
        last_state: String,
    },

    #[error("credential {key}: poll cancelled after {attempts} attempts, last state: {last_state}")]
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

impl PollFailure for CredentialError {
    fn poll_timeout(key: String, attempts: u32, last_state: String) -> Self {
        CredentialError::PollTimeout {
            key,
            attempts,
            last_state,
        }
    }

    fn poll_cancelled(key: String, attempts: u32, last_state: String) -> Self {
        CredentialError::PollCancelled {
            key,
            attempts,
            last_state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(crate = "self::serde")]
pub enum IssuerState {
    Created,
    OfferSent,
    RequestReceived,
    Issued,
    Rejected,
}

impl StateGraph for IssuerState {
    fn successor(&self) -> Option<Self> {
        match self {
            IssuerState::OfferSent => Some(IssuerState::RequestReceived),
            IssuerState::RequestReceived => Some(IssuerState::Issued),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            IssuerState::Created => 0,
            IssuerState::OfferSent => 1,
            IssuerState::RequestReceived => 2,
            IssuerState::Issued => 3,
            IssuerState::Rejected => 4,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, IssuerState::Issued | IssuerState::Rejected)
    }

    fn is_failure(&self) -> bool {
        matches!(self, IssuerState::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(crate = "self::serde")]
pub enum HolderState {
    Initialized,
    RequestSent,
    Accepted,
    Rejected,
}

impl StateGraph for HolderState {
    fn successor(&self) -> Option<Self> {
        match self {
            HolderState::RequestSent => Some(HolderState::Accepted),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            HolderState::Initialized => 0,
            HolderState::RequestSent => 1,
            HolderState::Accepted => 2,
            HolderState::Rejected => 3,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, HolderState::Accepted | HolderState::Rejected)
    }

    fn is_failure(&self) -> bool {
        matches!(self, HolderState::Rejected)
    }
}

/// `CredentialOffer` is the structured offer exchanged between issuer and holder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialOffer {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "credDefId")]
    pub cred_def_id: String,

    #[serde(rename = "credentialName", default)]
    pub name: String,

    pub attributes: BTreeMap<String, String>,
}

impl CredentialOffer {
    pub fn new(id: String, cred_def_id: String, name: String) -> Self {
        Self {
            id,
            cred_def_id,
            name,
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn validate(&self) -> Result<(), CredentialError> {
        if self.id.is_empty() {
            return Err(CredentialError::InvalidOffer("@id was missing".to_string()));
        }

        if self.cred_def_id.is_empty() {
            return Err(CredentialError::InvalidOffer(
                "credDefId was missing".to_string(),
            ));
        }

        if self.attributes.is_empty() {
            return Err(CredentialError::InvalidOffer(
                "attributes was missing".to_string(),
            ));
        }

        Ok(())
    }

    /// `from_list` parses a JSON array of offers, every item must be a valid offer
    pub fn from_list(payload: &str) -> Result<Vec<CredentialOffer>, CredentialError> {
        let values: Vec<Value> = serde_json::from_str(payload)
            .map_err(|err| CredentialError::InvalidOffer(err.to_string()))?;

        values.into_iter().map(CredentialOffer::try_from).collect()
    }
}

impl TryFrom<Value> for CredentialOffer {
    type Error = CredentialError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let offer: CredentialOffer = serde_json::from_value(value)
            .map_err(|err| CredentialError::InvalidOffer(err.to_string()))?;

        offer.validate()?;
        Ok(offer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PaymentOptions {
    pub payment_handle: u32,
}

pub trait IssuerEntityAccessor {
    fn get_id(&self) -> String;
    fn get_key(&self) -> String;
    fn get_source_id(&self) -> String;
    fn get_connection_key(&self) -> ConnectionKey;
    fn get_state(&self) -> IssuerState;
    fn get_offer(&self) -> CredentialOffer;
    fn get_session(&self) -> Option<SessionPayload>;
    fn get_created_at(&self) -> DateTime<Utc>;
    fn get_updated_at(&self) -> DateTime<Utc>;
}

pub trait HolderEntityAccessor {
    fn get_id(&self) -> String;
    fn get_key(&self) -> String;
    fn get_source_id(&self) -> String;
    fn get_connection_key(&self) -> ConnectionKey;
    fn get_state(&self) -> HolderState;
    fn get_offer(&self) -> CredentialOffer;
    fn get_session(&self) -> SessionPayload;
    fn get_created_at(&self) -> DateTime<Utc>;
    fn get_updated_at(&self) -> DateTime<Utc>;
}

/// `CredentialAPI` is the public credential exchange contract, for both sides
#[async_trait]
pub trait CredentialAPI: Clone {
    type IssuerAccessor: IssuerEntityAccessor;
    type HolderAccessor: HolderEntityAccessor;

    /// `send_offer` is the issuer's first step, `Created -> OfferSent`
    async fn send_offer(
        &self,
        connection: ConnectionKey,
        source_id: String,
        offer: CredentialOffer,
    ) -> Result<Self::IssuerAccessor, CredentialError>;

    async fn update_issuer_state(&self, key: String)
        -> Result<Self::IssuerAccessor, CredentialError>;

    /// `await_request` polls until the holder's request has been received
    async fn await_request(
        &self,
        key: String,
        options: PollOptions,
        stop: Option<StopSignal>,
    ) -> Result<Self::IssuerAccessor, CredentialError>;

    /// `send_credential` issues the credential, `RequestReceived -> Issued`
    async fn send_credential(&self, key: String) -> Result<Self::IssuerAccessor, CredentialError>;

    /// `get_offers` returns every pending offer, an empty list is a valid result
    async fn get_offers(
        &self,
        connection: ConnectionKey,
    ) -> Result<Vec<CredentialOffer>, CredentialError>;

    /// `request_credential` takes the first offer from a JSON array payload,
    /// `Initialized -> RequestSent`
    async fn request_credential(
        &self,
        connection: ConnectionKey,
        source_id: String,
        offers: String,
        payment: PaymentOptions,
    ) -> Result<Self::HolderAccessor, CredentialError>;

    async fn update_holder_state(&self, key: String)
        -> Result<Self::HolderAccessor, CredentialError>;

    /// `await_accepted` polls until the issued credential has been stored by the holder
    async fn await_accepted(
        &self,
        key: String,
        options: PollOptions,
        stop: Option<StopSignal>,
    ) -> Result<Self::HolderAccessor, CredentialError>;

    async fn get_issuer_credential(&self, key: String)
        -> Result<Self::IssuerAccessor, CredentialError>;

    async fn get_holder_credential(&self, key: String)
        -> Result<Self::HolderAccessor, CredentialError>;
}

/// `CredentialCryptoBuilder` is the credential capability of the identity library
#[async_trait]
pub trait CredentialCryptoBuilder: Clone + Sync + Send {
    async fn send_offer(
        &self,
        connection: SessionPayload,
        source_id: String,
        offer: CredentialOffer,
    ) -> Result<SessionPayload, CredentialError>;

    async fn refresh_issuer_state(
        &self,
        session: SessionPayload,
    ) -> Result<Observed<IssuerState>, CredentialError>;

    async fn send_credential(
        &self,
        connection: SessionPayload,
        session: SessionPayload,
    ) -> Result<SessionPayload, CredentialError>;

    async fn fetch_offers(&self, connection: SessionPayload) -> Result<Vec<Value>, CredentialError>;

    async fn create_credential_object(
        &self,
        source_id: String,
        offer: CredentialOffer,
    ) -> Result<SessionPayload, CredentialError>;

    async fn send_request(
        &self,
        connection: SessionPayload,
        session: SessionPayload,
        payment: PaymentOptions,
    ) -> Result<SessionPayload, CredentialError>;

    async fn refresh_holder_state(
        &self,
        session: SessionPayload,
    ) -> Result<Observed<HolderState>, CredentialError>;
}

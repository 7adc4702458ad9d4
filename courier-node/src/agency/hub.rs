use std::collections::BTreeMap;
use std::sync::Arc;

use rst_common::with_tokio::tokio::sync::RwLock;

use prople_courier_core::connection::types::{Invitation, Message};
use prople_courier_core::credential::types::CredentialOffer;
use prople_courier_core::proof::types::{CredentialCandidate, ProofPayload, ProofRequest};
use prople_courier_core::provisioning::types::{AgentKeys, ProvisionConfig, RelayIdentity};
use prople_courier_core::session::SessionPayload;

use super::types::{from_session, generate_identifier, AgencyError, ConnectionSession, Side};

pub(crate) struct Registration {
    pub(crate) config: ProvisionConfig,
    pub(crate) keys: AgentKeys,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum HandshakeStage {
    Invited,
    Requested,
    Responded,
    Acknowledged,
    Rejected,
}

#[derive(Debug, Clone)]
pub(crate) struct Party {
    pub(crate) agent_did: String,
    pub(crate) pairwise_did: String,
}

pub(crate) struct Pairwise {
    pub(crate) invitation: Invitation,
    pub(crate) stage: HandshakeStage,
    pub(crate) inviter: Party,
    pub(crate) invitee: Option<Party>,
}

impl Pairwise {
    pub(crate) fn side_of(&self, pairwise_did: &str) -> Option<Side> {
        if self.inviter.pairwise_did == pairwise_did {
            return Some(Side::Inviter);
        }

        self.invitee
            .as_ref()
            .filter(|party| party.pairwise_did == pairwise_did)
            .map(|_| Side::Invitee)
    }

    pub(crate) fn party(&self, side: Side) -> Option<&Party> {
        match side {
            Side::Inviter => Some(&self.inviter),
            Side::Invitee => self.invitee.as_ref(),
        }
    }

    pub(crate) fn counterparty(&self, pairwise_did: &str) -> Result<Party, AgencyError> {
        self.side_of(pairwise_did)
            .and_then(|side| self.party(side.opposite()))
            .cloned()
            .ok_or_else(|| AgencyError::UnknownRoute(format!("{} has no counterparty", pairwise_did)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CredentialStage {
    Offered,
    Requested,
    Issued,
    Rejected,
}

pub(crate) struct CredentialThread {
    pub(crate) offer: CredentialOffer,
    pub(crate) stage: CredentialStage,
    pub(crate) issuer: String,
    pub(crate) holder: Party,
    pub(crate) stored: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ProofStage {
    Requested,
    Presented,
    Verified,
    Rejected,
}

pub(crate) struct ProofThread {
    pub(crate) request: ProofRequest,
    pub(crate) stage: ProofStage,
    pub(crate) verifier: String,
    pub(crate) prover: Party,
    pub(crate) proof: Option<ProofPayload>,
}

/// `Mailbox` is the complete agency state, guarded by a single lock
///
/// Connections are keyed by their invitation id, every pairwise DID is routed to one of them.
/// Credential and proof threads are keyed by `{invitation_id}:{thread_id}`.
#[derive(Default)]
pub(crate) struct Mailbox {
    pub(crate) agents: BTreeMap<String, Registration>,
    pub(crate) routes: BTreeMap<String, String>,
    pub(crate) connections: BTreeMap<String, Pairwise>,
    pub(crate) messages: BTreeMap<String, Vec<Message>>,
    pub(crate) credentials: BTreeMap<String, CredentialThread>,
    pub(crate) proofs: BTreeMap<String, ProofThread>,
    pub(crate) wallets: BTreeMap<String, Vec<CredentialCandidate>>,
}

impl Mailbox {
    pub(crate) fn route(&self, pairwise_did: &str) -> Result<String, AgencyError> {
        self.routes
            .get(pairwise_did)
            .cloned()
            .ok_or_else(|| AgencyError::UnknownRoute(pairwise_did.to_string()))
    }

    pub(crate) fn pairwise(&self, pairwise_did: &str) -> Result<&Pairwise, AgencyError> {
        let connection_id = self.route(pairwise_did)?;
        self.connections
            .get(&connection_id)
            .ok_or(AgencyError::UnknownRoute(connection_id))
    }

    pub(crate) fn pairwise_mut(&mut self, pairwise_did: &str) -> Result<&mut Pairwise, AgencyError> {
        let connection_id = self.route(pairwise_did)?;
        self.connections
            .get_mut(&connection_id)
            .ok_or(AgencyError::UnknownRoute(connection_id))
    }

    pub(crate) fn thread_key(&self, pairwise_did: &str, thread_id: &str) -> Result<String, AgencyError> {
        let connection_id = self.route(pairwise_did)?;
        Ok(format!("{}:{}", connection_id, thread_id))
    }
}

/// `Agency` is an in-process relay shared by every local agent
///
/// It implements the agency side of all protocols without any real cryptography: messages are
/// routed by pairwise DID and each protocol step only moves the shared thread forward. Each agent
/// reaches it through its own [`AgentClient`]. Cloning an `Agency` shares the same state.
#[derive(Clone)]
pub struct Agency {
    pub(crate) endpoint: String,
    pub(crate) identity: RelayIdentity,
    pub(crate) mailbox: Arc<RwLock<Mailbox>>,
}

impl Agency {
    pub fn new(endpoint: String) -> Self {
        let (did, verkey) = generate_identifier();
        Self {
            endpoint,
            identity: RelayIdentity { did, verkey },
            mailbox: Arc::new(RwLock::new(Mailbox::default())),
        }
    }

    pub fn endpoint(&self) -> String {
        self.endpoint.to_owned()
    }

    pub fn identity(&self) -> RelayIdentity {
        self.identity.clone()
    }

    /// `client` builds the agency handle of a single agent
    ///
    /// The given DID must be the same one used as the agent's own DID for its connections,
    /// it owns the credentials stored in the agent's wallet
    pub fn client(&self, agent_did: String) -> AgentClient {
        AgentClient {
            agency: self.clone(),
            agent_did,
        }
    }

    pub async fn registrations(&self) -> usize {
        self.mailbox.read().await.agents.len()
    }

    pub async fn webhook_url(&self, institution_did: &str) -> Option<String> {
        self.mailbox
            .read()
            .await
            .agents
            .get(institution_did)
            .and_then(|registration| registration.config.webhook_url.clone())
    }

    /// `reject_connection` simulates a counterparty refusing the handshake
    pub async fn reject_connection(&self, session: &SessionPayload) -> Result<(), AgencyError> {
        let conn: ConnectionSession = from_session(session)?;
        let mut mailbox = self.mailbox.write().await;

        mailbox.pairwise_mut(&conn.pairwise_did)?.stage = HandshakeStage::Rejected;
        Ok(())
    }

    pub async fn wallet(&self, agent_did: &str) -> Vec<CredentialCandidate> {
        self.mailbox
            .read()
            .await
            .wallets
            .get(agent_did)
            .cloned()
            .unwrap_or_default()
    }
}

/// `AgentClient` is the view of the [`Agency`] from a single local agent
#[derive(Clone)]
pub struct AgentClient {
    pub(crate) agency: Agency,
    pub(crate) agent_did: String,
}

impl AgentClient {
    pub fn agent_did(&self) -> String {
        self.agent_did.to_owned()
    }

    pub fn agency(&self) -> &Agency {
        &self.agency
    }
}

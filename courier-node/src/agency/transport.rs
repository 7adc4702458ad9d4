use rst_common::standard::async_trait::async_trait;
use rst_common::standard::uuid::Uuid;
use rst_common::with_logging::log::debug;

use prople_courier_core::connection::types::{
    ConnectOptions, ConnectionError, Handshake, Invitation, Message, State, TransportBuilder,
};
use prople_courier_core::session::{Observed, SessionPayload};

use super::hub::{AgentClient, HandshakeStage, Pairwise, Party};
use super::types::{from_session, generate_identifier, to_session, AgencyError, ConnectionSession, Side};

/// `observe` maps the shared handshake stage onto the state seen by one side
///
/// Observing the handshake is what moves it forward: the inviter answers a pending request,
/// the invitee acknowledges a pending response.
fn observe(pairwise: &mut Pairwise, side: Side) -> State {
    match (side, pairwise.stage) {
        (_, HandshakeStage::Rejected) => State::Rejected,
        (Side::Inviter, HandshakeStage::Invited) => State::Invited,
        (Side::Inviter, HandshakeStage::Requested) => {
            pairwise.stage = HandshakeStage::Responded;
            State::Responded
        }
        (Side::Inviter, HandshakeStage::Responded) => State::Responded,
        (Side::Invitee, HandshakeStage::Invited) => State::Null,
        (Side::Invitee, HandshakeStage::Requested) => State::Requested,
        (Side::Invitee, HandshakeStage::Responded) => {
            pairwise.stage = HandshakeStage::Acknowledged;
            State::Accepted
        }
        (_, HandshakeStage::Acknowledged) => State::Accepted,
    }
}

#[async_trait]
impl TransportBuilder for AgentClient {
    async fn create_invitation(
        &self,
        self_did: String,
        source_id: String,
    ) -> Result<Handshake, ConnectionError> {
        let (pairwise_did, pairwise_verkey) = generate_identifier();
        let invitation = Invitation {
            id: Uuid::new_v4().to_string(),
            label: self_did.clone(),
            recipient_keys: vec![pairwise_verkey],
            routing_keys: vec![self.agency.identity.verkey.clone()],
            service_endpoint: self.agency.endpoint(),
        };

        let session = to_session(&ConnectionSession {
            pairwise_did: pairwise_did.clone(),
            source_id,
            side: Side::Inviter,
            connected: false,
        })?;

        let mut mailbox = self.agency.mailbox.write().await;
        mailbox
            .routes
            .insert(pairwise_did.clone(), invitation.id.clone());
        mailbox.connections.insert(
            invitation.id.clone(),
            Pairwise {
                invitation: invitation.clone(),
                stage: HandshakeStage::Invited,
                inviter: Party {
                    agent_did: self_did,
                    pairwise_did,
                },
                invitee: None,
            },
        );

        debug!("agency: invitation created: {}", invitation.id);
        Ok(Handshake {
            invitation,
            session,
        })
    }

    async fn accept_invitation(
        &self,
        self_did: String,
        source_id: String,
        invitation: Invitation,
    ) -> Result<SessionPayload, ConnectionError> {
        let (pairwise_did, _) = generate_identifier();

        let mut mailbox = self.agency.mailbox.write().await;
        let pairwise = mailbox
            .connections
            .get_mut(&invitation.id)
            .ok_or_else(|| AgencyError::UnknownRoute(invitation.id.clone()))?;

        if pairwise.invitation.recipient_keys != invitation.recipient_keys {
            return Err(ConnectionError::InvalidInvitation(
                "recipientKeys does not match".to_string(),
            ));
        }

        if pairwise.invitee.is_some() {
            return Err(AgencyError::InvalidMessage(format!(
                "invitation already accepted: {}",
                invitation.id
            ))
            .into());
        }

        pairwise.invitee = Some(Party {
            agent_did: self_did,
            pairwise_did: pairwise_did.clone(),
        });

        mailbox.routes.insert(pairwise_did.clone(), invitation.id);

        let session = to_session(&ConnectionSession {
            pairwise_did,
            source_id,
            side: Side::Invitee,
            connected: false,
        })?;

        Ok(session)
    }

    async fn connect(
        &self,
        session: SessionPayload,
        _options: ConnectOptions,
    ) -> Result<SessionPayload, ConnectionError> {
        let mut conn: ConnectionSession = from_session(&session)?;

        let mut mailbox = self.agency.mailbox.write().await;
        let pairwise = mailbox.pairwise_mut(&conn.pairwise_did)?;

        if conn.side == Side::Invitee && pairwise.stage == HandshakeStage::Invited {
            pairwise.stage = HandshakeStage::Requested;
        }

        conn.connected = true;
        Ok(to_session(&conn)?)
    }

    async fn refresh_state(
        &self,
        session: SessionPayload,
    ) -> Result<Observed<State>, ConnectionError> {
        let conn: ConnectionSession = from_session(&session)?;
        if !conn.connected {
            return Err(AgencyError::InvalidSession(format!(
                "connection was not started: {}",
                conn.source_id
            ))
            .into());
        }

        let mut mailbox = self.agency.mailbox.write().await;
        let pairwise = mailbox.pairwise_mut(&conn.pairwise_did)?;
        let state = observe(pairwise, conn.side);

        Ok(Observed::new(state, session))
    }

    async fn send(&self, session: SessionPayload, message: Message) -> Result<(), ConnectionError> {
        let conn: ConnectionSession = from_session(&session)?;

        let mut mailbox = self.agency.mailbox.write().await;
        let pairwise = mailbox.pairwise(&conn.pairwise_did)?;
        if pairwise.stage != HandshakeStage::Acknowledged {
            return Err(AgencyError::InvalidMessage(
                "connection is not established".to_string(),
            )
            .into());
        }

        let counterparty = pairwise.counterparty(&conn.pairwise_did)?;
        mailbox
            .messages
            .entry(counterparty.pairwise_did)
            .or_default()
            .push(message);

        Ok(())
    }

    async fn download_messages(
        &self,
        session: SessionPayload,
    ) -> Result<Vec<Message>, ConnectionError> {
        let conn: ConnectionSession = from_session(&session)?;

        let mut mailbox = self.agency.mailbox.write().await;
        if mailbox.pairwise(&conn.pairwise_did)?.stage != HandshakeStage::Acknowledged {
            return Err(AgencyError::InvalidMessage(
                "connection is not established".to_string(),
            )
            .into());
        }

        let messages = mailbox
            .messages
            .remove(&conn.pairwise_did)
            .unwrap_or_default();

        debug!("agency: {} messages downloaded by {}", messages.len(), conn.source_id);
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rst_common::with_tokio::tokio;

    use crate::agency::Agency;

    async fn handshake(agency: &Agency) -> (SessionPayload, SessionPayload) {
        let faber = agency.client("did:faber".to_string());
        let alice = agency.client("did:alice".to_string());

        let created = faber
            .create_invitation("did:faber".to_string(), "alice".to_string())
            .await
            .unwrap();
        let inviter = faber
            .connect(created.session, ConnectOptions::default())
            .await
            .unwrap();

        let accepted = alice
            .accept_invitation("did:alice".to_string(), "faber".to_string(), created.invitation)
            .await
            .unwrap();
        let invitee = alice
            .connect(accepted, ConnectOptions::default())
            .await
            .unwrap();

        (inviter, invitee)
    }

    #[tokio::test]
    async fn test_handshake_states() {
        let agency = Agency::new("loopback://agency".to_string());
        let client = agency.client("did:any".to_string());
        let (inviter, invitee) = handshake(&agency).await;

        let observed = client.refresh_state(invitee.clone()).await.unwrap();
        assert_eq!(observed.state, State::Requested);

        let observed = client.refresh_state(inviter.clone()).await.unwrap();
        assert_eq!(observed.state, State::Responded);

        let observed = client.refresh_state(invitee.clone()).await.unwrap();
        assert_eq!(observed.state, State::Accepted);

        let observed = client.refresh_state(inviter).await.unwrap();
        assert_eq!(observed.state, State::Accepted);
    }

    #[tokio::test]
    async fn test_accept_twice() {
        let agency = Agency::new("loopback://agency".to_string());
        let faber = agency.client("did:faber".to_string());

        let created = faber
            .create_invitation("did:faber".to_string(), "alice".to_string())
            .await
            .unwrap();

        let first = faber
            .accept_invitation(
                "did:alice".to_string(),
                "faber".to_string(),
                created.invitation.clone(),
            )
            .await;
        assert!(first.is_ok());

        let second = faber
            .accept_invitation("did:bob".to_string(), "faber".to_string(), created.invitation)
            .await;
        assert!(matches!(second, Err(ConnectionError::TransportError(_))))
    }

    #[tokio::test]
    async fn test_refresh_before_connect() {
        let agency = Agency::new("loopback://agency".to_string());
        let faber = agency.client("did:faber".to_string());

        let created = faber
            .create_invitation("did:faber".to_string(), "alice".to_string())
            .await
            .unwrap();

        let observed = faber.refresh_state(created.session).await;
        assert!(matches!(observed, Err(ConnectionError::TransportError(_))))
    }

    #[tokio::test]
    async fn test_send_message() {
        let agency = Agency::new("loopback://agency".to_string());
        let client = agency.client("did:any".to_string());
        let (inviter, invitee) = handshake(&agency).await;

        let message = Message::new("hello".to_string(), "hi alice".to_string());
        let early = client.send(inviter.clone(), message.clone()).await;
        assert!(early.is_err());

        let _ = client.refresh_state(inviter.clone()).await.unwrap();
        let _ = client.refresh_state(invitee.clone()).await.unwrap();

        let sent = client.send(inviter, message.clone()).await;
        assert!(sent.is_ok());

        let received = client.download_messages(invitee.clone()).await.unwrap();
        assert_eq!(received, vec![message]);

        let drained = client.download_messages(invitee).await.unwrap();
        assert!(drained.is_empty())
    }

    #[tokio::test]
    async fn test_download_before_acknowledged() {
        let agency = Agency::new("loopback://agency".to_string());
        let client = agency.client("did:any".to_string());
        let (inviter, invitee) = handshake(&agency).await;

        let _ = client.refresh_state(inviter).await.unwrap();

        let downloaded = client.download_messages(invitee).await;
        assert!(matches!(downloaded, Err(ConnectionError::TransportError(_))))
    }

    #[tokio::test]
    async fn test_rejected_connection() {
        let agency = Agency::new("loopback://agency".to_string());
        let client = agency.client("did:any".to_string());
        let (inviter, invitee) = handshake(&agency).await;

        agency.reject_connection(&invitee).await.unwrap();

        let observed = client.refresh_state(inviter).await.unwrap();
        assert_eq!(observed.state, State::Rejected)
    }
}

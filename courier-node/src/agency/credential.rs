use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{self, Value};
use rst_common::standard::uuid::Uuid;
use rst_common::with_logging::log::debug;

use prople_courier_core::credential::types::{
    CredentialCryptoBuilder, CredentialError, CredentialOffer, HolderState, IssuerState,
    PaymentOptions,
};
use prople_courier_core::proof::types::CredentialCandidate;
use prople_courier_core::session::{Observed, SessionPayload};

use super::hub::{AgentClient, CredentialStage, CredentialThread};
use super::types::{from_session, to_session, AgencyError, ConnectionSession, ThreadSession};

#[async_trait]
impl CredentialCryptoBuilder for AgentClient {
    async fn send_offer(
        &self,
        connection: SessionPayload,
        source_id: String,
        offer: CredentialOffer,
    ) -> Result<SessionPayload, CredentialError> {
        let conn: ConnectionSession = from_session(&connection)?;

        let mut mailbox = self.agency.mailbox.write().await;
        let holder = mailbox.pairwise(&conn.pairwise_did)?.counterparty(&conn.pairwise_did)?;
        let thread_key = mailbox.thread_key(&conn.pairwise_did, &offer.id)?;

        if mailbox.credentials.contains_key(&thread_key) {
            return Err(AgencyError::InvalidMessage(format!("offer already sent: {}", offer.id)).into());
        }

        let session = to_session(&ThreadSession {
            thread_id: offer.id.clone(),
            source_id,
            pairwise_did: Some(conn.pairwise_did.clone()),
        })?;

        mailbox.credentials.insert(
            thread_key.clone(),
            CredentialThread {
                offer,
                stage: CredentialStage::Offered,
                issuer: conn.pairwise_did,
                holder,
                stored: false,
            },
        );

        debug!("agency: credential offer delivered: {}", thread_key);
        Ok(session)
    }

    async fn refresh_issuer_state(
        &self,
        session: SessionPayload,
    ) -> Result<Observed<IssuerState>, CredentialError> {
        let thread: ThreadSession = from_session(&session)?;

        let mailbox = self.agency.mailbox.read().await;
        let thread_key = mailbox.thread_key(&thread.route()?, &thread.thread_id)?;
        let credential = mailbox
            .credentials
            .get(&thread_key)
            .ok_or(AgencyError::UnknownThread(thread_key))?;

        let state = match credential.stage {
            CredentialStage::Offered => IssuerState::OfferSent,
            CredentialStage::Requested => IssuerState::RequestReceived,
            CredentialStage::Issued => IssuerState::Issued,
            CredentialStage::Rejected => IssuerState::Rejected,
        };

        Ok(Observed::new(state, session))
    }

    async fn send_credential(
        &self,
        connection: SessionPayload,
        session: SessionPayload,
    ) -> Result<SessionPayload, CredentialError> {
        let conn: ConnectionSession = from_session(&connection)?;
        let thread: ThreadSession = from_session(&session)?;

        let mut mailbox = self.agency.mailbox.write().await;
        let thread_key = mailbox.thread_key(&conn.pairwise_did, &thread.thread_id)?;
        let credential = mailbox
            .credentials
            .get_mut(&thread_key)
            .ok_or_else(|| AgencyError::UnknownThread(thread_key.clone()))?;

        if credential.issuer != conn.pairwise_did || credential.stage != CredentialStage::Requested {
            return Err(AgencyError::InvalidMessage(format!(
                "credential is not requested: {}",
                thread_key
            ))
            .into());
        }

        credential.stage = CredentialStage::Issued;
        debug!("agency: credential issued: {}", thread_key);

        Ok(session)
    }

    async fn fetch_offers(&self, connection: SessionPayload) -> Result<Vec<Value>, CredentialError> {
        let conn: ConnectionSession = from_session(&connection)?;

        let mailbox = self.agency.mailbox.read().await;
        let connection_id = mailbox.route(&conn.pairwise_did)?;
        let prefix = format!("{}:", connection_id);

        let mut offers = Vec::new();
        for (key, credential) in mailbox.credentials.iter() {
            let pending = key.starts_with(&prefix)
                && credential.holder.pairwise_did == conn.pairwise_did
                && credential.stage == CredentialStage::Offered;

            if pending {
                let offer = serde_json::to_value(&credential.offer)
                    .map_err(|err| CredentialError::GenerateJSONError(err.to_string()))?;
                offers.push(offer);
            }
        }

        Ok(offers)
    }

    async fn create_credential_object(
        &self,
        source_id: String,
        offer: CredentialOffer,
    ) -> Result<SessionPayload, CredentialError> {
        let session = to_session(&ThreadSession {
            thread_id: offer.id,
            source_id,
            pairwise_did: None,
        })?;

        Ok(session)
    }

    async fn send_request(
        &self,
        connection: SessionPayload,
        session: SessionPayload,
        _payment: PaymentOptions,
    ) -> Result<SessionPayload, CredentialError> {
        let conn: ConnectionSession = from_session(&connection)?;
        let mut thread: ThreadSession = from_session(&session)?;

        let mut mailbox = self.agency.mailbox.write().await;
        let thread_key = mailbox.thread_key(&conn.pairwise_did, &thread.thread_id)?;
        let credential = mailbox
            .credentials
            .get_mut(&thread_key)
            .ok_or_else(|| AgencyError::UnknownThread(thread_key.clone()))?;

        if credential.holder.pairwise_did != conn.pairwise_did
            || credential.stage != CredentialStage::Offered
        {
            return Err(AgencyError::InvalidMessage(format!(
                "credential is not offered: {}",
                thread_key
            ))
            .into());
        }

        credential.stage = CredentialStage::Requested;
        thread.pairwise_did = Some(conn.pairwise_did);

        Ok(to_session(&thread)?)
    }

    async fn refresh_holder_state(
        &self,
        session: SessionPayload,
    ) -> Result<Observed<HolderState>, CredentialError> {
        let thread: ThreadSession = from_session(&session)?;

        let mut guard = self.agency.mailbox.write().await;
        let mailbox = &mut *guard;
        let thread_key = mailbox.thread_key(&thread.route()?, &thread.thread_id)?;
        let credential = mailbox
            .credentials
            .get_mut(&thread_key)
            .ok_or_else(|| AgencyError::UnknownThread(thread_key.clone()))?;

        let state = match credential.stage {
            CredentialStage::Offered => HolderState::Initialized,
            CredentialStage::Requested => HolderState::RequestSent,
            CredentialStage::Issued => HolderState::Accepted,
            CredentialStage::Rejected => HolderState::Rejected,
        };

        if state == HolderState::Accepted && !credential.stored {
            credential.stored = true;
            mailbox
                .wallets
                .entry(credential.holder.agent_did.clone())
                .or_default()
                .push(CredentialCandidate {
                    cred_id: Uuid::new_v4().to_string(),
                    cred_def_id: credential.offer.cred_def_id.clone(),
                    attributes: credential.offer.attributes.clone(),
                });

            debug!("agency: credential stored: {}", thread_key);
        }

        Ok(Observed::new(state, session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rst_common::with_tokio::tokio;

    use prople_courier_core::connection::types::{ConnectOptions, TransportBuilder};

    use crate::agency::Agency;

    async fn connected(agency: &Agency) -> (SessionPayload, SessionPayload) {
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

        let _ = faber.refresh_state(inviter.clone()).await.unwrap();
        let _ = alice.refresh_state(invitee.clone()).await.unwrap();

        (inviter, invitee)
    }

    fn build_offer(id: &str) -> CredentialOffer {
        CredentialOffer::new(id.to_string(), "cred-def-1".to_string(), "degree".to_string())
            .attribute("name", "alice")
            .attribute("degree", "maths")
    }

    #[tokio::test]
    async fn test_credential_exchange() {
        let agency = Agency::new("loopback://agency".to_string());
        let faber = agency.client("did:faber".to_string());
        let alice = agency.client("did:alice".to_string());
        let (issuer_conn, holder_conn) = connected(&agency).await;

        let issuer = faber
            .send_offer(issuer_conn.clone(), "degree".to_string(), build_offer("offer-1"))
            .await
            .unwrap();
        let observed = faber.refresh_issuer_state(issuer.clone()).await.unwrap();
        assert_eq!(observed.state, IssuerState::OfferSent);

        let offers = alice.fetch_offers(holder_conn.clone()).await.unwrap();
        assert_eq!(offers.len(), 1);

        let offer = CredentialOffer::try_from(offers[0].clone()).unwrap();
        let holder = alice
            .create_credential_object("degree".to_string(), offer)
            .await
            .unwrap();
        let holder = alice
            .send_request(holder_conn.clone(), holder, PaymentOptions::default())
            .await
            .unwrap();

        let observed = alice.refresh_holder_state(holder.clone()).await.unwrap();
        assert_eq!(observed.state, HolderState::RequestSent);

        let observed = faber.refresh_issuer_state(issuer.clone()).await.unwrap();
        assert_eq!(observed.state, IssuerState::RequestReceived);

        let issuer = faber.send_credential(issuer_conn, issuer).await.unwrap();
        let observed = faber.refresh_issuer_state(issuer).await.unwrap();
        assert_eq!(observed.state, IssuerState::Issued);

        let observed = alice.refresh_holder_state(holder.clone()).await.unwrap();
        assert_eq!(observed.state, HolderState::Accepted);

        let _ = alice.refresh_holder_state(holder).await.unwrap();
        let wallet = agency.wallet("did:alice").await;
        assert_eq!(wallet.len(), 1);
        assert_eq!(wallet[0].attributes.get("degree"), Some(&"maths".to_string()));

        let offers = alice.fetch_offers(holder_conn).await.unwrap();
        assert!(offers.is_empty())
    }

    #[tokio::test]
    async fn test_issuer_does_not_see_own_offer() {
        let agency = Agency::new("loopback://agency".to_string());
        let faber = agency.client("did:faber".to_string());
        let (issuer_conn, _) = connected(&agency).await;

        let _ = faber
            .send_offer(issuer_conn.clone(), "degree".to_string(), build_offer("offer-2"))
            .await
            .unwrap();

        let offers = faber.fetch_offers(issuer_conn).await.unwrap();
        assert!(offers.is_empty())
    }

    #[tokio::test]
    async fn test_send_credential_before_request() {
        let agency = Agency::new("loopback://agency".to_string());
        let faber = agency.client("did:faber".to_string());
        let (issuer_conn, _) = connected(&agency).await;

        let issuer = faber
            .send_offer(issuer_conn.clone(), "degree".to_string(), build_offer("offer-3"))
            .await
            .unwrap();

        let issued = faber.send_credential(issuer_conn, issuer).await;
        assert!(matches!(issued, Err(CredentialError::CryptoError(_))))
    }

    #[tokio::test]
    async fn test_refresh_unsent_holder_object() {
        let agency = Agency::new("loopback://agency".to_string());
        let alice = agency.client("did:alice".to_string());

        let holder = alice
            .create_credential_object("degree".to_string(), build_offer("offer-4"))
            .await
            .unwrap();

        let observed = alice.refresh_holder_state(holder).await;
        assert!(matches!(observed, Err(CredentialError::CryptoError(_))))
    }
}

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::{debug, info};

use crate::connection::types::{ConnectionError, ConnectionKey};
use crate::connection::Connection;
use crate::polling::graph::{plan_transitions, StateGraph};
use crate::polling::{await_terminal, PollOptions, StopSignal};
use crate::session::SessionPayload;
use crate::store::types::{Namespace, StoreBuilder};
use crate::store::{compose_key, EntityRepo, KeyLocker};

use super::types::{
    CredentialAPI, CredentialCryptoBuilder, CredentialError, CredentialOffer, HolderState,
    IssuerState, PaymentOptions,
};
use super::{HolderCredential, IssuerCredential};

#[derive(Clone)]
pub struct Usecase<TStore, TCrypto>
where
    TStore: StoreBuilder,
    TCrypto: CredentialCryptoBuilder,
{
    connections: EntityRepo<TStore>,
    issuers: EntityRepo<TStore>,
    holders: EntityRepo<TStore>,
    crypto: TCrypto,
    locker: KeyLocker,
}

impl<TStore, TCrypto> Usecase<TStore, TCrypto>
where
    TStore: StoreBuilder,
    TCrypto: CredentialCryptoBuilder,
{
    pub fn new(store: TStore, crypto: TCrypto) -> Self {
        Self {
            connections: EntityRepo::new(store.clone(), Namespace::Connections),
            issuers: EntityRepo::new(store.clone(), Namespace::IssuerCredentials),
            holders: EntityRepo::new(store, Namespace::HolderCredentials),
            crypto,
            locker: KeyLocker::new(),
        }
    }

    async fn ready_connection(&self, key: &ConnectionKey) -> Result<SessionPayload, CredentialError> {
        let found: Result<Option<Connection>, ConnectionError> =
            self.connections.find(key.as_ref()).await;

        let conn = found?.ok_or_else(|| ConnectionError::NotFound(key.to_string()))?;
        let session = conn.ensure_ready()?;
        Ok(session)
    }

    async fn load_issuer(&self, key: &str) -> Result<IssuerCredential, CredentialError> {
        let found: Option<IssuerCredential> = self.issuers.find(key).await?;
        found.ok_or_else(|| CredentialError::NotFound(key.to_string()))
    }

    async fn load_holder(&self, key: &str) -> Result<HolderCredential, CredentialError> {
        let found: Option<HolderCredential> = self.holders.find(key).await?;
        found.ok_or_else(|| CredentialError::NotFound(key.to_string()))
    }

    fn validate_source_id(source_id: &str) -> Result<(), CredentialError> {
        if source_id.is_empty() {
            return Err(CredentialError::ValidationError(
                "source_id was missing".to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl<TStore, TCrypto> CredentialAPI for Usecase<TStore, TCrypto>
where
    TStore: StoreBuilder,
    TCrypto: CredentialCryptoBuilder,
{
    type IssuerAccessor = IssuerCredential;
    type HolderAccessor = HolderCredential;

    async fn send_offer(
        &self,
        connection: ConnectionKey,
        source_id: String,
        offer: CredentialOffer,
    ) -> Result<IssuerCredential, CredentialError> {
        Self::validate_source_id(&source_id)?;
        offer.validate()?;

        let conn_session = self.ready_connection(&connection).await?;
        let mut credential = IssuerCredential::new(connection, source_id.clone(), offer.clone());
        let key = credential.key();
        let _guard = self.locker.lock(&key).await;

        let existing: Option<IssuerCredential> = self.issuers.find(&key).await?;
        if let Some(stored) = existing.filter(|cred| cred.state != IssuerState::Rejected) {
            info!("credential offer resumed: {}, state: {}", key, stored.state);
            return Ok(stored);
        }

        let session = self
            .crypto
            .send_offer(conn_session, source_id, offer)
            .await?;

        credential
            .set_session(session)
            .transition(IssuerState::OfferSent)?;

        self.issuers.save(&key, credential.clone()).await?;
        info!("credential offer sent: {}", key);

        Ok(credential)
    }

    async fn update_issuer_state(&self, key: String) -> Result<IssuerCredential, CredentialError> {
        let _guard = self.locker.lock(&key).await;

        let mut credential = self.load_issuer(&key).await?;
        if credential.state.is_terminal() {
            return Ok(credential);
        }

        let session = credential.require_session()?;
        let observed = self.crypto.refresh_issuer_state(session).await?;
        credential.set_session(observed.session);

        let steps = plan_transitions(credential.state, observed.state);
        if steps.is_empty() {
            self.issuers.save(&key, credential.clone()).await?;
            return Ok(credential);
        }

        for step in steps {
            credential.transition(step)?;
            self.issuers.save(&key, credential.clone()).await?;
            debug!("issuer credential {}: moved to {}", key, step);
        }

        Ok(credential)
    }

    async fn await_request(
        &self,
        key: String,
        options: PollOptions,
        stop: Option<StopSignal>,
    ) -> Result<IssuerCredential, CredentialError> {
        let state = await_terminal(
            || {
                let key = key.clone();
                async move { self.update_issuer_state(key).await.map(|cred| cred.state) }
            },
            |state: &IssuerState| state.rank() >= IssuerState::RequestReceived.rank(),
            &options,
            stop,
        )
        .await
        .map_err(|err| err.resolve(&key))?;

        if state == IssuerState::Rejected {
            return Err(CredentialError::StateTransitionRejected {
                key,
                state: state.to_string(),
            });
        }

        self.load_issuer(&key).await
    }

    async fn send_credential(&self, key: String) -> Result<IssuerCredential, CredentialError> {
        let _guard = self.locker.lock(&key).await;

        let mut credential = self.load_issuer(&key).await?;
        if credential.state != IssuerState::RequestReceived {
            return Err(CredentialError::InvalidStateTransition {
                key,
                from: credential.state.to_string(),
                to: IssuerState::Issued.to_string(),
            });
        }

        let conn_session = self.ready_connection(&credential.connection_key).await?;
        let session = credential.require_session()?;
        let session = self.crypto.send_credential(conn_session, session).await?;

        credential
            .set_session(session)
            .transition(IssuerState::Issued)?;

        self.issuers.save(&key, credential.clone()).await?;
        info!("credential issued: {}", key);

        Ok(credential)
    }

    async fn get_offers(
        &self,
        connection: ConnectionKey,
    ) -> Result<Vec<CredentialOffer>, CredentialError> {
        let conn_session = self.ready_connection(&connection).await?;
        let offers = self.crypto.fetch_offers(conn_session).await?;
        debug!("credential offers from {}: {}", connection, offers.len());

        offers.into_iter().map(CredentialOffer::try_from).collect()
    }

    async fn request_credential(
        &self,
        connection: ConnectionKey,
        source_id: String,
        offers: String,
        payment: PaymentOptions,
    ) -> Result<HolderCredential, CredentialError> {
        Self::validate_source_id(&source_id)?;

        let offer = CredentialOffer::from_list(&offers)?
            .into_iter()
            .next()
            .ok_or_else(|| CredentialError::NoOffersAvailable(connection.to_string()))?;

        let conn_session = self.ready_connection(&connection).await?;
        let key = compose_key(&[connection.to_string().as_str(), &source_id]);
        let _guard = self.locker.lock(&key).await;

        let existing: Option<HolderCredential> = self.holders.find(&key).await?;
        let mut credential = match existing.filter(|cred| cred.state != HolderState::Rejected) {
            Some(stored) if stored.state != HolderState::Initialized => {
                info!("credential request resumed: {}, state: {}", key, stored.state);
                return Ok(stored);
            }
            Some(stored) => {
                info!("credential request not sent yet, retrying: {}", key);
                stored
            }
            None => {
                let session = self
                    .crypto
                    .create_credential_object(source_id.clone(), offer.clone())
                    .await?;

                let created = HolderCredential::new(connection, source_id, offer, session);
                self.holders.save(&key, created.clone()).await?;
                created
            }
        };

        let session = self
            .crypto
            .send_request(conn_session, credential.session.clone(), payment)
            .await?;

        credential
            .set_session(session)
            .transition(HolderState::RequestSent)?;

        self.holders.save(&key, credential.clone()).await?;
        info!("credential requested: {}", key);

        Ok(credential)
    }

    async fn update_holder_state(&self, key: String) -> Result<HolderCredential, CredentialError> {
        let _guard = self.locker.lock(&key).await;

        let mut credential = self.load_holder(&key).await?;
        if credential.state.is_terminal() {
            return Ok(credential);
        }

        let observed = self
            .crypto
            .refresh_holder_state(credential.session.clone())
            .await?;
        credential.set_session(observed.session);

        let steps = plan_transitions(credential.state, observed.state);
        if steps.is_empty() {
            self.holders.save(&key, credential.clone()).await?;
            return Ok(credential);
        }

        for step in steps {
            credential.transition(step)?;
            self.holders.save(&key, credential.clone()).await?;
            debug!("holder credential {}: moved to {}", key, step);
        }

        Ok(credential)
    }

    async fn await_accepted(
        &self,
        key: String,
        options: PollOptions,
        stop: Option<StopSignal>,
    ) -> Result<HolderCredential, CredentialError> {
        let state = await_terminal(
            || {
                let key = key.clone();
                async move { self.update_holder_state(key).await.map(|cred| cred.state) }
            },
            |state: &HolderState| state.is_terminal(),
            &options,
            stop,
        )
        .await
        .map_err(|err| err.resolve(&key))?;

        if state == HolderState::Rejected {
            return Err(CredentialError::StateTransitionRejected {
                key,
                state: state.to_string(),
            });
        }

        self.load_holder(&key).await
    }

    async fn get_issuer_credential(&self, key: String) -> Result<IssuerCredential, CredentialError> {
        self.load_issuer(&key).await
    }

    async fn get_holder_credential(&self, key: String) -> Result<HolderCredential, CredentialError> {
        self.load_holder(&key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use mockall::mock;

    use rst_common::standard::serde_json::{self, json, Value};
    use rst_common::with_tokio::tokio;

    use crate::connection::types::{Role, State};
    use crate::credential::types::{HolderEntityAccessor, IssuerEntityAccessor};
    use crate::session::Observed;
    use crate::store::MemoryStore;

    mock!(
        FakeCrypto{}

        impl Clone for FakeCrypto {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl CredentialCryptoBuilder for FakeCrypto {
            async fn send_offer(&self, connection: SessionPayload, source_id: String, offer: CredentialOffer) -> Result<SessionPayload, CredentialError>;
            async fn refresh_issuer_state(&self, session: SessionPayload) -> Result<Observed<IssuerState>, CredentialError>;
            async fn send_credential(&self, connection: SessionPayload, session: SessionPayload) -> Result<SessionPayload, CredentialError>;
            async fn fetch_offers(&self, connection: SessionPayload) -> Result<Vec<Value>, CredentialError>;
            async fn create_credential_object(&self, source_id: String, offer: CredentialOffer) -> Result<SessionPayload, CredentialError>;
            async fn send_request(&self, connection: SessionPayload, session: SessionPayload, payment: PaymentOptions) -> Result<SessionPayload, CredentialError>;
            async fn refresh_holder_state(&self, session: SessionPayload) -> Result<Observed<HolderState>, CredentialError>;
        }
    );

    fn generate_offer(id: &str) -> CredentialOffer {
        CredentialOffer::new(id.to_string(), "cred-def-1".to_string(), "degree".to_string())
            .attribute("name", "alice")
            .attribute("degree", "maths")
    }

    fn generate_session(step: u64) -> SessionPayload {
        SessionPayload::new(json!({"handle": 2, "step": step}))
    }

    async fn generate_store(self_did: &str, counterparty: &str, state: State) -> MemoryStore {
        let store = MemoryStore::new();
        let role = if self_did == "did:faber" {
            Role::Inviter
        } else {
            Role::Invitee
        };

        let mut conn = Connection::new(self_did.to_string(), counterparty.to_string(), role);
        conn.set_session(SessionPayload::new(json!({"connection": 1})));
        conn.state = state;

        let repo = EntityRepo::new(store.clone(), Namespace::Connections);
        let saved: Result<(), ConnectionError> = repo.save(conn.key().as_ref(), conn).await;
        assert!(!saved.is_err());

        store
    }

    fn fast_poll() -> PollOptions {
        PollOptions::new(Duration::from_millis(2)).with_max_attempts(5)
    }

    #[tokio::test]
    async fn test_send_offer_connection_not_ready() {
        let mut crypto = MockFakeCrypto::new();
        crypto.expect_send_offer().never();

        let store = generate_store("did:faber", "alice", State::Responded).await;
        let usecase = Usecase::new(store, crypto);

        let cred = usecase
            .send_offer(
                ConnectionKey::new("did:faber", "alice"),
                "degree".to_string(),
                generate_offer("offer-1"),
            )
            .await;

        assert!(matches!(
            cred,
            Err(CredentialError::ConnectionError(
                ConnectionError::ConnectionNotReady {
                    state: State::Responded,
                    ..
                }
            ))
        ))
    }

    #[tokio::test]
    async fn test_send_offer_invalid() {
        let mut crypto = MockFakeCrypto::new();
        crypto.expect_send_offer().never();

        let store = generate_store("did:faber", "alice", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let offer = CredentialOffer::new("offer-1".to_string(), "".to_string(), "degree".to_string());
        let cred = usecase
            .send_offer(ConnectionKey::new("did:faber", "alice"), "degree".to_string(), offer)
            .await;

        assert!(matches!(cred, Err(CredentialError::InvalidOffer(_))))
    }

    #[tokio::test]
    async fn test_issuer_flow() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_send_offer()
            .times(1)
            .returning(|_, _, _| Ok(generate_session(1)));

        let mut calls = 0;
        crypto
            .expect_refresh_issuer_state()
            .times(2)
            .returning(move |_| {
                calls += 1;
                let state = if calls < 2 {
                    IssuerState::OfferSent
                } else {
                    IssuerState::RequestReceived
                };

                Ok(Observed::new(state, generate_session(calls + 1)))
            });

        crypto
            .expect_send_credential()
            .times(1)
            .returning(|_, _| Ok(generate_session(10)));

        let store = generate_store("did:faber", "alice", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let offered = usecase
            .send_offer(
                ConnectionKey::new("did:faber", "alice"),
                "degree".to_string(),
                generate_offer("offer-1"),
            )
            .await
            .unwrap();
        assert_eq!(offered.get_state(), IssuerState::OfferSent);

        let requested = usecase
            .await_request(offered.get_key(), fast_poll(), None)
            .await
            .unwrap();
        assert_eq!(requested.get_state(), IssuerState::RequestReceived);

        let issued = usecase.send_credential(offered.get_key()).await.unwrap();
        assert_eq!(issued.get_state(), IssuerState::Issued);
        assert_eq!(issued.get_session(), Some(generate_session(10)))
    }

    #[tokio::test]
    async fn test_send_credential_wrong_state() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_send_offer()
            .times(1)
            .returning(|_, _, _| Ok(generate_session(1)));
        crypto.expect_send_credential().never();

        let store = generate_store("did:faber", "alice", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let offered = usecase
            .send_offer(
                ConnectionKey::new("did:faber", "alice"),
                "degree".to_string(),
                generate_offer("offer-1"),
            )
            .await
            .unwrap();

        let issued = usecase.send_credential(offered.get_key()).await;
        assert!(matches!(
            issued,
            Err(CredentialError::InvalidStateTransition { .. })
        ));

        let stored = usecase
            .get_issuer_credential(offered.get_key())
            .await
            .unwrap();
        assert_eq!(stored.get_state(), IssuerState::OfferSent)
    }

    #[tokio::test]
    async fn test_get_offers_empty() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_fetch_offers()
            .times(1)
            .returning(|_| Ok(vec![]));

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let offers = usecase
            .get_offers(ConnectionKey::new("did:alice", "faber"))
            .await;

        assert!(!offers.is_err());
        assert!(offers.unwrap().is_empty())
    }

    #[tokio::test]
    async fn test_get_offers_malformed() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_fetch_offers()
            .times(1)
            .returning(|_| Ok(vec![json!({"unknown": true})]));

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let offers = usecase
            .get_offers(ConnectionKey::new("did:alice", "faber"))
            .await;

        assert!(matches!(offers, Err(CredentialError::InvalidOffer(_))))
    }

    #[tokio::test]
    async fn test_request_credential_invalid_payloads() {
        let mut crypto = MockFakeCrypto::new();
        crypto.expect_create_credential_object().never();
        crypto.expect_send_request().never();

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let empty = usecase
            .request_credential(
                ConnectionKey::new("did:alice", "faber"),
                "credential".to_string(),
                "[]".to_string(),
                PaymentOptions::default(),
            )
            .await;
        assert!(matches!(empty, Err(CredentialError::NoOffersAvailable(_))));

        let invalid = usecase
            .request_credential(
                ConnectionKey::new("did:alice", "faber"),
                "credential".to_string(),
                "{\"offer\": 1}".to_string(),
                PaymentOptions::default(),
            )
            .await;
        assert!(matches!(invalid, Err(CredentialError::InvalidOffer(_))))
    }

    #[tokio::test]
    async fn test_holder_flow_three_polls() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_create_credential_object()
            .times(1)
            .withf(|_, offer| offer.id == "offer-1")
            .returning(|_, _| Ok(generate_session(0)));

        crypto
            .expect_send_request()
            .times(1)
            .withf(|_, _, payment| payment.payment_handle == 0)
            .returning(|_, _, _| Ok(generate_session(1)));

        let mut calls = 0;
        crypto
            .expect_refresh_holder_state()
            .times(3)
            .returning(move |_| {
                calls += 1;
                let state = if calls < 3 {
                    HolderState::RequestSent
                } else {
                    HolderState::Accepted
                };

                Ok(Observed::new(state, generate_session(calls + 1)))
            });

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let payload =
            serde_json::to_string(&vec![generate_offer("offer-1"), generate_offer("offer-2")])
                .unwrap();

        let requested = usecase
            .request_credential(
                ConnectionKey::new("did:alice", "faber"),
                "credential".to_string(),
                payload,
                PaymentOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(requested.get_state(), HolderState::RequestSent);
        assert_eq!(requested.get_offer().id, "offer-1");

        let accepted = usecase
            .await_accepted(requested.get_key(), fast_poll(), None)
            .await;

        assert!(!accepted.is_err());
        assert_eq!(accepted.unwrap().get_state(), HolderState::Accepted)
    }

    #[tokio::test]
    async fn test_holder_poll_timeout() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_create_credential_object()
            .returning(|_, _| Ok(generate_session(0)));
        crypto
            .expect_send_request()
            .returning(|_, _, _| Ok(generate_session(1)));
        crypto
            .expect_refresh_holder_state()
            .times(2)
            .returning(|_| Ok(Observed::new(HolderState::RequestSent, generate_session(2))));

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let payload = serde_json::to_string(&vec![generate_offer("offer-1")]).unwrap();
        let requested = usecase
            .request_credential(
                ConnectionKey::new("did:alice", "faber"),
                "credential".to_string(),
                payload,
                PaymentOptions::default(),
            )
            .await
            .unwrap();

        let opts = PollOptions::new(Duration::from_millis(1)).with_max_attempts(2);
        let accepted = usecase
            .await_accepted(requested.get_key(), opts, None)
            .await;

        assert!(matches!(
            accepted,
            Err(CredentialError::PollTimeout { attempts: 2, .. })
        ));

        let stored = usecase
            .get_holder_credential(requested.get_key())
            .await
            .unwrap();
        assert_eq!(stored.get_state(), HolderState::RequestSent)
    }

    #[tokio::test]
    async fn test_holder_rejected() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_create_credential_object()
            .returning(|_, _| Ok(generate_session(0)));
        crypto
            .expect_send_request()
            .returning(|_, _, _| Ok(generate_session(1)));
        crypto
            .expect_refresh_holder_state()
            .times(1)
            .returning(|_| Ok(Observed::new(HolderState::Rejected, generate_session(2))));

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let payload = serde_json::to_string(&vec![generate_offer("offer-1")]).unwrap();
        let requested = usecase
            .request_credential(
                ConnectionKey::new("did:alice", "faber"),
                "credential".to_string(),
                payload,
                PaymentOptions::default(),
            )
            .await
            .unwrap();

        let accepted = usecase
            .await_accepted(requested.get_key(), fast_poll(), None)
            .await;

        assert!(matches!(
            accepted,
            Err(CredentialError::StateTransitionRejected { .. })
        ))
    }

    #[tokio::test]
    async fn test_request_credential_retries_unsent_request() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_create_credential_object()
            .times(1)
            .returning(|_, _| Ok(generate_session(0)));

        let mut attempts = 0;
        crypto
            .expect_send_request()
            .times(2)
            .withf(|_, session, _| session == &generate_session(0))
            .returning(move |_, _, _| {
                attempts += 1;
                if attempts < 2 {
                    return Err(CredentialError::CryptoError("agency down".to_string()));
                }

                Ok(generate_session(1))
            });

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);
        let payload = serde_json::to_string(&vec![generate_offer("offer-1")]).unwrap();

        let failed = usecase
            .request_credential(
                ConnectionKey::new("did:alice", "faber"),
                "credential".to_string(),
                payload.clone(),
                PaymentOptions::default(),
            )
            .await;
        assert!(matches!(failed, Err(CredentialError::CryptoError(_))));

        let key = compose_key(&["did:alice|faber", "credential"]);
        let stored = usecase.get_holder_credential(key.clone()).await.unwrap();
        assert_eq!(stored.get_state(), HolderState::Initialized);

        let retried = usecase
            .request_credential(
                ConnectionKey::new("did:alice", "faber"),
                "credential".to_string(),
                payload,
                PaymentOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(retried.get_state(), HolderState::RequestSent);

        let stored = usecase.get_holder_credential(key).await.unwrap();
        assert_eq!(stored.get_state(), HolderState::RequestSent)
    }

    #[tokio::test]
    async fn test_request_credential_returns_sent_request() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_create_credential_object()
            .times(1)
            .returning(|_, _| Ok(generate_session(0)));
        crypto
            .expect_send_request()
            .times(1)
            .returning(|_, _, _| Ok(generate_session(1)));

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);
        let payload = serde_json::to_string(&vec![generate_offer("offer-1")]).unwrap();

        for _ in 0..2 {
            let requested = usecase
                .request_credential(
                    ConnectionKey::new("did:alice", "faber"),
                    "credential".to_string(),
                    payload.clone(),
                    PaymentOptions::default(),
                )
                .await
                .unwrap();
            assert_eq!(requested.get_state(), HolderState::RequestSent);
        }
    }

    #[tokio::test]
    async fn test_issuer_state_is_monotonic() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_send_offer()
            .times(1)
            .returning(|_, _, _| Ok(generate_session(1)));

        let mut calls = 0;
        crypto
            .expect_refresh_issuer_state()
            .times(2)
            .returning(move |_| {
                calls += 1;
                let state = if calls < 2 {
                    IssuerState::RequestReceived
                } else {
                    IssuerState::OfferSent
                };

                Ok(Observed::new(state, generate_session(calls + 1)))
            });

        let store = generate_store("did:faber", "alice", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let offered = usecase
            .send_offer(
                ConnectionKey::new("did:faber", "alice"),
                "degree".to_string(),
                generate_offer("offer-1"),
            )
            .await
            .unwrap();

        let received = usecase.update_issuer_state(offered.get_key()).await.unwrap();
        assert_eq!(received.get_state(), IssuerState::RequestReceived);

        let stale = usecase.update_issuer_state(offered.get_key()).await.unwrap();
        assert_eq!(stale.get_state(), IssuerState::RequestReceived);

        let stored = usecase
            .get_issuer_credential(offered.get_key())
            .await
            .unwrap();
        assert_eq!(stored.get_state(), IssuerState::RequestReceived)
    }

    #[tokio::test]
    async fn test_holder_state_is_monotonic() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_create_credential_object()
            .times(1)
            .returning(|_, _| Ok(generate_session(0)));
        crypto
            .expect_send_request()
            .times(1)
            .returning(|_, _, _| Ok(generate_session(1)));
        crypto
            .expect_refresh_holder_state()
            .times(1)
            .returning(|_| Ok(Observed::new(HolderState::Initialized, generate_session(2))));

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let payload = serde_json::to_string(&vec![generate_offer("offer-1")]).unwrap();
        let requested = usecase
            .request_credential(
                ConnectionKey::new("did:alice", "faber"),
                "credential".to_string(),
                payload,
                PaymentOptions::default(),
            )
            .await
            .unwrap();

        let stale = usecase.update_holder_state(requested.get_key()).await.unwrap();
        assert_eq!(stale.get_state(), HolderState::RequestSent);

        let stored = usecase
            .get_holder_credential(requested.get_key())
            .await
            .unwrap();
        assert_eq!(stored.get_state(), HolderState::RequestSent)
    }
}

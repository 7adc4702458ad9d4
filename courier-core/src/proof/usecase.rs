use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::{debug, info};

use crate::connection::types::{ConnectionError, ConnectionKey};
use crate::connection::Connection;
use crate::polling::graph::{plan_transitions, StateGraph};
use crate::polling::{await_terminal, PollOptions, StopSignal};
use crate::session::SessionPayload;
use crate::store::types::{Namespace, StoreBuilder};
use crate::store::{compose_key, EntityRepo, KeyLocker};

use super::selection::select_first_match;
use super::types::{
    ProofAPI, ProofCryptoBuilder, ProofError, ProofRequest, ProverState, SelfAttested,
    VerifierState,
};
use super::{DisclosedProof, VerifierProof};

#[derive(Clone)]
pub struct Usecase<TStore, TCrypto>
where
    TStore: StoreBuilder,
    TCrypto: ProofCryptoBuilder,
{
    connections: EntityRepo<TStore>,
    provers: EntityRepo<TStore>,
    verifiers: EntityRepo<TStore>,
    crypto: TCrypto,
    locker: KeyLocker,
}

impl<TStore, TCrypto> Usecase<TStore, TCrypto>
where
    TStore: StoreBuilder,
    TCrypto: ProofCryptoBuilder,
{
    pub fn new(store: TStore, crypto: TCrypto) -> Self {
        Self {
            connections: EntityRepo::new(store.clone(), Namespace::Connections),
            provers: EntityRepo::new(store.clone(), Namespace::DisclosedProofs),
            verifiers: EntityRepo::new(store, Namespace::VerifierProofs),
            crypto,
            locker: KeyLocker::new(),
        }
    }

    async fn ready_connection(&self, key: &ConnectionKey) -> Result<SessionPayload, ProofError> {
        let found: Result<Option<Connection>, ConnectionError> =
            self.connections.find(key.as_ref()).await;

        let conn = found?.ok_or_else(|| ConnectionError::NotFound(key.to_string()))?;
        let session = conn.ensure_ready()?;
        Ok(session)
    }

    async fn load_prover(&self, key: &str) -> Result<DisclosedProof, ProofError> {
        let found: Option<DisclosedProof> = self.provers.find(key).await?;
        found.ok_or_else(|| ProofError::NotFound(key.to_string()))
    }

    async fn load_verifier(&self, key: &str) -> Result<VerifierProof, ProofError> {
        let found: Option<VerifierProof> = self.verifiers.find(key).await?;
        found.ok_or_else(|| ProofError::NotFound(key.to_string()))
    }

    async fn pending_requests(
        &self,
        connection: &ConnectionKey,
    ) -> Result<Vec<ProofRequest>, ProofError> {
        let conn_session = self.ready_connection(connection).await?;
        let requests = self.crypto.fetch_proof_requests(conn_session).await?;
        debug!("proof requests from {}: {}", connection, requests.len());

        requests.into_iter().map(ProofRequest::try_from).collect()
    }

    fn validate_source_id(source_id: &str) -> Result<(), ProofError> {
        if source_id.is_empty() {
            return Err(ProofError::ValidationError(
                "source_id was missing".to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl<TStore, TCrypto> ProofAPI for Usecase<TStore, TCrypto>
where
    TStore: StoreBuilder,
    TCrypto: ProofCryptoBuilder,
{
    type ProverAccessor = DisclosedProof;
    type VerifierAccessor = VerifierProof;

    async fn get_requests(&self, connection: ConnectionKey) -> Result<Vec<ProofRequest>, ProofError> {
        self.pending_requests(&connection).await
    }

    async fn receive_request(
        &self,
        connection: ConnectionKey,
        source_id: String,
    ) -> Result<DisclosedProof, ProofError> {
        Self::validate_source_id(&source_id)?;

        let key = compose_key(&[connection.to_string().as_str(), &source_id]);
        let _guard = self.locker.lock(&key).await;

        let existing: Option<DisclosedProof> = self.provers.find(&key).await?;
        if let Some(stored) = existing.filter(|proof| proof.state != ProverState::Rejected) {
            info!("proof request resumed: {}, state: {}", key, stored.state);
            return Ok(stored);
        }

        let request = self
            .pending_requests(&connection)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProofError::NoProofRequests(connection.to_string()))?;

        let proof = DisclosedProof::new(connection, source_id, request);
        self.provers.save(&key, proof.clone()).await?;
        info!("proof request received: {}", key);

        Ok(proof)
    }

    async fn select_credentials(&self, key: String) -> Result<DisclosedProof, ProofError> {
        let _guard = self.locker.lock(&key).await;

        let mut proof = self.load_prover(&key).await?;
        if proof.state != ProverState::RequestReceived {
            return Err(proof.invalid_transition(ProverState::CredentialsSelected));
        }

        let candidates = self
            .crypto
            .query_wallet_credentials(proof.request.clone())
            .await?;

        let selected = select_first_match(&proof.request, &candidates).map_err(|attribute| {
            ProofError::UnsatisfiedAttribute {
                key: key.clone(),
                attribute,
            }
        })?;

        proof
            .set_selected(selected)
            .transition(ProverState::CredentialsSelected)?;

        self.provers.save(&key, proof.clone()).await?;
        debug!("proof {}: credentials selected", key);

        Ok(proof)
    }

    async fn generate_proof(
        &self,
        key: String,
        self_attested: SelfAttested,
    ) -> Result<DisclosedProof, ProofError> {
        let _guard = self.locker.lock(&key).await;

        let mut proof = self.load_prover(&key).await?;
        if proof.state != ProverState::CredentialsSelected {
            return Err(proof.invalid_transition(ProverState::ProofGenerated));
        }

        let generated = self
            .crypto
            .generate_proof(
                proof.request.clone(),
                proof.selected.clone(),
                self_attested.clone(),
            )
            .await?;

        proof
            .set_proof(generated, self_attested)
            .transition(ProverState::ProofGenerated)?;

        self.provers.save(&key, proof.clone()).await?;
        debug!("proof {}: generated", key);

        Ok(proof)
    }

    async fn send_proof(&self, key: String) -> Result<DisclosedProof, ProofError> {
        let _guard = self.locker.lock(&key).await;

        let mut proof = self.load_prover(&key).await?;
        let generated = match (proof.state, proof.proof.clone()) {
            (ProverState::ProofGenerated, Some(generated)) => generated,
            _ => return Err(proof.invalid_transition(ProverState::ProofSent)),
        };

        let conn_session = self.ready_connection(&proof.connection_key).await?;
        let session = self
            .crypto
            .send_proof(conn_session, proof.request.clone(), generated)
            .await?;

        proof
            .set_session(session)
            .transition(ProverState::ProofSent)?;

        self.provers.save(&key, proof.clone()).await?;
        info!("proof sent: {}", key);

        Ok(proof)
    }

    async fn update_prover_state(&self, key: String) -> Result<DisclosedProof, ProofError> {
        let _guard = self.locker.lock(&key).await;

        let mut proof = self.load_prover(&key).await?;
        let session = match (&proof.session, proof.state.is_terminal()) {
            (Some(session), false) => session.clone(),
            _ => return Ok(proof),
        };

        let observed = self.crypto.refresh_prover_state(session).await?;
        proof.set_session(observed.session);

        let steps = plan_transitions(proof.state, observed.state);
        if steps.is_empty() {
            self.provers.save(&key, proof.clone()).await?;
            return Ok(proof);
        }

        for step in steps {
            proof.transition(step)?;
            self.provers.save(&key, proof.clone()).await?;
            debug!("proof {}: moved to {}", key, step);
        }

        Ok(proof)
    }

    async fn await_verified(
        &self,
        key: String,
        options: PollOptions,
        stop: Option<StopSignal>,
    ) -> Result<DisclosedProof, ProofError> {
        let state = await_terminal(
            || {
                let key = key.clone();
                async move { self.update_prover_state(key).await.map(|proof| proof.state) }
            },
            |state: &ProverState| state.is_terminal(),
            &options,
            stop,
        )
        .await
        .map_err(|err| err.resolve(&key))?;

        if state == ProverState::Rejected {
            return Err(ProofError::StateTransitionRejected {
                key,
                state: state.to_string(),
            });
        }

        self.load_prover(&key).await
    }

    async fn request_proof(
        &self,
        connection: ConnectionKey,
        source_id: String,
        request: ProofRequest,
    ) -> Result<VerifierProof, ProofError> {
        Self::validate_source_id(&source_id)?;
        request.validate()?;

        let conn_session = self.ready_connection(&connection).await?;
        let mut proof = VerifierProof::new(connection, source_id.clone(), request.clone());
        let key = proof.key();
        let _guard = self.locker.lock(&key).await;

        let existing: Option<VerifierProof> = self.verifiers.find(&key).await?;
        if let Some(stored) = existing.filter(|proof| !proof.state.is_terminal()) {
            info!("proof request resumed: {}, state: {}", key, stored.state);
            return Ok(stored);
        }

        let session = self
            .crypto
            .send_proof_request(conn_session, source_id, request)
            .await?;

        proof
            .set_session(session)
            .transition(VerifierState::RequestSent)?;

        self.verifiers.save(&key, proof.clone()).await?;
        info!("proof requested: {}", key);

        Ok(proof)
    }

    async fn update_verifier_state(&self, key: String) -> Result<VerifierProof, ProofError> {
        let _guard = self.locker.lock(&key).await;

        let mut proof = self.load_verifier(&key).await?;
        let mut session = match (&proof.session, proof.state.is_terminal()) {
            (Some(session), false) => session.clone(),
            _ => return Ok(proof),
        };

        if proof.state != VerifierState::ProofReceived {
            let observed = self.crypto.refresh_verifier_state(session).await?;
            session = observed.session.clone();
            proof.set_session(observed.session);

            let steps = plan_transitions(proof.state, observed.state)
                .into_iter()
                .take_while(|step| *step != VerifierState::Verified);

            for step in steps {
                proof.transition(step)?;
                self.verifiers.save(&key, proof.clone()).await?;
                debug!("verifier proof {}: moved to {}", key, step);
            }
        }

        if proof.state == VerifierState::ProofReceived {
            let verdict = self.crypto.verify_proof(session).await?;
            if !verdict.state.is_terminal() {
                return Err(ProofError::CryptoError(format!(
                    "unexpected verification state: {}",
                    verdict.state
                )));
            }

            proof
                .set_session(verdict.session)
                .transition(verdict.state)?;
            info!("proof {}: {}", key, verdict.state);
        }

        self.verifiers.save(&key, proof.clone()).await?;
        Ok(proof)
    }

    async fn await_verification(
        &self,
        key: String,
        options: PollOptions,
        stop: Option<StopSignal>,
    ) -> Result<VerifierProof, ProofError> {
        let _ = await_terminal(
            || {
                let key = key.clone();
                async move { self.update_verifier_state(key).await.map(|proof| proof.state) }
            },
            |state: &VerifierState| state.is_terminal(),
            &options,
            stop,
        )
        .await
        .map_err(|err| err.resolve(&key))?;

        self.load_verifier(&key).await
    }

    async fn get_disclosed_proof(&self, key: String) -> Result<DisclosedProof, ProofError> {
        self.load_prover(&key).await
    }

    async fn get_verifier_proof(&self, key: String) -> Result<VerifierProof, ProofError> {
        self.load_verifier(&key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;
    use std::time::Duration;

    use mockall::mock;

    use rst_common::standard::serde_json::{self, json, Value};
    use rst_common::with_tokio::tokio;

    use crate::connection::types::{Role, State};
    use crate::proof::types::{
        Candidates, CredentialCandidate, DisclosedProofEntityAccessor, ProofPayload,
        SelectedCredentials, VerifierProofEntityAccessor,
    };
    use crate::session::Observed;
    use crate::store::MemoryStore;

    mock!(
        FakeCrypto{}

        impl Clone for FakeCrypto {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl ProofCryptoBuilder for FakeCrypto {
            async fn fetch_proof_requests(&self, connection: SessionPayload) -> Result<Vec<Value>, ProofError>;
            async fn query_wallet_credentials(&self, request: ProofRequest) -> Result<Candidates, ProofError>;
            async fn generate_proof(&self, request: ProofRequest, selected: SelectedCredentials, self_attested: SelfAttested) -> Result<ProofPayload, ProofError>;
            async fn send_proof(&self, connection: SessionPayload, request: ProofRequest, proof: ProofPayload) -> Result<SessionPayload, ProofError>;
            async fn refresh_prover_state(&self, session: SessionPayload) -> Result<Observed<ProverState>, ProofError>;
            async fn send_proof_request(&self, connection: SessionPayload, source_id: String, request: ProofRequest) -> Result<SessionPayload, ProofError>;
            async fn refresh_verifier_state(&self, session: SessionPayload) -> Result<Observed<VerifierState>, ProofError>;
            async fn verify_proof(&self, session: SessionPayload) -> Result<Observed<VerifierState>, ProofError>;
        }
    );

    fn generate_request() -> ProofRequest {
        ProofRequest::new("request-1".to_string(), "proof of degree".to_string())
            .attribute("attr_name", "name", vec![json!({"cred_def_id": "cred-def-1"})])
            .attribute("attr_degree", "degree", vec![])
    }

    fn generate_candidate(cred_id: &str) -> CredentialCandidate {
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), "alice".to_string());
        attributes.insert("degree".to_string(), "maths".to_string());

        CredentialCandidate {
            cred_id: cred_id.to_string(),
            cred_def_id: "cred-def-1".to_string(),
            attributes,
        }
    }

    fn generate_session(step: u64) -> SessionPayload {
        SessionPayload::new(json!({"handle": 3, "step": step}))
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

    fn alice_connection() -> ConnectionKey {
        ConnectionKey::new("did:alice", "faber")
    }

    #[tokio::test]
    async fn test_get_requests_empty() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_fetch_proof_requests()
            .times(1)
            .returning(|_| Ok(vec![]));

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store.clone(), crypto);

        let requests = usecase.get_requests(alice_connection()).await;
        assert!(!requests.is_err());
        assert!(requests.unwrap().is_empty());

        let stored = store.keys(Namespace::DisclosedProofs).await.unwrap();
        assert!(stored.is_empty())
    }

    #[tokio::test]
    async fn test_receive_request_without_requests() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_fetch_proof_requests()
            .times(1)
            .returning(|_| Ok(vec![]));

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let proof = usecase
            .receive_request(alice_connection(), "proof".to_string())
            .await;
        assert!(matches!(proof, Err(ProofError::NoProofRequests(_))))
    }

    #[tokio::test]
    async fn test_receive_request_invalid() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_fetch_proof_requests()
            .times(1)
            .returning(|_| Ok(vec![json!({"@id": "request-1", "name": "proof", "requestedAttributes": {}})]));

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let proof = usecase
            .receive_request(alice_connection(), "proof".to_string())
            .await;
        assert!(matches!(proof, Err(ProofError::InvalidProofRequest(_))))
    }

    #[tokio::test]
    async fn test_select_unsatisfied_attribute() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_fetch_proof_requests()
            .times(1)
            .returning(|_| Ok(vec![serde_json::to_value(generate_request()).unwrap()]));

        crypto.expect_query_wallet_credentials().times(1).returning(|_| {
            let mut candidates = Candidates::new();
            candidates.insert("attr_name".to_string(), vec![generate_candidate("cred-1")]);
            candidates.insert("attr_degree".to_string(), vec![]);
            Ok(candidates)
        });

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let received = usecase
            .receive_request(alice_connection(), "proof".to_string())
            .await
            .unwrap();

        let selected = usecase.select_credentials(received.get_key()).await;
        assert!(matches!(
            selected,
            Err(ProofError::UnsatisfiedAttribute { ref attribute, .. }) if attribute == "attr_degree"
        ));

        let stored = usecase
            .get_disclosed_proof(received.get_key())
            .await
            .unwrap();
        assert_eq!(stored.get_state(), ProverState::RequestReceived)
    }

    #[tokio::test]
    async fn test_send_proof_before_generated() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_fetch_proof_requests()
            .times(1)
            .returning(|_| Ok(vec![serde_json::to_value(generate_request()).unwrap()]));
        crypto.expect_send_proof().never();

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let received = usecase
            .receive_request(alice_connection(), "proof".to_string())
            .await
            .unwrap();

        let sent = usecase.send_proof(received.get_key()).await;
        assert!(matches!(
            sent,
            Err(ProofError::InvalidStateTransition { .. })
        ))
    }

    #[tokio::test]
    async fn test_prover_flow() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_fetch_proof_requests()
            .times(1)
            .returning(|_| Ok(vec![serde_json::to_value(generate_request()).unwrap()]));

        crypto.expect_query_wallet_credentials().times(1).returning(|_| {
            let mut candidates = Candidates::new();
            candidates.insert(
                "attr_name".to_string(),
                vec![generate_candidate("cred-1"), generate_candidate("cred-2")],
            );
            candidates.insert("attr_degree".to_string(), vec![generate_candidate("cred-3")]);
            Ok(candidates)
        });

        crypto
            .expect_generate_proof()
            .times(1)
            .withf(|_, selected, self_attested| {
                selected.get("attr_name").map(|cred| cred.cred_id.as_str()) == Some("cred-1")
                    && self_attested.is_empty()
            })
            .returning(|_, _, _| Ok(ProofPayload::new(json!({"proof": "generated"}))));

        crypto
            .expect_send_proof()
            .times(1)
            .returning(|_, _, _| Ok(generate_session(1)));

        let mut calls = 0;
        crypto
            .expect_refresh_prover_state()
            .times(2)
            .returning(move |_| {
                calls += 1;
                let state = if calls < 2 {
                    ProverState::ProofSent
                } else {
                    ProverState::Verified
                };

                Ok(Observed::new(state, generate_session(calls + 1)))
            });

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let received = usecase
            .receive_request(alice_connection(), "proof".to_string())
            .await
            .unwrap();
        assert_eq!(received.get_state(), ProverState::RequestReceived);

        let key = received.get_key();
        let selected = usecase.select_credentials(key.clone()).await.unwrap();
        assert_eq!(selected.get_state(), ProverState::CredentialsSelected);
        assert_eq!(selected.get_selected().len(), 2);

        let generated = usecase
            .generate_proof(key.clone(), SelfAttested::new())
            .await
            .unwrap();
        assert_eq!(generated.get_state(), ProverState::ProofGenerated);

        let sent = usecase.send_proof(key.clone()).await.unwrap();
        assert_eq!(sent.get_state(), ProverState::ProofSent);

        let verified = usecase.await_verified(key, fast_poll(), None).await;
        assert!(!verified.is_err());
        assert_eq!(verified.unwrap().get_state(), ProverState::Verified)
    }

    #[tokio::test]
    async fn test_verifier_flow() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_send_proof_request()
            .times(1)
            .returning(|_, _, _| Ok(generate_session(1)));

        let mut calls = 0;
        crypto
            .expect_refresh_verifier_state()
            .times(2)
            .returning(move |_| {
                calls += 1;
                let state = if calls < 2 {
                    VerifierState::RequestSent
                } else {
                    VerifierState::ProofReceived
                };

                Ok(Observed::new(state, generate_session(calls + 1)))
            });

        crypto
            .expect_verify_proof()
            .times(1)
            .returning(|_| Ok(Observed::new(VerifierState::Verified, generate_session(10))));

        let store = generate_store("did:faber", "alice", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let requested = usecase
            .request_proof(
                ConnectionKey::new("did:faber", "alice"),
                "proof".to_string(),
                generate_request(),
            )
            .await
            .unwrap();
        assert_eq!(requested.get_state(), VerifierState::RequestSent);

        let verified = usecase
            .await_verification(requested.get_key(), fast_poll(), None)
            .await;

        assert!(!verified.is_err());

        let proof = verified.unwrap();
        assert_eq!(proof.get_state(), VerifierState::Verified);
        assert_eq!(proof.get_session(), Some(generate_session(10)))
    }

    #[tokio::test]
    async fn test_verifier_rejects_invalid_proof() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_send_proof_request()
            .times(1)
            .returning(|_, _, _| Ok(generate_session(1)));
        crypto
            .expect_refresh_verifier_state()
            .times(1)
            .returning(|_| Ok(Observed::new(VerifierState::ProofReceived, generate_session(2))));
        crypto
            .expect_verify_proof()
            .times(1)
            .returning(|_| Ok(Observed::new(VerifierState::Rejected, generate_session(3))));

        let store = generate_store("did:faber", "alice", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let requested = usecase
            .request_proof(
                ConnectionKey::new("did:faber", "alice"),
                "proof".to_string(),
                generate_request(),
            )
            .await
            .unwrap();

        let updated = usecase
            .update_verifier_state(requested.get_key())
            .await
            .unwrap();
        assert_eq!(updated.get_state(), VerifierState::Rejected)
    }

    #[tokio::test]
    async fn test_request_proof_connection_not_ready() {
        let mut crypto = MockFakeCrypto::new();
        crypto.expect_send_proof_request().never();

        let store = generate_store("did:faber", "alice", State::Invited).await;
        let usecase = Usecase::new(store, crypto);

        let requested = usecase
            .request_proof(
                ConnectionKey::new("did:faber", "alice"),
                "proof".to_string(),
                generate_request(),
            )
            .await;

        assert!(matches!(
            requested,
            Err(ProofError::ConnectionError(
                ConnectionError::ConnectionNotReady { .. }
            ))
        ))
    }

    #[tokio::test]
    async fn test_prover_state_is_monotonic() {
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_fetch_proof_requests()
            .times(1)
            .returning(|_| Ok(vec![serde_json::to_value(generate_request()).unwrap()]));

        crypto.expect_query_wallet_credentials().times(1).returning(|_| {
            let mut candidates = Candidates::new();
            candidates.insert("attr_name".to_string(), vec![generate_candidate("cred-1")]);
            candidates.insert("attr_degree".to_string(), vec![generate_candidate("cred-3")]);
            Ok(candidates)
        });

        crypto
            .expect_generate_proof()
            .times(1)
            .returning(|_, _, _| Ok(ProofPayload::new(json!({"proof": "generated"}))));

        crypto
            .expect_send_proof()
            .times(1)
            .returning(|_, _, _| Ok(generate_session(1)));

        crypto
            .expect_refresh_prover_state()
            .times(1)
            .returning(|_| Ok(Observed::new(ProverState::ProofGenerated, generate_session(2))));

        let store = generate_store("did:alice", "faber", State::Accepted).await;
        let usecase = Usecase::new(store, crypto);

        let received = usecase
            .receive_request(alice_connection(), "proof".to_string())
            .await
            .unwrap();

        let key = received.get_key();
        let _ = usecase.select_credentials(key.clone()).await.unwrap();
        let _ = usecase
            .generate_proof(key.clone(), SelfAttested::new())
            .await
            .unwrap();

        let sent = usecase.send_proof(key.clone()).await.unwrap();
        assert_eq!(sent.get_state(), ProverState::ProofSent);

        let stale = usecase.update_prover_state(key.clone()).await.unwrap();
        assert_eq!(stale.get_state(), ProverState::ProofSent);

        let stored = usecase.get_disclosed_proof(key).await.unwrap();
        assert_eq!(stored.get_state(), ProverState::ProofSent)
    }
}

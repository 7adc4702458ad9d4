use std::collections::BTreeMap;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_logging::log::{debug, info};

use prople_courier_core::proof::types::{
    AttributeSpec, Candidates, CredentialCandidate, ProofCryptoBuilder, ProofError, ProofPayload,
    ProofRequest, ProverState, SelectedCredentials, SelfAttested, VerifierState,
};
use prople_courier_core::session::{Observed, SessionPayload};

use super::hub::{AgentClient, ProofStage, ProofThread};
use super::types::{from_session, to_session, AgencyError, ConnectionSession, ThreadSession};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
struct RevealedAttribute {
    #[serde(rename = "credId")]
    cred_id: String,
    raw: String,
}

/// `Presentation` is the loopback proof format, it reveals raw values only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
struct Presentation {
    #[serde(rename = "requestId")]
    request_id: String,

    #[serde(rename = "revealedAttrs")]
    revealed: BTreeMap<String, RevealedAttribute>,

    #[serde(rename = "selfAttestedAttrs")]
    self_attested: SelfAttested,
}

fn satisfies(spec: &AttributeSpec, candidate: &CredentialCandidate) -> bool {
    if !candidate.attributes.contains_key(&spec.name) {
        return false;
    }

    if spec.restrictions.is_empty() {
        return true;
    }

    spec.restrictions.iter().any(|restriction| {
        match restriction.get("cred_def_id").and_then(Value::as_str) {
            Some(cred_def_id) => cred_def_id == candidate.cred_def_id,
            None => true,
        }
    })
}

/// `verify_presentation` checks that every requested attribute is either self attested or
/// revealed from a credential held by the prover, with its original raw value
fn verify_presentation(
    request: &ProofRequest,
    presentation: &Presentation,
    wallet: &[CredentialCandidate],
) -> bool {
    if presentation.request_id != request.id {
        return false;
    }

    request.requested_attributes.iter().all(|(referent, spec)| {
        if presentation.self_attested.contains_key(referent) {
            return true;
        }

        presentation
            .revealed
            .get(referent)
            .and_then(|revealed| {
                wallet
                    .iter()
                    .find(|candidate| candidate.cred_id == revealed.cred_id)
                    .map(|candidate| (candidate, revealed))
            })
            .map(|(candidate, revealed)| {
                satisfies(spec, candidate)
                    && candidate.attributes.get(&spec.name) == Some(&revealed.raw)
            })
            .unwrap_or(false)
    })
}

#[async_trait]
impl ProofCryptoBuilder for AgentClient {
    async fn fetch_proof_requests(&self, connection: SessionPayload) -> Result<Vec<Value>, ProofError> {
        let conn: ConnectionSession = from_session(&connection)?;

        let mailbox = self.agency.mailbox.read().await;
        let connection_id = mailbox.route(&conn.pairwise_did)?;
        let prefix = format!("{}:", connection_id);

        let mut requests = Vec::new();
        for (key, proof) in mailbox.proofs.iter() {
            let pending = key.starts_with(&prefix)
                && proof.prover.pairwise_did == conn.pairwise_did
                && proof.stage == ProofStage::Requested;

            if pending {
                let request = serde_json::to_value(&proof.request)
                    .map_err(|err| ProofError::GenerateJSONError(err.to_string()))?;
                requests.push(request);
            }
        }

        Ok(requests)
    }

    async fn query_wallet_credentials(&self, request: ProofRequest) -> Result<Candidates, ProofError> {
        let wallet = self.agency.wallet(&self.agent_did).await;

        let candidates = request
            .requested_attributes
            .iter()
            .map(|(referent, spec)| {
                let matched = wallet
                    .iter()
                    .filter(|candidate| satisfies(spec, candidate))
                    .cloned()
                    .collect();

                (referent.to_owned(), matched)
            })
            .collect();

        Ok(candidates)
    }

    async fn generate_proof(
        &self,
        request: ProofRequest,
        selected: SelectedCredentials,
        self_attested: SelfAttested,
    ) -> Result<ProofPayload, ProofError> {
        let mut revealed = BTreeMap::new();
        for (referent, candidate) in selected.iter() {
            let spec = request.requested_attributes.get(referent).ok_or_else(|| {
                ProofError::InvalidProofRequest(format!("unknown referent: {}", referent))
            })?;

            let raw = candidate.attributes.get(&spec.name).cloned().ok_or_else(|| {
                ProofError::UnsatisfiedAttribute {
                    key: request.id.clone(),
                    attribute: referent.to_owned(),
                }
            })?;

            revealed.insert(
                referent.to_owned(),
                RevealedAttribute {
                    cred_id: candidate.cred_id.clone(),
                    raw,
                },
            );
        }

        let presentation = Presentation {
            request_id: request.id,
            revealed,
            self_attested,
        };

        serde_json::to_value(presentation)
            .map(ProofPayload::new)
            .map_err(|err| ProofError::GenerateJSONError(err.to_string()))
    }

    async fn send_proof(
        &self,
        connection: SessionPayload,
        request: ProofRequest,
        proof: ProofPayload,
    ) -> Result<SessionPayload, ProofError> {
        let conn: ConnectionSession = from_session(&connection)?;

        let mut mailbox = self.agency.mailbox.write().await;
        let thread_key = mailbox.thread_key(&conn.pairwise_did, &request.id)?;
        let thread = mailbox
            .proofs
            .get_mut(&thread_key)
            .ok_or_else(|| AgencyError::UnknownThread(thread_key.clone()))?;

        if thread.prover.pairwise_did != conn.pairwise_did || thread.stage != ProofStage::Requested {
            return Err(AgencyError::InvalidMessage(format!(
                "proof is not requested: {}",
                thread_key
            ))
            .into());
        }

        thread.proof = Some(proof);
        thread.stage = ProofStage::Presented;
        debug!("agency: proof presented: {}", thread_key);

        let session = to_session(&ThreadSession {
            thread_id: request.id,
            source_id: request.name,
            pairwise_did: Some(conn.pairwise_did),
        })?;

        Ok(session)
    }

    async fn refresh_prover_state(
        &self,
        session: SessionPayload,
    ) -> Result<Observed<ProverState>, ProofError> {
        let thread: ThreadSession = from_session(&session)?;

        let mailbox = self.agency.mailbox.read().await;
        let thread_key = mailbox.thread_key(&thread.route()?, &thread.thread_id)?;
        let proof = mailbox
            .proofs
            .get(&thread_key)
            .ok_or(AgencyError::UnknownThread(thread_key))?;

        let state = match proof.stage {
            ProofStage::Requested => ProverState::RequestReceived,
            ProofStage::Presented => ProverState::ProofSent,
            ProofStage::Verified => ProverState::Verified,
            ProofStage::Rejected => ProverState::Rejected,
        };

        Ok(Observed::new(state, session))
    }

    async fn send_proof_request(
        &self,
        connection: SessionPayload,
        source_id: String,
        request: ProofRequest,
    ) -> Result<SessionPayload, ProofError> {
        let conn: ConnectionSession = from_session(&connection)?;

        let mut mailbox = self.agency.mailbox.write().await;
        let prover = mailbox.pairwise(&conn.pairwise_did)?.counterparty(&conn.pairwise_did)?;
        let thread_key = mailbox.thread_key(&conn.pairwise_did, &request.id)?;

        if mailbox.proofs.contains_key(&thread_key) {
            return Err(AgencyError::InvalidMessage(format!(
                "proof request already sent: {}",
                request.id
            ))
            .into());
        }

        let session = to_session(&ThreadSession {
            thread_id: request.id.clone(),
            source_id,
            pairwise_did: Some(conn.pairwise_did.clone()),
        })?;

        mailbox.proofs.insert(
            thread_key.clone(),
            ProofThread {
                request,
                stage: ProofStage::Requested,
                verifier: conn.pairwise_did,
                prover,
                proof: None,
            },
        );

        debug!("agency: proof request delivered: {}", thread_key);
        Ok(session)
    }

    async fn refresh_verifier_state(
        &self,
        session: SessionPayload,
    ) -> Result<Observed<VerifierState>, ProofError> {
        let thread: ThreadSession = from_session(&session)?;

        let mailbox = self.agency.mailbox.read().await;
        let thread_key = mailbox.thread_key(&thread.route()?, &thread.thread_id)?;
        let proof = mailbox
            .proofs
            .get(&thread_key)
            .ok_or(AgencyError::UnknownThread(thread_key))?;

        let state = match proof.stage {
            ProofStage::Requested => VerifierState::RequestSent,
            ProofStage::Presented => VerifierState::ProofReceived,
            ProofStage::Verified => VerifierState::Verified,
            ProofStage::Rejected => VerifierState::Rejected,
        };

        Ok(Observed::new(state, session))
    }

    async fn verify_proof(
        &self,
        session: SessionPayload,
    ) -> Result<Observed<VerifierState>, ProofError> {
        let thread: ThreadSession = from_session(&session)?;

        let mut guard = self.agency.mailbox.write().await;
        let mailbox = &mut *guard;
        let thread_key = mailbox.thread_key(&thread.route()?, &thread.thread_id)?;
        let proof = mailbox
            .proofs
            .get_mut(&thread_key)
            .ok_or_else(|| AgencyError::UnknownThread(thread_key.clone()))?;

        if proof.verifier != thread.route()? {
            return Err(AgencyError::InvalidSession(format!(
                "not the verifier of: {}",
                thread_key
            ))
            .into());
        }

        if proof.stage == ProofStage::Presented {
            let presentation: Option<Presentation> = proof
                .proof
                .clone()
                .and_then(|payload| serde_json::from_value(Value::from(payload)).ok());

            let wallet = mailbox
                .wallets
                .get(&proof.prover.agent_did)
                .map(|wallet| wallet.as_slice())
                .unwrap_or_default();

            let verified = presentation
                .map(|presentation| verify_presentation(&proof.request, &presentation, wallet))
                .unwrap_or(false);

            proof.stage = if verified {
                ProofStage::Verified
            } else {
                ProofStage::Rejected
            };

            info!("agency: proof {} verified: {}", thread_key, verified);
        }

        let state = match proof.stage {
            ProofStage::Verified => VerifierState::Verified,
            ProofStage::Rejected => VerifierState::Rejected,
            _ => {
                return Err(AgencyError::InvalidMessage(format!(
                    "proof was not presented: {}",
                    thread_key
                ))
                .into())
            }
        };

        Ok(Observed::new(state, session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rst_common::standard::serde_json::json;
    use rst_common::with_tokio::tokio;

    use table_test::table_test;

    use prople_courier_core::connection::types::{ConnectOptions, TransportBuilder};

    use crate::agency::Agency;

    fn candidate(cred_id: &str, cred_def_id: &str, name: &str, value: &str) -> CredentialCandidate {
        CredentialCandidate {
            cred_id: cred_id.to_string(),
            cred_def_id: cred_def_id.to_string(),
            attributes: BTreeMap::from([(name.to_string(), value.to_string())]),
        }
    }

    fn build_request(id: &str) -> ProofRequest {
        ProofRequest::new(id.to_string(), "proof-of-degree".to_string())
            .attribute("attr_degree", "degree", vec![json!({"cred_def_id": "cred-def-1"})])
    }

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

    #[test]
    fn test_satisfies() {
        let spec = AttributeSpec {
            name: "degree".to_string(),
            restrictions: vec![json!({"cred_def_id": "cred-def-1"})],
        };

        let table = vec![
            (candidate("c1", "cred-def-1", "degree", "maths"), true),
            (candidate("c2", "cred-def-2", "degree", "maths"), false),
            (candidate("c3", "cred-def-1", "name", "alice"), false),
        ];

        for (validator, input, expected) in table_test!(table) {
            let actual = satisfies(&spec, &input);

            validator
                .given(&format!("candidate: {:?}", input))
                .when("satisfies")
                .then(&format!("it should be: {}", expected))
                .assert_eq(expected, actual);
        }
    }

    #[tokio::test]
    async fn test_generate_and_verify_presentation() {
        let agency = Agency::new("loopback://agency".to_string());
        let alice = agency.client("did:alice".to_string());
        let request = build_request("request-1");

        let wallet = vec![candidate("c1", "cred-def-1", "degree", "maths")];
        let selected = BTreeMap::from([("attr_degree".to_string(), wallet[0].clone())]);

        let proof = alice
            .generate_proof(request.clone(), selected, SelfAttested::new())
            .await
            .unwrap();

        let presentation: Presentation = serde_json::from_value(Value::from(proof)).unwrap();
        assert!(verify_presentation(&request, &presentation, &wallet));

        let forged = vec![candidate("c1", "cred-def-1", "degree", "physics")];
        assert!(!verify_presentation(&request, &presentation, &forged));
    }

    #[tokio::test]
    async fn test_proof_exchange() {
        let agency = Agency::new("loopback://agency".to_string());
        let faber = agency.client("did:faber".to_string());
        let alice = agency.client("did:alice".to_string());
        let (verifier_conn, prover_conn) = connected(&agency).await;

        agency
            .mailbox
            .write()
            .await
            .wallets
            .insert(
                "did:alice".to_string(),
                vec![candidate("c1", "cred-def-1", "degree", "maths")],
            );

        let request = build_request("request-2");
        let verifier = faber
            .send_proof_request(verifier_conn, "degree".to_string(), request.clone())
            .await
            .unwrap();

        let requests = alice.fetch_proof_requests(prover_conn.clone()).await.unwrap();
        assert_eq!(requests.len(), 1);

        let candidates = alice.query_wallet_credentials(request.clone()).await.unwrap();
        let selected = BTreeMap::from([(
            "attr_degree".to_string(),
            candidates["attr_degree"][0].clone(),
        )]);

        let proof = alice
            .generate_proof(request.clone(), selected, SelfAttested::new())
            .await
            .unwrap();
        let prover = alice.send_proof(prover_conn, request, proof).await.unwrap();

        let observed = faber.refresh_verifier_state(verifier.clone()).await.unwrap();
        assert_eq!(observed.state, VerifierState::ProofReceived);

        let verdict = faber.verify_proof(verifier).await.unwrap();
        assert_eq!(verdict.state, VerifierState::Verified);

        let observed = alice.refresh_prover_state(prover).await.unwrap();
        assert_eq!(observed.state, ProverState::Verified);
    }

    #[tokio::test]
    async fn test_verify_before_presentation() {
        let agency = Agency::new("loopback://agency".to_string());
        let faber = agency.client("did:faber".to_string());
        let (verifier_conn, _) = connected(&agency).await;

        let verifier = faber
            .send_proof_request(verifier_conn, "degree".to_string(), build_request("request-3"))
            .await
            .unwrap();

        let verdict = faber.verify_proof(verifier).await;
        assert!(matches!(verdict, Err(ProofError::CryptoError(_))))
    }
}

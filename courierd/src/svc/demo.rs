use rst_common::standard::serde_json;
use rst_common::standard::uuid::Uuid;
use rst_common::with_logging::log::{info, warn};
use rst_common::with_tokio::tokio;

use prople_courier_core::connection::types::{
    ConnectionAPI, ConnectionEntityAccessor, ConnectionKey, Message,
};
use prople_courier_core::credential::types::{
    CredentialAPI, CredentialOffer, HolderEntityAccessor, IssuerEntityAccessor, PaymentOptions,
};
use prople_courier_core::polling::StopSignal;
use prople_courier_core::proof::types::{
    DisclosedProofEntityAccessor, ProofAPI, ProofRequest, SelfAttested,
    VerifierProofEntityAccessor, VerifierState,
};
use prople_courier_core::provisioning::types::{
    AgentRole, ProvisionOptions, ProvisioningEntityAccessor,
};
use prople_courier_node::store::RocksStore;
use prople_courier_node::{LocalAgent, Node};

use crate::errors::CourierError;

use super::Daemon;

type Agent = LocalAgent<RocksStore>;

fn protocol_error(err: impl ToString) -> CourierError {
    CourierError::ProtocolError(err.to_string())
}

/// `stop_on_interrupt` turns a ctrl-c into a stop request for every running polling loop
fn stop_on_interrupt() -> StopSignal {
    let (stopper, signal) = StopSignal::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("[demo] interrupted, stopping polling loops");
            stopper.stop();
        }
    });

    signal
}

async fn connect(
    node: &Node<RocksStore>,
    issuer: &Agent,
    holder: &Agent,
    holder_name: &str,
    stop: &StopSignal,
) -> Result<(ConnectionKey, ConnectionKey), CourierError> {
    // the loopback agency lives in memory, every run needs its own pairwise connections
    let run_id = Uuid::new_v4().simple().to_string();

    info!("#5 create a connection to {} and print out the invite details", holder_name);
    let invited = issuer
        .connections()
        .connect_as_inviter(issuer.did(), format!("{}-{}", holder_name, run_id))
        .await
        .map_err(protocol_error)?;

    let details = issuer
        .connections()
        .invite_details(invited.get_key())
        .await
        .map_err(protocol_error)?;
    info!("invite details: {}", details);

    info!("#6 {} accepts the invitation", holder_name);
    let requested = holder
        .connections()
        .connect_as_invitee(
            holder.did(),
            format!("{}-{}", issuer.record().get_role(), run_id),
            details,
        )
        .await
        .map_err(protocol_error)?;

    info!("#7 polling agency and waiting for both sides to be accepted");
    let (inviter, invitee) = tokio::join!(
        issuer.connections().poll_acceptance(
            invited.get_key(),
            node.poll_options(),
            Some(stop.clone())
        ),
        holder.connections().poll_acceptance(
            requested.get_key(),
            node.poll_options(),
            Some(stop.clone())
        ),
    );

    let inviter = inviter.map_err(protocol_error)?;
    let invitee = invitee.map_err(protocol_error)?;
    info!(
        "connection accepted, inviter: {}, invitee: {}",
        inviter.get_state(),
        invitee.get_state()
    );

    issuer
        .connections()
        .send_message(
            inviter.get_key(),
            Message::new("hello".to_string(), format!("hello {}", holder_name)),
        )
        .await
        .map_err(protocol_error)?;

    let messages = holder
        .connections()
        .download_messages(invitee.get_key())
        .await
        .map_err(protocol_error)?;

    for message in messages {
        info!("{} received a message: {}", holder_name, message.content);
    }

    Ok((inviter.get_key(), invitee.get_key()))
}

async fn issue(
    node: &Node<RocksStore>,
    issuer: &Agent,
    holder: &Agent,
    issuer_conn: ConnectionKey,
    holder_conn: ConnectionKey,
    holder_name: &str,
    stop: &StopSignal,
) -> Result<String, CourierError> {
    let cred_def_id = format!("{}:3:CL:degree", issuer.did());
    let offer = CredentialOffer::new(
        Uuid::new_v4().to_string(),
        cred_def_id.clone(),
        "degree".to_string(),
    )
    .attribute("name", holder_name)
    .attribute("date", "05-2018")
    .attribute("degree", "maths");

    info!("#12 offer a credential to {}", holder_name);
    let offered = issuer
        .credentials()
        .send_offer(issuer_conn, "degree".to_string(), offer)
        .await
        .map_err(protocol_error)?;

    info!("#13 {} fetches the pending credential offers", holder_name);
    let offers = holder
        .credentials()
        .get_offers(holder_conn.clone())
        .await
        .map_err(protocol_error)?;

    let payload = serde_json::to_string(&offers).map_err(protocol_error)?;

    info!("#15 after receiving the credential offer, send a credential request");
    let requested = holder
        .credentials()
        .request_credential(
            holder_conn,
            "degree".to_string(),
            payload,
            PaymentOptions::default(),
        )
        .await
        .map_err(protocol_error)?;

    let issuer_flow = async {
        info!("#16 poll agency and wait for the credential request");
        let received = issuer
            .credentials()
            .await_request(offered.get_key(), node.poll_options(), Some(stop.clone()))
            .await?;

        info!("#17 issue the credential to {}", holder_name);
        issuer.credentials().send_credential(received.get_key()).await
    };

    let holder_flow = holder.credentials().await_accepted(
        requested.get_key(),
        node.poll_options(),
        Some(stop.clone()),
    );

    let (issued, accepted) = tokio::join!(issuer_flow, holder_flow);
    let issued = issued.map_err(protocol_error)?;
    let accepted = accepted.map_err(protocol_error)?;
    info!(
        "credential exchanged, issuer: {}, holder: {}",
        issued.get_state(),
        accepted.get_state()
    );

    Ok(cred_def_id)
}

async fn prove(
    node: &Node<RocksStore>,
    verifier: &Agent,
    prover: &Agent,
    verifier_conn: ConnectionKey,
    prover_conn: ConnectionKey,
    cred_def_id: String,
    stop: &StopSignal,
) -> Result<VerifierState, CourierError> {
    let restriction = serde_json::json!({ "cred_def_id": cred_def_id });
    let request = ProofRequest::new(Uuid::new_v4().to_string(), "proof-of-education".to_string())
        .attribute("attr_name", "name", vec![restriction.clone()])
        .attribute("attr_date", "date", vec![restriction.clone()])
        .attribute("attr_degree", "degree", vec![restriction]);

    info!("#19 create a proof request and send it");
    let requested = verifier
        .proofs()
        .request_proof(verifier_conn, "education".to_string(), request)
        .await
        .map_err(protocol_error)?;

    info!("#22 poll agency for a proof request");
    let disclosed = prover
        .proofs()
        .receive_request(prover_conn, "education".to_string())
        .await
        .map_err(protocol_error)?;

    info!("#24 query the wallet for credentials that satisfy the proof request");
    let selected = prover
        .proofs()
        .select_credentials(disclosed.get_key())
        .await
        .map_err(protocol_error)?;
    info!("selected credentials: {}", selected.get_selected().len());

    let mut self_attested = SelfAttested::new();
    self_attested.insert("attr_phone".to_string(), "8-800-300".to_string());

    info!("#25 generate the proof");
    let _ = prover
        .proofs()
        .generate_proof(disclosed.get_key(), self_attested)
        .await
        .map_err(protocol_error)?;

    info!("#26 send the proof");
    let _ = prover
        .proofs()
        .send_proof(disclosed.get_key())
        .await
        .map_err(protocol_error)?;

    info!("#27 poll agency and wait for the proof");
    let verified = verifier
        .proofs()
        .await_verification(requested.get_key(), node.poll_options(), Some(stop.clone()))
        .await
        .map_err(protocol_error)?;

    let _ = prover
        .proofs()
        .await_verified(disclosed.get_key(), node.poll_options(), Some(stop.clone()))
        .await
        .map_err(protocol_error)?;

    Ok(verified.get_state())
}

/// `run` drives the whole issuer and holder workflow in a single process
///
/// The configured agent is the issuer and the verifier, the holder is provisioned with the same seed.
pub async fn run(daemon: &Daemon, holder_name: String) -> Result<(), CourierError> {
    let node = daemon.node();
    let stop = stop_on_interrupt();

    let config = daemon.config().agent();
    let (role, _, seed) = config.get_identity();

    info!("#1 provision the issuer agent: {}", role);
    let issuer = node
        .agent(role, seed.clone(), config.provision_options())
        .await
        .map_err(|err| CourierError::ProvisioningError(err.to_string()))?;

    info!("#2 provision the holder agent: {}", holder_name);
    let holder = node
        .agent(
            AgentRole::from(holder_name.as_str()),
            seed,
            ProvisionOptions::new(Uuid::new_v4().to_string()),
        )
        .await
        .map_err(|err| CourierError::ProvisioningError(err.to_string()))?;

    let (issuer_conn, holder_conn) = connect(&node, &issuer, &holder, &holder_name, &stop).await?;

    let cred_def_id = issue(
        &node,
        &issuer,
        &holder,
        issuer_conn.clone(),
        holder_conn.clone(),
        &holder_name,
        &stop,
    )
    .await?;

    let state = prove(
        &node,
        &issuer,
        &holder,
        issuer_conn,
        holder_conn,
        cred_def_id,
        &stop,
    )
    .await?;

    match state {
        VerifierState::Verified => info!("#28 proof is verified"),
        _ => warn!("#28 proof is not verified: {}", state),
    }

    Ok(())
}

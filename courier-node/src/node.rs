use rst_common::with_logging::log::info;

use prople_courier_core::connection::Usecase as ConnectionUsecase;
use prople_courier_core::credential::Usecase as CredentialUsecase;
use prople_courier_core::polling::PollOptions;
use prople_courier_core::proof::Usecase as ProofUsecase;
use prople_courier_core::provisioning::types::{
    AgentRole, ProvisionOptions, ProvisioningAPI, ProvisioningEntityAccessor, ProvisioningError,
};
use prople_courier_core::provisioning::{ProvisioningRecord, Usecase as ProvisioningUsecase};
use prople_courier_core::store::types::StoreBuilder;

use crate::agency::{Agency, AgentClient};

/// `Node` wires a state store to a loopback [`Agency`]
///
/// All local agents created from the same node share both the store and the agency
#[derive(Clone)]
pub struct Node<TStore>
where
    TStore: StoreBuilder,
{
    store: TStore,
    agency: Agency,
    poll_options: PollOptions,
    provisioning: ProvisioningUsecase<TStore, Agency>,
}

impl<TStore> Node<TStore>
where
    TStore: StoreBuilder,
{
    pub fn new(store: TStore, agency: Agency, poll_options: PollOptions) -> Self {
        let provisioning = ProvisioningUsecase::new(store.clone(), agency.clone());
        Self {
            store,
            agency,
            poll_options,
            provisioning,
        }
    }

    pub fn agency(&self) -> &Agency {
        &self.agency
    }

    pub fn store(&self) -> &TStore {
        &self.store
    }

    pub fn poll_options(&self) -> PollOptions {
        self.poll_options.clone()
    }

    pub fn provisioning(&self) -> &ProvisioningUsecase<TStore, Agency> {
        &self.provisioning
    }

    /// `agent` provisions the given role once and returns its protocol handles
    pub async fn agent(
        &self,
        role: AgentRole,
        seed: String,
        options: ProvisionOptions,
    ) -> Result<LocalAgent<TStore>, ProvisioningError> {
        let record = self
            .provisioning
            .ensure_provisioned(role, self.agency.endpoint(), seed, options)
            .await?;

        info!(
            "node: agent {} ready, did: {}",
            record.get_role(),
            record.get_institution_did()
        );

        Ok(LocalAgent::new(self.store.clone(), &self.agency, record))
    }
}

/// `LocalAgent` is a provisioned agent with its connection, credential and proof usecases
#[derive(Clone)]
pub struct LocalAgent<TStore>
where
    TStore: StoreBuilder,
{
    record: ProvisioningRecord,
    client: AgentClient,
    connections: ConnectionUsecase<TStore, AgentClient>,
    credentials: CredentialUsecase<TStore, AgentClient>,
    proofs: ProofUsecase<TStore, AgentClient>,
}

impl<TStore> LocalAgent<TStore>
where
    TStore: StoreBuilder,
{
    pub fn new(store: TStore, agency: &Agency, record: ProvisioningRecord) -> Self {
        let client = agency.client(record.get_institution_did());
        Self {
            connections: ConnectionUsecase::new(store.clone(), client.clone()),
            credentials: CredentialUsecase::new(store.clone(), client.clone()),
            proofs: ProofUsecase::new(store, client.clone()),
            client,
            record,
        }
    }

    pub fn did(&self) -> String {
        self.record.get_institution_did()
    }

    pub fn record(&self) -> &ProvisioningRecord {
        &self.record
    }

    pub fn client(&self) -> &AgentClient {
        &self.client
    }

    pub fn connections(&self) -> &ConnectionUsecase<TStore, AgentClient> {
        &self.connections
    }

    pub fn credentials(&self) -> &CredentialUsecase<TStore, AgentClient> {
        &self.credentials
    }

    pub fn proofs(&self) -> &ProofUsecase<TStore, AgentClient> {
        &self.proofs
    }
}

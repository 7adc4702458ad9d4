use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json;
use rst_common::with_logging::log::{debug, info, warn};

use crate::polling::graph::{plan_transitions, StateGraph};
use crate::polling::{await_terminal, PollOptions, StopSignal};
use crate::store::types::{Namespace, StoreBuilder};
use crate::store::{EntityRepo, KeyLocker};

use super::types::{
    ConnectOptions, ConnectionAPI, ConnectionError, ConnectionKey, Invitation, Message, Role,
    State, TransportBuilder,
};
use super::Connection;

#[derive(Clone)]
pub struct Usecase<TStore, TTransport>
where
    TStore: StoreBuilder,
    TTransport: TransportBuilder,
{
    repo: EntityRepo<TStore>,
    transport: TTransport,
    locker: KeyLocker,
    connect_options: ConnectOptions,
}

impl<TStore, TTransport> Usecase<TStore, TTransport>
where
    TStore: StoreBuilder,
    TTransport: TransportBuilder,
{
    pub fn new(store: TStore, transport: TTransport) -> Self {
        Self {
            repo: EntityRepo::new(store, Namespace::Connections),
            transport,
            locker: KeyLocker::new(),
            connect_options: ConnectOptions::default(),
        }
    }

    pub fn with_connect_options(mut self, options: ConnectOptions) -> Self {
        self.connect_options = options;
        self
    }

    fn validate_parties(self_did: &str, counterparty: &str) -> Result<(), ConnectionError> {
        if self_did.is_empty() {
            return Err(ConnectionError::ValidationError(
                "self_did was missing".to_string(),
            ));
        }

        if counterparty.is_empty() {
            return Err(ConnectionError::ValidationError(
                "counterparty was missing".to_string(),
            ));
        }

        Ok(())
    }

    async fn load(&self, key: &ConnectionKey) -> Result<Connection, ConnectionError> {
        let found: Option<Connection> = self.repo.find(key.as_ref()).await?;
        found.ok_or_else(|| ConnectionError::NotFound(key.to_string()))
    }

    async fn find_resumable(
        &self,
        key: &ConnectionKey,
    ) -> Result<Option<Connection>, ConnectionError> {
        let found: Option<Connection> = self.repo.find(key.as_ref()).await?;
        Ok(found.filter(|conn| conn.state != State::Rejected))
    }

    async fn create(
        &self,
        self_did: String,
        counterparty: String,
    ) -> Result<Connection, ConnectionError> {
        let mut conn = Connection::new(self_did.clone(), counterparty, Role::Inviter);
        let handshake = self
            .transport
            .create_invitation(self_did, conn.source_id.clone())
            .await?;

        let session = self
            .transport
            .connect(handshake.session, self.connect_options.clone())
            .await?;

        conn.set_invitation(handshake.invitation)
            .set_session(session)
            .transition(State::Invited)?;

        let key = conn.key();
        self.repo.save(key.as_ref(), conn.clone()).await?;
        info!("invitation created: {}", key);

        Ok(conn)
    }

    async fn accept(
        &self,
        self_did: String,
        counterparty: String,
        invitation: Invitation,
    ) -> Result<Connection, ConnectionError> {
        let mut conn = Connection::new(self_did.clone(), counterparty, Role::Invitee);
        let session = self
            .transport
            .accept_invitation(self_did, conn.source_id.clone(), invitation.clone())
            .await?;

        let session = self
            .transport
            .connect(session, self.connect_options.clone())
            .await?;

        conn.set_invitation(invitation)
            .set_session(session)
            .transition(State::Requested)?;

        let key = conn.key();
        self.repo.save(key.as_ref(), conn.clone()).await?;
        info!("invitation accepted: {}", key);

        Ok(conn)
    }

    async fn advance(&self, key: &ConnectionKey) -> Result<Connection, ConnectionError> {
        let mut conn = self.load(key).await?;
        if conn.state.is_terminal() {
            return Ok(conn);
        }

        let session = conn.require_session()?;
        let observed = self.transport.refresh_state(session).await?;
        conn.set_session(observed.session);

        let steps = plan_transitions(conn.state, observed.state);
        if steps.is_empty() {
            if observed.state.rank() < conn.state.rank() {
                warn!(
                    "connection {}: ignore remote state {} behind local state {}",
                    key, observed.state, conn.state
                );
            }

            self.repo.save(key.as_ref(), conn.clone()).await?;
            return Ok(conn);
        }

        for step in steps {
            conn.transition(step)?;
            self.repo.save(key.as_ref(), conn.clone()).await?;
            debug!("connection {}: moved to {}", key, step);
        }

        Ok(conn)
    }
}

#[async_trait]
impl<TStore, TTransport> ConnectionAPI for Usecase<TStore, TTransport>
where
    TStore: StoreBuilder,
    TTransport: TransportBuilder,
{
    type EntityAccessor = Connection;

    async fn create_invitation(
        &self,
        self_did: String,
        counterparty: String,
    ) -> Result<Connection, ConnectionError> {
        Self::validate_parties(&self_did, &counterparty)?;

        let key = ConnectionKey::new(&self_did, &counterparty);
        let _guard = self.locker.lock(key.as_ref()).await;
        self.create(self_did, counterparty).await
    }

    async fn accept_invitation(
        &self,
        self_did: String,
        counterparty: String,
        invitation: String,
    ) -> Result<Connection, ConnectionError> {
        Self::validate_parties(&self_did, &counterparty)?;
        let invitation = Invitation::try_from(invitation.as_str())?;

        let key = ConnectionKey::new(&self_did, &counterparty);
        let _guard = self.locker.lock(key.as_ref()).await;
        self.accept(self_did, counterparty, invitation).await
    }

    async fn connect_as_inviter(
        &self,
        self_did: String,
        counterparty: String,
    ) -> Result<Connection, ConnectionError> {
        Self::validate_parties(&self_did, &counterparty)?;

        let key = ConnectionKey::new(&self_did, &counterparty);
        let _guard = self.locker.lock(key.as_ref()).await;

        if let Some(conn) = self.find_resumable(&key).await? {
            info!("connection resumed: {}, state: {}", key, conn.state);
            return Ok(conn);
        }

        self.create(self_did, counterparty).await
    }

    async fn connect_as_invitee(
        &self,
        self_did: String,
        counterparty: String,
        invitation: String,
    ) -> Result<Connection, ConnectionError> {
        Self::validate_parties(&self_did, &counterparty)?;

        let key = ConnectionKey::new(&self_did, &counterparty);
        let _guard = self.locker.lock(key.as_ref()).await;

        if let Some(conn) = self.find_resumable(&key).await? {
            info!("connection resumed: {}, state: {}", key, conn.state);
            return Ok(conn);
        }

        let invitation = Invitation::try_from(invitation.as_str())?;
        self.accept(self_did, counterparty, invitation).await
    }

    async fn update_state(&self, key: ConnectionKey) -> Result<Connection, ConnectionError> {
        let _guard = self.locker.lock(key.as_ref()).await;
        self.advance(&key).await
    }

    async fn poll_acceptance(
        &self,
        key: ConnectionKey,
        options: PollOptions,
        stop: Option<StopSignal>,
    ) -> Result<Connection, ConnectionError> {
        let state = await_terminal(
            || {
                let key = key.clone();
                async move { self.update_state(key).await.map(|conn| conn.state) }
            },
            |state: &State| state.is_terminal(),
            &options,
            stop,
        )
        .await
        .map_err(|err| err.resolve(key.as_ref()))?;

        if state == State::Rejected {
            return Err(ConnectionError::StateTransitionRejected {
                key: key.to_string(),
                state,
            });
        }

        self.load(&key).await
    }

    async fn send_message(&self, key: ConnectionKey, message: Message) -> Result<(), ConnectionError> {
        let conn = self.load(&key).await?;
        let session = conn.ensure_ready()?;

        self.transport.send(session, message).await?;
        debug!("message sent: {}", key);

        Ok(())
    }

    async fn download_messages(&self, key: ConnectionKey) -> Result<Vec<Message>, ConnectionError> {
        let conn = self.load(&key).await?;
        let session = conn.ensure_ready()?;

        let messages = self.transport.download_messages(session).await?;
        debug!("messages downloaded: {}, total: {}", key, messages.len());

        Ok(messages)
    }

    async fn invite_details(&self, key: ConnectionKey) -> Result<String, ConnectionError> {
        let conn = self.load(&key).await?;
        let invitation = conn.invitation.ok_or_else(|| {
            ConnectionError::ValidationError(format!("connection {} has no invitation", key))
        })?;

        serde_json::to_string(&invitation)
            .map_err(|err| ConnectionError::GenerateJSONError(err.to_string()))
    }

    async fn get_connection(&self, key: ConnectionKey) -> Result<Connection, ConnectionError> {
        self.load(&key).await
    }

    async fn list_connections(
        &self,
        state: Option<State>,
    ) -> Result<Vec<Connection>, ConnectionError> {
        let connections: Vec<Connection> = self.repo.list().await?;
        let filtered = connections
            .into_iter()
            .filter(|conn| state.map_or(true, |expected| conn.state == expected))
            .collect();

        Ok(filtered)
    }
}

//! `session` contains the opaque protocol payload shared by all state machines
//!
//! The agency collaborators return an internal representation of each protocol object
//! (a serialized connection, credential or proof). This layer never parses it, it only keeps
//! it so the object can be handed back to the collaborator on the next call, even after
//! a process restart.
use derive_more::{From, Into};

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;

/// `SessionPayload` is the collaborator's serialized protocol object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From, Into)]
#[serde(crate = "self::serde")]
pub struct SessionPayload(Value);

impl SessionPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

/// `Observed` is the result of a single remote state refresh
///
/// It always carries the latest session payload, because refreshing the state from the agency
/// may also change the collaborator's internal object
#[derive(Debug, Clone, PartialEq)]
pub struct Observed<TState> {
    pub state: TState,
    pub session: SessionPayload,
}

impl<TState> Observed<TState> {
    pub fn new(state: TState, session: SessionPayload) -> Self {
        Self { state, session }
    }
}

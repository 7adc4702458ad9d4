use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

use super::{Agent, Database, Polling};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(crate = "self::serde")]
pub struct Config {
    pub(super) database: Database,
    pub(super) agent: Agent,

    #[serde(default)]
    pub(super) polling: Polling,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn db(&self) -> &Database {
        &self.database
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn polling(&self) -> &Polling {
        &self.polling
    }
}

impl ToValidate for Config {
    fn validate(&self) -> Result<(), CommonError> {
        self.database.validate()?;
        self.agent.validate()?;
        self.polling.validate()?;

        Ok(())
    }
}

use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

/// `Database` groups every physical database used by the node
///
/// There is only one for now, `state`, which keeps all protocol objects
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(crate = "self::serde")]
pub struct Database {
    pub state: StateDatabase,
}

impl ToValidate for Database {
    fn validate(&self) -> Result<(), CommonError> {
        self.state.validate()
    }
}

/// `StateDatabase` locates the RocksDB instance and column family of the state store
///
/// The database and its column family are created on first open, the write ahead log stays
/// next to the data unless `wal_dir` is given.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(crate = "self::serde")]
pub struct StateDatabase {
    pub(super) path: String,
    pub(super) column_family: String,
    pub(super) wal_dir: Option<String>,
}

impl StateDatabase {
    pub fn get_location(&self) -> (String, String) {
        (self.path.to_owned(), self.column_family.to_owned())
    }

    pub fn get_wal_dir(&self) -> Option<String> {
        self.wal_dir.to_owned()
    }
}

impl ToValidate for StateDatabase {
    fn validate(&self) -> Result<(), CommonError> {
        if self.path.is_empty() {
            return Err(CommonError::ValidationError(
                "config: database:state:path is missing".to_string(),
            ));
        }

        if self.column_family.is_empty() {
            return Err(CommonError::ValidationError(
                "config: database:state:column_family is missing".to_string(),
            ));
        }

        if self.wal_dir.as_ref().is_some_and(|dir| dir.is_empty()) {
            return Err(CommonError::ValidationError(
                "config: database:state:wal_dir is empty".to_string(),
            ));
        }

        Ok(())
    }
}

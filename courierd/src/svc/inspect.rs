use cli_table::{print_stdout, Table, WithTitle};
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_logging::log::{debug, warn};

use prople_courier_core::store::types::{Namespace, StoreBuilder};

use crate::errors::CourierError;

use super::Daemon;

#[derive(Table, Clone, Debug, PartialEq)]
struct StoredObject {
    #[table(title = "namespace")]
    namespace: String,

    #[table(title = "key")]
    key: String,

    #[table(title = "id")]
    id: String,

    #[table(title = "state")]
    state: String,

    #[table(title = "updated_at")]
    updated_at: String,
}

fn field(value: &Value, name: &str) -> String {
    match value.get(name) {
        Some(Value::String(text)) => text.to_owned(),
        Some(Value::Number(number)) => number.to_string(),
        _ => "-".to_string(),
    }
}

fn build_rows(namespace: Namespace, keys: Vec<String>, values: Vec<Vec<u8>>) -> Vec<StoredObject> {
    keys.into_iter()
        .zip(values)
        .map(|(key, bytes)| {
            let value = serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|err| {
                warn!("[inspect] unreadable object {}: {}", key, err);
                Value::Null
            });

            let updated_at = match field(&value, "updatedAt").as_str() {
                "-" => field(&value, "createdAt"),
                updated => updated.to_string(),
            };

            StoredObject {
                namespace: namespace.to_string(),
                key,
                id: field(&value, "id"),
                state: field(&value, "state"),
                updated_at,
            }
        })
        .collect()
}

/// `run` prints every object of one namespace, or of all of them when no namespace is given
pub async fn run(daemon: &Daemon, namespace: Option<String>) -> Result<(), CourierError> {
    let namespaces = match namespace {
        Some(name) => vec![Namespace::try_from(name.as_str())
            .map_err(|err| CourierError::ConfigError(err.to_string()))?],
        None => Namespace::all(),
    };

    let store = daemon.store();
    let mut rows: Vec<StoredObject> = Vec::new();
    for ns in namespaces {
        let keys = store
            .keys(ns)
            .await
            .map_err(|err| CourierError::DbError(err.to_string()))?;

        let values = store
            .values(ns)
            .await
            .map_err(|err| CourierError::DbError(err.to_string()))?;

        debug!("[inspect] namespace: {}, objects: {}", ns, keys.len());
        rows.append(&mut build_rows(ns, keys, values));
    }

    let _ = print_stdout(rows.with_title())
        .map_err(|err| CourierError::OutputError(err.to_string()))?;

    Ok(())
}

//! Store operations.
//!
//! Each operation runs inside one host transaction against one store,
//! awaiting both its requests and the commit. The transaction is the only
//! atomicity boundary: a bulk write either commits whole or publishes
//! nothing, while separate calls are independent.

use std::collections::BTreeMap;

use futures::future::try_join_all;

use cubby_core::protocol::{TransactionMode, Value};
use cubby_core::{EngineError, Error, Key, KeySet, Result};

use crate::awaited::{issue, settle};
use crate::cursor;
use crate::manager::Connection;

/// Put `value` at `key`.
pub(crate) async fn set(
    connection: &Connection,
    store: &str,
    key: Key,
    value: Value,
) -> Result<()> {
    let mut tx = connection
        .begin(store, TransactionMode::ReadWrite)
        .map_err(|source| write_error(store, source))?;
    settle(|done| tx.put(key, value, done))
        .await?
        .map_err(|source| write_error(store, source))?;
    settle(|done| tx.commit(done))
        .await?
        .map_err(|source| write_error(store, source))
}

/// Bulk write.
///
/// A JSON sequence writes each element under its positional index; a keyed
/// mapping writes each field under its name. All puts go into one
/// transaction and their acknowledgments are awaited together; any failure
/// fails the operation before commit, so the host publishes nothing.
pub(crate) async fn set_entries(
    connection: &Connection,
    store: &str,
    container: Value,
) -> Result<()> {
    let pairs: Vec<(Key, Value)> = match container {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, value)| (Key::from(index), value))
            .collect(),
        Value::Object(fields) => fields
            .into_iter()
            .map(|(name, value)| (Key::from(name), value))
            .collect(),
        other => {
            return Err(Error::Validation(format!(
                "entries must be a sequence or a keyed mapping, got {}",
                kind_of(&other)
            )));
        }
    };

    let mut tx = connection
        .begin(store, TransactionMode::ReadWrite)
        .map_err(|source| write_error(store, source))?;

    let mut acknowledgments = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        acknowledgments.push(issue(|done| tx.put(key, value, done)));
    }
    let outcomes = try_join_all(acknowledgments)
        .await
        .map_err(|_| Error::Disconnected)?;
    for outcome in outcomes {
        outcome.map_err(|source| write_error(store, source))?;
    }

    settle(|done| tx.commit(done))
        .await?
        .map_err(|source| write_error(store, source))
}

/// Read the value at `key`; `None` if no entry exists.
///
/// A store that does not exist reads as absent too; only structural host
/// failures are errors.
pub(crate) async fn get(connection: &Connection, store: &str, key: &Key) -> Result<Option<Value>> {
    let mut tx = match connection.begin(store, TransactionMode::ReadOnly) {
        Ok(tx) => tx,
        Err(EngineError::StoreNotFound(_)) => return Ok(None),
        Err(source) => return Err(read_error(store, source)),
    };
    let value = settle(|done| tx.get(key, done))
        .await?
        .map_err(|source| read_error(store, source))?;
    settle(|done| tx.commit(done))
        .await?
        .map_err(|source| read_error(store, source))?;
    Ok(value)
}

/// Bulk read: linear scan collecting entries whose key is in `keys`,
/// ascending. Missing keys are omitted, not errors, and a missing store
/// reads as an empty mapping.
pub(crate) async fn get_entries(
    connection: &Connection,
    store: &str,
    keys: &KeySet,
) -> Result<BTreeMap<Key, Value>> {
    let mut tx = match connection.begin(store, TransactionMode::ReadOnly) {
        Ok(tx) => tx,
        Err(EngineError::StoreNotFound(_)) => return Ok(BTreeMap::new()),
        Err(source) => return Err(read_error(store, source)),
    };
    let cursor = settle(|done| tx.open_cursor(done))
        .await?
        .map_err(|source| read_error(store, source))?;
    let matches = cursor::collect_entries(cursor, keys, store).await?;
    settle(|done| tx.commit(done))
        .await?
        .map_err(|source| read_error(store, source))?;
    Ok(matches
        .into_iter()
        .map(|entry| (entry.key, entry.value))
        .collect())
}

/// Delete every entry whose key is in `keys`.
pub(crate) async fn delete(connection: &Connection, store: &str, keys: &KeySet) -> Result<()> {
    let mut tx = connection
        .begin(store, TransactionMode::ReadWrite)
        .map_err(|source| write_error(store, source))?;
    let cursor = settle(|done| tx.open_cursor(done))
        .await?
        .map_err(|source| write_error(store, source))?;
    cursor::delete_entries(cursor, keys, store).await?;
    settle(|done| tx.commit(done))
        .await?
        .map_err(|source| write_error(store, source))
}

/// Remove every entry in the store with the host's atomic clear primitive.
pub(crate) async fn clear(connection: &Connection, store: &str) -> Result<()> {
    let mut tx = connection
        .begin(store, TransactionMode::ReadWrite)
        .map_err(|source| clear_error(store, source))?;
    settle(|done| tx.clear(done))
        .await?
        .map_err(|source| clear_error(store, source))?;
    settle(|done| tx.commit(done))
        .await?
        .map_err(|source| clear_error(store, source))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn write_error(store: &str, source: EngineError) -> Error {
    Error::Write {
        store: store.to_string(),
        source,
    }
}

fn read_error(store: &str, source: EngineError) -> Error {
    Error::Read {
        store: store.to_string(),
        source,
    }
}

fn clear_error(store: &str, source: EngineError) -> Error {
    Error::Clear {
        store: store.to_string(),
        source,
    }
}

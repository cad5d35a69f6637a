//! The public operation surface.
//!
//! [`Cubby`] bundles the connection manager and deletion coordinator behind
//! the five public operations: `create`, `store` (the per-store operation
//! bundle), `clear`, `delete`, and `has`. Arguments are validated before any
//! host interaction; values cross the boundary through serde.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use cubby_core::protocol::{HostEngine, Value};
use cubby_core::{Error, Key, KeySet, Result};
use cubby_engine::MemoryEngine;

use crate::deletion::{DeletionCoordinator, RetryPolicy};
use crate::manager::{Connection, ConnectionManager};
use crate::ops;

/// Promise-style storage over a host engine.
///
/// Cheap to clone; clones share the connection registry.
///
/// # Example
///
/// ```
/// use cubby_store::Cubby;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> cubby_core::Result<()> {
/// let cubby = Cubby::in_memory();
/// cubby.create("app", &["settings"]).await?;
///
/// let settings = cubby.store("app", "settings");
/// settings.set("theme", "dark").await?;
/// let theme: Option<String> = settings.get("theme").await?;
/// assert_eq!(theme.as_deref(), Some("dark"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Cubby {
    manager: Arc<ConnectionManager>,
    coordinator: DeletionCoordinator,
}

impl Cubby {
    /// Create a layer over the given host engine with the default retry
    /// policy.
    pub fn new(engine: Arc<dyn HostEngine>) -> Self {
        Self::with_retry_policy(engine, RetryPolicy::default())
    }

    /// Create a layer with an explicit blocked-deletion retry policy.
    pub fn with_retry_policy(engine: Arc<dyn HostEngine>, policy: RetryPolicy) -> Self {
        Self {
            manager: Arc::new(ConnectionManager::new(Arc::clone(&engine))),
            coordinator: DeletionCoordinator::new(engine, policy),
        }
    }

    /// Create a layer over the in-process reference engine.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryEngine::new()))
    }

    /// Create the named database with the given stores if they don't exist.
    ///
    /// Idempotent for an unchanged store set. Because every database is
    /// pinned to version 1, calling this with *additional* store names on a
    /// database that already exists will not create them; use [`Cubby::has`]
    /// to detect that case and [`Cubby::delete`] to drop the database first.
    pub async fn create<S: AsRef<str>>(&self, name: &str, stores: &[S]) -> Result<Connection> {
        validate_name(name)?;
        let stores = owned(stores);
        validate_stores(&stores)?;
        self.manager.open(name, &stores).await
    }

    /// Operations bound to one store of one database.
    ///
    /// Each operation on the returned handle opens its own connection, so a
    /// handle stays valid across database deletion and recreation.
    pub fn store(&self, name: &str, store: &str) -> StoreHandle {
        StoreHandle {
            manager: Arc::clone(&self.manager),
            database: name.to_string(),
            store: store.to_string(),
        }
    }

    /// Empty one store, leaving every other store in the database intact.
    pub async fn clear(&self, name: &str, store: &str) -> Result<()> {
        validate_name(name)?;
        let stores = vec![store.to_string()];
        validate_stores(&stores)?;
        let connection = self.manager.open(name, &stores).await?;
        ops::clear(&connection, store).await
    }

    /// Delete the named database.
    ///
    /// If the host reports the deletion blocked by live connections, every
    /// tracked connection for the name is closed and the request re-issued,
    /// up to the retry policy's bound.
    pub async fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.coordinator.delete_database(&self.manager, name).await
    }

    /// Whether the named database contains every one of the given stores.
    ///
    /// This performs a full open, so it is **not read-only**: if the
    /// database did not exist, it is created along with the requested
    /// stores (and the answer is true). Its value is on databases that
    /// already exist, where it reveals stores a later `create` call would
    /// silently fail to add.
    pub async fn has<S: AsRef<str>>(&self, name: &str, stores: &[S]) -> Result<bool> {
        validate_name(name)?;
        let stores = owned(stores);
        validate_stores(&stores)?;
        let connection = self.manager.open(name, &stores).await?;
        let present = connection.store_names();
        Ok(stores.iter().all(|store| present.contains(store)))
    }

    /// The connection manager backing this layer.
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }
}

/// Entry operations bound to a (database, store) pair.
///
/// Every operation opens a fresh connection through the manager and runs in
/// its own host transaction.
#[derive(Clone)]
pub struct StoreHandle {
    manager: Arc<ConnectionManager>,
    database: String,
    store: String,
}

impl StoreHandle {
    /// Put a value at a key.
    pub async fn set<K, V>(&self, key: K, value: &V) -> Result<()>
    where
        K: Into<Key>,
        V: Serialize + ?Sized,
    {
        let value = to_value(value)?;
        let connection = self.connect().await?;
        ops::set(&connection, &self.store, key.into(), value).await
    }

    /// Put a whole dataset in one transaction.
    ///
    /// A sequence writes each element under its positional index; a keyed
    /// mapping writes each field under its name. Anything else fails
    /// validation.
    pub async fn set_entries<V>(&self, entries: &V) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        let container = to_value(entries)?;
        let connection = self.connect().await?;
        ops::set_entries(&connection, &self.store, container).await
    }

    /// Read the value at a key. A key that was never written resolves to
    /// `None`, not an error, and so does a store the database does not
    /// contain.
    pub async fn get<K, T>(&self, key: K) -> Result<Option<T>>
    where
        K: Into<Key>,
        T: DeserializeOwned,
    {
        let connection = self.connect().await?;
        match ops::get(&connection, &self.store, &key.into()).await? {
            Some(value) => Ok(Some(from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Read every entry whose key is in the given set, in ascending key
    /// order. Missing keys are omitted from the result.
    pub async fn get_entries<K, T>(&self, keys: K) -> Result<BTreeMap<Key, T>>
    where
        K: Into<KeySet>,
        T: DeserializeOwned,
    {
        let keys = keys.into();
        let connection = self.connect().await?;
        let entries = ops::get_entries(&connection, &self.store, &keys).await?;
        entries
            .into_iter()
            .map(|(key, value)| Ok((key, from_value(value)?)))
            .collect()
    }

    /// Delete the entry for a single key, or the entries for a sequence of
    /// keys. Keys with no entry are ignored.
    pub async fn delete<K: Into<KeySet>>(&self, keys: K) -> Result<()> {
        let keys = keys.into();
        let connection = self.connect().await?;
        ops::delete(&connection, &self.store, &keys).await
    }

    async fn connect(&self) -> Result<Connection> {
        validate_name(&self.database)?;
        let stores = std::slice::from_ref(&self.store);
        validate_stores(stores)?;
        self.manager.open(&self.database, stores).await
    }
}

fn owned<S: AsRef<str>>(stores: &[S]) -> Vec<String> {
    stores.iter().map(|s| s.as_ref().to_string()).collect()
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation(
            "database name must be a non-empty string".to_string(),
        ));
    }
    Ok(())
}

fn validate_stores(stores: &[String]) -> Result<()> {
    if stores.is_empty() {
        return Err(Error::Validation(
            "at least one store name is required".to_string(),
        ));
    }
    if stores.iter().any(|store| store.is_empty()) {
        return Err(Error::Validation(
            "store names must be non-empty strings".to_string(),
        ));
    }
    Ok(())
}

fn to_value<V: Serialize + ?Sized>(value: &V) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Serialization(e.to_string()))
}

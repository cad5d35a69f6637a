//! Connection lifecycle management.
//!
//! The manager opens databases at the pinned version, runs the store-creating
//! upgrade hook on first open of a name, and tracks every connection it hands
//! out in a process-wide registry so deletion can close them later.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use cubby_core::protocol::{
    DatabaseHandle, HostEngine, StoreTransaction, TransactionMode, UpgradeHook, DB_VERSION,
};
use cubby_core::{EngineError, Error, Result};

use crate::awaited::settle;

/// A live handle to an opened database.
///
/// Cheap to clone; all clones share the underlying host handle. Closing any
/// clone closes them all, and closing twice is a no-op.
#[derive(Clone)]
pub struct Connection {
    handle: Arc<dyn DatabaseHandle>,
}

impl Connection {
    /// The database name this connection points at.
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Names of every store in the database, ascending.
    pub fn store_names(&self) -> Vec<String> {
        self.handle.store_names()
    }

    /// Close the connection.
    pub fn close(&self) {
        self.handle.close();
    }

    /// Whether the connection is still open.
    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    pub(crate) fn begin(
        &self,
        store: &str,
        mode: TransactionMode,
    ) -> std::result::Result<Box<dyn StoreTransaction>, EngineError> {
        self.handle.begin(store, mode)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name())
            .field("open", &self.is_open())
            .finish()
    }
}

/// Opens databases and tracks the resulting connections per name.
pub struct ConnectionManager {
    engine: Arc<dyn HostEngine>,
    registry: Mutex<HashMap<String, Vec<Connection>>>,
}

impl ConnectionManager {
    /// Create a manager over the given host engine.
    pub fn new(engine: Arc<dyn HostEngine>) -> Self {
        Self {
            engine,
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// Open (or create) the named database, creating any of `store_names`
    /// that do not exist yet.
    ///
    /// The upgrade hook only fires the first time a name is opened, because
    /// every database is pinned to version 1. Opening an already-existing
    /// database with additional store names therefore does NOT create them;
    /// callers that need a different store set must delete and recreate the
    /// database (see [`crate::Cubby::has`] for detecting this).
    ///
    /// Concurrent opens of the same name are safe: the engine serializes the
    /// upgrade path, so one caller's hook runs and the rest receive the
    /// already-upgraded database.
    pub async fn open(&self, name: &str, store_names: &[String]) -> Result<Connection> {
        let wanted = store_names.to_vec();
        let upgrade: UpgradeHook = Box::new(move |schema| {
            for store in &wanted {
                if !schema.has_store(store) {
                    schema.create_store(store)?;
                }
            }
            Ok(())
        });

        let handle = settle(|done| self.engine.open_database(name, DB_VERSION, upgrade, done))
            .await?
            .map_err(|source| Error::Open {
                name: name.to_string(),
                source,
            })?;

        let connection = Connection { handle };
        let mut registry = self.registry.lock();
        let tracked = registry.entry(name.to_string()).or_default();
        tracked.push(connection.clone());
        debug!(
            "Opened connection to '{}' ({} tracked)",
            name,
            tracked.len()
        );

        Ok(connection)
    }

    /// Number of tracked connections for the given name.
    pub fn tracked(&self, name: &str) -> usize {
        self.registry
            .lock()
            .get(name)
            .map(Vec::len)
            .unwrap_or_default()
    }

    /// Close every tracked connection for the given name and forget them.
    ///
    /// Connections are removed from the registry only after their close
    /// completed; the underlying handles guard against double-close.
    pub fn close_all(&self, name: &str) -> usize {
        let mut registry = self.registry.lock();
        let Some(connections) = registry.get(name) else {
            return 0;
        };
        for connection in connections {
            connection.close();
        }
        let closed = registry.remove(name).map(|c| c.len()).unwrap_or_default();
        if closed > 0 {
            debug!("Closed {} tracked connection(s) to '{}'", closed, name);
        }
        closed
    }
}

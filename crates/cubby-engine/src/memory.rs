//! In-memory host engine.
//!
//! Implements the full host contract (versioned opens with a one-time
//! upgrade hook, snapshot transactions that publish on commit, ascending
//! cursors, and blocked deletion while connections remain open) against
//! process memory. Suitable for tests and for callers that want the layer's
//! semantics without a platform-provided engine.

use std::collections::hash_map::Entry as MapEntry;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info};

use cubby_core::protocol::{
    DatabaseHandle, DeleteReply, Done, Entry, HostEngine, SchemaEditor, StoreCursor,
    StoreTransaction, TransactionMode, UpgradeHook, Value,
};
use cubby_core::{EngineError, Key};

/// Global transaction ID counter
static TRANSACTION_COUNTER: AtomicU64 = AtomicU64::new(1);

type StoreMap = BTreeMap<Key, Value>;

#[derive(Default)]
struct EngineState {
    databases: HashMap<String, DatabaseRecord>,
}

struct DatabaseRecord {
    version: u32,
    stores: BTreeMap<String, StoreMap>,
    open_handles: usize,
}

/// The in-memory reference engine.
///
/// All state lives behind one mutex; upgrade hooks run under it, so
/// concurrent opens of the same name serialize and the hook executes exactly
/// once per (name, version) pair. Callbacks are invoked inline.
#[derive(Default)]
pub struct MemoryEngine {
    state: Arc<Mutex<EngineState>>,
}

impl MemoryEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    fn do_open(
        &self,
        name: &str,
        version: u32,
        upgrade: UpgradeHook,
    ) -> Result<Arc<dyn DatabaseHandle>, EngineError> {
        let mut state = self.state.lock();

        match state.databases.entry(name.to_string()) {
            MapEntry::Vacant(vacant) => {
                let mut stores = BTreeMap::new();
                let mut editor = MemoryEditor {
                    stores: &mut stores,
                };
                upgrade(&mut editor)?;
                vacant.insert(DatabaseRecord {
                    version,
                    stores,
                    open_handles: 1,
                });
                info!("Created database '{}' at version {}", name, version);
            }
            MapEntry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                if version < record.version {
                    return Err(EngineError::VersionMismatch {
                        requested: version,
                        current: record.version,
                    });
                }
                if version > record.version {
                    // Upgrade against a copy so a failing hook aborts cleanly.
                    let mut stores = record.stores.clone();
                    let mut editor = MemoryEditor {
                        stores: &mut stores,
                    };
                    upgrade(&mut editor)?;
                    record.stores = stores;
                    record.version = version;
                    info!("Upgraded database '{}' to version {}", name, version);
                }
                record.open_handles += 1;
            }
        }

        Ok(Arc::new(MemoryConnection {
            name: name.to_string(),
            state: Arc::clone(&self.state),
            open: AtomicBool::new(true),
        }))
    }
}

impl HostEngine for MemoryEngine {
    fn open_database(
        &self,
        name: &str,
        version: u32,
        upgrade: UpgradeHook,
        done: Done<Result<Arc<dyn DatabaseHandle>, EngineError>>,
    ) {
        let outcome = self.do_open(name, version, upgrade);
        done(outcome);
    }

    fn delete_database(&self, name: &str, done: Done<DeleteReply>) {
        let reply = {
            let mut state = self.state.lock();
            let open_handles = state.databases.get(name).map(|record| record.open_handles);
            match open_handles {
                None => DeleteReply::Deleted,
                Some(count) if count > 0 => {
                    debug!(
                        "Deletion of '{}' blocked by {} open connection(s)",
                        name, count
                    );
                    DeleteReply::Blocked
                }
                Some(_) => {
                    state.databases.remove(name);
                    info!("Deleted database '{}'", name);
                    DeleteReply::Deleted
                }
            }
        };
        done(reply);
    }
}

struct MemoryEditor<'a> {
    stores: &'a mut BTreeMap<String, StoreMap>,
}

impl SchemaEditor for MemoryEditor<'_> {
    fn has_store(&self, name: &str) -> bool {
        self.stores.contains_key(name)
    }

    fn create_store(&mut self, name: &str) -> Result<(), EngineError> {
        if self.stores.contains_key(name) {
            return Err(EngineError::Backend(format!(
                "store already exists: {}",
                name
            )));
        }
        self.stores.insert(name.to_string(), StoreMap::new());
        debug!("Created store '{}'", name);
        Ok(())
    }
}

struct MemoryConnection {
    name: String,
    state: Arc<Mutex<EngineState>>,
    open: AtomicBool,
}

impl DatabaseHandle for MemoryConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn store_names(&self) -> Vec<String> {
        self.state
            .lock()
            .databases
            .get(&self.name)
            .map(|record| record.stores.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn begin(
        &self,
        store: &str,
        mode: TransactionMode,
    ) -> Result<Box<dyn StoreTransaction>, EngineError> {
        if !self.is_open() {
            return Err(EngineError::ConnectionClosed);
        }

        let snapshot = {
            let state = self.state.lock();
            let record = state
                .databases
                .get(&self.name)
                .ok_or_else(|| EngineError::DatabaseNotFound(self.name.clone()))?;
            record
                .stores
                .get(store)
                .ok_or_else(|| EngineError::StoreNotFound(store.to_string()))?
                .clone()
        };

        let id = TRANSACTION_COUNTER.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Began {:?} transaction {} on '{}/{}'",
            mode, id, self.name, store
        );

        Ok(Box::new(MemoryTransaction {
            id,
            database: self.name.clone(),
            store: store.to_string(),
            mode,
            state: Arc::clone(&self.state),
            working: Arc::new(Mutex::new(snapshot)),
        }))
    }

    fn close(&self) {
        // The swap guards against a second close ever touching the count.
        if self.open.swap(false, Ordering::SeqCst) {
            let mut state = self.state.lock();
            if let Some(record) = state.databases.get_mut(&self.name) {
                record.open_handles = record.open_handles.saturating_sub(1);
            }
            debug!("Closed connection to '{}'", self.name);
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Snapshot transaction: operations mutate a working copy shared with any
/// cursors; `commit` writes the copy back in one step.
struct MemoryTransaction {
    id: u64,
    database: String,
    store: String,
    mode: TransactionMode,
    state: Arc<Mutex<EngineState>>,
    working: Arc<Mutex<StoreMap>>,
}

impl MemoryTransaction {
    fn guard_writable(&self) -> Result<(), EngineError> {
        if self.mode == TransactionMode::ReadOnly {
            return Err(EngineError::ReadOnly);
        }
        Ok(())
    }
}

impl StoreTransaction for MemoryTransaction {
    fn put(&mut self, key: Key, value: Value, done: Done<Result<(), EngineError>>) {
        if let Err(e) = self.guard_writable() {
            done(Err(e));
            return;
        }
        self.working.lock().insert(key, value);
        done(Ok(()));
    }

    fn get(&mut self, key: &Key, done: Done<Result<Option<Value>, EngineError>>) {
        let value = self.working.lock().get(key).cloned();
        done(Ok(value));
    }

    fn clear(&mut self, done: Done<Result<(), EngineError>>) {
        if let Err(e) = self.guard_writable() {
            done(Err(e));
            return;
        }
        self.working.lock().clear();
        done(Ok(()));
    }

    fn open_cursor(&mut self, done: Done<Result<Box<dyn StoreCursor>, EngineError>>) {
        done(Ok(Box::new(MemoryCursor {
            mode: self.mode,
            working: Arc::clone(&self.working),
            position: None,
        })));
    }

    fn commit(self: Box<Self>, done: Done<Result<(), EngineError>>) {
        if self.mode == TransactionMode::ReadOnly {
            done(Ok(()));
            return;
        }

        let outcome = {
            let mut state = self.state.lock();
            match state.databases.get_mut(&self.database) {
                None => Err(EngineError::DatabaseNotFound(self.database.clone())),
                Some(record) => match record.stores.get_mut(&self.store) {
                    None => Err(EngineError::StoreNotFound(self.store.clone())),
                    Some(slot) => {
                        *slot = self.working.lock().clone();
                        Ok(())
                    }
                },
            }
        };

        if outcome.is_ok() {
            debug!(
                "Committed transaction {} on '{}/{}'",
                self.id, self.database, self.store
            );
        }
        done(outcome);
    }
}

struct MemoryCursor {
    mode: TransactionMode,
    working: Arc<Mutex<StoreMap>>,
    position: Option<Key>,
}

impl StoreCursor for MemoryCursor {
    fn step(&mut self, done: Done<Result<Option<Entry>, EngineError>>) {
        let next = {
            let working = self.working.lock();
            match &self.position {
                None => working.iter().next(),
                Some(position) => working
                    .range((Bound::Excluded(position.clone()), Bound::Unbounded))
                    .next(),
            }
            .map(|(key, value)| Entry {
                key: key.clone(),
                value: value.clone(),
            })
        };

        if let Some(entry) = &next {
            self.position = Some(entry.key.clone());
        }
        done(Ok(next));
    }

    fn remove(&mut self, done: Done<Result<(), EngineError>>) {
        if self.mode == TransactionMode::ReadOnly {
            done(Err(EngineError::ReadOnly));
            return;
        }
        match &self.position {
            None => done(Err(EngineError::CursorNotPositioned)),
            Some(position) => {
                self.working.lock().remove(position);
                done(Ok(()));
            }
        }
    }
}

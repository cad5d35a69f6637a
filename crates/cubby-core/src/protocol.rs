//! The host storage engine contract.
//!
//! The host engine is an asynchronous, versioned, transactional key-value
//! service addressed by (database name, store name). Its native protocol is
//! callback-driven: every request takes a completion callback and replies
//! exactly once. The convenience layer adapts these callbacks into futures in
//! one place; engines implement the traits here and never deal in futures
//! themselves.
//!
//! Databases are pinned to [`DB_VERSION`]. The upgrade hook passed to
//! [`HostEngine::open_database`] therefore runs at most once per database
//! name for its entire lifetime (until the database is deleted).

use crate::error::EngineError;
use crate::key::Key;

use std::sync::Arc;

/// The single schema version every database is created at.
pub const DB_VERSION: u32 = 1;

/// A stored value. Anything host-serializable is represented as JSON.
pub type Value = serde_json::Value;

/// Single-shot completion callback for a host request.
pub type Done<T> = Box<dyn FnOnce(T) + Send>;

/// One-time schema hook run when a database is opened at an unseen version.
///
/// An error aborts the open; no database is created.
pub type UpgradeHook = Box<dyn FnOnce(&mut dyn SchemaEditor) -> std::result::Result<(), EngineError> + Send>;

/// A (key, value) pair within a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Key,
    pub value: Value,
}

/// Transaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

/// Reply to a database deletion request.
#[derive(Debug)]
pub enum DeleteReply {
    /// The database is gone. Deleting a name that never existed also lands
    /// here.
    Deleted,
    /// Live connections to the database prevented deletion.
    Blocked,
    /// The host refused the deletion outright.
    Failed(EngineError),
}

/// An asynchronous, versioned, transactional key-value host engine.
pub trait HostEngine: Send + Sync {
    /// Open (or create) the named database at `version`.
    ///
    /// If the (name, version) pair has not been seen before, `upgrade` runs
    /// exactly once before the connection becomes usable; concurrent opens of
    /// the same name are serialized so only one caller's hook executes.
    /// Opening at a version below the existing one fails with
    /// [`EngineError::VersionMismatch`].
    fn open_database(
        &self,
        name: &str,
        version: u32,
        upgrade: UpgradeHook,
        done: Done<std::result::Result<Arc<dyn DatabaseHandle>, EngineError>>,
    );

    /// Delete the named database.
    ///
    /// Replies [`DeleteReply::Blocked`] while any connection to the database
    /// remains open; the caller is expected to close connections and re-issue
    /// the request.
    fn delete_database(&self, name: &str, done: Done<DeleteReply>);
}

/// Schema access available only inside an upgrade hook.
pub trait SchemaEditor {
    /// Whether the store already exists.
    fn has_store(&self, name: &str) -> bool;

    /// Create a store. Creating a store that already exists is an error;
    /// callers check [`SchemaEditor::has_store`] first.
    fn create_store(&mut self, name: &str) -> std::result::Result<(), EngineError>;
}

/// A live handle to an opened database.
///
/// Handles are shared ([`Arc`]); any number of operations may hold one
/// concurrently. Closing is idempotent.
pub trait DatabaseHandle: Send + Sync {
    /// The database name.
    fn name(&self) -> &str;

    /// Names of every store in the database, ascending.
    fn store_names(&self) -> Vec<String>;

    /// Begin a transaction scoped to one store.
    fn begin(
        &self,
        store: &str,
        mode: TransactionMode,
    ) -> std::result::Result<Box<dyn StoreTransaction>, EngineError>;

    /// Close the connection. Closing twice is a no-op.
    fn close(&self);

    /// Whether the connection is still open.
    fn is_open(&self) -> bool;
}

/// A transaction over a single store.
///
/// Requests are ordered by issuance. Mutations are buffered and published
/// atomically by [`StoreTransaction::commit`]; a transaction dropped without
/// committing publishes nothing.
pub trait StoreTransaction: Send {
    /// Put `value` at `key`. Fails with [`EngineError::ReadOnly`] in a
    /// read-only transaction.
    fn put(&mut self, key: Key, value: Value, done: Done<std::result::Result<(), EngineError>>);

    /// Read the value at `key`; `None` if no entry exists.
    fn get(&mut self, key: &Key, done: Done<std::result::Result<Option<Value>, EngineError>>);

    /// Remove every entry in the store.
    fn clear(&mut self, done: Done<std::result::Result<(), EngineError>>);

    /// Open a cursor over all entries of the store.
    fn open_cursor(&mut self, done: Done<std::result::Result<Box<dyn StoreCursor>, EngineError>>);

    /// Commit the transaction, publishing buffered mutations.
    fn commit(self: Box<Self>, done: Done<std::result::Result<(), EngineError>>);
}

/// A forward-only cursor over a store's entries in ascending key order.
///
/// Cursors are transient: they live inside one transaction and are restarted
/// from the beginning by each operation that needs one.
pub trait StoreCursor: Send {
    /// Advance to the next entry and deliver it; `None` once exhausted.
    fn step(&mut self, done: Done<std::result::Result<Option<Entry>, EngineError>>);

    /// Delete the entry at the current position. Fails with
    /// [`EngineError::CursorNotPositioned`] before the first step and with
    /// [`EngineError::ReadOnly`] in a read-only transaction.
    fn remove(&mut self, done: Done<std::result::Result<(), EngineError>>);
}

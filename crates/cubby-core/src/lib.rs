//! cubbydb Core Library
//!
//! This crate provides the fundamental types, the error taxonomy, and the
//! host engine contract for cubbydb.
//!
//! # Modules
//!
//! - `key` - Entry keys and key sets
//! - `error` - Error types and result aliases
//! - `protocol` - The callback-driven host engine contract

pub mod error;
pub mod key;
pub mod protocol;

pub use error::{EngineError, Error, Result};
pub use key::{Key, KeySet};
pub use protocol::{
    DatabaseHandle, DeleteReply, Done, Entry, HostEngine, SchemaEditor, StoreCursor,
    StoreTransaction, TransactionMode, UpgradeHook, Value, DB_VERSION,
};

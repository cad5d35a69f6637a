//! cubbydb - Promise-style storage over a versioned key-value host engine
//!
//! This is the main library crate that re-exports all cubbydb components.
//!
//! # Example
//!
//! ```
//! use cubbydb::Cubby;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> cubbydb::Result<()> {
//! let cubby = Cubby::in_memory();
//! cubby.create("pantry", &["fruit", "veg"]).await?;
//!
//! let fruit = cubby.store("pantry", "fruit");
//! fruit.set_entries(&serde_json::json!({ "a": "apple", "b": "banana" })).await?;
//! let picked: Option<String> = fruit.get("a").await?;
//! assert_eq!(picked.as_deref(), Some("apple"));
//!
//! cubby.delete("pantry").await?;
//! # Ok(())
//! # }
//! ```

pub use cubby_core as core;
pub use cubby_engine as engine;
pub use cubby_store as store;

// Re-export commonly used types
pub use cubby_core::{
    DatabaseHandle, DeleteReply, EngineError, Entry, Error, HostEngine, Key, KeySet, Result,
    SchemaEditor, StoreCursor, StoreTransaction, TransactionMode, Value, DB_VERSION,
};

pub use cubby_engine::MemoryEngine;
pub use cubby_store::{Connection, ConnectionManager, Cubby, RetryPolicy, StoreHandle};

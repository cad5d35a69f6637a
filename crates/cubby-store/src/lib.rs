//! cubbydb Convenience Layer
//!
//! Adapts the host engine's callback protocol into a future-based surface:
//! declare a database with a fixed set of stores, then put/get/delete/clear
//! entries through [`Cubby`] and [`StoreHandle`].
//!
//! # Modules
//!
//! - `manager` - Connection lifecycle and the process-wide registry
//! - `deletion` - Blocked-deletion retry coordination
//! - `db` - The public operation surface
//!
//! Internally, every operation issues its host requests through one awaited
//! adapter and runs inside a single host transaction per call.

pub mod db;
pub mod deletion;
pub mod manager;

mod awaited;
mod cursor;
mod ops;

pub use db::{Cubby, StoreHandle};
pub use deletion::RetryPolicy;
pub use manager::{Connection, ConnectionManager};

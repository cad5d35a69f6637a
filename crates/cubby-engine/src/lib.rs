//! cubbydb Reference Engine
//!
//! An in-process implementation of the host engine contract defined in
//! `cubby-core`. Real deployments may wire the convenience layer to a
//! platform-provided engine instead; this one exists so the layer is usable
//! and testable standalone.

pub mod memory;

pub use memory::MemoryEngine;

//! Transport implementations.
//!
//! This module provides the reference in-memory implementation of the
//! domain-level `Transport` trait and the runner that connects a transport
//! to a correlation engine.
//!
//! Domain code must not depend on transport-specific types.

mod memory;
pub mod runner;

pub use memory::create_memory_pair;

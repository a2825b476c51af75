//! Cluster bus implementations.
//!
//! [`TcpBus`] is the production client for the local bus endpoint;
//! [`MemoryBus`] backs tests and simulation with the same trait surface.

mod memory;
mod tcp;

pub use memory::{MemoryBus, PublishedEvent};
pub use tcp::TcpBus;

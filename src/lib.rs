//! quorumkv - Quorum-Replicated Key-Value Store
//!
//! A single leader accepts writes, stores them locally, and fans each write
//! out to a fixed set of followers concurrently. A write succeeds once a
//! configurable number of followers have acknowledged it; the leader stops
//! waiting on the rest at that point.
//!
//! # Architecture
//!
//! - [`store`]: in-memory key-value map present on every node
//! - [`replication`]: quorum coordinator, leader write path, follower apply path
//! - [`state`]: runtime-adjustable write quorum
//! - [`network`]: pooled HTTP transport from leader to followers
//! - [`api`]: HTTP API for both roles

pub mod api;
pub mod config;
pub mod error;
pub mod network;
pub mod replication;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, Role};
    pub use crate::error::{Error, Result};
    pub use crate::replication::{FollowerNode, LeaderNode, ReplicationRequest, WriteOutcome};
    pub use crate::state::QuorumState;
    pub use crate::store::KvStore;
}

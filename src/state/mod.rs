//! State Management Module
//!
//! Runtime-mutable cluster state owned by the leader.

mod quorum;

pub use quorum::{QuorumInfo, QuorumSnapshot, QuorumState, QuorumUpdate};

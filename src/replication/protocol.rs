//! Replication Protocol
//!
//! Messages exchanged between the leader and its followers, and the outcome
//! record produced by every leader write.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A single key/value pair shipped from the leader to one follower
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationRequest {
    pub key: String,
    pub value: String,
}

impl ReplicationRequest {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Follower acknowledgment body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationAck {
    pub status: String,
}

impl ReplicationAck {
    pub fn replicated() -> Self {
        Self {
            status: "replicated".to_string(),
        }
    }
}

/// Final status of a leader write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    /// Quorum of followers acknowledged
    Success,
    /// Stored on the leader, but too few followers acknowledged
    QuorumNotMet,
}

/// Result of one leader write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub status: WriteStatus,
    pub key: String,
    pub value: String,
    /// Followers that acknowledged before the leader stopped waiting
    pub acked: usize,
    pub total_followers: usize,
    /// Threshold this write was evaluated against
    pub quorum: usize,
    /// Time spent replicating (excludes the local put)
    pub latency: Duration,
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        self.status == WriteStatus::Success
    }
}

//! Write Quorum State
//!
//! Tracks the required acknowledgment count and the fixed follower list of a
//! leader. The threshold can be changed at runtime; the follower list cannot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Current quorum as reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumInfo {
    pub quorum: usize,
    pub total_followers: usize,
}

/// Result of a successful reconfiguration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumUpdate {
    pub old_quorum: usize,
    pub new_quorum: usize,
    pub total_followers: usize,
}

/// Point-in-time view used by a single write
#[derive(Debug, Clone)]
pub struct QuorumSnapshot {
    pub quorum: usize,
    pub followers: Arc<[String]>,
}

/// Runtime-adjustable write quorum
///
/// Invariant: `1 <= quorum <= followers.len()`.
#[derive(Debug)]
pub struct QuorumState {
    followers: Arc<[String]>,
    quorum: AtomicUsize,
}

impl QuorumState {
    /// Create quorum state, rejecting a threshold outside `1..=followers.len()`
    pub fn new(followers: Vec<String>, quorum: usize) -> Result<Self> {
        Self::check(quorum, followers.len())?;
        Ok(Self {
            followers: followers.into(),
            quorum: AtomicUsize::new(quorum),
        })
    }

    fn check(requested: usize, followers: usize) -> Result<()> {
        if requested < 1 || requested > followers {
            return Err(Error::InvalidQuorum { requested, followers });
        }
        Ok(())
    }

    /// Current threshold and follower count
    pub fn get_quorum(&self) -> QuorumInfo {
        QuorumInfo {
            quorum: self.quorum.load(Ordering::Acquire),
            total_followers: self.followers.len(),
        }
    }

    /// Change the threshold. On error the previous value is kept.
    pub fn set_quorum(&self, quorum: usize) -> Result<QuorumUpdate> {
        Self::check(quorum, self.followers.len())?;
        let old_quorum = self.quorum.swap(quorum, Ordering::AcqRel);

        tracing::info!("Write quorum updated: {} -> {}", old_quorum, quorum);

        Ok(QuorumUpdate {
            old_quorum,
            new_quorum: quorum,
            total_followers: self.followers.len(),
        })
    }

    /// Follower addresses
    pub fn followers(&self) -> &[String] {
        &self.followers
    }

    /// Capture the threshold and follower list for one write
    pub fn snapshot(&self) -> QuorumSnapshot {
        QuorumSnapshot {
            quorum: self.quorum.load(Ordering::Acquire),
            followers: Arc::clone(&self.followers),
        }
    }
}

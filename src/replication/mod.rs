//! Replication Module
//!
//! Handles write replication between the leader and its followers.

pub mod delay;
pub mod protocol;
mod follower;
mod leader;
mod quorum;

pub use delay::{DelayStrategy, FixedDelay, UniformDelay};
pub use follower::FollowerNode;
pub use leader::LeaderNode;
pub use protocol::{ReplicationAck, ReplicationRequest, WriteOutcome, WriteStatus};
pub use quorum::{QuorumCoordinator, QuorumReport};

/// Transport used by the leader to ship one request to one follower
///
/// `Ok(())` means the follower applied the write. Any error (unreachable,
/// timeout, non-success response) counts as "did not acknowledge".
#[async_trait::async_trait]
pub trait ReplicationClient: Send + Sync {
    async fn replicate(&self, follower: &str, request: &ReplicationRequest) -> crate::Result<()>;
}

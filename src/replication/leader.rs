//! Leader Node Implementation
//!
//! Handles leader responsibilities: applying writes locally, replicating them
//! to followers and deciding whether the write quorum was met.

use std::sync::Arc;

use tokio::time::Instant;

use super::protocol::{ReplicationRequest, WriteOutcome, WriteStatus};
use super::quorum::QuorumCoordinator;
use crate::error::{Error, Result};
use crate::state::{QuorumInfo, QuorumState, QuorumUpdate};
use crate::store::KvStore;

/// Leader node state
pub struct LeaderNode {
    /// Node ID
    node_id: String,
    /// Authoritative copy of the data
    store: Arc<KvStore>,
    /// Write quorum and follower list
    quorum: Arc<QuorumState>,
    /// Fan-out to followers
    coordinator: QuorumCoordinator,
}

impl LeaderNode {
    /// Create a new leader node
    pub fn new(
        node_id: String,
        store: Arc<KvStore>,
        quorum: Arc<QuorumState>,
        coordinator: QuorumCoordinator,
    ) -> Self {
        Self {
            node_id,
            store,
            quorum,
            coordinator,
        }
    }

    /// Accept a write request.
    ///
    /// The value is always stored locally first. If fewer than the configured
    /// number of followers acknowledge, `Error::QuorumNotMet` is returned with
    /// the full outcome; the local value stays in place.
    pub async fn write(&self, key: String, value: String) -> Result<WriteOutcome> {
        self.store.put(key.clone(), value.clone())?;

        let start = Instant::now();
        let snapshot = self.quorum.snapshot();
        let report = self
            .coordinator
            .replicate(
                &snapshot.followers,
                snapshot.quorum,
                ReplicationRequest::new(key.clone(), value.clone()),
            )
            .await;
        let latency = start.elapsed();

        let status = if report.acked >= snapshot.quorum {
            WriteStatus::Success
        } else {
            WriteStatus::QuorumNotMet
        };

        let outcome = WriteOutcome {
            status,
            key,
            value,
            acked: report.acked,
            total_followers: snapshot.followers.len(),
            quorum: snapshot.quorum,
            latency,
        };

        match status {
            WriteStatus::Success => {
                tracing::debug!(
                    "Write {} replicated to {}/{} followers in {:?}",
                    outcome.key,
                    outcome.acked,
                    outcome.total_followers,
                    outcome.latency
                );
                Ok(outcome)
            }
            WriteStatus::QuorumNotMet => {
                tracing::warn!(
                    "Write quorum not met for key {}: {}/{} confirmations ({} failed)",
                    outcome.key,
                    outcome.acked,
                    outcome.quorum,
                    report.failed
                );
                Err(Error::QuorumNotMet(Box::new(outcome)))
            }
        }
    }

    /// Read a key from the leader's store
    pub fn read(&self, key: &str) -> Result<String> {
        self.store.get(key)
    }

    /// Current write quorum
    pub fn get_quorum(&self) -> QuorumInfo {
        self.quorum.get_quorum()
    }

    /// Change the write quorum for subsequent writes
    pub fn set_quorum(&self, quorum: usize) -> Result<QuorumUpdate> {
        self.quorum.set_quorum(quorum)
    }

    /// Follower addresses
    pub fn followers(&self) -> &[String] {
        self.quorum.followers()
    }

    /// Get this node's ID
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn store(&self) -> &Arc<KvStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::replication::{FixedDelay, FollowerNode, ReplicationClient};

    /// Delivers requests straight to in-process followers
    struct InProcessClient {
        followers: HashMap<String, Arc<FollowerNode>>,
        unreachable: HashSet<String>,
    }

    #[async_trait]
    impl ReplicationClient for InProcessClient {
        async fn replicate(&self, follower: &str, request: &ReplicationRequest) -> Result<()> {
            if self.unreachable.contains(follower) {
                return Err(Error::ConnectionFailed {
                    address: follower.to_string(),
                    reason: "connection refused".into(),
                });
            }
            let node = self
                .followers
                .get(follower)
                .map(Arc::clone)
                .ok_or_else(|| Error::Replication(format!("unknown follower {}", follower)))?;
            let request = request.clone();
            // Runs detached, like a remote node: aborting the caller does not stop it
            tokio::spawn(async move { node.replicate(request).await })
                .await
                .map_err(|e| Error::Internal(e.to_string()))?
        }
    }

    struct Cluster {
        leader: LeaderNode,
        followers: Vec<Arc<FollowerNode>>,
    }

    fn cluster(delays_ms: &[u64], unreachable: &[usize], quorum: usize) -> Cluster {
        let mut followers = Vec::new();
        let mut by_address = HashMap::new();
        let mut addresses = Vec::new();
        for (i, delay) in delays_ms.iter().enumerate() {
            let address = format!("http://follower{}:800{}", i + 1, i + 1);
            let node = Arc::new(FollowerNode::new(
                format!("follower{}", i + 1),
                Arc::new(KvStore::new()),
                Arc::new(FixedDelay(Duration::from_millis(*delay))),
            ));
            by_address.insert(address.clone(), Arc::clone(&node));
            addresses.push(address);
            followers.push(node);
        }
        let unreachable = unreachable.iter().map(|i| addresses[*i].clone()).collect();

        let client = Arc::new(InProcessClient { followers: by_address, unreachable });
        let leader = LeaderNode::new(
            "leader".to_string(),
            Arc::new(KvStore::new()),
            Arc::new(QuorumState::new(addresses, quorum).unwrap()),
            QuorumCoordinator::new(client),
        );

        Cluster { leader, followers }
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_success() {
        let c = cluster(&[10, 10, 10], &[], 2);

        let outcome = c.leader.write("a".into(), "1".into()).await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.acked, 2);
        assert_eq!(outcome.total_followers, 3);
        assert_eq!(outcome.quorum, 2);
        assert_eq!(c.leader.read("a").unwrap(), "1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_termination_latency() {
        let c = cluster(&[50, 50, 50, 5000, 5000], &[], 3);

        let outcome = c.leader.write("a".into(), "1".into()).await.unwrap();

        assert_eq!(outcome.acked, 3);
        assert!(outcome.latency < Duration::from_secs(1), "latency {:?}", outcome.latency);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shortfall_keeps_leader_value() {
        let c = cluster(&[10, 10, 10, 10, 10], &[4], 5);

        let err = c.leader.write("a".into(), "1".into()).await.unwrap_err();

        match err {
            Error::QuorumNotMet(outcome) => {
                assert_eq!(outcome.status, WriteStatus::QuorumNotMet);
                assert_eq!(outcome.acked, 4);
                assert_eq!(outcome.total_followers, 5);
                assert_eq!(outcome.quorum, 5);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(c.leader.read("a").unwrap(), "1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_followers_unreachable() {
        let c = cluster(&[0, 0, 0], &[0, 1, 2], 1);

        let err = c.leader.write("k".into(), "v".into()).await.unwrap_err();

        assert!(matches!(err, Error::QuorumNotMet(ref o) if o.acked == 0));
        assert_eq!(c.leader.read("k").unwrap(), "v");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigured_quorum_applies_to_next_write() {
        let c = cluster(&[10, 10, 10, 10], &[], 1);

        assert!(c.leader.set_quorum(0).is_err());
        assert!(c.leader.set_quorum(5).is_err());
        assert_eq!(c.leader.get_quorum().quorum, 1);

        c.leader.set_quorum(4).unwrap();
        let outcome = c.leader.write("a".into(), "1".into()).await.unwrap();

        assert_eq!(outcome.quorum, 4);
        assert_eq!(outcome.acked, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_followers_eventually_converge() {
        let c = cluster(&[10, 10, 400, 900], &[], 2);

        let outcome = c.leader.write("a".into(), "1".into()).await.unwrap();
        assert_eq!(outcome.acked, 2);
        assert!(outcome.latency < Duration::from_millis(400));
        assert!(c.followers[3].store().get("a").is_err());

        tokio::time::sleep(Duration::from_secs(1)).await;
        for follower in &c.followers {
            assert_eq!(follower.store().get("a").unwrap(), "1");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_writes() {
        let c = Arc::new(cluster(&[5, 15, 25], &[], 2));

        let writes = (0..20).map(|i| {
            let c = Arc::clone(&c);
            async move { c.leader.write(format!("k{}", i), i.to_string()).await }
        });
        let results = futures::future::join_all(writes).await;

        assert!(results.iter().all(|r| r.as_ref().map(|o| o.acked == 2).unwrap_or(false)));
        assert_eq!(c.leader.store().len().unwrap(), 20);
        assert_eq!(c.followers[0].store().len().unwrap(), 20);
    }
}

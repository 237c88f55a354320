//! Follower Node Implementation
//!
//! Receives replicated writes from the leader, waits for the injected delay,
//! then applies them to the local store.

use std::sync::Arc;

use super::delay::DelayStrategy;
use super::protocol::ReplicationRequest;
use crate::error::Result;
use crate::store::KvStore;

/// Follower node state
pub struct FollowerNode {
    /// Node ID
    node_id: String,
    /// Local copy of the data
    store: Arc<KvStore>,
    /// Latency injected before each apply
    delay: Arc<dyn DelayStrategy>,
}

impl FollowerNode {
    /// Create a new follower node
    pub fn new(node_id: String, store: Arc<KvStore>, delay: Arc<dyn DelayStrategy>) -> Self {
        Self { node_id, store, delay }
    }

    /// Apply a replicated write.
    ///
    /// Returns only after the value is in the local store, so a success
    /// response to the leader always means "applied here".
    pub async fn replicate(&self, request: ReplicationRequest) -> Result<()> {
        let delay = self.delay.delay(&request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        tracing::debug!(
            "Follower {} applying key {} after {:?}",
            self.node_id,
            request.key,
            delay
        );

        if let Err(e) = self.store.put(request.key, request.value) {
            tracing::error!("Follower {} failed to apply write: {}", self.node_id, e);
            return Err(e);
        }
        Ok(())
    }

    /// Get this node's ID
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn store(&self) -> &Arc<KvStore> {
        &self.store
    }
}

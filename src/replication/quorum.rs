//! Quorum Coordinator
//!
//! Fans a write out to every follower at once and returns as soon as enough of
//! them have acknowledged. Calls still in flight at that point are aborted;
//! a follower that already received the request may still apply it.

use std::sync::Arc;

use tokio::task::JoinSet;

use super::{ReplicationClient, ReplicationRequest};

/// Tally of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuorumReport {
    /// Followers that acknowledged
    pub acked: usize,
    /// Followers that failed, timed out or panicked
    pub failed: usize,
    /// Calls still pending when quorum was reached
    pub abandoned: usize,
}

/// Drives replication of one write to a follower set
pub struct QuorumCoordinator {
    client: Arc<dyn ReplicationClient>,
}

impl QuorumCoordinator {
    pub fn new(client: Arc<dyn ReplicationClient>) -> Self {
        Self { client }
    }

    /// Replicate `request` to `followers`, stopping once `quorum` have acked.
    ///
    /// Never fails: follower errors are logged and counted. A report with
    /// `acked < quorum` means every call finished without reaching quorum.
    pub async fn replicate(
        &self,
        followers: &[String],
        quorum: usize,
        request: ReplicationRequest,
    ) -> QuorumReport {
        let request = Arc::new(request);
        let mut calls = JoinSet::new();

        for follower in followers {
            let client = Arc::clone(&self.client);
            let request = Arc::clone(&request);
            let follower = follower.clone();
            calls.spawn(async move {
                let result = client.replicate(&follower, &request).await;
                (follower, result)
            });
        }

        let mut report = QuorumReport::default();

        while report.acked < quorum {
            match calls.join_next().await {
                Some(Ok((follower, Ok(())))) => {
                    report.acked += 1;
                    tracing::debug!(
                        "Follower {} acknowledged key {} ({}/{})",
                        follower,
                        request.key,
                        report.acked,
                        quorum
                    );
                }
                Some(Ok((follower, Err(e)))) => {
                    report.failed += 1;
                    tracing::warn!("Error replicating to {}: {}", follower, e);
                }
                Some(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!("Replication task failed: {}", e);
                }
                None => break,
            }
        }

        report.abandoned = calls.len();
        if report.abandoned > 0 {
            tracing::debug!(
                "Quorum reached for key {}, cancelling {} pending replication calls",
                request.key,
                report.abandoned
            );
        }
        calls.abort_all();

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use crate::error::{Error, Result};

    #[derive(Clone, Copy)]
    struct Behavior {
        delay: Duration,
        ok: bool,
    }

    /// Scripted follower responses keyed by address
    #[derive(Default)]
    struct ScriptedClient {
        behaviors: HashMap<String, Behavior>,
        calls: HashMap<String, AtomicUsize>,
        completed: HashMap<String, AtomicUsize>,
    }

    impl ScriptedClient {
        fn new(script: &[(u64, bool)]) -> (Self, Vec<String>) {
            let mut client = ScriptedClient::default();
            let mut followers = Vec::new();
            for (i, (delay_ms, ok)) in script.iter().enumerate() {
                let name = format!("follower-{}", i + 1);
                client.behaviors.insert(
                    name.clone(),
                    Behavior { delay: Duration::from_millis(*delay_ms), ok: *ok },
                );
                client.calls.insert(name.clone(), AtomicUsize::new(0));
                client.completed.insert(name.clone(), AtomicUsize::new(0));
                followers.push(name);
            }
            (client, followers)
        }

        fn calls(&self, follower: &str) -> usize {
            self.calls[follower].load(Ordering::SeqCst)
        }

        fn completed(&self, follower: &str) -> usize {
            self.completed[follower].load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReplicationClient for ScriptedClient {
        async fn replicate(&self, follower: &str, _request: &ReplicationRequest) -> Result<()> {
            self.calls[follower].fetch_add(1, Ordering::SeqCst);
            let behavior = self.behaviors[follower];
            tokio::time::sleep(behavior.delay).await;
            self.completed[follower].fetch_add(1, Ordering::SeqCst);
            if behavior.ok {
                Ok(())
            } else {
                Err(Error::ConnectionFailed {
                    address: follower.to_string(),
                    reason: "connection refused".into(),
                })
            }
        }
    }

    fn coordinator(client: &Arc<ScriptedClient>) -> QuorumCoordinator {
        QuorumCoordinator::new(Arc::clone(client) as Arc<dyn ReplicationClient>)
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_after_fastest_quorum() {
        let (client, followers) = ScriptedClient::new(&[
            (50, true),
            (50, true),
            (50, true),
            (5000, true),
            (5000, true),
        ]);
        let client = Arc::new(client);

        let start = Instant::now();
        let report = coordinator(&client)
            .replicate(&followers, 3, ReplicationRequest::new("a", "1"))
            .await;
        let elapsed = start.elapsed();

        assert_eq!(report.acked, 3);
        assert_eq!(report.abandoned, 2);
        assert!(elapsed < Duration::from_secs(1), "waited {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_calls_are_aborted() {
        let (client, followers) = ScriptedClient::new(&[(10, true), (10_000, true)]);
        let client = Arc::new(client);

        let report = coordinator(&client)
            .replicate(&followers, 1, ReplicationRequest::new("a", "1"))
            .await;
        assert_eq!(report.acked, 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.calls("follower-2"), 1);
        assert_eq!(client.completed("follower-2"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shortfall_when_followers_fail() {
        let (client, followers) = ScriptedClient::new(&[
            (10, true),
            (10, true),
            (10, true),
            (10, true),
            (20, false),
        ]);
        let client = Arc::new(client);

        let report = coordinator(&client)
            .replicate(&followers, 5, ReplicationRequest::new("a", "1"))
            .await;

        assert_eq!(report, QuorumReport { acked: 4, failed: 1, abandoned: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_not_retried() {
        let (client, followers) = ScriptedClient::new(&[(5, false), (5, false), (30, true)]);
        let client = Arc::new(client);

        let report = coordinator(&client)
            .replicate(&followers, 2, ReplicationRequest::new("a", "1"))
            .await;

        assert_eq!(report.acked, 1);
        assert_eq!(report.failed, 2);
        for follower in &followers {
            assert_eq!(client.calls(follower), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_quorum_equal_to_followers_waits_for_all() {
        let (client, followers) = ScriptedClient::new(&[(10, true), (200, true), (400, true)]);
        let client = Arc::new(client);

        let start = Instant::now();
        let report = coordinator(&client)
            .replicate(&followers, 3, ReplicationRequest::new("a", "1"))
            .await;

        assert_eq!(report.acked, 3);
        assert_eq!(report.abandoned, 0);
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_empty_follower_list() {
        let (client, _) = ScriptedClient::new(&[]);
        let client = Arc::new(client);

        let report = coordinator(&client)
            .replicate(&[], 1, ReplicationRequest::new("a", "1"))
            .await;

        assert_eq!(report, QuorumReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_failure_does_not_block_quorum() {
        let (client, followers) = ScriptedClient::new(&[(60_000, false), (20, true), (30, true)]);
        let client = Arc::new(client);

        let start = Instant::now();
        let report = coordinator(&client)
            .replicate(&followers, 2, ReplicationRequest::new("a", "1"))
            .await;

        assert_eq!(report.acked, 2);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}

//! Network Client
//!
//! HTTP client the leader uses to push writes to followers. One pooled
//! `reqwest::Client` is shared by every write; a semaphore caps the number of
//! replication requests in flight at once.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::replication::{ReplicationClient, ReplicationRequest};

/// Replication transport over HTTP (`POST {follower}/replicate`)
pub struct HttpReplicationClient {
    client: reqwest::Client,
    in_flight: Arc<Semaphore>,
}

impl HttpReplicationClient {
    /// Create a client from the replication section of the node config
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(config.replication.max_idle_per_host)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            in_flight: Arc::new(Semaphore::new(config.replication.max_connections)),
        })
    }

    /// Permits currently free
    pub fn available_permits(&self) -> usize {
        self.in_flight.available_permits()
    }
}

#[async_trait]
impl ReplicationClient for HttpReplicationClient {
    async fn replicate(&self, follower: &str, request: &ReplicationRequest) -> Result<()> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|_| Error::Internal("replication semaphore closed".into()))?;

        let url = format!("{}/replicate", follower);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| map_request_error(follower, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Replication(format!(
                "{} answered {} for key {}",
                follower, status, request.key
            )));
        }

        Ok(())
    }
}

fn map_request_error(address: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::ConnectionTimeout(address.to_string())
    } else if e.is_connect() {
        Error::ConnectionFailed {
            address: address.to_string(),
            reason: e.to_string(),
        }
    } else {
        Error::Network(e.to_string())
    }
}

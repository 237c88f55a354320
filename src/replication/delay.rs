//! Replication delay injection
//!
//! Followers wait for a strategy-chosen duration before applying each
//! replicated write, emulating variable network and processing latency.

use std::time::Duration;

use rand::Rng;

use super::ReplicationRequest;
use crate::error::{Error, Result};

/// Chooses how long a follower waits before applying a request
pub trait DelayStrategy: Send + Sync {
    fn delay(&self, request: &ReplicationRequest) -> Duration;
}

/// Uniformly random delay in `[min, max]` (inclusive)
#[derive(Debug, Clone, Copy)]
pub struct UniformDelay {
    min: Duration,
    max: Duration,
}

impl UniformDelay {
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(Error::Config(format!(
                "min delay {:?} exceeds max delay {:?}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Result<Self> {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }
}

impl DelayStrategy for UniformDelay {
    fn delay(&self, _request: &ReplicationRequest) -> Duration {
        let min = saturating_micros(self.min);
        let max = saturating_micros(self.max);
        if min == max {
            return self.min;
        }
        Duration::from_micros(rand::thread_rng().gen_range(min..=max))
    }
}

fn saturating_micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// Constant delay, mostly for tests and benchmarks
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDelay(pub Duration);

impl DelayStrategy for FixedDelay {
    fn delay(&self, _request: &ReplicationRequest) -> Duration {
        self.0
    }
}

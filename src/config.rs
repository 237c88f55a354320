//! quorumkv Configuration
//!
//! Node configuration is loaded from a TOML file and may be overridden by
//! environment variables (`NODE_ID`, `BIND_ADDRESS`, `FOLLOWERS`,
//! `WRITE_QUORUM`, `MIN_DELAY_MS`, `MAX_DELAY_MS`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main quorumkv configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Node-specific configuration
    pub node: NodeConfig,

    /// Follower set and write quorum (leader only)
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Replication transport and delay injection
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Role a node plays in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Leader,
    Follower,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Leader => write!(f, "leader"),
            Role::Follower => write!(f, "follower"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "leader" => Ok(Role::Leader),
            "follower" => Ok(Role::Follower),
            other => Err(Error::Config(format!("unknown role: {}", other))),
        }
    }
}

/// Node-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique node identifier
    pub id: String,

    /// Leader or follower
    pub role: Role,

    /// Address to bind the HTTP API to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Cluster configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Follower base URLs (`http://host:port`; scheme optional)
    #[serde(default)]
    pub followers: Vec<String>,

    /// Follower acknowledgments required for a successful write
    #[serde(default = "default_write_quorum")]
    pub write_quorum: usize,
}

/// Replication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Minimum injected follower delay in milliseconds
    #[serde(default)]
    pub min_delay_ms: u64,

    /// Maximum injected follower delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Per-call timeout for leader → follower requests
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// TCP connect timeout for leader → follower requests
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Maximum replication requests in flight across all followers
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Idle keep-alive connections kept per follower
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_write_quorum() -> usize {
    1
}

fn default_max_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_max_connections() -> usize {
    100
}

fn default_max_idle_per_host() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: default_max_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_connections: default_max_connections(),
            max_idle_per_host: default_max_idle_per_host(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Minimal configuration for a node with the given role
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            node: NodeConfig {
                id: id.into(),
                role,
                bind_address: default_bind_address(),
            },
            cluster: ClusterConfig::default(),
            replication: ReplicationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file, apply environment overrides and validate
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without overrides or validation
    pub fn parse_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("NODE_ID") {
            self.node.id = id;
        }
        if let Some(addr) = lookup("BIND_ADDRESS") {
            self.node.bind_address = addr;
        }
        if let Some(followers) = lookup("FOLLOWERS") {
            self.cluster.followers = followers
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(quorum) = lookup("WRITE_QUORUM") {
            self.cluster.write_quorum = parse_env("WRITE_QUORUM", &quorum)?;
        }
        if let Some(min) = lookup("MIN_DELAY_MS") {
            self.replication.min_delay_ms = parse_env("MIN_DELAY_MS", &min)?;
        }
        if let Some(max) = lookup("MAX_DELAY_MS") {
            self.replication.max_delay_ms = parse_env("MAX_DELAY_MS", &max)?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.node.id.is_empty() {
            return Err(Error::Config("node.id cannot be empty".into()));
        }

        if self.node.bind_address.is_empty() {
            return Err(Error::Config("node.bind_address cannot be empty".into()));
        }

        if self.replication.min_delay_ms > self.replication.max_delay_ms {
            return Err(Error::Config(format!(
                "replication.min_delay_ms ({}) exceeds replication.max_delay_ms ({})",
                self.replication.min_delay_ms, self.replication.max_delay_ms
            )));
        }

        if self.replication.request_timeout_ms == 0 {
            return Err(Error::Config("replication.request_timeout_ms must be positive".into()));
        }

        if self.replication.connect_timeout_ms == 0 {
            return Err(Error::Config("replication.connect_timeout_ms must be positive".into()));
        }

        if self.replication.max_connections == 0 {
            return Err(Error::Config("replication.max_connections must be positive".into()));
        }

        if self.node.role == Role::Leader {
            if self.cluster.followers.is_empty() {
                return Err(Error::Config("leader requires at least one follower".into()));
            }
            let followers = self.cluster.followers.len();
            if self.cluster.write_quorum < 1 || self.cluster.write_quorum > followers {
                return Err(Error::Config(format!(
                    "cluster.write_quorum must be between 1 and {}, got {}",
                    followers, self.cluster.write_quorum
                )));
            }
        }

        Ok(())
    }

    /// Follower base URLs with a scheme
    pub fn follower_urls(&self) -> Vec<String> {
        self.cluster
            .followers
            .iter()
            .map(|f| crate::network::normalize_base_url(f))
            .collect()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.replication.request_timeout_ms)
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.replication.connect_timeout_ms)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} is not a valid number: {:?}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const LEADER_TOML: &str = r#"
[node]
id = "leader"
role = "leader"
bind_address = "0.0.0.0:8000"

[cluster]
followers = ["http://127.0.0.1:8001", "127.0.0.1:8002", "127.0.0.1:8003"]
write_quorum = 2

[replication]
min_delay_ms = 5
max_delay_ms = 50
"#;

    #[test]
    fn test_parse_config() {
        let config = Config::from_str(LEADER_TOML).unwrap();
        assert_eq!(config.node.id, "leader");
        assert_eq!(config.node.role, Role::Leader);
        assert_eq!(config.cluster.followers.len(), 3);
        assert_eq!(config.cluster.write_quorum, 2);
        assert_eq!(config.replication.max_delay_ms, 50);
        assert_eq!(config.replication.max_connections, 100);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.follower_urls()[1], "http://127.0.0.1:8002");
    }

    #[test]
    fn test_follower_defaults() {
        let config = Config::from_str(
            r#"
[node]
id = "follower1"
role = "follower"
"#,
        )
        .unwrap();
        assert_eq!(config.node.bind_address, "0.0.0.0:8000");
        assert!(config.cluster.followers.is_empty());
        assert_eq!(config.replication.min_delay_ms, 0);
    }

    #[test]
    fn test_rejects_bad_quorum() {
        let toml = LEADER_TOML.replace("write_quorum = 2", "write_quorum = 4");
        assert!(matches!(Config::from_str(&toml), Err(Error::Config(_))));

        let toml = LEADER_TOML.replace("write_quorum = 2", "write_quorum = 0");
        assert!(Config::from_str(&toml).is_err());
    }

    #[test]
    fn test_rejects_inverted_delays() {
        let toml = LEADER_TOML.replace("min_delay_ms = 5", "min_delay_ms = 500");
        assert!(Config::from_str(&toml).is_err());
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        let mut config = Config::from_str(LEADER_TOML).unwrap();
        config.replication.connect_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(Error::Config(msg)) if msg.contains("connect_timeout_ms")));

        config.replication.connect_timeout_ms = 2_000;
        config.replication.request_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(Error::Config(msg)) if msg.contains("request_timeout_ms")));
    }

    #[test]
    fn test_rejects_unknown_role() {
        let toml = LEADER_TOML.replace("role = \"leader\"", "role = \"observer\"");
        assert!(matches!(Config::from_str(&toml), Err(Error::ConfigParse(_))));
        assert!("observer".parse::<Role>().is_err());
        assert_eq!("Follower".parse::<Role>().unwrap(), Role::Follower);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FOLLOWERS", "http://f1:8001, http://f2:8002,,"),
            ("WRITE_QUORUM", "2"),
            ("MAX_DELAY_MS", "250"),
            ("NODE_ID", "leader-b"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::new("leader", Role::Leader);
        config
            .apply_env_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.node.id, "leader-b");
        assert_eq!(config.cluster.followers, vec!["http://f1:8001", "http://f2:8002"]);
        assert_eq!(config.cluster.write_quorum, 2);
        assert_eq!(config.replication.max_delay_ms, 250);
        config.validate().unwrap();
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = Config::new("leader", Role::Leader);
        let result = config.apply_env_overrides(|name| {
            (name == "WRITE_QUORUM").then(|| "three".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LEADER_TOML.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.node.id, "leader");
    }
}

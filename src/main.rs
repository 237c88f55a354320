//! quorumkv - Quorum-Replicated Key-Value Store
//!
//! Runs a leader or follower node and a few configuration helpers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quorumkv::api::HttpServer;
use quorumkv::config::{Config, Role};
use quorumkv::error::{Error, Result};
use quorumkv::network::HttpReplicationClient;
use quorumkv::replication::{FollowerNode, LeaderNode, QuorumCoordinator, UniformDelay};
use quorumkv::state::QuorumState;
use quorumkv::store::KvStore;

/// quorumkv - Quorum-Replicated Key-Value Store
#[derive(Parser)]
#[command(name = "quorumkv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "quorumkv.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a node
    Start {
        /// Role to run as (required when no config file exists)
        #[arg(long)]
        role: Option<Role>,

        /// HTTP bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "quorumkv.toml")]
        output: PathBuf,

        /// Node ID
        #[arg(long, default_value = "leader")]
        node_id: String,

        /// Node role
        #[arg(long, default_value = "leader")]
        role: Role,
    },

    /// Validate configuration file
    Validate,

    /// Show node information
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { role, bind } => {
            let config = load_config(&cli.config, role, bind)?;
            init_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level));
            run_start(config).await
        }
        Commands::Init { output, node_id, role } => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"));
            run_init(output, node_id, role)
        }
        Commands::Validate => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"));
            run_validate(cli.config)
        }
        Commands::Info => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"));
            run_info(cli.config)
        }
    }
}

/// Initialize logging
fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the effective configuration: file (if present), CLI flags, environment
fn load_config(path: &Path, role: Option<Role>, bind: Option<String>) -> Result<Config> {
    let mut config = if path.exists() {
        Config::parse_file(path)?
    } else {
        let role = role.ok_or_else(|| {
            Error::Config(format!("{} not found; pass --role to start without one", path.display()))
        })?;
        Config::new(role.to_string(), role)
    };

    if let Some(role) = role {
        config.node.role = role;
    }
    if let Some(bind) = bind {
        config.node.bind_address = bind;
    }
    config.apply_env_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

/// Start the node
async fn run_start(config: Config) -> Result<()> {
    tracing::info!("Starting {} node {}...", config.node.role, config.node.id);

    let store = Arc::new(KvStore::new());
    let bind_address = config.node.bind_address.clone();

    let server = match config.node.role {
        Role::Leader => {
            let followers = config.follower_urls();
            tracing::info!("Leader initialized with {} followers: {:?}", followers.len(), followers);
            tracing::info!(
                "Write quorum: {}, request timeout: {:?}, max in-flight replications: {}",
                config.cluster.write_quorum,
                config.request_timeout(),
                config.replication.max_connections
            );

            let quorum = Arc::new(QuorumState::new(followers, config.cluster.write_quorum)?);
            let client = Arc::new(HttpReplicationClient::new(&config)?);
            let leader = Arc::new(LeaderNode::new(
                config.node.id.clone(),
                store,
                quorum,
                QuorumCoordinator::new(client),
            ));
            HttpServer::leader(bind_address, leader)
        }
        Role::Follower => {
            tracing::info!(
                "Follower {} delay range: [{}ms, {}ms]",
                config.node.id,
                config.replication.min_delay_ms,
                config.replication.max_delay_ms
            );

            let delay = Arc::new(UniformDelay::from_millis(
                config.replication.min_delay_ms,
                config.replication.max_delay_ms,
            )?);
            let follower = Arc::new(FollowerNode::new(config.node.id.clone(), store, delay));
            HttpServer::follower(bind_address, follower)
        }
    };

    tokio::select! {
        result = server.start() => {
            if let Err(e) = result {
                tracing::error!("HTTP server error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
    }

    Ok(())
}

/// Initialize configuration file
fn run_init(output: PathBuf, node_id: String, role: Role) -> Result<()> {
    let cluster = match role {
        Role::Leader => {
            r#"[cluster]
followers = ["http://127.0.0.1:8001", "http://127.0.0.1:8002", "http://127.0.0.1:8003"]
write_quorum = 2
"#
        }
        Role::Follower => {
            r#"# [cluster] is only read by the leader
"#
        }
    };
    let bind_address = match role {
        Role::Leader => "0.0.0.0:8000",
        Role::Follower => "0.0.0.0:8001",
    };

    let config_content = format!(
        r#"# quorumkv Configuration
# Generated configuration file

[node]
id = "{node_id}"
role = "{role}"
bind_address = "{bind_address}"

{cluster}
[replication]
# Injected follower latency, drawn uniformly per request
min_delay_ms = 0
max_delay_ms = 1000
# Leader -> follower transport
request_timeout_ms = 10000
connect_timeout_ms = 2000
max_connections = 100
max_idle_per_host = 10

[logging]
level = "info"
"#
    );

    std::fs::write(&output, config_content)?;
    println!("Configuration file created: {}", output.display());
    println!("Then start with: quorumkv --config {} start", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: PathBuf) -> Result<()> {
    match Config::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Node ID: {}", config.node.id);
            println!("  Role: {}", config.node.role);
            println!("  Bind Address: {}", config.node.bind_address);
            if config.node.role == Role::Leader {
                println!("  Followers: {}", config.cluster.followers.len());
                println!("  Write Quorum: {}", config.cluster.write_quorum);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Show node information
fn run_info(config_path: PathBuf) -> Result<()> {
    let config = Config::from_file(&config_path)?;

    println!("quorumkv Node Information");
    println!("=========================");
    println!();
    println!("Node ID:          {}", config.node.id);
    println!("Role:             {}", config.node.role);
    println!("Bind Address:     {}", config.node.bind_address);
    println!();
    if config.node.role == Role::Leader {
        println!("Cluster Configuration:");
        println!("  Followers:      {:?}", config.follower_urls());
        println!("  Write Quorum:   {}", config.cluster.write_quorum);
        println!();
    }
    println!("Replication Configuration:");
    println!(
        "  Delay Range:    [{} ms, {} ms]",
        config.replication.min_delay_ms, config.replication.max_delay_ms
    );
    println!("  Timeout:        {} ms", config.replication.request_timeout_ms);
    println!("  Connect:        {} ms", config.replication.connect_timeout_ms);
    println!("  Max In-Flight:  {}", config.replication.max_connections);
    println!("  Idle Per Host:  {}", config.replication.max_idle_per_host);

    Ok(())
}

//! kvctl - Command line client for quorumkv nodes
//!
//! Usage:
//!   kvctl put <key> <value>  - Write through the leader
//!   kvctl get <key>          - Read from any node
//!   kvctl keys               - List keys on a node
//!   kvctl state              - Dump a node's store
//!   kvctl health             - Node health
//!   kvctl quorum [N]         - Show or change the leader's write quorum

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

use quorumkv::api::{
    ErrorResponse, HealthResponse, KeyValueResponse, KeysResponse, QuorumShortfallResponse,
    QuorumUpdateRequest, QuorumUpdateResponse, StateResponse, WriteRequest, WriteResponse,
};
use quorumkv::state::QuorumInfo;

/// quorumkv Control Tool
#[derive(Parser)]
#[command(name = "kvctl")]
#[command(about = "Read, write and reconfigure quorumkv nodes", long_about = None)]
struct Cli {
    /// Node API endpoint
    #[arg(short, long, default_value = "http://127.0.0.1:8000")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a key through the leader
    Put { key: String, value: String },
    /// Read a key
    Get { key: String },
    /// List keys
    Keys,
    /// Dump the node's full store
    State,
    /// Show node health
    Health,
    /// Show the write quorum, or set it when N is given
    Quorum { quorum: Option<usize> },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let endpoint = quorumkv::network::normalize_base_url(&cli.endpoint);
    let client = reqwest::Client::new();

    let result = match &cli.command {
        Commands::Put { key, value } => put(&client, &endpoint, key, value).await,
        Commands::Get { key } => get(&client, &endpoint, key).await,
        Commands::Keys => keys(&client, &endpoint).await,
        Commands::State => state(&client, &endpoint).await,
        Commands::Health => health(&client, &endpoint).await,
        Commands::Quorum { quorum } => quorum_cmd(&client, &endpoint, *quorum).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Decode a success body, or turn an API error body into an error
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, Box<dyn std::error::Error>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.text().await?;
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => Err(format!("{} ({}): {}", status, err.code, err.error).into()),
        Err(_) => Err(format!("API error: {} {}", status, body).into()),
    }
}

/// `{endpoint}/keys/{key}` with the key encoded as a single path segment
fn key_url(endpoint: &str, key: &str) -> Result<reqwest::Url, Box<dyn std::error::Error>> {
    let mut url = reqwest::Url::parse(endpoint)?;
    url.path_segments_mut()
        .map_err(|_| format!("invalid endpoint: {}", endpoint))?
        .pop_if_empty()
        .push("keys")
        .push(key);
    Ok(url)
}

// ============ Commands ============

async fn put(client: &reqwest::Client, endpoint: &str, key: &str, value: &str) -> CliResult {
    let response = client
        .post(format!("{}/keys", endpoint))
        .json(&WriteRequest { key: key.to_string(), value: value.to_string() })
        .send()
        .await?;

    if response.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
        let body = response.text().await?;
        if let Ok(shortfall) = serde_json::from_str::<QuorumShortfallResponse>(&body) {
            println!(
                "\x1b[33mStored on leader, quorum not met\x1b[0m: {}/{} acks ({} followers, {:.1} ms)",
                shortfall.outcome.replicated_to,
                shortfall.outcome.write_quorum,
                shortfall.outcome.total_followers,
                shortfall.outcome.latency_seconds * 1000.0
            );
            return Err("write quorum not met".into());
        }
        return Err(format!("API error: 503 {}", body).into());
    }

    let written: WriteResponse = decode(response).await?;
    println!(
        "\x1b[32mOK\x1b[0m {} = {}  ({}/{} acks, quorum {}, {:.1} ms)",
        written.key,
        written.value,
        written.replicated_to,
        written.total_followers,
        written.write_quorum,
        written.latency_seconds * 1000.0
    );
    Ok(())
}

async fn get(client: &reqwest::Client, endpoint: &str, key: &str) -> CliResult {
    let response = client.get(key_url(endpoint, key)?).send().await?;
    let kv: KeyValueResponse = decode(response).await?;
    println!("{}", kv.value);
    Ok(())
}

async fn keys(client: &reqwest::Client, endpoint: &str) -> CliResult {
    let response = client.get(format!("{}/keys", endpoint)).send().await?;
    let mut listing: KeysResponse = decode(response).await?;
    listing.keys.sort();
    for key in listing.keys {
        println!("{}", key);
    }
    Ok(())
}

async fn state(client: &reqwest::Client, endpoint: &str) -> CliResult {
    let response = client.get(format!("{}/state", endpoint)).send().await?;
    let state: StateResponse = decode(response).await?;

    println!();
    println!("Node {} ({} keys)", state.node_id, state.keys_count);
    println!("{}", "-".repeat(40));

    let mut entries: Vec<_> = state.store.into_iter().collect();
    entries.sort();
    for (key, value) in entries {
        println!("{:<20} {}", key, value);
    }
    println!();
    Ok(())
}

async fn health(client: &reqwest::Client, endpoint: &str) -> CliResult {
    let response = client.get(format!("{}/health", endpoint)).send().await?;
    let health: HealthResponse = decode(response).await?;
    println!("{} ({}): {}", health.node_id, health.role, health.status);
    Ok(())
}

async fn quorum_cmd(client: &reqwest::Client, endpoint: &str, quorum: Option<usize>) -> CliResult {
    let url = format!("{}/config/quorum", endpoint);

    match quorum {
        None => {
            let info: QuorumInfo = decode(client.get(&url).send().await?).await?;
            println!("Write quorum: {}/{} followers", info.quorum, info.total_followers);
        }
        Some(quorum) => {
            let response = client.post(&url).json(&QuorumUpdateRequest { quorum }).send().await?;
            let updated: QuorumUpdateResponse = decode(response).await?;
            println!(
                "Write quorum updated: {} -> {} ({} followers)",
                updated.update.old_quorum, updated.update.new_quorum, updated.update.total_followers
            );
        }
    }
    Ok(())
}

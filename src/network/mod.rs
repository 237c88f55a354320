//! Network Module
//!
//! HTTP transport between the leader and its followers.

mod client;

pub use client::HttpReplicationClient;

/// Add `http://` to an address that has no scheme and drop a trailing slash
pub fn normalize_base_url(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

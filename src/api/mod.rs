//! HTTP API Module
//!
//! Provides the REST API for both leader and follower nodes.

mod http;

pub use http::{
    ErrorResponse, HealthResponse, HttpServer, KeyValueResponse, KeysResponse,
    QuorumShortfallResponse, QuorumUpdateRequest, QuorumUpdateResponse, RootResponse,
    StateResponse, WriteRequest, WriteResponse,
};

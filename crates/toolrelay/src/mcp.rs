//! Remote MCP tool server access over streamable HTTP
//!
//! `client` holds the session the orchestrator uses. `probe` and `proxy` speak raw
//! JSON-RPC over HTTP for diagnostics and for bridging stdio-only hosts.
pub mod client;
pub mod http;
pub mod probe;
pub mod proxy;
pub mod types;

pub use client::McpToolServer;

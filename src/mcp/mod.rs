//! Remote tools over MCP (Model Context Protocol).
//!
//! The client side is always built: endpoint discovery and the bridge that
//! turns a server's tools into synchronous capabilities. The reference
//! filesystem server that the bridge talks to is behind the `fs-server`
//! feature.
//!
//! ```text
//! MCP_SERVER_URLS ──▶ discover_endpoints ──▶ McpBridge::connect
//!                                              │ first reachable endpoint
//!                                              ▼
//!                     agent loop ◀── get_callables (4 sync wrappers)
//!                                              │ list_all_tools + call_tool
//!                                              ▼
//!                                   FilesystemServer (/mcp)
//! ```

pub mod bridge;
pub mod endpoint;
pub mod params;
#[cfg(feature = "fs-server")]
pub mod server;
#[cfg(feature = "fs-server")]
pub mod transport;

pub use bridge::{Connection, McpBridge};
pub use endpoint::{discover_endpoints, normalize_endpoint};
pub use params::RemoteTool;
#[cfg(feature = "fs-server")]
pub use server::{FilesystemServer, Sandbox};
#[cfg(feature = "fs-server")]
pub use transport::{serve_http, serve_http_on, serve_stdio};

//! Remote tool bridge.
//!
//! Connects to the first reachable MCP server among the configured endpoints
//! and exposes its filesystem tools as synchronous [`Capability`] values.
//! Every network round-trip is driven to completion on the shared
//! [`BlockingRuntime`]; callers get either the tool's text or an error
//! string, never a future and never an `Err` that escapes the wrapper.

use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use rmcp::model::{CallToolRequestParams, CallToolResult, Tool};
use rmcp::service::RunningService;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::{RoleClient, ServiceExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::endpoint::normalize_endpoint;
use super::params::RemoteTool;
use crate::agent::tool::{Capability, CapabilitySource, ToolDefinition};
use crate::config::Settings;
use crate::error::BridgeError;
use crate::runtime::BlockingRuntime;

/// A live session with one remote tool server.
pub struct Connection {
    endpoint: String,
    advertised: Vec<String>,
    service: RunningService<RoleClient, ()>,
}

impl Connection {
    /// Normalized endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Tool names the server listed when the session was established.
    #[must_use]
    pub fn advertised(&self) -> &[String] {
        &self.advertised
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("advertised", &self.advertised)
            .finish_non_exhaustive()
    }
}

/// Bridges remote MCP tools into the synchronous agent loop.
pub struct McpBridge {
    endpoints: Vec<String>,
    connect_timeout: Duration,
    runtime: Arc<BlockingRuntime>,
    connection: OnceLock<Option<Arc<Connection>>>,
    descriptions: OnceLock<Vec<(String, String)>>,
    attempts: AtomicUsize,
}

impl McpBridge {
    /// Creates a bridge over raw (un-normalized) endpoints. Nothing connects
    /// until [`connect`](Self::connect) or [`get_callables`](Self::get_callables).
    #[must_use]
    pub fn new(endpoints: Vec<String>, connect_timeout: Duration, runtime: Arc<BlockingRuntime>) -> Self {
        Self {
            endpoints,
            connect_timeout,
            runtime,
            connection: OnceLock::new(),
            descriptions: OnceLock::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Creates a bridge from the configured endpoint list.
    #[must_use]
    pub fn from_settings(settings: &Settings, runtime: Arc<BlockingRuntime>) -> Self {
        Self::new(settings.endpoints(), settings.connect_timeout, runtime)
    }

    /// Configured endpoints, in order, as given.
    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Number of endpoints a connection has been attempted against.
    #[must_use]
    pub fn connection_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Whether a server is connected. Does not trigger a connection.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.get().is_some_and(Option::is_some)
    }

    /// Connects to the first reachable endpoint, once per bridge.
    ///
    /// Endpoints are tried in order; the first whose tool list can be
    /// enumerated is kept and the rest are not tried. Failures are logged
    /// and skipped. Returns `None` when every endpoint failed or none is
    /// configured; later calls return the same outcome without retrying.
    pub fn connect(&self) -> Option<Arc<Connection>> {
        self.connection.get_or_init(|| self.establish()).clone()
    }

    fn establish(&self) -> Option<Arc<Connection>> {
        for raw in &self.endpoints {
            let endpoint = normalize_endpoint(raw);
            self.attempts.fetch_add(1, Ordering::SeqCst);
            match self.runtime.block_on(self.open(&endpoint)) {
                Ok((connection, tools)) => {
                    info!(
                        endpoint = %connection.endpoint,
                        tools = connection.advertised.len(),
                        "connected to remote tool server"
                    );
                    let _ = self.descriptions.set(describe(&tools));
                    return Some(Arc::new(connection));
                }
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "remote tool server unavailable");
                }
            }
        }
        if !self.endpoints.is_empty() {
            warn!(
                tried = self.endpoints.len(),
                "no remote tool server reachable; continuing with local tools only"
            );
        }
        None
    }

    async fn open(&self, endpoint: &str) -> Result<(Connection, Vec<Tool>), BridgeError> {
        let connect_error = |message: String| BridgeError::Connect {
            endpoint: endpoint.to_string(),
            message,
        };

        let handshake = async {
            let transport = StreamableHttpClientTransport::from_uri(endpoint.to_string());
            let service = ()
                .serve(transport)
                .await
                .map_err(|e| connect_error(e.to_string()))?;
            let tools = service
                .list_all_tools()
                .await
                .map_err(|e| connect_error(e.to_string()))?;
            Ok::<_, BridgeError>((service, tools))
        };

        let (service, tools) = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| BridgeError::Timeout {
                endpoint: endpoint.to_string(),
                seconds: self.connect_timeout.as_secs(),
            })??;

        let connection = Connection {
            endpoint: endpoint.to_string(),
            advertised: tools.iter().map(|t| t.name.to_string()).collect(),
            service,
        };
        Ok((connection, tools))
    }

    /// Synchronous wrappers for the supported remote tools.
    ///
    /// Empty when no endpoint is configured (no connection is attempted) or
    /// none could be reached.
    #[must_use]
    pub fn get_callables(self: &Arc<Self>) -> Vec<Capability> {
        let Some(connection) = self.connect() else {
            return Vec::new();
        };

        RemoteTool::ALL
            .into_iter()
            .map(|tool| {
                let bridge = Arc::clone(self);
                let description = self
                    .remote_description(tool.name())
                    .unwrap_or_else(|| tool.default_description().to_string());
                Capability::new(
                    ToolDefinition {
                        name: tool.name().to_string(),
                        description,
                        parameters: tool.parameters_schema(),
                    },
                    CapabilitySource::Remote {
                        endpoint: connection.endpoint.clone(),
                    },
                    Arc::new(move |args: &Value| bridge.invoke(tool.name(), args)),
                )
            })
            .collect()
    }

    fn remote_description(&self, name: &str) -> Option<String> {
        self.descriptions
            .get()?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.clone())
    }

    /// Invokes a remote tool by name and waits for the result.
    ///
    /// The server's tool list is fetched again on every call. A tool the
    /// server no longer lists yields `Error: <name> tool not found`; every
    /// other failure yields `Error in <name>: <detail>`.
    pub fn invoke(&self, name: &str, args: &Value) -> Result<String, String> {
        let fail = |detail: &dyn std::fmt::Display| format!("Error in {name}: {detail}");

        let Some(connection) = self.connect() else {
            return Err(fail(&BridgeError::NoConnection));
        };

        self.runtime.block_on(async {
            let tools = connection
                .service
                .list_all_tools()
                .await
                .map_err(|e| fail(&e))?;
            if !tools.iter().any(|t| t.name == name) {
                return Err(format!("Error: {name} tool not found"));
            }

            let arguments = match RemoteTool::from_name(name) {
                Some(tool) => tool.validate(args).map_err(|e| fail(&e))?,
                None => match args {
                    Value::Object(map) => map.clone(),
                    _ => serde_json::Map::new(),
                },
            };

            debug!(tool = name, endpoint = %connection.endpoint, "calling remote tool");
            let result = connection
                .service
                .call_tool(CallToolRequestParams {
                    meta: None,
                    name: Cow::Owned(name.to_string()),
                    arguments: Some(arguments),
                    task: None,
                })
                .await
                .map_err(|e| fail(&e))?;

            render_result(name, &result)
        })
    }
}

impl std::fmt::Debug for McpBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpBridge")
            .field("endpoints", &self.endpoints)
            .field("connect_timeout", &self.connect_timeout)
            .field("connection", &self.connection.get())
            .finish_non_exhaustive()
    }
}

fn describe(tools: &[Tool]) -> Vec<(String, String)> {
    tools
        .iter()
        .filter_map(|t| {
            let description = t.description.as_deref()?.trim();
            (!description.is_empty()).then(|| (t.name.to_string(), description.to_string()))
        })
        .collect()
}

/// Flattens a tool result to text: text blocks joined by newlines, or the
/// structured payload when there is no text.
fn render_result(name: &str, result: &CallToolResult) -> Result<String, String> {
    let mut text = result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.as_str()))
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty()
        && let Some(structured) = &result.structured_content
    {
        text = structured.to_string();
    }

    if result.is_error.unwrap_or(false) {
        Err(format!("Error in {name}: {text}"))
    } else {
        Ok(text)
    }
}

//! Tool type definitions for function-calling.
//!
//! Provides provider-agnostic types for tool definitions, calls, and results,
//! plus [`Capability`]: a definition paired with the synchronous invoker that
//! backs it. The reasoning loop only ever sees definitions and invokers, never
//! where a capability came from.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match a capability in the agent's [`ToolSet`]).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// The result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Result content (tool output on success, error message on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}

/// Where a capability is served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CapabilitySource {
    /// Implemented in-process.
    Local,
    /// Forwarded to a remote tool server.
    Remote {
        /// Normalized endpoint URL.
        endpoint: String,
    },
}

impl fmt::Display for CapabilitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote { endpoint } => write!(f, "remote ({endpoint})"),
        }
    }
}

/// Synchronous invoker behind a capability.
///
/// `Err` carries an observation string for the model; invokers never panic
/// or propagate errors.
pub type Invoker = Arc<dyn Fn(&Value) -> Result<String, String> + Send + Sync>;

/// A named, callable unit with a parameter schema and description.
#[derive(Clone)]
pub struct Capability {
    definition: ToolDefinition,
    source: CapabilitySource,
    invoker: Invoker,
}

impl Capability {
    /// Creates a capability from its definition and invoker.
    pub fn new(definition: ToolDefinition, source: CapabilitySource, invoker: Invoker) -> Self {
        Self {
            definition,
            source,
            invoker,
        }
    }

    /// Tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Definition sent to the model.
    #[must_use]
    pub const fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    /// Where the capability is served from.
    #[must_use]
    pub const fn source(&self) -> &CapabilitySource {
        &self.source
    }

    /// Whether the capability is served by a remote tool server.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self.source, CapabilitySource::Remote { .. })
    }

    /// Invokes the capability, distinguishing failures.
    pub fn invoke(&self, args: &Value) -> Result<String, String> {
        (self.invoker)(args)
    }

    /// Invokes the capability and returns its output or error text.
    #[must_use]
    pub fn call(&self, args: &Value) -> String {
        self.invoke(args).unwrap_or_else(|e| e)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.definition.name)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// An ordered, fixed set of capabilities bound to one agent.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    capabilities: Vec<Capability>,
}

impl ToolSet {
    /// Creates a set from capabilities in order.
    #[must_use]
    pub const fn new(capabilities: Vec<Capability>) -> Self {
        Self { capabilities }
    }

    /// Empty tool set (no tools available).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Capabilities in order.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Definitions for the model, in order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.capabilities
            .iter()
            .map(|c| c.definition.clone())
            .collect()
    }

    /// Tool names, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.capabilities.iter().map(Capability::name).collect()
    }

    /// Looks a capability up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.name() == name)
    }

    /// Whether any capability is remote.
    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.capabilities.iter().any(Capability::is_remote)
    }

    /// Returns `true` if this set contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Returns the number of tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.capabilities.len()
    }
}

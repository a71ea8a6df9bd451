//! Parameter types for the filesystem tools.
//!
//! Shared by the bridge (which validates model-supplied arguments before
//! forwarding them) and the reference server (which receives them). Schemas
//! are generated with `schemars` so both sides advertise the same shape.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default line cap for `read_file`.
pub const DEFAULT_MAX_LINES: usize = 100;
/// Hard line cap for `read_file`.
pub const MAX_READ_LINES: usize = 5_000;

const fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES
}

/// Parameters for `list_directory`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListDirectoryParams {
    /// Directory to list. Use "." for the current directory.
    pub path: String,
}

/// Parameters for `read_file`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ReadFileParams {
    /// File to read.
    pub file_path: String,

    /// Maximum number of lines to return.
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

/// Parameters for `search_files`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchFilesParams {
    /// Directory to search recursively.
    pub directory: String,

    /// Substring the file name must contain.
    pub pattern: String,

    /// Required file name ending, such as ".pdf". Empty matches any file.
    #[serde(default)]
    pub file_type: String,
}

/// Parameters for `get_file_info`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetFileInfoParams {
    /// File or directory to describe.
    pub file_path: String,
}

/// The fixed set of remote tools the bridge exposes to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteTool {
    /// Directory listing.
    ListDirectory,
    /// File read with a line cap.
    ReadFile,
    /// Pattern-based file search.
    SearchFiles,
    /// File metadata.
    GetFileInfo,
}

impl RemoteTool {
    /// Every supported tool, in the order they are offered to the model.
    pub const ALL: [Self; 4] = [
        Self::ListDirectory,
        Self::ReadFile,
        Self::SearchFiles,
        Self::GetFileInfo,
    ];

    /// Wire name of the tool.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ListDirectory => "list_directory",
            Self::ReadFile => "read_file",
            Self::SearchFiles => "search_files",
            Self::GetFileInfo => "get_file_info",
        }
    }

    /// Looks a tool up by wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Description used when the server does not advertise one.
    #[must_use]
    pub const fn default_description(self) -> &'static str {
        match self {
            Self::ListDirectory => {
                "List the files and subdirectories of a directory with their types and sizes."
            }
            Self::ReadFile => "Read the first lines of a text file (100 lines unless max_lines is given).",
            Self::SearchFiles => {
                "Recursively find files whose name contains a pattern, optionally filtered by file type."
            }
            Self::GetFileInfo => {
                "Get size, modification time, type and extension of a file or directory."
            }
        }
    }

    /// JSON Schema for the tool's parameters.
    #[must_use]
    pub fn parameters_schema(self) -> Value {
        match self {
            Self::ListDirectory => schema_of::<ListDirectoryParams>(),
            Self::ReadFile => schema_of::<ReadFileParams>(),
            Self::SearchFiles => schema_of::<SearchFilesParams>(),
            Self::GetFileInfo => schema_of::<GetFileInfoParams>(),
        }
    }

    /// Checks model-supplied arguments against the typed parameters and
    /// returns the normalized argument object, defaults filled in.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(self, args: &Value) -> Result<Map<String, Value>, String> {
        match self {
            Self::ListDirectory => normalize::<ListDirectoryParams>(args),
            Self::ReadFile => normalize::<ReadFileParams>(args).map(|mut map| {
                if let Some(n) = map.get("max_lines").and_then(Value::as_u64)
                    && n > MAX_READ_LINES as u64
                {
                    map.insert("max_lines".to_string(), Value::from(MAX_READ_LINES));
                }
                map
            }),
            Self::SearchFiles => normalize::<SearchFilesParams>(args),
            Self::GetFileInfo => normalize::<GetFileInfoParams>(args),
        }
    }
}

fn normalize<T: DeserializeOwned + Serialize>(args: &Value) -> Result<Map<String, Value>, String> {
    let typed: T = serde_json::from_value(args.clone()).map_err(|e| e.to_string())?;
    match serde_json::to_value(typed).map_err(|e| e.to_string())? {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected an object, got {other}")),
    }
}

/// Generates a parameter schema without the metadata keys function-calling
/// APIs reject.
#[must_use]
pub fn schema_of<T: JsonSchema>() -> Value {
    let mut schema = schemars::schema_for!(T);
    schema.remove("$schema");
    schema.remove("title");
    schema.to_value()
}

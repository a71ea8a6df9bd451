//! Reference filesystem tool server.
//!
//! Serves the four tools the bridge knows how to call. Filesystem work runs
//! on the blocking pool via `spawn_blocking`. A failing operation becomes a
//! tool-level error result carrying `{"error": "..."}`; the session stays up.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use serde_json::{Value, json};

use super::params::{GetFileInfoParams, ListDirectoryParams, ReadFileParams, SearchFilesParams};

/// Upper bound on `search_files` results.
pub const MAX_SEARCH_MATCHES: usize = 50;

/// Resolves and confines paths, and performs the filesystem operations.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: Option<PathBuf>,
}

impl Sandbox {
    /// Creates a sandbox. With a root, relative paths resolve against it and
    /// anything resolving outside it is refused.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the root does not exist.
    pub fn new(root: Option<&Path>) -> std::io::Result<Self> {
        let root = root.map(fs::canonicalize).transpose()?;
        Ok(Self { root })
    }

    /// Canonical root, if confined.
    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, String> {
        let requested = Path::new(path);
        let Some(root) = &self.root else {
            return Ok(requested.to_path_buf());
        };

        let candidate = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            root.join(requested)
        };
        let resolved = fs::canonicalize(&candidate).map_err(|e| format!("{path}: {e}"))?;
        if resolved.starts_with(root) {
            Ok(resolved)
        } else {
            Err(format!("{path}: outside the served root"))
        }
    }

    /// Lists a directory, entries sorted by name.
    pub fn list_directory(&self, path: &str) -> Result<Value, String> {
        let dir = self.resolve(path)?;
        let entries = fs::read_dir(&dir).map_err(|e| format!("{path}: {e}"))?;

        let mut contents = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| format!("{path}: {e}"))?;
            let metadata = entry.metadata().map_err(|e| format!("{path}: {e}"))?;
            let is_dir = metadata.is_dir();
            contents.push(json!({
                "name": entry.file_name().to_string_lossy(),
                "type": if is_dir { "directory" } else { "file" },
                "size": if is_dir { 0 } else { metadata.len() },
            }));
        }
        contents.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(json!({ "path": path, "contents": contents }))
    }

    /// Reads the first `max_lines` lines of a UTF-8 text file.
    pub fn read_file(&self, file_path: &str, max_lines: usize) -> Result<Value, String> {
        let resolved = self.resolve(file_path)?;
        let text = fs::read_to_string(&resolved).map_err(|e| format!("{file_path}: {e}"))?;

        let mut lines = text.split_inclusive('\n');
        let content: String = lines.by_ref().take(max_lines).collect();
        let truncated = lines.next().is_some();

        Ok(json!({ "path": file_path, "content": content, "truncated": truncated }))
    }

    /// Recursively finds files whose name contains `pattern` and ends with
    /// `file_type`.
    pub fn search_files(&self, directory: &str, pattern: &str, file_type: &str) -> Result<Value, String> {
        let base = self.resolve(directory)?;
        if !base.is_dir() {
            return Err(format!("{directory}: not a directory"));
        }

        let mut matches = Vec::new();
        let mut pending = vec![base.clone()];
        'walk: while let Some(dir) = pending.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            let mut entries: Vec<_> = entries.filter_map(Result::ok).collect();
            entries.sort_by_key(fs::DirEntry::file_name);

            let mut subdirs = Vec::new();
            for entry in entries {
                let Ok(kind) = entry.file_type() else {
                    continue;
                };
                if kind.is_dir() {
                    subdirs.push(entry.path());
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.contains(pattern) && name.ends_with(file_type) {
                    let relative = entry.path().strip_prefix(&base).map(Path::to_path_buf);
                    let shown = relative.map_or_else(|_| entry.path(), |r| Path::new(directory).join(r));
                    matches.push(shown.display().to_string());
                    if matches.len() == MAX_SEARCH_MATCHES {
                        break 'walk;
                    }
                }
            }
            // Reverse so the stack visits subdirectories in name order.
            pending.extend(subdirs.into_iter().rev());
        }

        Ok(json!({ "directory": directory, "pattern": pattern, "matches": matches }))
    }

    /// Size, modification time, kind and extension of a path.
    pub fn get_file_info(&self, file_path: &str) -> Result<Value, String> {
        let resolved = self.resolve(file_path)?;
        let metadata = fs::metadata(&resolved).map_err(|e| format!("{file_path}: {e}"))?;
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs());
        let extension = Path::new(file_path)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        Ok(json!({
            "path": file_path,
            "size": metadata.len(),
            "modified": modified,
            "is_directory": metadata.is_dir(),
            "extension": extension,
        }))
    }
}

/// MCP server exposing a [`Sandbox`] as tools.
#[derive(Clone)]
pub struct FilesystemServer {
    tool_router: ToolRouter<Self>,
    sandbox: Sandbox,
}

#[tool_router]
impl FilesystemServer {
    #[tool(
        name = "list_directory",
        description = "List contents of a directory. Returns JSON with each entry's name, type (file or directory) and size."
    )]
    async fn list_directory(
        &self,
        Parameters(params): Parameters<ListDirectoryParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |sandbox| sandbox.list_directory(&params.path))
            .await
    }

    #[tool(
        name = "read_file",
        description = "Read contents of a text file. Returns the first max_lines lines (default 100) and whether the file was truncated."
    )]
    async fn read_file(
        &self,
        Parameters(params): Parameters<ReadFileParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |sandbox| sandbox.read_file(&params.file_path, params.max_lines))
            .await
    }

    #[tool(
        name = "search_files",
        description = "Search for files by name pattern under a directory, recursively. Optional file_type filters by suffix such as .pdf. At most 50 matches."
    )]
    async fn search_files(
        &self,
        Parameters(params): Parameters<SearchFilesParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |sandbox| {
            sandbox.search_files(&params.directory, &params.pattern, &params.file_type)
        })
        .await
    }

    #[tool(
        name = "get_file_info",
        description = "Get detailed file information: size, modification time (unix seconds), whether it is a directory, and extension."
    )]
    async fn get_file_info(
        &self,
        Parameters(params): Parameters<GetFileInfoParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |sandbox| sandbox.get_file_info(&params.file_path))
            .await
    }
}

#[tool_handler]
impl ServerHandler for FilesystemServer {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name = "docqa-filesystem".to_string();
        server_info.title = Some("docqa filesystem explorer".to_string());
        server_info.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info,
            instructions: Some(
                "Filesystem explorer: list directories, read text files, search files by name \
                 and inspect file metadata."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}

impl FilesystemServer {
    /// Creates a server, optionally confined to `root`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `root` does not exist.
    pub fn new(root: Option<&Path>) -> std::io::Result<Self> {
        Ok(Self {
            tool_router: Self::tool_router(),
            sandbox: Sandbox::new(root)?,
        })
    }

    /// The sandbox backing the tools.
    #[must_use]
    pub const fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    async fn run<F>(&self, op: F) -> Result<CallToolResult, McpError>
    where
        F: FnOnce(&Sandbox) -> Result<Value, String> + Send + 'static,
    {
        let sandbox = self.sandbox.clone();
        let outcome = tokio::task::spawn_blocking(move || op(&sandbox))
            .await
            .map_err(|e| McpError::internal_error(format!("Task join error: {e}"), None))?;

        match outcome {
            Ok(value) => {
                let text = serde_json::to_string_pretty(&value).map_err(|e| {
                    McpError::internal_error(format!("Serialization error: {e}"), None)
                })?;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(message) => Ok(CallToolResult::error(vec![Content::text(
                json!({ "error": message }).to_string(),
            )])),
        }
    }
}

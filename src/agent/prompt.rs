//! System prompts and the document answer template.
//!
//! Two system prompt variants exist: one for when only the document search
//! tool is available, and one that also explains the remote filesystem
//! tools. The composer picks between them from the tools it actually bound.
//! All three texts can be overridden from markdown files.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::AgentError;

/// System prompt when only document search is available.
pub const DOCUMENT_ONLY_PROMPT: &str = "You are a helpful AI assistant with access to an indexed \
collection of documents.

Use the document_search tool to answer questions about the documents: missions, engineering \
practice, policy, risk and anything else they cover. Search before answering whenever the \
question could be answered from the documents, and base your answer on what the search returns.

Always provide executive-level, detailed responses. If the documents do not cover the question, \
say so plainly instead of guessing.";

/// System prompt when remote filesystem tools are also available.
pub const REMOTE_TOOLS_PROMPT: &str = r#"You are a helpful AI assistant with access to an indexed collection of documents and to a filesystem through remote tools.

## Available Tools

- **document_search**: search the indexed documents and get an executive-level answer. Use for questions about the content of the documents.
- **list_directory**: list files and subdirectories. Use path "." for the current directory.
- **read_file**: read the first lines of a file (file_path, optional max_lines, default 100).
- **search_files**: find files by name (directory, pattern, optional file_type such as ".pdf").
- **get_file_info**: size, modification time and type of a file or directory (file_path).

## Guidelines

1. Questions about what the documents say → document_search.
2. Questions about files, folders or what is on disk → the filesystem tools.
3. Combine tools when a question needs both, for example find a file and then summarize the topic it covers.
4. If a tool returns an error, read it, then retry with corrected arguments or try another tool.
5. Keep answers executive-level: lead with the conclusion, then the supporting detail.

## Examples

- "What are the risk strategies?" → document_search with the question.
- "List current directory" → list_directory with path ".".
- "Read the README file" → read_file with file_path "README.md".
- "Which PDFs mention budget?" → search_files with pattern "budget" and file_type ".pdf"."#;

/// Template for the retriever's single model call.
///
/// `{context}` receives the retrieved passages and `{query}` the question.
pub const ANSWER_TEMPLATE: &str =
    "Answer for executives only: be concise, high-level and decision-oriented.\n\
     Context:\n{context}\n\
     Question: {query}";

/// Default prompt directory under user config.
const DEFAULT_PROMPT_DIR: &str = ".config/docqa/prompts";

/// Filename for the document-only prompt.
const DOCUMENT_ONLY_FILENAME: &str = "document_only.md";
/// Filename for the remote-tools prompt.
const REMOTE_TOOLS_FILENAME: &str = "remote_tools.md";
/// Filename for the answer template.
const ANSWER_TEMPLATE_FILENAME: &str = "answer_template.md";

/// Which system prompt an agent was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptVariant {
    /// Document search only.
    DocumentOnly,
    /// Document search plus remote filesystem tools.
    RemoteTools,
}

impl PromptVariant {
    /// Variant for a tool set with or without remote tools.
    #[must_use]
    pub const fn for_tools(has_remote: bool) -> Self {
        if has_remote {
            Self::RemoteTools
        } else {
            Self::DocumentOnly
        }
    }
}

/// The prompt texts used by one process.
///
/// Loaded from template files when available, falling back to compiled-in
/// defaults per file.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// System prompt when only document search is available.
    pub document_only: String,
    /// System prompt when remote tools are available.
    pub remote_tools: String,
    /// Answer template with `{context}` and `{query}` placeholders.
    pub answer_template: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::defaults()
    }
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// With no directory, `~/.config/docqa/prompts/` is tried. Each file is
    /// loaded independently; a missing file uses its default. An answer
    /// template lacking either placeholder is ignored with a warning.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir.map(PathBuf::from).or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let mut answer_template = load_file(ANSWER_TEMPLATE_FILENAME, ANSWER_TEMPLATE);
        if !(answer_template.contains("{context}") && answer_template.contains("{query}")) {
            warn!(
                file = ANSWER_TEMPLATE_FILENAME,
                "answer template is missing {{context}} or {{query}}, using the default"
            );
            answer_template = ANSWER_TEMPLATE.to_string();
        }

        Self {
            document_only: load_file(DOCUMENT_ONLY_FILENAME, DOCUMENT_ONLY_PROMPT),
            remote_tools: load_file(REMOTE_TOOLS_FILENAME, REMOTE_TOOLS_PROMPT),
            answer_template,
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            document_only: DOCUMENT_ONLY_PROMPT.to_string(),
            remote_tools: REMOTE_TOOLS_PROMPT.to_string(),
            answer_template: ANSWER_TEMPLATE.to_string(),
        }
    }

    /// System prompt text for a variant.
    #[must_use]
    pub fn system_prompt(&self, variant: PromptVariant) -> &str {
        match variant {
            PromptVariant::DocumentOnly => &self.document_only,
            PromptVariant::RemoteTools => &self.remote_tools,
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are kept
    /// unless `force` is set. Returns the paths written.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Prompt`] if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path, force: bool) -> Result<Vec<PathBuf>, AgentError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| AgentError::Prompt(format!("{}: {e}", dir.display())))?;

        let templates = [
            (DOCUMENT_ONLY_FILENAME, DOCUMENT_ONLY_PROMPT),
            (REMOTE_TOOLS_FILENAME, REMOTE_TOOLS_PROMPT),
            (ANSWER_TEMPLATE_FILENAME, ANSWER_TEMPLATE),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if force || !path.exists() {
                std::fs::write(&path, content)
                    .map_err(|e| AgentError::Prompt(format!("{}: {e}", path.display())))?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    ///
    /// Returns `None` if the home directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// Fills the answer template with retrieved context and the original query.
///
/// Substitution is single-pass: placeholder-like text inside the context or
/// the query is copied verbatim.
#[must_use]
pub fn build_answer_prompt(template: &str, context: &str, query: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + query.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{context}") {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{query}") {
            out.push_str(query);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

//! Output formatting for CLI commands.

use serde::Serialize;

use crate::agent::ToolSet;
use crate::config::StatusReport;
use crate::retriever::IndexDiagnostics;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; anything unrecognized is text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes a value as pretty JSON followed by a newline.
    pub fn to_json<T: Serialize>(self, value: &T) -> String {
        let mut out = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("serialization failed: {e}") }).to_string()
        });
        out.push('\n');
        out
    }
}

const fn mark(ok: bool, yes: &'static str, no: &'static str) -> &'static str {
    if ok { yes } else { no }
}

/// Renders the configuration status and index diagnostics.
pub fn format_status(report: &StatusReport, index: &IndexDiagnostics, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return format.to_json(&serde_json::json!({ "config": report, "index": index }));
    }

    let mut out = String::from("🔧 Configuration Status:\n");
    out.push_str(&format!(
        "   OpenAI API Key: {}\n",
        mark(report.credential_set, "✅ Set", "❌ Missing")
    ));
    out.push_str(&format!(
        "   Vector Database: {} ({})\n",
        mark(report.index_found, "✅ Found", "❌ Missing"),
        report.index_path.display()
    ));
    out.push_str(&format!(
        "   MCP Servers: {}\n",
        mark(report.remote_configured, "✅ Configured", "⚪ None")
    ));
    for endpoint in &report.endpoints {
        out.push_str(&format!("     - {endpoint}\n"));
    }
    out.push_str(&format!("   Model: {}\n", report.model));
    out.push_str(&format!("   Temperature: {}\n", report.temperature));
    out.push_str(&format!("   Iteration limit: {}\n", report.iteration_limit));

    out.push_str("\n📚 Document Index:\n");
    out.push_str(&format!("   Collection: {}\n", index.collection));
    out.push_str(&format!("   Path: {}\n", index.index_path.display()));
    match (&index.error, index.chunk_count) {
        (Some(error), _) => out.push_str(&format!("   Error: {error}\n")),
        (None, Some(count)) => out.push_str(&format!("   Chunks: {count}\n")),
        (None, None) => {}
    }

    if !report.warnings.is_empty() {
        out.push_str("\n⚠️  Warnings:\n");
        for warning in &report.warnings {
            out.push_str(&format!("   - {warning}\n"));
        }
    }
    out
}

/// Renders a tool set.
pub fn format_tools(tools: &ToolSet, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        let entries: Vec<_> = tools
            .capabilities()
            .iter()
            .map(|c| {
                serde_json::json!({
                    "name": c.name(),
                    "source": c.source(),
                    "description": c.definition().description,
                })
            })
            .collect();
        return format.to_json(&entries);
    }

    let mut out = format!("{} tool(s) available:\n", tools.len());
    for capability in tools.capabilities() {
        out.push_str(&format!(
            "  {:<16} [{}]\n      {}\n",
            capability.name(),
            capability.source(),
            capability.definition().description
        ));
    }
    out
}

//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

#![allow(clippy::format_push_string)]

use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::agent::{AgentComposer, PromptSet, QaAgent, openai_factory};
use crate::cli::output::{OutputFormat, format_status, format_tools};
#[cfg(feature = "fs-server")]
use crate::cli::parser::McpCommands;
use crate::cli::parser::{Cli, Commands};
use crate::cli::repl::{self, NO_ANSWER_MESSAGE};
use crate::config::{ConfigProvider, validate_iteration_limit};
use crate::error::{CommandError, Result};
use crate::mcp::McpBridge;
use crate::retriever::DocumentRetriever;
use crate::runtime::BlockingRuntime;
use crate::spinner::ThinkingSpinner;

/// Executes a CLI command.
///
/// Returns the text to print; interactive and server commands write
/// directly and return an empty string.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli, config: &ConfigProvider) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        None => cmd_chat(config, false, None),
        Some(Commands::Chat { no_remote, model }) => cmd_chat(config, *no_remote, model.as_deref()),
        Some(Commands::Ask {
            question,
            no_remote,
            model,
            iteration_limit,
        }) => cmd_ask(
            config,
            question,
            *no_remote,
            model.as_deref(),
            *iteration_limit,
            format,
        ),
        Some(Commands::Status) => cmd_status(config, format),
        Some(Commands::Tools { no_remote }) => cmd_tools(config, *no_remote, format),
        Some(Commands::InitPrompts { dir, force }) => {
            cmd_init_prompts(dir.as_deref(), *force, format)
        }
        #[cfg(feature = "fs-server")]
        Some(Commands::Mcp(cmd)) => cmd_mcp(cmd),
    }
}

/// Builds the process-wide components around one shared runtime.
fn build_composer(config: &ConfigProvider) -> Result<AgentComposer> {
    let settings = config.get_config();
    let runtime = Arc::new(BlockingRuntime::new()?);
    let prompts = PromptSet::load(config.prompt_dir());
    let retriever = Arc::new(DocumentRetriever::new(
        settings,
        &prompts.answer_template,
        Arc::clone(&runtime),
    ));
    let bridge = Arc::new(McpBridge::from_settings(settings, Arc::clone(&runtime)));

    Ok(AgentComposer::new(
        settings.agent_behavior(),
        retriever,
        bridge,
        openai_factory(settings),
        prompts,
        runtime,
    ))
}

fn create_agent(composer: &AgentComposer, no_remote: bool, model: Option<&str>) -> Result<QaAgent> {
    let include_remote = !no_remote && composer.behavior().include_remote;
    let agent = composer.create_agent(include_remote, model)?;
    info!(tools = ?agent.tools().names(), "agent ready");
    Ok(agent)
}

fn cmd_chat(config: &ConfigProvider, no_remote: bool, model: Option<&str>) -> Result<String> {
    let composer = build_composer(config)?;
    let agent = create_agent(&composer, no_remote, model)?;

    let spinner = ThinkingSpinner::stdout();
    // Ctrl-C ends the session cleanly even while a turn is running.
    repl::watch_interrupt(tokio::signal::ctrl_c(), spinner.writer(), || {
        std::process::exit(0)
    })
    .map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to install interrupt handler: {e}"))
    })?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    repl::run(&agent, stdin.lock(), &mut stdout, Some(&spinner))?;

    Ok(String::new())
}

fn cmd_ask(
    config: &ConfigProvider,
    question: &str,
    no_remote: bool,
    model: Option<&str>,
    iteration_limit: Option<usize>,
    format: OutputFormat,
) -> Result<String> {
    if question.trim().is_empty() {
        return Err(CommandError::ExecutionFailed("question must not be empty".to_string()).into());
    }

    let iteration_limit = iteration_limit.map(validate_iteration_limit).transpose()?;

    let composer = build_composer(config)?;
    let agent = create_agent(&composer, no_remote, model)?;
    let reply = agent.invoke(&[], question.trim(), iteration_limit)?;

    match format {
        OutputFormat::Text => Ok(format!(
            "{}\n",
            reply.answer.as_deref().unwrap_or(NO_ANSWER_MESSAGE)
        )),
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "question": question.trim(),
            "answer": reply.answer,
            "tools_used": reply.tools_used,
        }))),
    }
}

fn cmd_status(config: &ConfigProvider, format: OutputFormat) -> Result<String> {
    let settings = config.get_config();
    let runtime = Arc::new(BlockingRuntime::new()?);
    let prompts = PromptSet::load(config.prompt_dir());
    let retriever = DocumentRetriever::new(settings, &prompts.answer_template, runtime);

    Ok(format_status(
        &settings.status_report(),
        &retriever.get_info(),
        format,
    ))
}

fn cmd_tools(config: &ConfigProvider, no_remote: bool, format: OutputFormat) -> Result<String> {
    let composer = build_composer(config)?;
    let include_remote = !no_remote && composer.behavior().include_remote;
    Ok(format_tools(&composer.capabilities(include_remote), format))
}

fn cmd_init_prompts(dir: Option<&Path>, force: bool, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir, force).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {} (use --force to overwrite)\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str(&format!(
                    "  {}\n",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                ));
            }
            output.push_str("\nEdit these files to customize the agent prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "directory": target_dir.to_string_lossy(),
            "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
            "count": written.len(),
        }))),
    }
}

/// Runs the filesystem tool server until shutdown.
///
/// Uses its own multi-threaded runtime; the blocking runtime is for clients.
#[cfg(feature = "fs-server")]
fn cmd_mcp(cmd: &McpCommands) -> Result<String> {
    use crate::mcp::{serve_http, serve_stdio};

    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;

    rt.block_on(async {
        match cmd {
            McpCommands::Stdio { root } => serve_stdio(root.as_deref()).await,
            McpCommands::Serve { host, port, root } => serve_http(host, *port, root.as_deref()).await,
        }
    })
    .map_err(|e| CommandError::ExecutionFailed(format!("MCP server error: {e}")))?;

    Ok(String::new())
}

//! Interactive question loop.
//!
//! Reads one question per line, runs it through the agent with the
//! conversation so far, and prints the answer. A failed turn is reported
//! and the loop keeps going. Only questions and answers from the last few
//! turns are carried forward.

use std::future::Future;
use std::io::{self, BufRead, Write};
use std::sync::PoisonError;
use std::thread::{self, JoinHandle};

use tokio::runtime::Builder;
use tracing::{debug, warn};

use crate::agent::{ChatMessage, QaAgent, Role};
use crate::spinner::{SharedWriter, ThinkingSpinner, clear_sequence};

/// Inputs that end the session, compared case-insensitively.
pub const EXIT_TOKENS: [&str; 3] = ["quit", "exit", "q"];
/// Printed before each question.
pub const PROMPT: &str = "Ask ▶ ";
/// Printed when the agent produced no answer.
pub const NO_ANSWER_MESSAGE: &str = "No answer generated. Please try a different question.";
/// Question-and-answer turns carried into the next question.
pub const HISTORY_TURNS: usize = 10;
const GOODBYE: &str = "👋 Goodbye!";
const ERROR_TIP: &str = "💡 Tip: run `docqa status` to check configuration";

/// Whether `input` ends the session.
#[must_use]
pub fn is_exit(input: &str) -> bool {
    EXIT_TOKENS.iter().any(|t| input.eq_ignore_ascii_case(t))
}

/// Writes the session banner.
///
/// # Errors
///
/// Returns any write error.
pub fn banner<W: Write>(output: &mut W, agent: &QaAgent) -> std::io::Result<()> {
    writeln!(output, "🚀 Document Q&A")?;
    writeln!(
        output,
        "Ask questions about your documents. Type 'quit', 'exit' or 'q' to leave."
    )?;
    writeln!(output, "{}", "=".repeat(60))?;
    debug!(tools = ?agent.tools().names(), "session tools");
    writeln!(output, "✅ Agent ready for questions!")?;
    Ok(())
}

/// Runs the loop until an exit token or end of input.
///
/// With a spinner, it animates while each question is being answered. A
/// failed turn also clears the carried history.
///
/// # Errors
///
/// Returns an error only if reading input or writing output fails.
pub fn run<R: BufRead, W: Write>(
    agent: &QaAgent,
    input: R,
    output: &mut W,
    spinner: Option<&ThinkingSpinner>,
) -> std::io::Result<()> {
    banner(output, agent)?;

    let mut history: Vec<ChatMessage> = Vec::new();
    let mut lines = input.lines();

    loop {
        write!(output, "\n{PROMPT}")?;
        output.flush()?;

        let Some(line) = lines.next() else {
            writeln!(output, "\n{GOODBYE}")?;
            return Ok(());
        };
        let question = line?;
        let question = question.trim();

        if question.is_empty() {
            continue;
        }
        if is_exit(question) {
            writeln!(output, "{GOODBYE}")?;
            return Ok(());
        }

        let turn = || agent.invoke(&history, question, None);
        let result = match spinner {
            Some(s) => s.run(turn),
            None => turn(),
        };

        match result {
            Ok(reply) => {
                let answer = reply.answer.as_deref().unwrap_or(NO_ANSWER_MESSAGE);
                writeln!(output, "→ {answer}")?;
                history = carry_forward(reply.messages);
            }
            Err(e) => {
                // The history may be what the model rejected.
                debug!(dropped = history.len(), "clearing history after a failed turn");
                history.clear();
                writeln!(output, "→ Error: {e}")?;
                writeln!(output, "{ERROR_TIP}")?;
            }
        }
    }
}

/// Reduces a finished turn's conversation to what the next turn needs.
///
/// Tool requests and tool output are dropped, and only the last
/// [`HISTORY_TURNS`] questions with their answers are kept.
#[must_use]
pub fn carry_forward(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut kept: Vec<ChatMessage> = messages
        .into_iter()
        .filter(|m| match m.role {
            Role::User => true,
            Role::Assistant => m.tool_calls.is_empty() && !m.content.is_empty(),
            Role::System | Role::Tool => false,
        })
        .collect();

    let questions: Vec<usize> = kept
        .iter()
        .enumerate()
        .filter(|(_, m)| m.role == Role::User)
        .map(|(i, _)| i)
        .collect();
    if let Some(skip) = questions.len().checked_sub(HISTORY_TURNS)
        && let Some(&start) = questions.get(skip)
    {
        kept.drain(..start);
    }
    kept
}

/// Waits on a dedicated thread for `signal`, then ends the session.
///
/// The current line is cleared and the goodbye written to `output`, then
/// `on_interrupt` runs with the writer still locked so no spinner frame can
/// follow. If the signal cannot be awaited the watcher logs it and stops.
///
/// # Errors
///
/// Returns an error if the watcher's runtime cannot be created.
pub fn watch_interrupt<F, H>(
    signal: F,
    output: SharedWriter,
    on_interrupt: H,
) -> io::Result<JoinHandle<()>>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
    H: FnOnce() + Send + 'static,
{
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(thread::spawn(move || {
        if let Err(e) = runtime.block_on(signal) {
            warn!(error = %e, "interrupt handling unavailable");
            return;
        }
        let mut out = output.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = write!(out, "{}\n{GOODBYE}\n", clear_sequence());
        let _ = out.flush();
        on_interrupt();
    }))
}

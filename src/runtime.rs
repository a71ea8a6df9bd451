//! Synchronous driver for async work.
//!
//! The agent loop, the document tool and the remote tool wrappers are all
//! synchronous. Every network round-trip they make goes through one
//! [`BlockingRuntime`], which runs the future to completion before returning.
//! No caller above this type sees a pending future.

use std::future::Future;

use tokio::runtime::{Builder, Runtime};

use crate::error::AgentError;

/// A current-thread tokio runtime used as the sync/async boundary.
///
/// Background tasks spawned by clients (such as a remote tool session) make
/// progress whenever a call is being driven.
#[derive(Debug)]
pub struct BlockingRuntime {
    runtime: Runtime,
}

impl BlockingRuntime {
    /// Creates the runtime with I/O and timers enabled.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Runtime`] if tokio cannot start.
    pub fn new() -> Result<Self, AgentError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AgentError::Runtime(e.to_string()))?;
        Ok(Self { runtime })
    }

    /// Drives `future` to completion on the calling thread.
    ///
    /// Must not be called from inside an async context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Handle for spawning onto this runtime.
    #[must_use]
    pub fn handle(&self) -> &tokio::runtime::Handle {
        self.runtime.handle()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_block_on_completes_timer() {
        let rt = BlockingRuntime::new().unwrap_or_else(|e| panic!("runtime failed: {e}"));
        let value = rt.block_on(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            42
        });
        assert_eq!(value, 42);
    }

    #[test]
    fn test_spawned_task_progresses_during_later_calls() {
        let rt = BlockingRuntime::new().unwrap_or_else(|e| panic!("runtime failed: {e}"));
        let (tx, rx) = tokio::sync::oneshot::channel();
        rt.handle().spawn(async move {
            let _ = tx.send("done");
        });
        let got = rt.block_on(rx).unwrap_or_else(|e| panic!("recv failed: {e}"));
        assert_eq!(got, "done");
    }
}

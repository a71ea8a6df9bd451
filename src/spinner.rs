//! Terminal liveness indicator.
//!
//! [`ThinkingSpinner::start`] spawns one background thread that redraws the
//! current line every [`FRAME_INTERVAL`]. The returned [`SpinnerGuard`] stops
//! the thread and clears the line when dropped, including during unwinding,
//! so a failed operation never leaves a stray frame behind.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Delay between frames.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);
/// How long the guard waits for the animation thread to finish.
const STOP_TIMEOUT: Duration = Duration::from_secs(1);
/// Width blanked when clearing the line. Wider than any frame.
const CLEAR_WIDTH: usize = 24;

const LABEL: &str = "🧠 Thinking";
const DOTS: [&str; 8] = ["", ".", "..", "...", "....", "...", "..", "."];
const GLYPHS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Writer shared between the caller and the animation thread.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// Returns the sequence that blanks the current line and homes the cursor.
#[must_use]
pub fn clear_sequence() -> String {
    format!("\r{}\r", " ".repeat(CLEAR_WIDTH))
}

fn frame(tick: usize) -> String {
    format!(
        "\r{LABEL}{:<4} {}",
        DOTS[tick % DOTS.len()],
        GLYPHS[tick % GLYPHS.len()]
    )
}

/// Factory for scoped spinner runs.
#[derive(Clone)]
pub struct ThinkingSpinner {
    writer: SharedWriter,
    interval: Duration,
}

impl ThinkingSpinner {
    /// Spinner drawing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::with_writer(Arc::new(Mutex::new(io::stdout())))
    }

    /// Spinner drawing to the given writer.
    #[must_use]
    pub fn with_writer(writer: SharedWriter) -> Self {
        Self {
            writer,
            interval: FRAME_INTERVAL,
        }
    }

    /// The writer frames are drawn to.
    #[must_use]
    pub fn writer(&self) -> SharedWriter {
        Arc::clone(&self.writer)
    }

    /// Starts animating. Stops when the guard is dropped.
    #[must_use = "the spinner stops as soon as the guard is dropped"]
    pub fn start(&self) -> SpinnerGuard {
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();
        let writer = Arc::clone(&self.writer);
        let flag = Arc::clone(&stop);
        let interval = self.interval;

        let handle = thread::spawn(move || {
            let mut tick = 0usize;
            while !flag.load(Ordering::Acquire) {
                if let Ok(mut out) = writer.lock() {
                    // The guard may have cleared the line while we waited.
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    let _ = out.write_all(frame(tick).as_bytes());
                    let _ = out.flush();
                }
                tick = tick.wrapping_add(1);
                thread::park_timeout(interval);
            }
            let _ = done_tx.send(());
        });

        SpinnerGuard {
            stop,
            done: done_rx,
            handle: Some(handle),
            writer: Arc::clone(&self.writer),
        }
    }

    /// Runs `operation` with the spinner active.
    pub fn run<T>(&self, operation: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        operation()
    }
}

impl std::fmt::Debug for ThinkingSpinner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThinkingSpinner")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Active spinner. Dropping it stops the animation and clears the line.
pub struct SpinnerGuard {
    stop: Arc<AtomicBool>,
    done: Receiver<()>,
    handle: Option<JoinHandle<()>>,
    writer: SharedWriter,
}

impl Drop for SpinnerGuard {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            // A thread that misses the deadline is detached.
            if self.done.recv_timeout(STOP_TIMEOUT).is_ok() {
                let _ = handle.join();
            }
        }
        if let Ok(mut out) = self.writer.lock() {
            let _ = out.write_all(clear_sequence().as_bytes());
            let _ = out.flush();
        }
    }
}

//! Process-wide runtime settings
//!
//! Holds the advisory login timeout and the optional diagnostic log sink.
//! Both live on an explicit object owned by the driver manager so tests can
//! build a fresh one instead of resetting globals.

use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Receives the manager's human-readable trace lines
pub trait LogSink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Sink writing each line to an `io::Write`, flushed after every line.
/// Write errors are dropped: diagnostics must never fail an operation.
pub struct WriterSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl WriterSink {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl LogSink for WriterSink {
    fn write_line(&self, line: &str) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "{}", line);
        let _ = out.flush();
    }
}

/// Sink forwarding lines to `tracing` at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write_line(&self, line: &str) {
        tracing::info!(target: "driverscope::log_sink", "{}", line);
    }
}

/// Sink keeping every line in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

pub struct RuntimeSettings {
    login_timeout_secs: AtomicU32,
    log_sink: RwLock<Option<Arc<dyn LogSink>>>,
}

impl RuntimeSettings {
    pub fn new(login_timeout_secs: u32) -> Self {
        Self {
            login_timeout_secs: AtomicU32::new(login_timeout_secs),
            log_sink: RwLock::new(None),
        }
    }

    /// Advisory login timeout in seconds, 0 means no limit.
    ///
    /// Stored and exposed only; enforcing it is up to the drivers.
    pub fn login_timeout(&self) -> u32 {
        self.login_timeout_secs.load(Ordering::Relaxed)
    }

    pub fn set_login_timeout(&self, seconds: u32) {
        self.login_timeout_secs.store(seconds, Ordering::Relaxed);
    }

    pub fn log_sink(&self) -> Option<Arc<dyn LogSink>> {
        self.log_sink.read().clone()
    }

    pub fn set_log_sink(&self, sink: Option<Arc<dyn LogSink>>) {
        *self.log_sink.write() = sink;
    }

    pub fn has_log_sink(&self) -> bool {
        self.log_sink.read().is_some()
    }

    /// Writes `message` to the log sink, if one is set
    pub fn println(&self, message: &str) {
        if let Some(sink) = self.log_sink() {
            sink.write_line(message);
        }
    }

    /// Like [`println`](Self::println), but only builds the message when a
    /// sink is actually listening
    pub fn trace<F>(&self, message: F)
    where
        F: FnOnce() -> String,
    {
        if let Some(sink) = self.log_sink() {
            sink.write_line(&message());
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::new(0)
    }
}

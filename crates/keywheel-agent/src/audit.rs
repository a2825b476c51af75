//! Audit trail sinks.
//!
//! Every state transition is recorded as one timestamped line. Lines always
//! go to stderr; a file sink is added when a path is configured. Append
//! failures after startup are surfaced to the caller but never halt
//! rotation — only failing to open the file at startup is fatal.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::Mutex,
    time::SystemTime,
};

use keywheel_core::{AuditError, AuditSink};

/// File-plus-stderr audit sink.
pub struct AuditLog {
    file: Option<Mutex<File>>,
}

impl AuditLog {
    /// Open the audit trail, appending to `path` when given.
    ///
    /// `None` (or an empty configured path) keeps stderr-only output.
    pub fn open(path: Option<&Path>) -> Result<Self, AuditError> {
        let file = match path {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Mutex::new(file))
            },
            None => None,
        };
        Ok(Self { file })
    }

    fn stamped(line: &str) -> String {
        format!("{} {line}\n", humantime::format_rfc3339_seconds(SystemTime::now()))
    }
}

impl AuditSink for AuditLog {
    /// # Panics
    ///
    /// Panics if the file mutex is poisoned (a writer panicked mid-append).
    #[allow(clippy::expect_used)]
    fn record(&self, line: &str) -> Result<(), AuditError> {
        let stamped = Self::stamped(line);

        // Write both sinks even if the first fails; report the first error.
        let stderr_result = std::io::stderr().lock().write_all(stamped.as_bytes());

        let file_result = match &self.file {
            Some(file) => {
                let mut file = file.lock().expect("audit file mutex poisoned");
                file.write_all(stamped.as_bytes()).and_then(|()| file.flush())
            },
            None => Ok(()),
        };

        stderr_result?;
        file_result?;
        Ok(())
    }
}

/// In-memory audit sink for tests and simulation.
///
/// Captures every recorded line for later assertion.
#[derive(Clone, Default)]
pub struct MemoryAudit {
    lines: std::sync::Arc<Mutex<Vec<String>>>,
}

impl MemoryAudit {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines recorded so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for MemoryAudit {
    /// # Panics
    ///
    /// Panics if the mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    fn record(&self, line: &str) -> Result<(), AuditError> {
        self.lines.lock().expect("audit mutex poisoned").push(line.to_string());
        Ok(())
    }
}

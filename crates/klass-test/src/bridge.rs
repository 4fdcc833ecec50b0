//! Status bridge: one JSON envelope per line.
//!
//! Progress lines look like `{"jstest":{"status":"pass","test":"K#test_x"}}`
//! and the final line like `{"jstest":{"total":3,"fail":0,"error":1}}`.
//! [`JsonReporter`] produces them, [`BridgeConsole`] consumes them.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runner::{Reporter, TestResult, TestResults, TestStatus};

/// Errors when reading or writing bridge messages
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The line is not a JSON envelope
    #[error("invalid status envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope is neither a progress line nor a complete summary
    #[error("status envelope carries neither a test status nor a summary")]
    Incomplete,

    /// Reading input or writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Outer wrapper of every bridge message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEnvelope {
    /// The message itself
    pub jstest: Status,
}

/// Either a per-test progress report or the run summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    /// `pass`, `fail` or `error` on progress lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Test name on progress lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    /// Number of tests run (summary)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    /// Number of failures (summary)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<usize>,
    /// Number of errors (summary)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<usize>,
}

impl Status {
    /// Progress line for one finished test
    pub fn progress(status: TestStatus, test: &str) -> Self {
        Self {
            status: Some(status.as_str().to_string()),
            test: Some(test.to_string()),
            ..Self::default()
        }
    }

    /// Summary line closing a run
    pub fn summary(total: usize, fail: usize, error: usize) -> Self {
        Self {
            total: Some(total),
            fail: Some(fail),
            error: Some(error),
            ..Self::default()
        }
    }

    /// Process exit code for a summary (0 when nothing failed or errored);
    /// `None` for progress lines and incomplete summaries
    pub fn exit_code(&self) -> Option<i32> {
        if self.status.is_some() {
            return None;
        }
        match (self.fail, self.error) {
            (Some(fail), Some(error)) => Some(if fail == 0 && error == 0 { 0 } else { 1 }),
            _ => None,
        }
    }

    /// Human-readable rendering: `[PASS] name` or the summary sentence
    pub fn render(&self) -> Result<String, BridgeError> {
        if let Some(status) = &self.status {
            return Ok(format!(
                "[{}] {}",
                status.to_uppercase(),
                self.test.as_deref().unwrap_or_default()
            ));
        }
        match (self.total, self.fail, self.error) {
            (Some(total), Some(fail), Some(error)) => Ok(format!(
                "{} tests, {} failures, {} errors",
                total, fail, error
            )),
            _ => Err(BridgeError::Incomplete),
        }
    }
}

impl StatusEnvelope {
    /// Wrap a status
    pub fn new(jstest: Status) -> Self {
        Self { jstest }
    }

    /// Parse one line
    pub fn parse(line: &str) -> Result<Self, BridgeError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Serialize to a single line (no trailing newline)
    pub fn to_line(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Producer ─────────────────────────────────────────────────────────────

/// Reporter emitting one envelope per line.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    /// Report into `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, status: Status) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, &StatusEnvelope::new(status))?;
        writeln!(self.out)
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn record(&mut self, result: &TestResult) -> io::Result<()> {
        self.emit(Status::progress(result.status, &result.name))
    }

    fn finish(&mut self, results: &TestResults) -> io::Result<()> {
        self.emit(Status::summary(
            results.total(),
            results.failures(),
            results.errors(),
        ))?;
        self.out.flush()
    }
}

// ── Consumer ─────────────────────────────────────────────────────────────

/// Consumes bridge lines, echoing progress and remembering the exit status
/// once a summary arrives. Malformed lines are skipped.
pub struct BridgeConsole<W: Write> {
    out: W,
    exit_status: Option<i32>,
}

impl<W: Write> BridgeConsole<W> {
    /// Console printing into `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            exit_status: None,
        }
    }

    /// Handle one line. Only output failures are reported as errors.
    pub fn log(&mut self, line: &str) -> io::Result<()> {
        let status = match StatusEnvelope::parse(line) {
            Ok(envelope) => envelope.jstest,
            Err(err) => {
                log::debug!("skipping bridge line: {}", err);
                return Ok(());
            }
        };
        let rendered = match status.render() {
            Ok(rendered) => rendered,
            Err(err) => {
                log::debug!("skipping bridge line: {}", err);
                return Ok(());
            }
        };

        writeln!(self.out, "{}", rendered)?;
        if let Some(code) = status.exit_code() {
            self.exit_status = Some(code);
        }
        Ok(())
    }

    /// Exit code once a summary has been seen
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    /// Whether a summary has arrived
    pub fn is_finished(&self) -> bool {
        self.exit_status.is_some()
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

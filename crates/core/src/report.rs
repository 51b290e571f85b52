//! Run outcome reporting
//!
//! Turns an `Outcome` into operator-facing output and a process exit code.
//! The one-line summary goes to stdout; the full diagnostic (stage name,
//! error chain) goes to the tracing sink, and optionally to a structured
//! log file as a JSON record. Reporting is best-effort: formatting or log
//! file problems never raise further errors.

use crate::errors::{PkiError, ScriptletError};
use crate::orchestrator::{Direction, Outcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error as _;
use std::path::PathBuf;
use tracing::error;

/// Structured diagnostic record written for failed runs
#[derive(Debug, Serialize)]
pub struct DiagnosticRecord {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub stage: String,
    pub error: String,
    pub error_chain: Vec<String>,
}

impl DiagnosticRecord {
    fn new(direction: Direction, stage: &str, error: &PkiError) -> Self {
        let mut error_chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            error_chain.push(cause.to_string());
            source = cause.source();
        }
        Self {
            timestamp: Utc::now(),
            direction,
            stage: stage.to_string(),
            error: error.to_string(),
            error_chain,
        }
    }
}

/// Renders outcomes for the operator
#[derive(Debug, Default)]
pub struct Reporter {
    log_file: Option<PathBuf>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Additionally write failure diagnostics to the given file
    pub fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self { log_file }
    }

    /// Report the outcome and return the process exit code.
    ///
    /// Success and clean cancellation exit 0; a failure exits 1 after the
    /// one-line summary. Subprocess failures additionally surface the
    /// failing command line and its captured output verbatim.
    pub fn report(&self, outcome: &Outcome, direction: Direction) -> i32 {
        match outcome {
            Outcome::Success => {
                println!();
                println!("{} complete.", direction.noun());
                0
            }
            Outcome::Canceled => {
                println!("{} canceled.", direction.noun());
                0
            }
            Outcome::Failure { stage, error } => {
                self.log_failure(direction, stage, error);

                println!();
                match error {
                    PkiError::Scriptlet(ScriptletError::Process {
                        command, output, ..
                    }) => {
                        println!("{} failed: Command failed: {}", direction.noun(), command);
                        if !output.is_empty() {
                            println!("{}", output);
                        }
                    }
                    _ => {
                        println!("{} failed: {}", direction.noun(), error);
                    }
                }
                println!();
                1
            }
        }
    }

    fn log_failure(&self, direction: Direction, stage: &str, error: &PkiError) {
        let record = DiagnosticRecord::new(direction, stage, error);
        error!(
            stage = %record.stage,
            error = %record.error,
            "{} failed",
            direction.noun()
        );

        if let Some(path) = &self.log_file {
            match serde_json::to_string_pretty(&record) {
                Ok(json) => {
                    if let Err(e) = std::fs::write(path, json) {
                        error!("Failed to write log file {}: {}", path.display(), e);
                    }
                }
                Err(e) => error!("Failed to serialize diagnostic record: {}", e),
            }
        }
    }
}

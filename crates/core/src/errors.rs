//! Error types and handling
//!
//! This module provides domain-specific error types for the administration
//! engine. The taxonomy is structured with specific error enums for each
//! domain (Configuration, Precondition, Scriptlet, Instance) that are then
//! wrapped in the main PkiError enum for unified error handling.

use thiserror::Error;

/// Configuration composition errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file parsing error
    #[error("Failed to parse configuration file {path}: {message}")]
    Parsing { path: String, message: String },

    /// Required configuration source is missing
    #[error("Configuration file not found: {path}")]
    NotFound { path: String },

    /// The same key is defined as a plain value in one source and used as a
    /// section name in another
    #[error("Conflicting definitions for key '{key}': value and section")]
    KeyConflict { key: String },

    /// Configuration file I/O error
    #[error("Failed to read configuration file")]
    Io(#[from] std::io::Error),
}

/// Precondition failures detected before any scriptlet runs
#[derive(Error, Debug)]
pub enum PreconditionError {
    /// The command requires root privileges
    #[error("'{program}' must be run as root")]
    NotRoot { program: String },

    /// The target instance directory does not exist
    #[error("Instance does not exist: {path}")]
    InstanceMissing { path: String },

    /// The target subsystem directory does not exist inside the instance
    #[error("{subsystem} subsystem does not exist in {path}")]
    SubsystemMissing { subsystem: String, path: String },
}

/// Scriptlet resolution and execution errors
#[derive(Error, Debug)]
pub enum ScriptletError {
    /// A configured scriptlet name has no registered implementation
    #[error("Unknown scriptlet: {name}")]
    Unknown { name: String },

    /// A command invoked by a scriptlet exited with a nonzero status.
    /// The command line and captured output are preserved verbatim for
    /// the failure report.
    #[error("Command failed with exit code {code}: {command}")]
    Process {
        command: String,
        output: String,
        code: i32,
    },

    /// An empty or unparsable command string was configured
    #[error("Invalid command string: {message}")]
    InvalidCommand { message: String },

    /// Generic scriptlet failure
    #[error("{message}")]
    Failed { message: String },

    /// Filesystem error inside a scriptlet
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<InstanceError> for ScriptletError {
    fn from(e: InstanceError) -> Self {
        ScriptletError::Failed {
            message: e.to_string(),
        }
    }
}

/// Server instance errors
#[derive(Error, Debug)]
pub enum InstanceError {
    /// The named instance does not exist or has an unusable layout
    #[error("Invalid instance: {name}")]
    Invalid { name: String },

    /// A target path already exists and --force was not given
    #[error("Path already exists: {path}")]
    AlreadyExists { path: String },

    /// A required file is missing
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// Instance filesystem I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum PkiError {
    /// Configuration composition errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Precondition failures (missing instance/subsystem, privileges)
    #[error("{0}")]
    Precondition(#[from] PreconditionError),

    /// Scriptlet resolution and execution errors
    #[error("{0}")]
    Scriptlet(#[from] ScriptletError),

    /// Server instance errors
    #[error("{0}")]
    Instance(#[from] InstanceError),

    /// Uncategorized I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results with PkiError
pub type Result<T> = std::result::Result<T, PkiError>;

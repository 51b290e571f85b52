//! Command-line interface definition and dispatch
//!
//! Global flags mirror the server tooling conventions: `-v/--verbose` and
//! `--debug` raise the log level, `--log-format` switches between text and
//! JSON logs. Each subcommand hands off to its implementation in
//! `commands/`.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use pkictl_core::instance::DEFAULT_INSTANCE_NAME;
use std::path::PathBuf;

/// Log format options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// PKI server instance administration
#[derive(Debug, Parser)]
#[command(name = "pkictl", version, about = "PKI server instance administration")]
pub struct Cli {
    /// Run in verbose mode (info-level logging)
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Run in debug mode (debug-level logging)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// pkictl subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Remove a deployed subsystem from an instance
    #[command(long_about = "Remove a deployed subsystem from an instance\n\n\
        Composes the master configuration from the packaged defaults and the\n\
        instance's recorded deployment configuration, then runs the configured\n\
        teardown scriptlets in order. Without a subsystem argument the command\n\
        runs attended and prompts for the missing values.")]
    Destroy {
        /// Subsystem to remove (CA, KRA, OCSP, TKS, TPS); prompted for when omitted
        subsystem: Option<String>,

        /// Instance ID (default: pki-tomcat)
        #[arg(short = 'i', long, value_name = "INSTANCE")]
        instance: Option<String>,

        /// Security domain user
        #[arg(short = 'u', value_name = "USER")]
        secdomain_user: Option<String>,

        /// Security domain password file path
        #[arg(short = 'W', value_name = "FILE")]
        secdomain_pass_file: Option<PathBuf>,

        /// Force removal of the subsystem
        #[arg(long)]
        force: bool,

        /// Remove subsystem logs
        #[arg(long)]
        remove_logs: bool,

        /// Write failure diagnostics to this file
        #[arg(long, value_name = "PATH")]
        log_file: Option<PathBuf>,
    },

    /// ACME subsystem management commands
    Acme {
        #[command(subcommand)]
        command: AcmeCommands,
    },
}

/// ACME management subcommands
#[derive(Debug, Subcommand)]
pub enum AcmeCommands {
    /// Create ACME subsystem
    Create {
        /// Subsystem name
        #[arg(default_value = "acme")]
        name: String,
        /// Instance ID
        #[arg(short = 'i', long, value_name = "INSTANCE", default_value = DEFAULT_INSTANCE_NAME)]
        instance: String,
        /// Force creation
        #[arg(long)]
        force: bool,
    },

    /// Remove ACME subsystem
    Remove {
        /// Subsystem name
        #[arg(default_value = "acme")]
        name: String,
        /// Instance ID
        #[arg(short = 'i', long, value_name = "INSTANCE", default_value = DEFAULT_INSTANCE_NAME)]
        instance: String,
        /// Force removal
        #[arg(long)]
        force: bool,
    },

    /// Deploy ACME webapp
    Deploy {
        /// Subsystem name
        #[arg(default_value = "acme")]
        name: String,
        /// Instance ID
        #[arg(short = 'i', long, value_name = "INSTANCE", default_value = DEFAULT_INSTANCE_NAME)]
        instance: String,
        /// Wait until started
        #[arg(long)]
        wait: bool,
        /// Maximum wait time in seconds
        #[arg(long, value_name = "SECONDS", default_value_t = 60)]
        max_wait: u64,
    },

    /// Undeploy ACME webapp
    Undeploy {
        /// Subsystem name
        #[arg(default_value = "acme")]
        name: String,
        /// Instance ID
        #[arg(short = 'i', long, value_name = "INSTANCE", default_value = DEFAULT_INSTANCE_NAME)]
        instance: String,
        /// Wait until stopped
        #[arg(long)]
        wait: bool,
        /// Maximum wait time in seconds
        #[arg(long, value_name = "SECONDS", default_value_t = 60)]
        max_wait: u64,
    },

    /// ACME metadata management commands
    Metadata {
        #[command(subcommand)]
        command: MetadataCommands,
    },

    /// ACME database management commands
    Database {
        #[command(subcommand)]
        command: DatabaseCommands,
    },

    /// ACME issuer management commands
    Issuer {
        #[command(subcommand)]
        command: IssuerCommands,
    },

    /// ACME realm management commands
    Realm {
        #[command(subcommand)]
        command: RealmCommands,
    },
}

/// ACME metadata subcommands
#[derive(Debug, Subcommand)]
pub enum MetadataCommands {
    /// Show ACME metadata configuration
    Show {
        /// Instance ID
        #[arg(short = 'i', long, value_name = "INSTANCE", default_value = DEFAULT_INSTANCE_NAME)]
        instance: String,
    },
    /// Modify ACME metadata configuration
    Mod {
        /// Instance ID
        #[arg(short = 'i', long, value_name = "INSTANCE", default_value = DEFAULT_INSTANCE_NAME)]
        instance: String,
    },
}

/// ACME database subcommands
#[derive(Debug, Subcommand)]
pub enum DatabaseCommands {
    /// Show ACME database configuration
    Show {
        /// Instance ID
        #[arg(short = 'i', long, value_name = "INSTANCE", default_value = DEFAULT_INSTANCE_NAME)]
        instance: String,
    },
    /// Modify ACME database configuration
    Mod {
        /// Instance ID
        #[arg(short = 'i', long, value_name = "INSTANCE", default_value = DEFAULT_INSTANCE_NAME)]
        instance: String,
        /// Database type (silent mode)
        #[arg(long = "type", value_name = "TYPE")]
        db_type: Option<String>,
        /// Set property value (silent mode, format: NAME=VALUE, can be repeated)
        #[arg(short = 'D', value_name = "NAME=VALUE")]
        property: Vec<String>,
    },
}

/// ACME issuer subcommands
#[derive(Debug, Subcommand)]
pub enum IssuerCommands {
    /// Show ACME issuer configuration
    Show {
        /// Instance ID
        #[arg(short = 'i', long, value_name = "INSTANCE", default_value = DEFAULT_INSTANCE_NAME)]
        instance: String,
    },
    /// Modify ACME issuer configuration
    Mod {
        /// Instance ID
        #[arg(short = 'i', long, value_name = "INSTANCE", default_value = DEFAULT_INSTANCE_NAME)]
        instance: String,
        /// Issuer type (silent mode)
        #[arg(long = "type", value_name = "TYPE")]
        issuer_type: Option<String>,
        /// Set property value (silent mode, format: NAME=VALUE, can be repeated)
        #[arg(short = 'D', value_name = "NAME=VALUE")]
        property: Vec<String>,
    },
}

/// ACME realm subcommands
#[derive(Debug, Subcommand)]
pub enum RealmCommands {
    /// Show ACME realm configuration
    Show {
        /// Instance ID
        #[arg(short = 'i', long, value_name = "INSTANCE", default_value = DEFAULT_INSTANCE_NAME)]
        instance: String,
    },
    /// Modify ACME realm configuration
    Mod {
        /// Instance ID
        #[arg(short = 'i', long, value_name = "INSTANCE", default_value = DEFAULT_INSTANCE_NAME)]
        instance: String,
        /// Realm type (silent mode)
        #[arg(long = "type", value_name = "TYPE")]
        realm_type: Option<String>,
        /// Set property value (silent mode, format: NAME=VALUE, can be repeated)
        #[arg(short = 'D', value_name = "NAME=VALUE")]
        property: Vec<String>,
    },
}

impl Cli {
    /// Effective log level from the verbosity flags
    fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose > 0 {
            "info"
        } else {
            "warn"
        }
    }

    /// Dispatch the parsed subcommand.
    ///
    /// Initializes logging from the global options, executes the selected
    /// subcommand, and returns the process exit code.
    pub fn dispatch(self) -> Result<i32> {
        let log_format = match self.log_format {
            LogFormat::Text => Some("text"),
            LogFormat::Json => Some("json"),
        };

        // Default the filter from the verbosity flags unless the user
        // overrode it via environment
        let log_level = self.log_level();
        if std::env::var_os("PKICTL_LOG").is_none() && std::env::var_os("RUST_LOG").is_none() {
            std::env::set_var(
                "RUST_LOG",
                format!("pkictl={},pkictl_core={}", log_level, log_level),
            );
        }
        pkictl_core::logging::init(log_format)?;

        tracing::debug!("CLI initialized with log level: {}", log_level);

        match self.command {
            Commands::Destroy {
                subsystem,
                instance,
                secdomain_user,
                secdomain_pass_file,
                force,
                remove_logs,
                log_file,
            } => {
                use crate::commands::destroy::{execute_destroy, DestroyArgs};

                execute_destroy(DestroyArgs {
                    subsystem,
                    instance,
                    secdomain_user,
                    secdomain_pass_file,
                    force,
                    remove_logs,
                    log_file,
                })
            }
            Commands::Acme { command } => {
                crate::commands::acme::execute_acme(command)?;
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destroy_flags_parse() {
        let cli = Cli::parse_from([
            "pkictl",
            "destroy",
            "CA",
            "-i",
            "pki-tomcat",
            "--force",
            "--remove-logs",
        ]);
        match cli.command {
            Commands::Destroy {
                subsystem,
                instance,
                force,
                remove_logs,
                ..
            } => {
                assert_eq!(subsystem.as_deref(), Some("CA"));
                assert_eq!(instance.as_deref(), Some("pki-tomcat"));
                assert!(force);
                assert!(remove_logs);
            }
            other => panic!("expected destroy, got {:?}", other),
        }
    }

    #[test]
    fn test_destroy_without_subsystem_is_valid() {
        let cli = Cli::parse_from(["pkictl", "destroy"]);
        assert!(matches!(
            cli.command,
            Commands::Destroy {
                subsystem: None,
                ..
            }
        ));
    }

    #[test]
    fn test_acme_database_mod_properties() {
        let cli = Cli::parse_from([
            "pkictl",
            "acme",
            "database",
            "mod",
            "--type",
            "postgresql",
            "-D",
            "user=acmeuser",
            "-D",
            "password=secret",
        ]);
        match cli.command {
            Commands::Acme {
                command:
                    AcmeCommands::Database {
                        command:
                            DatabaseCommands::Mod {
                                db_type, property, ..
                            },
                    },
            } => {
                assert_eq!(db_type.as_deref(), Some("postgresql"));
                assert_eq!(property, vec!["user=acmeuser", "password=secret"]);
            }
            other => panic!("expected database mod, got {:?}", other),
        }
    }

    #[test]
    fn test_verbosity_levels() {
        let cli = Cli::parse_from(["pkictl", "destroy", "CA"]);
        assert_eq!(cli.log_level(), "warn");

        let cli = Cli::parse_from(["pkictl", "-v", "destroy", "CA"]);
        assert_eq!(cli.log_level(), "info");

        let cli = Cli::parse_from(["pkictl", "--debug", "destroy", "CA"]);
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn test_acme_default_instance() {
        let cli = Cli::parse_from(["pkictl", "acme", "create"]);
        match cli.command {
            Commands::Acme {
                command: AcmeCommands::Create { name, instance, .. },
            } => {
                assert_eq!(name, "acme");
                assert_eq!(instance, DEFAULT_INSTANCE_NAME);
            }
            other => panic!("expected acme create, got {:?}", other),
        }
    }
}

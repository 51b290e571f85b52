//! Initialization scriptlet
//!
//! First stage of every run: announces the operation and brings the server
//! to a safe state by stopping the instance service before anything is
//! removed or created.

use crate::errors::ScriptletError;
use crate::process::run_command;
use crate::scriptlet::{Scriptlet, StageContext};
use tracing::{info, instrument, warn};

/// Configuration key overriding the service stop command
const STOP_COMMAND_KEY: &str = "pki_stop_command";

pub struct Initialization;

impl Initialization {
    fn stop_command(context: &StageContext) -> String {
        match context.config.get(STOP_COMMAND_KEY) {
            Some(command) => command.to_string(),
            None => format!(
                "systemctl stop pki-tomcatd@{}.service",
                context.identity.instance_name
            ),
        }
    }
}

impl Scriptlet for Initialization {
    fn name(&self) -> &'static str {
        "initialization"
    }

    #[instrument(skip(self, context))]
    fn setup(&self, context: &StageContext) -> Result<(), ScriptletError> {
        info!("Beginning deployment of {}", context.identity);
        Ok(())
    }

    #[instrument(skip(self, context))]
    fn teardown(&self, context: &StageContext) -> Result<(), ScriptletError> {
        info!("Beginning removal of {}", context.identity);

        let command = Self::stop_command(context);
        match run_command(&command) {
            Ok(_) => Ok(()),
            Err(e) if context.force => {
                // On a partially removed instance the service unit may
                // already be gone; force mode keeps the teardown going.
                warn!("Ignoring stop failure: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

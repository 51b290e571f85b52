//! Security databases scriptlet
//!
//! The NSS certificate database and its password file under the instance
//! `conf/` tree are shared by every subsystem in the instance. They are
//! created once for the first subsystem and removed only when the last
//! subsystem is being torn down.

use crate::errors::ScriptletError;
use crate::scriptlet::{Scriptlet, StageContext};
use std::fs;
use tracing::{debug, info, instrument};

pub struct SecurityDatabases;

impl Scriptlet for SecurityDatabases {
    fn name(&self) -> &'static str {
        "security_databases"
    }

    #[instrument(skip(self, context))]
    fn setup(&self, context: &StageContext) -> Result<(), ScriptletError> {
        let instance = context.instance();
        let alias_dir = instance.conf_dir().join("alias");
        if alias_dir.exists() {
            debug!("Shared NSS database already present");
            return Ok(());
        }
        instance.makedirs(&alias_dir, context.force)?;
        Ok(())
    }

    #[instrument(skip(self, context))]
    fn teardown(&self, context: &StageContext) -> Result<(), ScriptletError> {
        let instance = context.instance();

        let remaining = instance.subsystems();
        if !remaining.is_empty() {
            info!(
                "Keeping shared NSS database; {} subsystem(s) still deployed",
                remaining.len()
            );
            return Ok(());
        }

        let alias_dir = instance.conf_dir().join("alias");
        if alias_dir.exists() {
            info!("Removing {}", alias_dir.display());
            fs::remove_dir_all(&alias_dir)?;
        } else {
            debug!("No NSS database at {}", alias_dir.display());
        }

        let password_conf = instance.conf_dir().join("password.conf");
        if password_conf.exists() {
            info!("Removing {}", password_conf.display());
            fs::remove_file(&password_conf)?;
        }
        Ok(())
    }
}

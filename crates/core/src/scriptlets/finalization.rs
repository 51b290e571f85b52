//! Finalization scriptlet
//!
//! Last stage of every run. On teardown it purges the instance log
//! directory when log removal was requested.

use crate::errors::ScriptletError;
use crate::instance::remove_tree;
use crate::scriptlet::{Scriptlet, StageContext};
use tracing::{debug, info, instrument};

pub struct Finalization;

impl Scriptlet for Finalization {
    fn name(&self) -> &'static str {
        "finalization"
    }

    #[instrument(skip(self, context))]
    fn setup(&self, context: &StageContext) -> Result<(), ScriptletError> {
        info!("Deployment of {} finalized", context.identity);
        Ok(())
    }

    #[instrument(skip(self, context))]
    fn teardown(&self, context: &StageContext) -> Result<(), ScriptletError> {
        let instance = context.instance();

        if context.remove_logs {
            // Log removal only applies once no subsystem needs the logs
            if instance.subsystems().is_empty() {
                remove_tree(&instance.log_dir(), true)?;
            } else {
                debug!("Keeping logs; instance still hosts subsystems");
            }
        }

        info!("Removal of {} finalized", context.identity);
        Ok(())
    }
}

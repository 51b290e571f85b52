//! Instance layout scriptlet
//!
//! Manages the instance's own directory tree. On teardown the tree is only
//! removed once the last subsystem is gone; an instance still hosting other
//! subsystems is left in place.

use crate::errors::ScriptletError;
use crate::instance::remove_tree;
use crate::scriptlet::{Scriptlet, StageContext};
use tracing::{info, instrument};

pub struct InstanceLayout;

impl Scriptlet for InstanceLayout {
    fn name(&self) -> &'static str {
        "instance_layout"
    }

    #[instrument(skip(self, context))]
    fn setup(&self, context: &StageContext) -> Result<(), ScriptletError> {
        let instance = context.instance();
        if instance.exists() {
            info!("Instance {} already laid out", instance.name());
            return Ok(());
        }
        for dir in [
            instance.conf_dir(),
            instance.webapps_dir(),
            instance.contexts_dir(),
        ] {
            instance.makedirs(&dir, true)?;
        }
        Ok(())
    }

    #[instrument(skip(self, context))]
    fn teardown(&self, context: &StageContext) -> Result<(), ScriptletError> {
        let instance = context.instance();

        let remaining = instance.subsystems();
        if !remaining.is_empty() {
            info!(
                "Keeping instance {}; {} subsystem(s) still deployed",
                instance.name(),
                remaining.len()
            );
            return Ok(());
        }

        remove_tree(&instance.root_dir(), context.force)?;
        Ok(())
    }
}

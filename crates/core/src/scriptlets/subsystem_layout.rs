//! Subsystem layout scriptlet
//!
//! Manages the subsystem's directory tree under the instance root, including
//! the deployment registry that records how the subsystem was installed.

use crate::errors::ScriptletError;
use crate::instance::remove_tree;
use crate::scriptlet::{Scriptlet, StageContext};
use tracing::instrument;

pub struct SubsystemLayout;

impl Scriptlet for SubsystemLayout {
    fn name(&self) -> &'static str {
        "subsystem_layout"
    }

    #[instrument(skip(self, context))]
    fn setup(&self, context: &StageContext) -> Result<(), ScriptletError> {
        let instance = context.instance();
        let kind = context.identity.subsystem;

        let registry = instance
            .subsystem_dir(kind)
            .join("registry")
            .join(kind.dir_name());
        instance.makedirs(&registry, context.force)?;
        Ok(())
    }

    #[instrument(skip(self, context))]
    fn teardown(&self, context: &StageContext) -> Result<(), ScriptletError> {
        let instance = context.instance();
        let subsystem_dir = instance.subsystem_dir(context.identity.subsystem);
        remove_tree(&subsystem_dir, context.force)?;
        Ok(())
    }
}

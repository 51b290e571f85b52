//! Configuration scriptlet
//!
//! Manages the subsystem's configuration directory under the instance
//! `conf/` tree: created and seeded from packaged templates during setup,
//! removed during teardown.

use crate::errors::ScriptletError;
use crate::instance::{remove_tree, share_dir};
use crate::scriptlet::{Scriptlet, StageContext};
use tracing::{debug, instrument};

pub struct Configuration;

impl Scriptlet for Configuration {
    fn name(&self) -> &'static str {
        "configuration"
    }

    #[instrument(skip(self, context))]
    fn setup(&self, context: &StageContext) -> Result<(), ScriptletError> {
        let instance = context.instance();
        let kind = context.identity.subsystem;
        let conf_dir = instance.subsystem_conf_dir(kind);

        instance.makedirs(&conf_dir, context.force)?;

        let template = share_dir().join(kind.dir_name()).join("conf").join("CS.cfg");
        if template.exists() {
            instance.copy(&template, &conf_dir.join("CS.cfg"), context.force)?;
        } else {
            debug!("No packaged template at {}", template.display());
        }
        Ok(())
    }

    #[instrument(skip(self, context))]
    fn teardown(&self, context: &StageContext) -> Result<(), ScriptletError> {
        let instance = context.instance();
        let conf_dir = instance.subsystem_conf_dir(context.identity.subsystem);
        remove_tree(&conf_dir, context.force)?;
        Ok(())
    }
}

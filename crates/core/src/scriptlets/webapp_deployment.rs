//! Webapp deployment scriptlet
//!
//! Deploys or undeploys the subsystem webapp by managing its context
//! descriptor in the instance. Wait behavior is configurable; by default the
//! descriptor change is fire-and-forget because the server is stopped during
//! teardown.

use crate::errors::ScriptletError;
use crate::instance::share_dir;
use crate::scriptlet::{Scriptlet, StageContext};
use std::time::Duration;
use tracing::instrument;

/// Configuration key for the descriptor wait timeout, in seconds
const DEPLOY_WAIT_KEY: &str = "pki_deploy_wait";

pub struct WebappDeployment;

impl WebappDeployment {
    fn max_wait(context: &StageContext) -> Duration {
        let seconds = context
            .config
            .get(DEPLOY_WAIT_KEY)
            .and_then(|value| value.parse().ok())
            .unwrap_or(0u64);
        Duration::from_secs(seconds)
    }
}

impl Scriptlet for WebappDeployment {
    fn name(&self) -> &'static str {
        "webapp_deployment"
    }

    #[instrument(skip(self, context))]
    fn setup(&self, context: &StageContext) -> Result<(), ScriptletError> {
        let instance = context.instance();
        let kind = context.identity.subsystem;
        let name = kind.dir_name();

        let share = share_dir().join(name);
        let descriptor = share
            .join("conf")
            .join("Catalina")
            .join("localhost")
            .join(format!("{}.xml", name));
        let doc_base = share.join("webapps").join(name);

        let max_wait = Self::max_wait(context);
        instance.deploy_webapp(name, &descriptor, &doc_base, !max_wait.is_zero(), max_wait)?;
        Ok(())
    }

    #[instrument(skip(self, context))]
    fn teardown(&self, context: &StageContext) -> Result<(), ScriptletError> {
        let instance = context.instance();
        let name = context.identity.subsystem.dir_name();
        let max_wait = Self::max_wait(context);
        instance.undeploy_webapp(name, !max_wait.is_zero(), max_wait)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MasterConfig;
    use crate::instance::{InstanceIdentity, SubsystemKind};

    #[test]
    fn test_max_wait_defaults_to_zero() {
        let config = MasterConfig::default();
        let identity = InstanceIdentity::new(SubsystemKind::Ca, "pki-tomcat");
        let context = StageContext {
            config: &config,
            identity: &identity,
            force: false,
            remove_logs: false,
        };
        assert!(WebappDeployment::max_wait(&context).is_zero());
    }

    #[test]
    fn test_max_wait_from_config() {
        let config: MasterConfig = [("pki_deploy_wait".to_string(), "30".to_string())]
            .into_iter()
            .collect();
        let identity = InstanceIdentity::new(SubsystemKind::Ca, "pki-tomcat");
        let context = StageContext {
            config: &config,
            identity: &identity,
            force: false,
            remove_logs: false,
        };
        assert_eq!(
            WebappDeployment::max_wait(&context),
            Duration::from_secs(30)
        );
    }
}

//! Lifecycle orchestration
//!
//! Executes a configured sequence of scriptlets in order for a lifecycle
//! direction. The orchestrator enforces:
//!
//! 1. All scriptlet names resolve before anything executes (pre-flight).
//! 2. Execution is strictly sequential in the declared order - later stages
//!    assume the side effects of earlier stages have already landed.
//! 3. The run aborts on the first failure; executed stages are not rolled
//!    back. Scriptlets are individually idempotent so a retried run
//!    converges.
//!
//! Cancellation is a first-class outcome variant, not an error: an operator
//! declining the confirmation prompt terminates the run cleanly.

use crate::errors::{PkiError, PreconditionError};
use crate::instance::ServerInstance;
use crate::scriptlet::{ScriptletRegistry, StageContext};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

/// Which half of the lifecycle a run drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Deploy the subsystem (scriptlet `setup` operations)
    Setup,
    /// Remove the subsystem (scriptlet `teardown` operations)
    Teardown,
}

impl Direction {
    /// The direction name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Setup => "setup",
            Direction::Teardown => "teardown",
        }
    }

    /// Human-facing noun for report lines
    pub fn noun(&self) -> &'static str {
        match self {
            Direction::Setup => "Installation",
            Direction::Teardown => "Uninstallation",
        }
    }
}

/// Result of a complete run.
///
/// Produced once per run and consumed by the reporter, which turns it into
/// the process exit code.
#[derive(Debug)]
pub enum Outcome {
    /// Every stage completed
    Success,
    /// The operator canceled the run before any stage executed
    Canceled,
    /// A stage failed; no later stage was invoked
    Failure {
        /// Name of the failing stage (or the unresolvable stage name when
        /// pre-flight resolution failed)
        stage: String,
        /// The underlying error
        error: PkiError,
    },
}

impl Outcome {
    /// Whether the run completed successfully
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Check the enumerated preconditions before composition begins.
///
/// Without `force`, a missing instance or subsystem directory is fatal
/// before any stage runs. With `force`, exactly these two checks downgrade
/// to warnings so that teardown can proceed on already-partially-removed
/// state. Other failures are never downgraded.
pub fn check_preconditions(
    instance: &ServerInstance,
    subsystem: crate::instance::SubsystemKind,
    force: bool,
) -> Result<(), PreconditionError> {
    let instance_path = instance.root_dir();
    if !instance_path.exists() {
        if !force {
            return Err(PreconditionError::InstanceMissing {
                path: instance_path.display().to_string(),
            });
        }
        warn!(
            "Instance does not exist: {}; continuing due to --force",
            instance_path.display()
        );
        return Ok(());
    }

    let subsystem_path = instance.subsystem_dir(subsystem);
    if !subsystem_path.exists() {
        if !force {
            return Err(PreconditionError::SubsystemMissing {
                subsystem: subsystem.as_str().to_string(),
                path: instance_path.display().to_string(),
            });
        }
        warn!(
            "{} subsystem does not exist in {}; continuing due to --force",
            subsystem,
            instance_path.display()
        );
    }

    Ok(())
}

/// Drives scriptlets in declared order for one lifecycle direction
pub struct Orchestrator<'a> {
    registry: &'a ScriptletRegistry,
}

impl<'a> Orchestrator<'a> {
    pub fn new(registry: &'a ScriptletRegistry) -> Self {
        Self { registry }
    }

    /// Run the named stages in order.
    ///
    /// All names are resolved up front; an unknown name produces a failure
    /// outcome before any stage executes. An empty stage list is a
    /// successful no-op. On the first stage failure the run aborts
    /// immediately - remaining stages are not attempted and executed stages
    /// are not rolled back.
    #[instrument(skip(self, stage_names, context), fields(direction = direction.as_str(), identity = %context.identity))]
    pub fn run<S: AsRef<str>>(
        &self,
        stage_names: &[S],
        direction: Direction,
        context: &StageContext,
    ) -> Outcome {
        if stage_names.is_empty() {
            info!("No stages configured; nothing to do");
            return Outcome::Success;
        }

        let scriptlets = match self.registry.resolve_all(stage_names) {
            Ok(scriptlets) => scriptlets,
            Err(e) => {
                let stage = match &e {
                    crate::errors::ScriptletError::Unknown { name } => name.clone(),
                    _ => String::new(),
                };
                error!("Stage resolution failed: {}", e);
                return Outcome::Failure {
                    stage,
                    error: e.into(),
                };
            }
        };

        for scriptlet in scriptlets {
            let name = scriptlet.name();
            info!("Executing {} ({})", name, direction.as_str());

            let result = match direction {
                Direction::Setup => scriptlet.setup(context),
                Direction::Teardown => scriptlet.teardown(context),
            };

            if let Err(e) = result {
                error!("Stage {} failed: {}", name, e);
                return Outcome::Failure {
                    stage: name.to_string(),
                    error: e.into(),
                };
            }
        }

        Outcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MasterConfig;
    use crate::errors::ScriptletError;
    use crate::instance::{InstanceIdentity, SubsystemKind};
    use crate::scriptlet::Scriptlet;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Records invocations and optionally fails
    struct Probe {
        name: &'static str,
        fail: bool,
        journal: Arc<Mutex<Vec<String>>>,
    }

    impl Scriptlet for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn setup(&self, _context: &StageContext) -> Result<(), ScriptletError> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("setup:{}", self.name));
            if self.fail {
                return Err(ScriptletError::Failed {
                    message: "probe failure".to_string(),
                });
            }
            Ok(())
        }

        fn teardown(&self, _context: &StageContext) -> Result<(), ScriptletError> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("teardown:{}", self.name));
            if self.fail {
                return Err(ScriptletError::Process {
                    command: "pki-server subsystem-undeploy".to_string(),
                    output: "Connection refused".to_string(),
                    code: 1,
                });
            }
            Ok(())
        }
    }

    fn probe_registry(
        names: &[(&'static str, bool)],
    ) -> (ScriptletRegistry, Arc<Mutex<Vec<String>>>) {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ScriptletRegistry::new();
        for (name, fail) in names {
            registry.register(Box::new(Probe {
                name,
                fail: *fail,
                journal: journal.clone(),
            }));
        }
        (registry, journal)
    }

    fn test_context<'a>(
        config: &'a MasterConfig,
        identity: &'a InstanceIdentity,
    ) -> StageContext<'a> {
        StageContext {
            config,
            identity,
            force: false,
            remove_logs: false,
        }
    }

    #[test]
    fn test_stages_run_in_declared_order() {
        let (registry, journal) = probe_registry(&[
            ("stop-service", false),
            ("remove-webapp", false),
            ("remove-config", false),
        ]);
        let config = MasterConfig::default();
        let identity = InstanceIdentity::new(SubsystemKind::Ca, "pki-tomcat");
        let context = test_context(&config, &identity);

        // declared order differs from registration order and is authoritative
        let outcome = Orchestrator::new(&registry).run(
            &["remove-config", "stop-service", "remove-webapp"],
            Direction::Teardown,
            &context,
        );

        assert!(outcome.is_success());
        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "teardown:remove-config",
                "teardown:stop-service",
                "teardown:remove-webapp"
            ]
        );
    }

    #[test]
    fn test_first_failure_aborts_remaining_stages() {
        let (registry, journal) = probe_registry(&[
            ("stop-service", false),
            ("remove-webapp", true),
            ("remove-config", false),
        ]);
        let config = MasterConfig::default();
        let identity = InstanceIdentity::new(SubsystemKind::Ca, "pki-tomcat");
        let context = test_context(&config, &identity);

        let outcome = Orchestrator::new(&registry).run(
            &["stop-service", "remove-webapp", "remove-config"],
            Direction::Teardown,
            &context,
        );

        match outcome {
            Outcome::Failure { stage, error } => {
                assert_eq!(stage, "remove-webapp");
                // subprocess failures keep the command line and output
                match error {
                    PkiError::Scriptlet(ScriptletError::Process {
                        command, output, ..
                    }) => {
                        assert_eq!(command, "pki-server subsystem-undeploy");
                        assert_eq!(output, "Connection refused");
                    }
                    other => panic!("expected process error, got {:?}", other),
                }
            }
            other => panic!("expected failure, got {:?}", other),
        }

        assert_eq!(
            *journal.lock().unwrap(),
            vec!["teardown:stop-service", "teardown:remove-webapp"]
        );
    }

    #[test]
    fn test_empty_stage_list_is_successful_noop() {
        let (registry, journal) = probe_registry(&[("stop-service", false)]);
        let config = MasterConfig::default();
        let identity = InstanceIdentity::new(SubsystemKind::Ca, "pki-tomcat");
        let context = test_context(&config, &identity);

        let outcome =
            Orchestrator::new(&registry).run::<&str>(&[], Direction::Teardown, &context);

        assert!(outcome.is_success());
        assert!(journal.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_stage_fails_before_any_execution() {
        let (registry, journal) = probe_registry(&[("stop-service", false)]);
        let config = MasterConfig::default();
        let identity = InstanceIdentity::new(SubsystemKind::Ca, "pki-tomcat");
        let context = test_context(&config, &identity);

        let outcome = Orchestrator::new(&registry).run(
            &["stop-service", "no-such-stage"],
            Direction::Teardown,
            &context,
        );

        match outcome {
            Outcome::Failure { stage, error } => {
                assert_eq!(stage, "no-such-stage");
                assert!(matches!(
                    error,
                    PkiError::Scriptlet(ScriptletError::Unknown { .. })
                ));
            }
            other => panic!("expected failure, got {:?}", other),
        }

        // pre-flight resolution failed, so nothing ran - including the
        // stages that would have resolved
        assert!(journal.lock().unwrap().is_empty());
    }

    #[test]
    fn test_direction_selects_operation() {
        let (registry, journal) = probe_registry(&[("stop-service", false)]);
        let config = MasterConfig::default();
        let identity = InstanceIdentity::new(SubsystemKind::Ca, "pki-tomcat");
        let context = test_context(&config, &identity);

        Orchestrator::new(&registry).run(&["stop-service"], Direction::Setup, &context);
        assert_eq!(*journal.lock().unwrap(), vec!["setup:stop-service"]);
    }

    #[test]
    fn test_preconditions_without_force() {
        let dir = TempDir::new().unwrap();
        let instance = ServerInstance::with_base_dir("pki-tomcat", dir.path());

        let result = check_preconditions(&instance, SubsystemKind::Ca, false);
        assert!(matches!(
            result,
            Err(PreconditionError::InstanceMissing { .. })
        ));

        fs::create_dir_all(instance.root_dir()).unwrap();
        let result = check_preconditions(&instance, SubsystemKind::Ca, false);
        assert!(matches!(
            result,
            Err(PreconditionError::SubsystemMissing { .. })
        ));

        fs::create_dir_all(instance.subsystem_dir(SubsystemKind::Ca)).unwrap();
        assert!(check_preconditions(&instance, SubsystemKind::Ca, false).is_ok());
    }

    #[test]
    fn test_preconditions_downgraded_by_force() {
        let dir = TempDir::new().unwrap();
        let instance = ServerInstance::with_base_dir("pki-tomcat", dir.path());

        assert!(check_preconditions(&instance, SubsystemKind::Ca, true).is_ok());

        fs::create_dir_all(instance.root_dir()).unwrap();
        assert!(check_preconditions(&instance, SubsystemKind::Ca, true).is_ok());
    }

    #[test]
    fn test_direction_strings() {
        assert_eq!(Direction::Setup.as_str(), "setup");
        assert_eq!(Direction::Teardown.as_str(), "teardown");
        assert_eq!(Direction::Setup.noun(), "Installation");
        assert_eq!(Direction::Teardown.noun(), "Uninstallation");
    }
}

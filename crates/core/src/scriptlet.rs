//! Scriptlet contract and registry
//!
//! A scriptlet is a named, independently implemented lifecycle step. The
//! orchestrator knows nothing about scriptlet internals; it sees only this
//! uniform contract. Implementations are registered by name at process
//! startup and resolved with a pre-flight existence check for every
//! configured name before execution begins, so a run never discovers an
//! unresolvable stage halfway through.

use crate::config::MasterConfig;
use crate::errors::ScriptletError;
use crate::instance::{InstanceIdentity, ServerInstance};
use indexmap::IndexMap;
use tracing::debug;

/// Context handed unchanged to every scriptlet invocation.
///
/// The configuration is shared read-only; a scriptlet that must persist
/// values writes through the property-file primitives, never back into the
/// in-memory map consumed by later scriptlets in the same run.
#[derive(Debug, Clone)]
pub struct StageContext<'a> {
    /// Master configuration composed for this run
    pub config: &'a MasterConfig,
    /// Target subsystem and instance
    pub identity: &'a InstanceIdentity,
    /// Downgrade the enumerated precondition failures to warnings
    pub force: bool,
    /// Remove instance log artifacts during teardown
    pub remove_logs: bool,
}

impl StageContext<'_> {
    /// Server instance handle for the target identity
    pub fn instance(&self) -> ServerInstance {
        ServerInstance::new(&self.identity.instance_name)
    }
}

/// A named lifecycle stage with a setup and a teardown operation.
///
/// Scriptlets are expected to be individually idempotent so that a retried
/// run converges; the orchestrator never rolls back executed stages.
pub trait Scriptlet {
    /// The name this scriptlet is registered and configured under
    fn name(&self) -> &'static str;

    /// Perform this stage of deployment
    fn setup(&self, context: &StageContext) -> Result<(), ScriptletError>;

    /// Perform this stage of removal
    fn teardown(&self, context: &StageContext) -> Result<(), ScriptletError>;
}

/// Name-to-implementation registry for scriptlets.
///
/// Registration order is preserved for listing, but execution order always
/// comes from the configured stage list, never from the registry.
#[derive(Default)]
pub struct ScriptletRegistry {
    handlers: IndexMap<&'static str, Box<dyn Scriptlet>>,
}

impl ScriptletRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in scriptlets
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for scriptlet in crate::scriptlets::builtin() {
            registry.register(scriptlet);
        }
        registry
    }

    /// Register a scriptlet under its own name
    pub fn register(&mut self, scriptlet: Box<dyn Scriptlet>) {
        debug!("Registering scriptlet {}", scriptlet.name());
        self.handlers.insert(scriptlet.name(), scriptlet);
    }

    /// Resolve a single name
    pub fn resolve(&self, name: &str) -> Result<&dyn Scriptlet, ScriptletError> {
        self.handlers
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| ScriptletError::Unknown {
                name: name.to_string(),
            })
    }

    /// Resolve every name up front, failing on the first unknown one.
    ///
    /// Partial execution with an unresolvable later stage would leave the
    /// instance in an inconsistent state; resolving all names before any
    /// stage runs avoids that.
    pub fn resolve_all<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<&dyn Scriptlet>, ScriptletError> {
        names
            .iter()
            .map(|name| self.resolve(name.as_ref()))
            .collect()
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::SubsystemKind;

    struct Noop(&'static str);

    impl Scriptlet for Noop {
        fn name(&self) -> &'static str {
            self.0
        }

        fn setup(&self, _context: &StageContext) -> Result<(), ScriptletError> {
            Ok(())
        }

        fn teardown(&self, _context: &StageContext) -> Result<(), ScriptletError> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ScriptletRegistry::new();
        registry.register(Box::new(Noop("initialization")));

        assert!(registry.resolve("initialization").is_ok());
        let err = registry.resolve("missing").err().unwrap();
        assert!(matches!(err, ScriptletError::Unknown { name } if name == "missing"));
    }

    #[test]
    fn test_resolve_all_fails_fast_on_unknown_name() {
        let mut registry = ScriptletRegistry::new();
        registry.register(Box::new(Noop("initialization")));
        registry.register(Box::new(Noop("finalization")));

        let resolved = registry
            .resolve_all(&["initialization", "finalization"])
            .unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].name(), "initialization");

        let err = registry
            .resolve_all(&["initialization", "missing", "finalization"])
            .err()
            .unwrap();
        assert!(matches!(err, ScriptletError::Unknown { name } if name == "missing"));
    }

    #[test]
    fn test_builtin_registry_covers_default_stage_list() {
        let registry = ScriptletRegistry::builtin();
        let default_order = [
            "initialization",
            "configuration",
            "webapp_deployment",
            "subsystem_layout",
            "security_databases",
            "instance_layout",
            "finalization",
        ];
        for name in default_order {
            assert!(registry.resolve(name).is_ok(), "missing builtin {}", name);
        }
    }

    #[test]
    fn test_stage_context_instance() {
        let config = MasterConfig::default();
        let identity = InstanceIdentity::new(SubsystemKind::Ca, "pki-tomcat");
        let context = StageContext {
            config: &config,
            identity: &identity,
            force: false,
            remove_logs: false,
        };
        assert_eq!(context.instance().name(), "pki-tomcat");
    }
}

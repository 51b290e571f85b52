//! Built-in scriptlet implementations
//!
//! Each scriptlet owns one slice of the deployment lifecycle. The default
//! teardown order, as shipped in the packaged configuration, is:
//! initialization -> configuration -> webapp_deployment -> subsystem_layout
//! -> security_databases -> instance_layout -> finalization.
//!
//! Internals here are opaque to the orchestrator: it only sees the uniform
//! setup/teardown contract.

mod configuration;
mod finalization;
mod initialization;
mod instance_layout;
mod security_databases;
mod subsystem_layout;
mod webapp_deployment;

pub use configuration::Configuration;
pub use finalization::Finalization;
pub use initialization::Initialization;
pub use instance_layout::InstanceLayout;
pub use security_databases::SecurityDatabases;
pub use subsystem_layout::SubsystemLayout;
pub use webapp_deployment::WebappDeployment;

use crate::scriptlet::Scriptlet;

/// The built-in scriptlets, in default execution order
pub fn builtin() -> Vec<Box<dyn Scriptlet>> {
    vec![
        Box::new(Initialization),
        Box::new(Configuration),
        Box::new(WebappDeployment),
        Box::new(SubsystemLayout),
        Box::new(SecurityDatabases),
        Box::new(InstanceLayout),
        Box::new(Finalization),
    ]
}

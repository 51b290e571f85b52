//! Destroy command implementation
//!
//! Removes a deployed subsystem from an instance: resolves the target
//! identity (from flags or interactively), checks preconditions, composes
//! the master configuration from the layered sources, and drives the
//! configured teardown scriptlets in order.

use anyhow::Result;
use pkictl_core::config::{Composer, DESTROY_SCRIPTLETS_KEY};
use pkictl_core::errors::{PkiError, PreconditionError};
use pkictl_core::instance::{
    self, InstanceIdentity, ServerInstance, SubsystemKind, DEFAULT_INSTANCE_NAME,
};
use pkictl_core::orchestrator::{check_preconditions, Direction, Orchestrator, Outcome};
use pkictl_core::process;
use pkictl_core::report::Reporter;
use pkictl_core::scriptlet::{ScriptletRegistry, StageContext};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, instrument};

use crate::ui::prompt::Prompt;

/// Destroy command arguments
#[derive(Debug, Clone)]
pub struct DestroyArgs {
    /// Subsystem to remove; prompted for when absent
    pub subsystem: Option<String>,
    /// Instance name; prompted for when absent
    pub instance: Option<String>,
    /// Security domain user
    pub secdomain_user: Option<String>,
    /// Security domain password file
    pub secdomain_pass_file: Option<PathBuf>,
    /// Downgrade the enumerated precondition failures to warnings
    pub force: bool,
    /// Remove subsystem logs during teardown
    pub remove_logs: bool,
    /// Failure diagnostics file
    pub log_file: Option<PathBuf>,
}

/// Execute the destroy command
#[instrument(skip(args))]
pub fn execute_destroy(args: DestroyArgs) -> Result<i32> {
    debug!("Destroy args: {:?}", args);

    // An operator interrupt terminates cleanly, distinct from a stage failure
    ctrlc::set_handler(|| {
        println!();
        println!("Uninstallation canceled.");
        std::process::exit(1);
    })?;

    ensure_root()?;

    let reporter = Reporter::with_log_file(args.log_file.clone());

    // Resolve the target identity before anything else; a canceled
    // confirmation terminates the run cleanly
    let identity = match resolve_identity(&args)? {
        Some(identity) => identity,
        None => return Ok(reporter.report(&Outcome::Canceled, Direction::Teardown)),
    };

    let server = ServerInstance::new(&identity.instance_name);
    check_preconditions(&server, identity.subsystem, args.force)?;

    let config = compose_configuration(&args, &identity, &server)?;

    if let Some(path) = &args.log_file {
        println!("Uninstallation log: {}", path.display());
    }

    println!(
        "Uninstalling {} from {}.",
        identity.subsystem,
        server.root_dir().display()
    );

    let stage_names = config.stage_names(DESTROY_SCRIPTLETS_KEY);
    debug!("Teardown stages: {:?}", stage_names);

    let registry = ScriptletRegistry::builtin();
    let context = StageContext {
        config: &config,
        identity: &identity,
        force: args.force,
        remove_logs: args.remove_logs,
    };

    let outcome = Orchestrator::new(&registry).run(&stage_names, Direction::Teardown, &context);
    Ok(reporter.report(&outcome, Direction::Teardown))
}

/// Require root for the packaged filesystem layout.
///
/// Skipped when `PKICTL_BASE_DIR` redirects the layout to a location the
/// current user owns.
fn ensure_root() -> Result<()> {
    if std::env::var_os("PKICTL_BASE_DIR").is_some() {
        return Ok(());
    }
    if let Some(uid) = process::current_uid() {
        if uid != 0 {
            return Err(PreconditionError::NotRoot {
                program: "pkictl destroy".to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Resolve the target subsystem and instance.
///
/// Values missing from the arguments are requested interactively; a run
/// that prompted for anything also asks for confirmation before starting.
/// Returns `None` when the operator cancels.
fn resolve_identity(args: &DestroyArgs) -> Result<Option<InstanceIdentity>> {
    loop {
        let mut interactive = false;

        let subsystem = match &args.subsystem {
            Some(name) => {
                SubsystemKind::from_str(name).map_err(|message| anyhow::anyhow!(message))?
            }
            None => {
                interactive = true;
                let answer = Prompt::new("Subsystem (CA/KRA/OCSP/TKS/TPS)")
                    .options(&["CA", "KRA", "OCSP", "TKS", "TPS"])
                    .default_value("CA")
                    .read()?;
                match answer {
                    Some(name) => SubsystemKind::from_str(&name)
                        .map_err(|message| anyhow::anyhow!(message))?,
                    None => return Ok(None),
                }
            }
        };

        let instance_name = match &args.instance {
            Some(name) => name.clone(),
            None => {
                interactive = true;
                match Prompt::new("Instance")
                    .default_value(DEFAULT_INSTANCE_NAME)
                    .read()?
                {
                    Some(name) => name,
                    None => return Ok(None),
                }
            }
        };

        if !interactive {
            return Ok(Some(InstanceIdentity::new(subsystem, instance_name)));
        }

        println!();
        let begin = Prompt::new("Begin uninstallation (Yes/No/Quit)")
            .options(&["Yes", "Y", "No", "N", "Quit", "Q"])
            .sign("?")
            .required()
            .read()?;
        println!();

        match begin.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("yes") | Some("y") => {
                return Ok(Some(InstanceIdentity::new(subsystem, instance_name)))
            }
            Some("quit") | Some("q") | None => return Ok(None),
            // "No" re-asks for the target
            _ => continue,
        }
    }
}

/// Compose the master configuration for the run.
///
/// Sources, in precedence order: packaged defaults, the instance's recorded
/// deployment configuration, then overrides taken from the command line.
/// With `--force` a missing deployment configuration is tolerated so that
/// teardown converges on partially removed state.
fn compose_configuration(
    args: &DestroyArgs,
    identity: &InstanceIdentity,
    server: &ServerInstance,
) -> Result<pkictl_core::config::MasterConfig> {
    let default_cfg = instance::share_dir()
        .join("server")
        .join("etc")
        .join("default.cfg");
    let deployment_cfg = server.deployment_config_path(identity.subsystem);

    let mut composer = Composer::new(identity.subsystem.as_str())
        .source(default_cfg, true)
        .source(deployment_cfg, !args.force)
        .override_value("pki_instance_name", &identity.instance_name);

    if let Some(user) = &args.secdomain_user {
        composer = composer.override_value("pki_secdomain_user", user);
    }

    if let Some(path) = &args.secdomain_pass_file {
        let content = fs::read_to_string(path)?;
        let password = content.lines().next().unwrap_or("").to_string();
        composer = composer.override_value("pki_secdomain_pass", password);
    }

    let config = composer.compose().map_err(PkiError::from)?;
    debug!("Composed master configuration ({} keys)", config.len());
    Ok(config)
}

//! Server instance abstraction
//!
//! Models a deployed application-server installation hosting one or more
//! subsystems: layout paths, existence checks, directory creation, file
//! copies, webapp deploy/undeploy, and property persistence. Scriptlets and
//! the ACME sub-commands go through this type instead of touching the
//! filesystem layout directly.

use crate::errors::InstanceError;
use crate::properties::PropertyFile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default instance name used when none is supplied
pub const DEFAULT_INSTANCE_NAME: &str = "pki-tomcat";

/// Root of deployed instances, overridable via `PKICTL_BASE_DIR`
pub fn base_dir() -> PathBuf {
    match std::env::var_os("PKICTL_BASE_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from("/var/lib/pki"),
    }
}

/// Root of packaged shared data, overridable via `PKICTL_SHARE_DIR`
pub fn share_dir() -> PathBuf {
    match std::env::var_os("PKICTL_SHARE_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from("/usr/share/pki"),
    }
}

/// Root of instance log directories, overridable via `PKICTL_LOG_DIR`
pub fn log_dir() -> PathBuf {
    match std::env::var_os("PKICTL_LOG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from("/var/log/pki"),
    }
}

/// One of the fixed server roles a subsystem can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubsystemKind {
    Ca,
    Kra,
    Ocsp,
    Tks,
    Tps,
}

impl SubsystemKind {
    /// Canonical uppercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            SubsystemKind::Ca => "CA",
            SubsystemKind::Kra => "KRA",
            SubsystemKind::Ocsp => "OCSP",
            SubsystemKind::Tks => "TKS",
            SubsystemKind::Tps => "TPS",
        }
    }

    /// Lowercase name used for directories and webapp paths
    pub fn dir_name(&self) -> &'static str {
        match self {
            SubsystemKind::Ca => "ca",
            SubsystemKind::Kra => "kra",
            SubsystemKind::Ocsp => "ocsp",
            SubsystemKind::Tks => "tks",
            SubsystemKind::Tps => "tps",
        }
    }

    /// All known subsystem kinds
    pub fn all() -> &'static [SubsystemKind] {
        &[
            SubsystemKind::Ca,
            SubsystemKind::Kra,
            SubsystemKind::Ocsp,
            SubsystemKind::Tks,
            SubsystemKind::Tps,
        ]
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubsystemKind {
    type Err = String;

    /// Case-insensitive parse, normalized to the canonical uppercase form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CA" => Ok(SubsystemKind::Ca),
            "KRA" => Ok(SubsystemKind::Kra),
            "OCSP" => Ok(SubsystemKind::Ocsp),
            "TKS" => Ok(SubsystemKind::Tks),
            "TPS" => Ok(SubsystemKind::Tps),
            _ => Err(format!("Invalid subsystem: {}", s)),
        }
    }
}

/// The resolved target of a run: which subsystem in which instance.
///
/// Immutable once resolved (from flags or interactively) and required before
/// any scriptlet runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceIdentity {
    pub subsystem: SubsystemKind,
    pub instance_name: String,
}

impl InstanceIdentity {
    pub fn new(subsystem: SubsystemKind, instance_name: impl Into<String>) -> Self {
        Self {
            subsystem,
            instance_name: instance_name.into(),
        }
    }
}

impl fmt::Display for InstanceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.instance_name, self.subsystem)
    }
}

/// A deployed application-server instance on disk
#[derive(Debug, Clone)]
pub struct ServerInstance {
    name: String,
    base_dir: PathBuf,
}

impl ServerInstance {
    /// Instance rooted under the configured base directory
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_base_dir(name, base_dir())
    }

    /// Instance rooted under an explicit base directory
    pub fn with_base_dir(name: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            base_dir: base_dir.into(),
        }
    }

    /// Instance name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance root directory
    pub fn root_dir(&self) -> PathBuf {
        self.base_dir.join(&self.name)
    }

    /// Instance configuration directory
    pub fn conf_dir(&self) -> PathBuf {
        self.root_dir().join("conf")
    }

    /// Deployed webapps directory
    pub fn webapps_dir(&self) -> PathBuf {
        self.root_dir().join("webapps")
    }

    /// Directory of webapp context descriptors; dropping a descriptor here
    /// triggers deployment, removing it triggers undeployment
    pub fn contexts_dir(&self) -> PathBuf {
        self.conf_dir().join("Catalina").join("localhost")
    }

    /// Instance log directory
    pub fn log_dir(&self) -> PathBuf {
        log_dir().join(&self.name)
    }

    /// Root directory of a deployed subsystem
    pub fn subsystem_dir(&self, kind: SubsystemKind) -> PathBuf {
        self.root_dir().join(kind.dir_name())
    }

    /// Configuration directory of a deployed subsystem
    pub fn subsystem_conf_dir(&self, kind: SubsystemKind) -> PathBuf {
        self.conf_dir().join(kind.dir_name())
    }

    /// Recorded deployment configuration of a subsystem
    pub fn deployment_config_path(&self, kind: SubsystemKind) -> PathBuf {
        self.subsystem_dir(kind)
            .join("registry")
            .join(kind.dir_name())
            .join("deployment.cfg")
    }

    /// Whether the instance directory exists
    pub fn exists(&self) -> bool {
        self.root_dir().is_dir()
    }

    /// Verify the instance exists and has a usable layout
    pub fn load(&self) -> Result<(), InstanceError> {
        if !self.exists() {
            return Err(InstanceError::Invalid {
                name: self.name.clone(),
            });
        }
        debug!("Loaded instance {}", self.name);
        Ok(())
    }

    /// Subsystems currently deployed in this instance
    pub fn subsystems(&self) -> Vec<SubsystemKind> {
        SubsystemKind::all()
            .iter()
            .copied()
            .filter(|kind| self.subsystem_dir(*kind).is_dir())
            .collect()
    }

    /// Create a directory (and parents). An existing directory is an error
    /// unless `force` is set.
    pub fn makedirs(&self, path: &Path, force: bool) -> Result<(), InstanceError> {
        if path.exists() && !force {
            return Err(InstanceError::AlreadyExists {
                path: path.display().to_string(),
            });
        }
        debug!("Creating {}", path.display());
        fs::create_dir_all(path)?;
        Ok(())
    }

    /// Copy a file into the instance. An existing destination is an error
    /// unless `force` is set.
    pub fn copy(&self, from: &Path, to: &Path, force: bool) -> Result<(), InstanceError> {
        if !from.exists() {
            return Err(InstanceError::NotFound {
                path: from.display().to_string(),
            });
        }
        if to.exists() && !force {
            return Err(InstanceError::AlreadyExists {
                path: to.display().to_string(),
            });
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!("Copying {} to {}", from.display(), to.display());
        fs::copy(from, to)?;
        Ok(())
    }

    /// Persist a property file into the instance
    pub fn store_properties(
        &self,
        path: &Path,
        properties: &PropertyFile,
    ) -> Result<(), InstanceError> {
        properties.store(path)?;
        Ok(())
    }

    /// Deploy a webapp by dropping its context descriptor into place.
    ///
    /// With `wait`, polls until the server has expanded the webapp directory
    /// or `max_wait` elapses (timeout is a warning, not an error - the server
    /// may simply be stopped).
    pub fn deploy_webapp(
        &self,
        name: &str,
        descriptor: &Path,
        doc_base: &Path,
        wait: bool,
        max_wait: Duration,
    ) -> Result<(), InstanceError> {
        if !doc_base.exists() {
            warn!("Webapp document base not found: {}", doc_base.display());
        }

        let context = self.contexts_dir().join(format!("{}.xml", name));
        self.copy(descriptor, &context, true)?;
        info!("Deployed {} webapp", name);

        if wait {
            self.wait_for(&self.webapps_dir().join(name), true, max_wait);
        }
        Ok(())
    }

    /// Undeploy a webapp by removing its context descriptor.
    ///
    /// A webapp that is already undeployed is not an error, so a retried
    /// teardown converges.
    pub fn undeploy_webapp(
        &self,
        name: &str,
        wait: bool,
        max_wait: Duration,
    ) -> Result<(), InstanceError> {
        let context = self.contexts_dir().join(format!("{}.xml", name));
        if !context.exists() {
            debug!("Webapp {} is not deployed", name);
            return Ok(());
        }

        fs::remove_file(&context)?;
        info!("Undeployed {} webapp", name);

        if wait {
            self.wait_for(&self.webapps_dir().join(name), false, max_wait);
        }
        Ok(())
    }

    /// Block until `path` exists (or stops existing), up to `max_wait`
    fn wait_for(&self, path: &Path, present: bool, max_wait: Duration) {
        let started = Instant::now();
        while path.exists() != present {
            if started.elapsed() >= max_wait {
                warn!(
                    "Timed out after {:?} waiting for {}",
                    max_wait,
                    path.display()
                );
                return;
            }
            std::thread::sleep(Duration::from_secs(1));
        }
    }
}

/// Remove a directory tree.
///
/// A missing tree is an error unless `force` is set, in which case it is
/// skipped with a debug log (re-running teardown on partially removed state
/// must converge).
pub fn remove_tree(path: &Path, force: bool) -> Result<(), InstanceError> {
    if !path.exists() {
        if force {
            debug!("Skipping missing {}", path.display());
            return Ok(());
        }
        return Err(InstanceError::NotFound {
            path: path.display().to_string(),
        });
    }
    info!("Removing {}", path.display());
    fs::remove_dir_all(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_instance() -> (TempDir, ServerInstance) {
        let dir = TempDir::new().unwrap();
        let instance = ServerInstance::with_base_dir("pki-tomcat", dir.path());
        (dir, instance)
    }

    #[test]
    fn test_subsystem_kind_parse() {
        assert_eq!("ca".parse::<SubsystemKind>().unwrap(), SubsystemKind::Ca);
        assert_eq!("KRA".parse::<SubsystemKind>().unwrap(), SubsystemKind::Kra);
        assert_eq!(
            "oCsP".parse::<SubsystemKind>().unwrap(),
            SubsystemKind::Ocsp
        );
        assert!("tls".parse::<SubsystemKind>().is_err());
    }

    #[test]
    fn test_subsystem_kind_names() {
        assert_eq!(SubsystemKind::Ca.as_str(), "CA");
        assert_eq!(SubsystemKind::Ca.dir_name(), "ca");
        assert_eq!(SubsystemKind::all().len(), 5);
    }

    #[test]
    fn test_identity_display() {
        let identity = InstanceIdentity::new(SubsystemKind::Ca, "pki-tomcat");
        assert_eq!(identity.to_string(), "pki-tomcat/CA");
    }

    #[test]
    fn test_layout_paths() {
        let instance = ServerInstance::with_base_dir("pki-tomcat", "/var/lib/pki");
        assert_eq!(
            instance.root_dir(),
            PathBuf::from("/var/lib/pki/pki-tomcat")
        );
        assert_eq!(
            instance.subsystem_dir(SubsystemKind::Ca),
            PathBuf::from("/var/lib/pki/pki-tomcat/ca")
        );
        assert_eq!(
            instance.deployment_config_path(SubsystemKind::Kra),
            PathBuf::from("/var/lib/pki/pki-tomcat/kra/registry/kra/deployment.cfg")
        );
        assert_eq!(
            instance.contexts_dir(),
            PathBuf::from("/var/lib/pki/pki-tomcat/conf/Catalina/localhost")
        );
    }

    #[test]
    fn test_exists_and_load() {
        let (_dir, instance) = make_instance();
        assert!(!instance.exists());
        assert!(instance.load().is_err());

        fs::create_dir_all(instance.root_dir()).unwrap();
        assert!(instance.exists());
        assert!(instance.load().is_ok());
    }

    #[test]
    fn test_subsystems_present() {
        let (_dir, instance) = make_instance();
        fs::create_dir_all(instance.subsystem_dir(SubsystemKind::Ca)).unwrap();
        fs::create_dir_all(instance.subsystem_dir(SubsystemKind::Tps)).unwrap();

        assert_eq!(
            instance.subsystems(),
            vec![SubsystemKind::Ca, SubsystemKind::Tps]
        );
    }

    #[test]
    fn test_makedirs_force() {
        let (_dir, instance) = make_instance();
        let target = instance.conf_dir().join("acme");

        instance.makedirs(&target, false).unwrap();
        assert!(target.is_dir());

        let result = instance.makedirs(&target, false);
        assert!(matches!(result, Err(InstanceError::AlreadyExists { .. })));

        instance.makedirs(&target, true).unwrap();
    }

    #[test]
    fn test_copy_force() {
        let (dir, instance) = make_instance();
        let source = dir.path().join("database.conf");
        fs::write(&source, "class=x\n").unwrap();
        let target = instance.conf_dir().join("acme").join("database.conf");

        instance.copy(&source, &target, false).unwrap();
        assert!(target.is_file());

        let result = instance.copy(&source, &target, false);
        assert!(matches!(result, Err(InstanceError::AlreadyExists { .. })));

        instance.copy(&source, &target, true).unwrap();
    }

    #[test]
    fn test_deploy_and_undeploy_webapp() {
        let (dir, instance) = make_instance();
        let descriptor = dir.path().join("acme.xml");
        fs::write(&descriptor, "<Context docBase=\"/usr/share/pki/acme/webapps/acme\"/>").unwrap();

        instance
            .deploy_webapp(
                "acme",
                &descriptor,
                dir.path(),
                false,
                Duration::from_secs(0),
            )
            .unwrap();
        assert!(instance.contexts_dir().join("acme.xml").is_file());

        instance
            .undeploy_webapp("acme", false, Duration::from_secs(0))
            .unwrap();
        assert!(!instance.contexts_dir().join("acme.xml").exists());

        // already undeployed is not an error
        instance
            .undeploy_webapp("acme", false, Duration::from_secs(0))
            .unwrap();
    }

    #[test]
    fn test_remove_tree_force_semantics() {
        let (dir, _instance) = make_instance();
        let target = dir.path().join("gone");

        assert!(remove_tree(&target, false).is_err());
        assert!(remove_tree(&target, true).is_ok());

        fs::create_dir_all(target.join("nested")).unwrap();
        remove_tree(&target, false).unwrap();
        assert!(!target.exists());
    }
}

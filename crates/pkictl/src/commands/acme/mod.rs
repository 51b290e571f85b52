//! ACME subsystem management commands
//!
//! Covers lifecycle of the ACME subsystem inside an instance (create,
//! remove, deploy, undeploy) and the per-concern configuration editors
//! (metadata, database, issuer, realm). Each concern lives in one flat
//! property file under the subsystem's configuration directory and is
//! edited via read-modify-merge-write.

pub mod database;
pub mod issuer;
pub mod metadata;
pub mod realm;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use pkictl_core::instance::{self, remove_tree, ServerInstance};
use pkictl_core::IndexMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::cli::AcmeCommands;

// TODO: auto-populate these maps from the packaged database/issuer/realm
// template directories
pub static DATABASE_CLASSES: Lazy<IndexMap<&'static str, &'static str>> = Lazy::new(|| {
    IndexMap::from([
        ("ds", "org.dogtagpki.acme.database.DSDatabase"),
        ("in-memory", "org.dogtagpki.acme.database.InMemoryDatabase"),
        ("ldap", "org.dogtagpki.acme.database.LDAPDatabase"),
        ("openldap", "org.dogtagpki.acme.database.OpenLDAPDatabase"),
        ("postgresql", "org.dogtagpki.acme.database.PostgreSQLDatabase"),
    ])
});

pub static ISSUER_CLASSES: Lazy<IndexMap<&'static str, &'static str>> = Lazy::new(|| {
    IndexMap::from([
        ("nss", "org.dogtagpki.acme.issuer.NSSIssuer"),
        ("pki", "org.dogtagpki.acme.issuer.PKIIssuer"),
    ])
});

pub static REALM_CLASSES: Lazy<IndexMap<&'static str, &'static str>> = Lazy::new(|| {
    IndexMap::from([
        ("ds", "org.dogtagpki.acme.realm.DSRealm"),
        ("in-memory", "org.dogtagpki.acme.realm.InMemoryRealm"),
        ("postgresql", "org.dogtagpki.acme.realm.PostgreSQLRealm"),
    ])
});

/// Reverse-map an implementation class to its short type name
pub fn type_for_class<'a>(
    classes: &'a IndexMap<&'static str, &'static str>,
    class: Option<&str>,
) -> Option<&'a str> {
    let class = class?;
    classes
        .iter()
        .find(|(_, c)| **c == class)
        .map(|(t, _)| *t)
}

/// Load an existing instance or fail with a user-facing error
pub fn load_instance(name: &str) -> Result<ServerInstance> {
    let server = ServerInstance::new(name);
    server.load()?;
    Ok(server)
}

/// The ACME configuration directory inside an instance
pub fn acme_conf_dir(server: &ServerInstance, name: &str) -> PathBuf {
    server.conf_dir().join(name)
}

/// Packaged ACME shared data directory
pub fn acme_share_dir() -> PathBuf {
    instance::share_dir().join("acme")
}

/// Parse a `-D NAME=VALUE` property setting
pub fn parse_property(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((name, value)) => Ok((name.to_string(), value.to_string())),
        None => bail!("Invalid property setting: {} (expected NAME=VALUE)", raw),
    }
}

/// Dispatch an ACME subcommand
pub fn execute_acme(command: AcmeCommands) -> Result<()> {
    match command {
        AcmeCommands::Create {
            name,
            instance,
            force,
        } => execute_create(&name, &instance, force),
        AcmeCommands::Remove {
            name,
            instance,
            force,
        } => execute_remove(&name, &instance, force),
        AcmeCommands::Deploy {
            name,
            instance,
            wait,
            max_wait,
        } => execute_deploy(&name, &instance, wait, max_wait),
        AcmeCommands::Undeploy {
            name,
            instance,
            wait,
            max_wait,
        } => execute_undeploy(&name, &instance, wait, max_wait),
        AcmeCommands::Metadata { command } => metadata::execute(command),
        AcmeCommands::Database { command } => database::execute(command),
        AcmeCommands::Issuer { command } => issuer::execute(command),
        AcmeCommands::Realm { command } => realm::execute(command),
    }
}

/// Create the ACME configuration directory from the packaged templates
fn execute_create(name: &str, instance_name: &str, force: bool) -> Result<()> {
    let server = load_instance(instance_name)?;

    let conf_dir = acme_conf_dir(&server, name);
    server.makedirs(&conf_dir, force)?;

    let share_conf = acme_share_dir().join("conf");
    for file in ["database.conf", "issuer.conf", "realm.conf"] {
        server.copy(&share_conf.join(file), &conf_dir.join(file), force)?;
    }
    Ok(())
}

/// Remove the ACME configuration directory
fn execute_remove(name: &str, instance_name: &str, force: bool) -> Result<()> {
    let server = load_instance(instance_name)?;

    let conf_dir = acme_conf_dir(&server, name);
    info!("Removing {}", conf_dir.display());
    remove_tree(&conf_dir, force)?;
    Ok(())
}

/// Deploy the ACME webapp into the instance
fn execute_deploy(name: &str, instance_name: &str, wait: bool, max_wait: u64) -> Result<()> {
    let server = load_instance(instance_name)?;

    let descriptor = acme_share_dir()
        .join("conf")
        .join("Catalina")
        .join("localhost")
        .join("acme.xml");
    let doc_base = acme_share_dir().join("webapps").join("acme");

    info!("Deploying {} webapp", name);
    server.deploy_webapp(
        name,
        &descriptor,
        &doc_base,
        wait,
        Duration::from_secs(max_wait),
    )?;
    Ok(())
}

/// Undeploy the ACME webapp from the instance
fn execute_undeploy(name: &str, instance_name: &str, wait: bool, max_wait: u64) -> Result<()> {
    let server = load_instance(instance_name)?;

    info!("Undeploying {} webapp", name);
    server.undeploy_webapp(name, wait, Duration::from_secs(max_wait))?;
    Ok(())
}

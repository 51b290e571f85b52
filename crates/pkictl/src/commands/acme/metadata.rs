//! ACME metadata configuration commands

use anyhow::Result;
use pkictl_core::properties::PropertyFile;
use tracing::info;

use crate::cli::MetadataCommands;
use crate::ui::prompt::{print_editing_banner, Prompt};

use super::{acme_conf_dir, acme_share_dir, load_instance};

pub fn execute(command: MetadataCommands) -> Result<()> {
    match command {
        MetadataCommands::Show { instance } => execute_show(&instance),
        MetadataCommands::Mod { instance } => execute_mod(&instance),
    }
}

/// Load the instance metadata configuration, falling back to the packaged
/// defaults when the instance has none yet
fn load_metadata(instance_name: &str) -> Result<(pkictl_core::instance::ServerInstance, PropertyFile)> {
    let server = load_instance(instance_name)?;

    let metadata_conf = acme_conf_dir(&server, "acme").join("metadata.conf");
    let source = if metadata_conf.exists() {
        metadata_conf
    } else {
        acme_share_dir().join("conf").join("metadata.conf")
    };

    info!("Loading {}", source.display());
    let file = PropertyFile::load(&source)?;
    Ok((server, file))
}

fn execute_show(instance_name: &str) -> Result<()> {
    let (_server, config) = load_metadata(instance_name)?;

    if let Some(terms_of_service) = config.get("termsOfService") {
        println!("  Terms of Service: {}", terms_of_service);
    }
    if let Some(website) = config.get("website") {
        println!("  Website: {}", website);
    }
    if let Some(caa_identities) = config.get("caaIdentities") {
        println!("  CAA Identities: {}", caa_identities);
    }
    if let Some(external_account_required) = config.get("externalAccountRequired") {
        println!("  External Account Required: {}", external_account_required);
    }
    Ok(())
}

fn execute_mod(instance_name: &str) -> Result<()> {
    let (server, mut config) = load_metadata(instance_name)?;

    print_editing_banner();

    let fields = [
        (
            "termsOfService",
            "Terms of Service",
            "Enter the location of the terms of service.",
        ),
        ("website", "Website", "Enter the location of the website."),
        ("caaIdentities", "CAA Identities", "Enter the CAA identities."),
        (
            "externalAccountRequired",
            "External Account Required",
            "Enter true/false whether an external account is required.",
        ),
    ];

    for (key, label, help) in fields {
        println!();
        println!("{}", help);
        let current = config.get(key).map(str::to_string);
        let answer = Prompt::new(label)
            .optional_default(current.as_deref())
            .read()?;
        let Some(value) = answer else {
            println!("Modification canceled.");
            return Ok(());
        };
        config.set_optional(key, Some(&value));
    }

    let metadata_conf = acme_conf_dir(&server, "acme").join("metadata.conf");
    server.store_properties(&metadata_conf, &config)?;
    Ok(())
}

//! ACME issuer configuration commands

use anyhow::{bail, Result};
use pkictl_core::properties::PropertyFile;
use tracing::info;

use crate::cli::IssuerCommands;
use crate::ui::prompt::{print_editing_banner, Prompt};

use super::{
    acme_conf_dir, acme_share_dir, load_instance, parse_property, type_for_class, ISSUER_CLASSES,
};

pub fn execute(command: IssuerCommands) -> Result<()> {
    match command {
        IssuerCommands::Show { instance } => execute_show(&instance),
        IssuerCommands::Mod {
            instance,
            issuer_type,
            property,
        } => execute_mod(&instance, issuer_type.as_deref(), &property),
    }
}

fn execute_show(instance_name: &str) -> Result<()> {
    let server = load_instance(instance_name)?;
    let issuer_conf = acme_conf_dir(&server, "acme").join("issuer.conf");

    info!("Loading {}", issuer_conf.display());
    let config = PropertyFile::load(&issuer_conf)?;

    let issuer_type = type_for_class(&ISSUER_CLASSES, config.get("class"));
    println!("  Issuer Type: {}", issuer_type.unwrap_or("unknown"));

    match issuer_type {
        Some("nss") => {
            if let Some(nickname) = config.get("nickname") {
                println!("  Signing Certificate: {}", nickname);
            }
            if let Some(extensions) = config.get("extensions") {
                println!("  Certificate Extensions: {}", extensions);
            }
        }
        Some("pki") => {
            if let Some(url) = config.get("url") {
                println!("  Server URL: {}", url);
            }
            if let Some(nickname) = config.get("nickname") {
                println!("  Client Certificate: {}", nickname);
            }
            if let Some(username) = config.get("username") {
                println!("  Agent Username: {}", username);
            }
            if config.get("password").is_some() {
                println!("  Agent Password: ********");
            }
            if let Some(password_file) = config.get("passwordFile") {
                println!("  Password file: {}", password_file);
            }
            if let Some(profile) = config.get("profile") {
                println!("  Certificate Profile: {}", profile);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Packaged template for an issuer type
fn template_path(issuer_type: &str) -> std::path::PathBuf {
    acme_share_dir()
        .join("issuer")
        .join(issuer_type)
        .join("issuer.conf")
}

fn execute_mod(instance_name: &str, issuer_type: Option<&str>, properties: &[String]) -> Result<()> {
    if let Some(issuer_type) = issuer_type {
        if !ISSUER_CLASSES.contains_key(issuer_type) {
            bail!("Invalid issuer type: {}", issuer_type);
        }
    }

    let server = load_instance(instance_name)?;
    let issuer_conf = acme_conf_dir(&server, "acme").join("issuer.conf");

    let source = match issuer_type {
        Some(issuer_type) => template_path(issuer_type),
        None => issuer_conf.clone(),
    };
    info!("Loading {}", source.display());
    let mut config = PropertyFile::load(&source)?;

    // --type or -D selects silent mode
    if issuer_type.is_some() || !properties.is_empty() {
        info!("Setting properties:");
        for raw in properties {
            let (name, value) = parse_property(raw)?;
            info!("- {}: {}", name, value);
            config.set_optional(&name, Some(&value));
        }
        server.store_properties(&issuer_conf, &config)?;
        return Ok(());
    }

    // interactive mode
    print_editing_banner();

    let type_names: Vec<&str> = ISSUER_CLASSES.keys().copied().collect();
    println!();
    println!(
        "Enter the type of the certificate issuer. Available types: {}.",
        type_names.join(", ")
    );
    let orig_type = type_for_class(&ISSUER_CLASSES, config.get("class")).map(str::to_string);
    let Some(selected) = Prompt::new("Issuer Type")
        .options(&type_names)
        .optional_default(orig_type.as_deref())
        .required()
        .read()?
    else {
        println!("Modification canceled.");
        return Ok(());
    };
    config.set("class", ISSUER_CLASSES[selected.as_str()]);

    if orig_type.as_deref() != Some(selected.as_str()) {
        let template = template_path(&selected);
        info!("Loading {}", template.display());
        let defaults = PropertyFile::load(&template)?;
        config.merge(&defaults.to_map());
        config.set("class", ISSUER_CLASSES[selected.as_str()]);
    }

    let completed = match selected.as_str() {
        "nss" => prompt_nss_settings(&mut config)?,
        "pki" => prompt_pki_settings(&mut config)?,
        _ => true,
    };
    if !completed {
        println!("Modification canceled.");
        return Ok(());
    }

    server.store_properties(&issuer_conf, &config)?;
    Ok(())
}

/// Interactive settings for the NSS issuer.
///
/// Returns false when the operator interrupts the prompts.
fn prompt_nss_settings(config: &mut PropertyFile) -> Result<bool> {
    println!();
    println!("Enter the nickname of the signing certificate.");
    let current = config.get("nickname").map(str::to_string);
    let Some(nickname) = Prompt::new("Signing Certificate")
        .optional_default(current.as_deref())
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("nickname", Some(&nickname));

    println!();
    println!("Enter the certificate extension configuration.");
    let current = config.get("extensions").map(str::to_string);
    let Some(extensions) = Prompt::new("Certificate Extensions")
        .optional_default(current.as_deref())
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("extensions", Some(&extensions));

    Ok(true)
}

/// Interactive settings for the PKI issuer
fn prompt_pki_settings(config: &mut PropertyFile) -> Result<bool> {
    println!();
    println!("Enter the location of the PKI server (e.g. https://localhost.localdomain:8443).");
    let current = config.get("url").map(str::to_string);
    let Some(url) = Prompt::new("Server URL")
        .optional_default(current.as_deref())
        .required()
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("url", Some(&url));

    println!();
    println!("Enter the certificate nickname for client authentication.");
    println!("This might be the CA agent certificate.");
    println!("Enter blank to use basic authentication.");
    let current = config.get("nickname").map(str::to_string);
    let Some(nickname) = Prompt::new("Client Certificate")
        .optional_default(current.as_deref())
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("nickname", Some(&nickname));

    println!();
    println!("Enter the username of the CA agent for basic authentication.");
    println!("Enter blank if a CA agent certificate is used for client authentication.");
    let current = config.get("username").map(str::to_string);
    let Some(username) = Prompt::new("Agent Username")
        .optional_default(current.as_deref())
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("username", Some(&username));

    println!();
    println!("Enter the CA agent password for basic authentication.");
    println!("Enter blank if the password is already stored in a separate property file");
    println!("or if a CA agent certificate is used for client authentication.");
    let current = config.get("password").map(str::to_string);
    let Some(password) = Prompt::new("Agent Password")
        .optional_default(current.as_deref())
        .secret()
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("password", Some(&password));

    if !password.is_empty() {
        config.remove("passwordFile");
    } else {
        println!();
        println!("Enter the property file that stores the CA agent password.");
        println!("The password must be stored under acmeUserPassword property.");
        let current = config.get("passwordFile").map(str::to_string);
        let Some(password_file) = Prompt::new("Password File")
            .optional_default(current.as_deref())
            .read()?
        else {
            return Ok(false);
        };
        config.set_optional("passwordFile", Some(&password_file));
    }

    println!();
    println!("Enter the certificate profile for issuing ACME certificates (e.g. acmeServerCert).");
    let current = config.get("profile").map(str::to_string);
    let Some(profile) = Prompt::new("Certificate Profile")
        .optional_default(current.as_deref())
        .required()
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("profile", Some(&profile));

    Ok(true)
}

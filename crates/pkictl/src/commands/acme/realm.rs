//! ACME realm configuration commands

use anyhow::{bail, Result};
use pkictl_core::properties::PropertyFile;
use tracing::info;

use crate::cli::RealmCommands;
use crate::ui::prompt::{print_editing_banner, Prompt};

use super::{
    acme_conf_dir, acme_share_dir, load_instance, parse_property, type_for_class, REALM_CLASSES,
};

pub fn execute(command: RealmCommands) -> Result<()> {
    match command {
        RealmCommands::Show { instance } => execute_show(&instance),
        RealmCommands::Mod {
            instance,
            realm_type,
            property,
        } => execute_mod(&instance, realm_type.as_deref(), &property),
    }
}

fn execute_show(instance_name: &str) -> Result<()> {
    let server = load_instance(instance_name)?;
    let realm_conf = acme_conf_dir(&server, "acme").join("realm.conf");

    info!("Loading {}", realm_conf.display());
    let config = PropertyFile::load(&realm_conf)?;

    let realm_type = type_for_class(&REALM_CLASSES, config.get("class"));
    println!("  Realm Type: {}", realm_type.unwrap_or("unknown"));

    match realm_type {
        Some("in-memory") => {
            if let Some(username) = config.get("username") {
                println!("  Admin Username: {}", username);
            }
            if config.get("password").is_some() {
                println!("  Admin Password: ********");
            }
        }
        Some("ds") => {
            if let Some(url) = config.get("url") {
                println!("  Server URL: {}", url);
            }

            let auth_type = config.get("authType");
            if let Some(auth_type) = auth_type {
                println!("  Authentication Type: {}", auth_type);
            }

            match auth_type {
                Some("BasicAuth") => {
                    if let Some(bind_dn) = config.get("bindDN") {
                        println!("  Bind DN: {}", bind_dn);
                    }
                    if config.get("bindPassword").is_some() {
                        println!("  Bind Password: ********");
                    }
                }
                Some("SslClientAuth") => {
                    if let Some(nickname) = config.get("nickname") {
                        println!("  Client Certificate: {}", nickname);
                    }
                }
                _ => {}
            }

            if let Some(users_dn) = config.get("usersDN") {
                println!("  Users DN: {}", users_dn);
            }
            if let Some(groups_dn) = config.get("groupsDN") {
                println!("  Groups DN: {}", groups_dn);
            }
        }
        Some("postgresql") => {
            if let Some(url) = config.get("url") {
                println!("  Server URL: {}", url);
            }
            if let Some(user) = config.get("user") {
                println!("  Username: {}", user);
            }
            if config.get("password").is_some() {
                println!("  Password: ********");
            }
        }
        _ => {}
    }
    Ok(())
}

/// Packaged template for a realm type
fn template_path(realm_type: &str) -> std::path::PathBuf {
    acme_share_dir()
        .join("realm")
        .join(realm_type)
        .join("realm.conf")
}

fn execute_mod(instance_name: &str, realm_type: Option<&str>, properties: &[String]) -> Result<()> {
    if let Some(realm_type) = realm_type {
        if !REALM_CLASSES.contains_key(realm_type) {
            bail!("Invalid realm type: {}", realm_type);
        }
    }

    let server = load_instance(instance_name)?;
    let realm_conf = acme_conf_dir(&server, "acme").join("realm.conf");

    let source = match realm_type {
        Some(realm_type) => template_path(realm_type),
        None => realm_conf.clone(),
    };
    info!("Loading {}", source.display());
    let mut config = PropertyFile::load(&source)?;

    // --type or -D selects silent mode
    if realm_type.is_some() || !properties.is_empty() {
        info!("Setting properties:");
        for raw in properties {
            let (name, value) = parse_property(raw)?;
            info!("- {}: {}", name, value);
            config.set_optional(&name, Some(&value));
        }
        server.store_properties(&realm_conf, &config)?;
        return Ok(());
    }

    // interactive mode
    print_editing_banner();

    let type_names: Vec<&str> = REALM_CLASSES.keys().copied().collect();
    println!();
    println!(
        "Enter the type of the realm. Available types: {}.",
        type_names.join(", ")
    );
    let orig_type = type_for_class(&REALM_CLASSES, config.get("class")).map(str::to_string);
    let Some(selected) = Prompt::new("Realm Type")
        .options(&type_names)
        .optional_default(orig_type.as_deref())
        .required()
        .read()?
    else {
        println!("Modification canceled.");
        return Ok(());
    };
    config.set("class", REALM_CLASSES[selected.as_str()]);

    if orig_type.as_deref() != Some(selected.as_str()) {
        let template = template_path(&selected);
        info!("Loading {}", template.display());
        let defaults = PropertyFile::load(&template)?;
        config.merge(&defaults.to_map());
        config.set("class", REALM_CLASSES[selected.as_str()]);
    }

    let completed = match selected.as_str() {
        "in-memory" => prompt_in_memory_settings(&mut config)?,
        "ds" => prompt_ds_settings(&mut config)?,
        "postgresql" => prompt_postgresql_settings(&mut config)?,
        _ => true,
    };
    if !completed {
        println!("Modification canceled.");
        return Ok(());
    }

    server.store_properties(&realm_conf, &config)?;
    Ok(())
}

/// Interactive settings for the in-memory realm.
///
/// Returns false when the operator interrupts the prompts.
fn prompt_in_memory_settings(config: &mut PropertyFile) -> Result<bool> {
    println!();
    println!("Enter the admin username.");
    let current = config.get("username").map(str::to_string);
    let Some(username) = Prompt::new("Admin Username")
        .optional_default(current.as_deref())
        .required()
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("username", Some(&username));

    println!();
    println!("Enter the admin password.");
    let current = config.get("password").map(str::to_string);
    let Some(password) = Prompt::new("Admin Password")
        .optional_default(current.as_deref())
        .secret()
        .required()
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("password", Some(&password));

    Ok(true)
}

/// Interactive settings for the DS realm
fn prompt_ds_settings(config: &mut PropertyFile) -> Result<bool> {
    println!();
    println!("Enter the location of the LDAP server (e.g. ldap://localhost.localdomain:389).");
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
    println!("Enter the authentication type. Available types: BasicAuth, SslClientAuth.");
    let current = config.get("authType").map(str::to_string);
    let Some(auth_type) = Prompt::new("Authentication Type")
        .options(&["BasicAuth", "SslClientAuth"])
        .optional_default(current.as_deref())
        .required()
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("authType", Some(&auth_type));

    match auth_type.as_str() {
        "BasicAuth" => {
            println!();
            println!("Enter the bind DN.");
            let current = config.get("bindDN").map(str::to_string);
            let Some(bind_dn) = Prompt::new("Bind DN")
                .optional_default(current.as_deref())
                .required()
                .read()?
            else {
                return Ok(false);
            };
            config.set_optional("bindDN", Some(&bind_dn));

            println!();
            println!("Enter the bind password.");
            let current = config.get("bindPassword").map(str::to_string);
            let Some(password) = Prompt::new("Bind Password")
                .optional_default(current.as_deref())
                .secret()
                .required()
                .read()?
            else {
                return Ok(false);
            };
            config.set_optional("bindPassword", Some(&password));
        }
        "SslClientAuth" => {
            println!();
            println!("Enter the client certificate.");
            let current = config.get("nickname").map(str::to_string);
            let Some(nickname) = Prompt::new("Client Certificate")
                .optional_default(current.as_deref())
                .required()
                .read()?
            else {
                return Ok(false);
            };
            config.set_optional("nickname", Some(&nickname));
        }
        _ => {}
    }

    println!();
    println!("Enter the subtree DN for the ACME users.");
    let current = config.get("usersDN").map(str::to_string);
    let Some(users_dn) = Prompt::new("Users DN")
        .optional_default(current.as_deref())
        .required()
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("usersDN", Some(&users_dn));

    println!();
    println!("Enter the subtree DN for the ACME groups.");
    let current = config.get("groupsDN").map(str::to_string);
    let Some(groups_dn) = Prompt::new("Groups DN")
        .optional_default(current.as_deref())
        .required()
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("groupsDN", Some(&groups_dn));

    Ok(true)
}

/// Interactive settings for the PostgreSQL realm
fn prompt_postgresql_settings(config: &mut PropertyFile) -> Result<bool> {
    println!();
    println!(
        "Enter the location of the PostgreSQL realm \
         (e.g. jdbc:postgresql://localhost.localdomain:5432/acme)."
    );
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
    println!("Enter the username for basic authentication.");
    let current = config.get("user").map(str::to_string);
    let Some(user) = Prompt::new("Username")
        .optional_default(current.as_deref())
        .required()
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("user", Some(&user));

    println!();
    println!("Enter the password for basic authentication.");
    let current = config.get("password").map(str::to_string);
    let Some(password) = Prompt::new("Password")
        .optional_default(current.as_deref())
        .secret()
        .required()
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("password", Some(&password));

    Ok(true)
}

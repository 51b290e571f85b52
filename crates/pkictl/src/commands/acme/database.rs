//! ACME database configuration commands

use anyhow::{bail, Result};
use pkictl_core::properties::PropertyFile;
use tracing::{info, warn};

use crate::cli::DatabaseCommands;
use crate::ui::prompt::{print_editing_banner, Prompt};

use super::{
    acme_conf_dir, acme_share_dir, load_instance, parse_property, type_for_class, DATABASE_CLASSES,
};

pub fn execute(command: DatabaseCommands) -> Result<()> {
    match command {
        DatabaseCommands::Show { instance } => execute_show(&instance),
        DatabaseCommands::Mod {
            instance,
            db_type,
            property,
        } => execute_mod(&instance, db_type.as_deref(), &property),
    }
}

fn execute_show(instance_name: &str) -> Result<()> {
    let server = load_instance(instance_name)?;
    let database_conf = acme_conf_dir(&server, "acme").join("database.conf");

    info!("Loading {}", database_conf.display());
    let config = PropertyFile::load(&database_conf)?;

    let database_type = type_for_class(&DATABASE_CLASSES, config.get("class"));
    println!(
        "  Database Type: {}",
        database_type.unwrap_or("unknown")
    );

    match database_type {
        Some("ds") | Some("ldap") | Some("openldap") => {
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

            // basedn is the legacy spelling of baseDN
            let base_dn = match config.get("basedn") {
                Some(value) => {
                    warn!("The basedn parameter has been deprecated. Use baseDN instead.");
                    Some(value)
                }
                None => config.get("baseDN"),
            };
            if let Some(base_dn) = base_dn {
                println!("  Base DN: {}", base_dn);
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

/// Packaged template for a database type
fn template_path(database_type: &str) -> std::path::PathBuf {
    acme_share_dir()
        .join("database")
        .join(database_type)
        .join("database.conf")
}

fn execute_mod(instance_name: &str, db_type: Option<&str>, properties: &[String]) -> Result<()> {
    if let Some(db_type) = db_type {
        if !DATABASE_CLASSES.contains_key(db_type) {
            bail!("Invalid database type: {}", db_type);
        }
    }

    let server = load_instance(instance_name)?;
    let database_conf = acme_conf_dir(&server, "acme").join("database.conf");

    // with --type the packaged template is the starting point, otherwise the
    // instance's current configuration
    let source = match db_type {
        Some(db_type) => template_path(db_type),
        None => database_conf.clone(),
    };
    info!("Loading {}", source.display());
    let mut config = PropertyFile::load(&source)?;

    // --type or -D selects silent mode
    if db_type.is_some() || !properties.is_empty() {
        info!("Setting properties:");
        for raw in properties {
            let (name, value) = parse_property(raw)?;
            info!("- {}: {}", name, value);
            config.set_optional(&name, Some(&value));
        }
        server.store_properties(&database_conf, &config)?;
        return Ok(());
    }

    // interactive mode
    print_editing_banner();

    let type_names: Vec<&str> = DATABASE_CLASSES.keys().copied().collect();
    println!();
    println!(
        "Enter the type of the database. Available types: {}.",
        type_names.join(", ")
    );
    let orig_type = type_for_class(&DATABASE_CLASSES, config.get("class")).map(str::to_string);
    let Some(database_type) = Prompt::new("Database Type")
        .options(&type_names)
        .optional_default(orig_type.as_deref())
        .required()
        .read()?
    else {
        println!("Modification canceled.");
        return Ok(());
    };
    config.set("class", DATABASE_CLASSES[database_type.as_str()]);

    // switching types re-seeds the configuration from the template
    if orig_type.as_deref() != Some(database_type.as_str()) {
        let template = template_path(&database_type);
        info!("Loading {}", template.display());
        let defaults = PropertyFile::load(&template)?;
        config.merge(&defaults.to_map());
        config.set("class", DATABASE_CLASSES[database_type.as_str()]);
    }

    let completed = match database_type.as_str() {
        "in-memory" => {
            config.remove("url");
            config.remove("user");
            config.remove("password");
            true
        }
        "ds" | "ldap" | "openldap" => prompt_ldap_settings(&mut config)?,
        "postgresql" => prompt_postgresql_settings(&mut config)?,
        _ => true,
    };
    if !completed {
        println!("Modification canceled.");
        return Ok(());
    }

    server.store_properties(&database_conf, &config)?;
    Ok(())
}

/// Interactive settings for the LDAP-backed database types.
///
/// Returns false when the operator interrupts the prompts.
fn prompt_ldap_settings(config: &mut PropertyFile) -> Result<bool> {
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
    println!("Enter the base DN for the ACME subtree.");
    let legacy = config.get("basedn").map(str::to_string);
    if legacy.is_some() {
        config.remove("basedn");
    }
    let current = legacy.or_else(|| config.get("baseDN").map(str::to_string));
    let Some(base_dn) = Prompt::new("Base DN")
        .optional_default(current.as_deref())
        .required()
        .read()?
    else {
        return Ok(false);
    };
    config.set_optional("baseDN", Some(&base_dn));

    Ok(true)
}

/// Interactive settings for the PostgreSQL database type
fn prompt_postgresql_settings(config: &mut PropertyFile) -> Result<bool> {
    println!();
    println!(
        "Enter the location of the PostgreSQL database \
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

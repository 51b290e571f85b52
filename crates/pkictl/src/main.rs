use clap::Parser;
use pkictl_core::errors::{PkiError, PreconditionError};

mod cli;
mod commands;
mod ui;

fn main() {
    // Parse manually so usage errors exit 1 while --help/--version exit 0
    let parsed = match cli::Cli::try_parse() {
        Ok(parsed) => parsed,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            err.print().ok();
            std::process::exit(code);
        }
    };

    match parsed.dispatch() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            // Precondition failures (not root, missing instance/subsystem)
            // take a dedicated early-exit path
            let precondition = err
                .downcast_ref::<PreconditionError>()
                .map(ToString::to_string)
                .or_else(|| match err.downcast_ref::<PkiError>() {
                    Some(PkiError::Precondition(p)) => Some(p.to_string()),
                    _ => None,
                });
            if let Some(message) = precondition {
                eprintln!("ERROR: {}", message);
                std::process::exit(2);
            }

            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    }
}

//! Core library for the pkictl CLI
//!
//! This crate contains the shared logic for configuration composition,
//! server instance handling, scriptlet resolution and orchestration,
//! property-file editing, logging, and error handling.

pub mod config;
pub mod errors;
pub mod instance;
pub mod logging;
pub mod orchestrator;
pub mod process;
pub mod properties;
pub mod report;
pub mod scriptlet;
pub mod scriptlets;

// Re-export IndexMap for use by dependent crates (preserves insertion order for ordered maps)
pub use indexmap::IndexMap;

/// Get the version of the core library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let version = version();
        assert!(!version.is_empty());
        assert!(version.contains('.'));
    }
}

//! Configuration composition
//!
//! The master configuration for a run is composed from an ordered list of
//! layered sources (packaged defaults, the instance's recorded deployment
//! configuration, in-memory overrides from the command line). Later sources
//! override earlier ones per key. Sources are flat property files with
//! optional `[section]` headers; for a given run the `[DEFAULT]` section and
//! the section named after the target subsystem are merged, DEFAULT first.
//!
//! Deprecated keys are resolved once, deterministically, at the end of
//! composition. After composition the master configuration is read-only and
//! shared by reference with every scriptlet.

use crate::errors::ConfigError;
use indexmap::{IndexMap, IndexSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Section merged into every composition, regardless of target subsystem
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Configuration key holding the ordered teardown scriptlet names
pub const DESTROY_SCRIPTLETS_KEY: &str = "destroy_scriptlets";

/// Configuration key holding the ordered setup scriptlet names
pub const SPAWN_SCRIPTLETS_KEY: &str = "spawn_scriptlets";

/// Legacy key names mapped to their canonical replacements.
///
/// The misspelled `*_scriplets` keys are the historical spelling and still
/// appear in deployed configuration files; they are resolved to the canonical
/// keys once during composition.
const DEPRECATED_KEYS: &[(&str, &str)] = &[
    ("destroy_scriplets", DESTROY_SCRIPTLETS_KEY),
    ("spawn_scriplets", SPAWN_SCRIPTLETS_KEY),
];

/// Maximum interpolation passes before giving up on `%(key)s` references
const MAX_INTERPOLATION_DEPTH: usize = 10;

/// The merged key/value map consumed by all scriptlets in a run.
///
/// Insertion-ordered and read-only once composition completes. Scriptlets
/// receive it by shared reference and must not write values back into it; a
/// scriptlet that needs to persist state writes through the property-file
/// primitives instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterConfig {
    values: IndexMap<String, String>,
}

impl MasterConfig {
    /// Get a value by canonical key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Get a value by canonical key, falling back to a default
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Split a whitespace-delimited stage list out of the configuration.
    ///
    /// The returned order is authoritative: the orchestrator never reorders
    /// or deduplicates it. A missing or empty key yields an empty list.
    pub fn stage_names(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|value| value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Number of composed keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the configuration is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(key, value)` pairs in composition order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for MasterConfig {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// A single layered configuration source
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the property file
    pub path: PathBuf,
    /// Whether a missing or malformed file aborts composition
    pub required: bool,
}

/// Composes the master configuration from layered sources.
///
/// Sources are merged in the order they were added; later sources override
/// earlier ones for the same key. In-memory overrides (values taken from
/// command-line flags) form the final, highest-precedence layer.
#[derive(Debug, Clone)]
pub struct Composer {
    section: String,
    sources: Vec<ConfigSource>,
    overrides: IndexMap<String, String>,
}

impl Composer {
    /// Create a composer targeting the given subsystem section
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            sources: Vec::new(),
            overrides: IndexMap::new(),
        }
    }

    /// Append a file source (later sources take precedence)
    pub fn source(mut self, path: impl Into<PathBuf>, required: bool) -> Self {
        self.sources.push(ConfigSource {
            path: path.into(),
            required,
        });
        self
    }

    /// Set an in-memory override (highest precedence layer)
    pub fn override_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Compose the master configuration.
    ///
    /// Fails if a required source is missing or malformed, or if a key is
    /// defined as a plain value in one place and used as a section name in
    /// another. Plain value override is not an error.
    #[instrument(skip(self), fields(section = %self.section))]
    pub fn compose(&self) -> Result<MasterConfig, ConfigError> {
        let mut merged: IndexMap<String, String> = IndexMap::new();
        let mut section_names: IndexSet<String> = IndexSet::new();

        for source in &self.sources {
            if !source.path.exists() {
                if source.required {
                    return Err(ConfigError::NotFound {
                        path: source.path.display().to_string(),
                    });
                }
                debug!("Skipping missing optional source {}", source.path.display());
                continue;
            }

            debug!("Merging source {}", source.path.display());
            let sections = parse_source(&source.path)?;

            for name in sections.keys() {
                if name != DEFAULT_SECTION {
                    section_names.insert(name.clone());
                }
            }

            // DEFAULT first, then the subsystem section overriding it
            if let Some(values) = sections.get(DEFAULT_SECTION) {
                merged.extend(values.clone());
            }
            if let Some(values) = sections.get(&self.section) {
                merged.extend(values.clone());
            }
        }

        merged.extend(self.overrides.clone());

        // A key that is both a scalar and a section name is a schema
        // conflict, not an override
        for key in merged.keys() {
            if section_names.contains(key) {
                return Err(ConfigError::KeyConflict { key: key.clone() });
            }
        }

        interpolate(&mut merged);
        apply_deprecated_aliases(&mut merged);

        debug!("Composed {} keys", merged.len());
        Ok(MasterConfig { values: merged })
    }
}

/// Parse one source file into its sections.
///
/// Keys before the first `[section]` header belong to the DEFAULT section.
fn parse_source(path: &Path) -> Result<IndexMap<String, IndexMap<String, String>>, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut sections: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
    let mut current = DEFAULT_SECTION.to_string();

    for (number, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = name.trim().to_string();
            sections.entry(current.clone()).or_default();
            continue;
        }

        match line.split_once('=') {
            Some((key, value)) => {
                sections
                    .entry(current.clone())
                    .or_default()
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
            None => {
                return Err(ConfigError::Parsing {
                    path: path.display().to_string(),
                    message: format!("missing '=' on line {}", number + 1),
                });
            }
        }
    }

    Ok(sections)
}

/// Resolve `%(key)s` references against the merged map.
///
/// Unknown references are left verbatim. Resolution is bounded to avoid
/// looping on self-referential values.
fn interpolate(values: &mut IndexMap<String, String>) {
    for _ in 0..MAX_INTERPOLATION_DEPTH {
        let snapshot = values.clone();
        let mut changed = false;

        for value in values.values_mut() {
            if !value.contains("%(") {
                continue;
            }
            let resolved = interpolate_one(value, &snapshot);
            if resolved != *value {
                *value = resolved;
                changed = true;
            }
        }

        if !changed {
            return;
        }
    }
    warn!("Interpolation did not settle after {MAX_INTERPOLATION_DEPTH} passes");
}

fn interpolate_one(value: &str, values: &IndexMap<String, String>) -> String {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("%(") {
        result.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        match tail.find(")s") {
            Some(end) => {
                let name = &tail[..end];
                match values.get(name) {
                    Some(replacement) => result.push_str(replacement),
                    None => {
                        result.push_str("%(");
                        result.push_str(name);
                        result.push_str(")s");
                    }
                }
                rest = &tail[end + 2..];
            }
            None => {
                result.push_str("%(");
                rest = tail;
            }
        }
    }
    result.push_str(rest);
    result
}

/// Resolve deprecated keys to their canonical replacements.
///
/// Applied once after all sources merge: when both spellings are present the
/// canonical value wins and a single warning is emitted; when only the legacy
/// spelling is present its value is copied to the canonical key. Legacy keys
/// stay in the map as read-only aliases; scriptlets consult canonical keys
/// only.
fn apply_deprecated_aliases(values: &mut IndexMap<String, String>) {
    for (legacy, canonical) in DEPRECATED_KEYS {
        match (values.contains_key(*legacy), values.contains_key(*canonical)) {
            (true, true) => {
                warn!(
                    "The {} parameter has been deprecated. Use {} instead.",
                    legacy, canonical
                );
            }
            (true, false) => {
                let value = values[*legacy].clone();
                values.insert((*canonical).to_string(), value);
            }
            _ => {}
        }
    }
}

//! Flat property-file primitives
//!
//! Per-concern configuration files (`database.conf`, `issuer.conf`,
//! `realm.conf`, `metadata.conf`, `deployment.cfg`) are flat `key=value`
//! property files. This module provides a line-preserving model so that
//! comment and blank lines survive a read-modify-merge-write cycle instead
//! of being regenerated from scratch.

use indexmap::IndexMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// A single line of a property file.
///
/// Lines that are not recognized as `key=value`, comment, or blank are kept
/// verbatim so a rewrite never loses content it does not understand.
#[derive(Debug, Clone, PartialEq)]
enum Line {
    Blank,
    Comment(String),
    Property { key: String, value: String },
    Raw(String),
}

/// A flat `key=value` property file with comment-preserving rewrite.
///
/// Keys keep their original file order; new keys are appended at the end.
#[derive(Debug, Clone, Default)]
pub struct PropertyFile {
    lines: Vec<Line>,
}

impl PropertyFile {
    /// Create an empty property file
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a property file from disk
    pub fn load(path: &Path) -> io::Result<Self> {
        debug!("Loading {}", path.display());
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Parse property-file content
    pub fn parse(content: &str) -> Self {
        let mut lines = Vec::new();
        for raw in content.lines() {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                lines.push(Line::Blank);
            } else if trimmed.starts_with('#') || trimmed.starts_with(';') {
                lines.push(Line::Comment(raw.to_string()));
            } else if let Some((key, value)) = raw.split_once('=') {
                lines.push(Line::Property {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                });
            } else {
                lines.push(Line::Raw(raw.to_string()));
            }
        }
        Self { lines }
    }

    /// Get a property value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Property { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Set a property value, replacing the first existing occurrence or
    /// appending a new line at the end
    pub fn set(&mut self, key: &str, value: &str) {
        for line in &mut self.lines {
            if let Line::Property { key: k, value: v } = line {
                if k == key {
                    *v = value.to_string();
                    return;
                }
            }
        }
        self.lines.push(Line::Property {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    /// Remove a property. Returns true if the key was present.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.lines.len();
        self.lines
            .retain(|line| !matches!(line, Line::Property { key: k, .. } if k == key));
        self.lines.len() != before
    }

    /// Set a property from an optional value: `None` or an empty string
    /// removes the key (the interactive editors use an empty answer to mean
    /// "clear this value")
    pub fn set_optional(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(v) if !v.is_empty() => self.set(key, v),
            _ => {
                self.remove(key);
            }
        }
    }

    /// Whether the file contains the given key
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over `(key, value)` pairs in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            Line::Property { key, value } => Some((key.as_str(), value.as_str())),
            _ => None,
        })
    }

    /// Collect the properties into an ordered map
    pub fn to_map(&self) -> IndexMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Merge a map of properties into this file (read-modify-merge-write)
    pub fn merge(&mut self, values: &IndexMap<String, String>) {
        for (key, value) in values {
            self.set(key, value);
        }
    }

    /// Render the file back to a string
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Blank => {}
                Line::Comment(text) => out.push_str(text),
                Line::Property { key, value } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
                Line::Raw(text) => out.push_str(text),
            }
            out.push('\n');
        }
        out
    }

    /// Write the file to disk, creating parent directories as needed
    pub fn store(&self, path: &Path) -> io::Result<()> {
        debug!("Storing {}", path.display());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render())
    }
}

/// Load a property file directly into an ordered map
pub fn load_map(path: &Path) -> io::Result<IndexMap<String, String>> {
    Ok(PropertyFile::load(path)?.to_map())
}

//! KDL schema definitions for config.kdl and state.kdl.
//!
//! This module provides:
//! - Rust structs representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation and merging

use crate::import::ImportMode;
use chrono::{DateTime, Utc};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys accepted by `mw config set`.
pub const CONFIG_KEYS: &[&str] = &["output-format", "import-mode", "keep-last-choice"];

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// output-format "human"      // or "json"
/// import-mode "renumber"     // ask | no-import | renumber | override
/// keep-last-choice #true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuwrightConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// What `mw import` does with duplicate IDs
    pub import_mode: Option<ImportMode>,

    /// Reuse the answer of the last conflict prompt
    pub keep_last_choice: Option<bool>,
}

impl MenuwrightConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from a KDL document. Unknown nodes and unparseable
    /// values are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = string_arg(doc, "output-format") {
            config.output_format = OutputFormat::parse(&s);
        }

        if let Some(s) = string_arg(doc, "import-mode") {
            config.import_mode = ImportMode::parse(&s);
        }

        if let Some(node) = doc.get("keep-last-choice") {
            config.keep_last_choice = node.entries().first().and_then(|e| e.value().as_bool());
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(format) = self.output_format {
            push_string(&mut doc, "output-format", format.as_str());
        }

        if let Some(mode) = self.import_mode {
            push_string(&mut doc, "import-mode", mode.as_str());
        }

        if let Some(keep) = self.keep_last_choice {
            let mut node = KdlNode::new("keep-last-choice");
            node.push(KdlEntry::new(KdlValue::Bool(keep)));
            doc.nodes_mut().push(node);
        }

        doc
    }

    /// Set a single key from its textual value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "output-format" => {
                self.output_format = Some(
                    OutputFormat::parse(value)
                        .ok_or_else(|| format!("output-format must be json or human, got '{}'", value))?,
                );
            }
            "import-mode" => {
                self.import_mode = Some(ImportMode::parse(value).ok_or_else(|| {
                    format!(
                        "import-mode must be ask, no-import, renumber or override, got '{}'",
                        value
                    )
                })?);
            }
            "keep-last-choice" => {
                self.keep_last_choice = Some(match value.to_lowercase().as_str() {
                    "true" | "yes" | "1" => true,
                    "false" | "no" | "0" => false,
                    _ => return Err(format!("keep-last-choice must be true or false, got '{}'", value)),
                });
            }
            _ => {
                return Err(format!(
                    "unknown config key '{}', expected one of: {}",
                    key,
                    CONFIG_KEYS.join(", ")
                ));
            }
        }
        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &MenuwrightConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.import_mode.is_some() {
            self.import_mode = other.import_mode;
        }
        if other.keep_last_choice.is_some() {
            self.keep_last_choice = other.keep_last_choice;
        }
    }
}

/// Runtime state stored in state.kdl, next to the item store.
///
/// # KDL Schema
///
/// ```kdl
/// last-import-mode "override"
/// last-import-at "2026-01-31T09:00:00+00:00"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuwrightState {
    /// Answer remembered from the last conflict prompt
    pub last_import_mode: Option<ImportMode>,

    /// When the last import ran
    pub last_import_at: Option<DateTime<Utc>>,
}

impl MenuwrightState {
    /// Create an empty state with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse state from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut state = Self::new();

        if let Some(s) = string_arg(doc, "last-import-mode") {
            state.last_import_mode = ImportMode::parse(&s);
        }

        if let Some(s) = string_arg(doc, "last-import-at") {
            if let Ok(dt) = s.parse::<DateTime<Utc>>() {
                state.last_import_at = Some(dt);
            }
        }

        state
    }

    /// Convert state to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(mode) = self.last_import_mode {
            push_string(&mut doc, "last-import-mode", mode.as_str());
        }

        if let Some(at) = self.last_import_at {
            push_string(&mut doc, "last-import-at", &at.to_rfc3339());
        }

        doc
    }
}

fn string_arg(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)?
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn push_string(doc: &mut KdlDocument, name: &str, value: &str) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    doc.nodes_mut().push(node);
}

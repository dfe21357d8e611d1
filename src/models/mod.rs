//! Data models for Menuwright items.
//!
//! This module defines the core data structures:
//! - `ItemKind` - Menu, Action or Profile
//! - `ItemFields` - Generic identity fields every item carries
//! - `Conditions` - Execution conditions carried by menus and profiles
//! - `ActionFields` / `ProfileFields` - Kind-specific fields
//! - `ItemBody` - The per-kind payload of a node
//! - `ItemDocument` - Self-contained serialization shape of an item subtree

use crate::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The three item kinds of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Menu,
    Action,
    Profile,
}

impl ItemKind {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "menu" => Some(ItemKind::Menu),
            "action" => Some(ItemKind::Action),
            "profile" => Some(ItemKind::Profile),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Menu => "menu",
            ItemKind::Action => "action",
            ItemKind::Profile => "profile",
        }
    }

    /// Whether this kind owns an ordered child sequence.
    pub fn is_container(&self) -> bool {
        !matches!(self, ItemKind::Profile)
    }

    /// Whether this kind carries execution conditions.
    pub fn carries_conditions(&self) -> bool {
        matches!(self, ItemKind::Menu | ItemKind::Profile)
    }

    /// Whether an item of this kind may own a child of `child` kind.
    ///
    /// Menus own menus and actions, actions own profiles, profiles own nothing.
    pub fn accepts_child(&self, child: ItemKind) -> bool {
        match self {
            ItemKind::Menu => matches!(child, ItemKind::Menu | ItemKind::Action),
            ItemKind::Action => child == ItemKind::Profile,
            ItemKind::Profile => false,
        }
    }

    /// Whether this kind may sit at the top level of the tree.
    pub fn can_be_root(&self) -> bool {
        self.is_container()
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Generic identity fields shared by every kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFields {
    /// Stable identifier, unique among siblings
    pub id: String,

    /// Displayed label
    #[serde(default)]
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,

    /// Icon name or path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the host should show this item at all
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ItemFields {
    /// Create fields with the given ID and label.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            tooltip: None,
            icon: None,
            description: None,
            enabled: true,
        }
    }
}

/// Execution conditions deciding when the host displays an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    #[serde(default = "default_basenames")]
    pub basenames: Vec<String>,

    #[serde(default = "default_true")]
    pub matchcase: bool,

    #[serde(default = "default_mimetypes")]
    pub mimetypes: Vec<String>,

    #[serde(default = "default_schemes")]
    pub schemes: Vec<String>,

    #[serde(default = "default_folders")]
    pub folders: Vec<String>,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            basenames: default_basenames(),
            matchcase: true,
            mimetypes: default_mimetypes(),
            schemes: default_schemes(),
            folders: default_folders(),
        }
    }
}

/// Fields specific to actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFields {
    /// Label shown in the toolbar (required when `target_toolbar` is set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolbar_label: Option<String>,

    /// Show in the selection context menu
    #[serde(default = "default_true")]
    pub target_selection: bool,

    /// Show in the location context menu
    #[serde(default)]
    pub target_location: bool,

    /// Show in the toolbar
    #[serde(default)]
    pub target_toolbar: bool,
}

impl Default for ActionFields {
    fn default() -> Self {
        Self {
            toolbar_label: None,
            target_selection: true,
            target_location: false,
            target_toolbar: false,
        }
    }
}

/// How the host runs a profile's command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    #[default]
    Normal,
    Terminal,
    Embedded,
    DisplayOutput,
}

impl ExecutionMode {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(ExecutionMode::Normal),
            "terminal" => Some(ExecutionMode::Terminal),
            "embedded" => Some(ExecutionMode::Embedded),
            "display-output" | "display_output" => Some(ExecutionMode::DisplayOutput),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Normal => "normal",
            ExecutionMode::Terminal => "terminal",
            ExecutionMode::Embedded => "embedded",
            ExecutionMode::DisplayOutput => "display-output",
        }
    }
}

/// Fields specific to profiles: the actual command configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    /// Command to run
    #[serde(default)]
    pub path: String,

    /// Command-line parameters, may contain host placeholders
    #[serde(default)]
    pub parameters: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    #[serde(default)]
    pub execution_mode: ExecutionMode,
}

/// Per-kind payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemBody {
    Menu {
        conditions: Conditions,
    },
    Action {
        action: ActionFields,
    },
    Profile {
        conditions: Conditions,
        profile: ProfileFields,
    },
}

impl ItemBody {
    /// Default payload for a freshly created item of `kind`.
    pub fn default_for(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Menu => ItemBody::Menu {
                conditions: Conditions::default(),
            },
            ItemKind::Action => ItemBody::Action {
                action: ActionFields::default(),
            },
            ItemKind::Profile => ItemBody::Profile {
                conditions: Conditions::default(),
                profile: ProfileFields::default(),
            },
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ItemBody::Menu { .. } => ItemKind::Menu,
            ItemBody::Action { .. } => ItemKind::Action,
            ItemBody::Profile { .. } => ItemKind::Profile,
        }
    }

    /// Execution conditions, for the kinds that carry them.
    pub fn conditions(&self) -> Option<&Conditions> {
        match self {
            ItemBody::Menu { conditions } | ItemBody::Profile { conditions, .. } => {
                Some(conditions)
            }
            ItemBody::Action { .. } => None,
        }
    }

    pub fn conditions_mut(&mut self) -> Option<&mut Conditions> {
        match self {
            ItemBody::Menu { conditions } | ItemBody::Profile { conditions, .. } => {
                Some(conditions)
            }
            ItemBody::Action { .. } => None,
        }
    }

    pub fn action(&self) -> Option<&ActionFields> {
        match self {
            ItemBody::Action { action } => Some(action),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&ProfileFields> {
        match self {
            ItemBody::Profile { profile, .. } => Some(profile),
            _ => None,
        }
    }
}

/// Self-contained serialization shape of an item and its subtree.
///
/// Used by the store, import and export. Sections that do not apply to the
/// item's kind are ignored; missing sections take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDocument {
    /// Entity type marker
    #[serde(rename = "type")]
    pub kind: ItemKind,

    #[serde(flatten)]
    pub fields: ItemFields,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionFields>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileFields>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ItemDocument>,
}

impl ItemDocument {
    /// Build a document from a node's fields and payload, without children.
    pub fn from_parts(fields: ItemFields, body: ItemBody) -> Self {
        let kind = body.kind();
        let (conditions, action, profile) = match body {
            ItemBody::Menu { conditions } => (Some(conditions), None, None),
            ItemBody::Action { action } => (None, Some(action), None),
            ItemBody::Profile {
                conditions,
                profile,
            } => (Some(conditions), None, Some(profile)),
        };
        Self {
            kind,
            fields,
            conditions,
            action,
            profile,
            children: Vec::new(),
        }
    }

    /// Split into fields and payload, filling in defaults for missing sections.
    pub fn to_parts(&self) -> (ItemFields, ItemBody) {
        let body = match self.kind {
            ItemKind::Menu => ItemBody::Menu {
                conditions: self.conditions.clone().unwrap_or_default(),
            },
            ItemKind::Action => ItemBody::Action {
                action: self.action.clone().unwrap_or_default(),
            },
            ItemKind::Profile => ItemBody::Profile {
                conditions: self.conditions.clone().unwrap_or_default(),
                profile: self.profile.clone().unwrap_or_default(),
            },
        };
        (self.fields.clone(), body)
    }

    /// A menu document with default conditions.
    pub fn menu(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::from_parts(ItemFields::new(id, label), ItemBody::default_for(ItemKind::Menu))
    }

    /// An action document with default targets.
    pub fn action(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::from_parts(
            ItemFields::new(id, label),
            ItemBody::default_for(ItemKind::Action),
        )
    }

    /// A profile document running `path`.
    pub fn profile(id: impl Into<String>, label: impl Into<String>, path: &str) -> Self {
        let mut doc = Self::from_parts(
            ItemFields::new(id, label),
            ItemBody::default_for(ItemKind::Profile),
        );
        if let Some(profile) = doc.profile.as_mut() {
            profile.path = path.to_string();
        }
        doc
    }

    /// Append a child document, builder style.
    pub fn with_child(mut self, child: ItemDocument) -> Self {
        self.children.push(child);
        self
    }

    /// The document's identity.
    pub fn id(&self) -> &str {
        &self.fields.id
    }

    /// Count of this document and all its descendants.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ItemDocument::count).sum::<usize>()
    }
}

/// Names accepted by [`apply_field`].
pub const EDITABLE_FIELDS: &[&str] = &[
    "label",
    "tooltip",
    "icon",
    "description",
    "enabled",
    "basenames",
    "matchcase",
    "mimetypes",
    "schemes",
    "folders",
    "toolbar-label",
    "target-selection",
    "target-location",
    "target-toolbar",
    "path",
    "parameters",
    "working-dir",
    "execution-mode",
];

/// Apply a textual edit to an item's fields or payload.
///
/// List fields take a comma-separated value. An empty value clears optional
/// fields. Fails if the field does not exist for the item's kind or the value
/// cannot be parsed.
pub fn apply_field(fields: &mut ItemFields, body: &mut ItemBody, name: &str, value: &str) -> Result<()> {
    let kind = body.kind();
    match name {
        "label" => fields.label = value.to_string(),
        "tooltip" => fields.tooltip = optional(value),
        "icon" => fields.icon = optional(value),
        "description" => fields.description = optional(value),
        "enabled" => fields.enabled = parse_bool(name, value)?,
        "basenames" | "matchcase" | "mimetypes" | "schemes" | "folders" => {
            let conditions = body
                .conditions_mut()
                .ok_or_else(|| field_not_applicable(name, kind))?;
            match name {
                "basenames" => conditions.basenames = parse_list(value),
                "matchcase" => conditions.matchcase = parse_bool(name, value)?,
                "mimetypes" => conditions.mimetypes = parse_list(value),
                "schemes" => conditions.schemes = parse_list(value),
                _ => conditions.folders = parse_list(value),
            }
        }
        "toolbar-label" | "target-selection" | "target-location" | "target-toolbar" => {
            let ItemBody::Action { action } = body else {
                return Err(field_not_applicable(name, kind));
            };
            match name {
                "toolbar-label" => action.toolbar_label = optional(value),
                "target-selection" => action.target_selection = parse_bool(name, value)?,
                "target-location" => action.target_location = parse_bool(name, value)?,
                _ => action.target_toolbar = parse_bool(name, value)?,
            }
        }
        "path" | "parameters" | "working-dir" | "execution-mode" => {
            let ItemBody::Profile { profile, .. } = body else {
                return Err(field_not_applicable(name, kind));
            };
            match name {
                "path" => profile.path = value.to_string(),
                "parameters" => profile.parameters = value.to_string(),
                "working-dir" => profile.working_dir = optional(value),
                _ => {
                    profile.execution_mode = ExecutionMode::parse(value).ok_or_else(|| {
                        Error::InvalidInput(format!("unknown execution mode: {}", value))
                    })?
                }
            }
        }
        _ => {
            return Err(Error::InvalidInput(format!(
                "unknown field '{}', expected one of: {}",
                name,
                EDITABLE_FIELDS.join(", ")
            )));
        }
    }
    Ok(())
}

/// Generate a unique ID for a new item.
///
/// Format: `<prefix>-<8 hex chars>`
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(Utc::now().timestamp_nanos_opt().unwrap_or(0).to_le_bytes());
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..8])
}

/// Validate a user-supplied item ID.
///
/// IDs are used as path segments, so they may not be empty or contain `/`.
pub fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidId("ID must not be empty".to_string()));
    }
    if id.contains('/') {
        return Err(Error::InvalidId(format!("ID must not contain '/': {}", id)));
    }
    Ok(())
}

fn field_not_applicable(name: &str, kind: ItemKind) -> Error {
    Error::InvalidInput(format!("field '{}' does not apply to {} items", name, kind))
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "field '{}' expects a boolean, got: {}",
            name, value
        ))),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_basenames() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_mimetypes() -> Vec<String> {
    vec!["*/*".to_string()]
}

fn default_schemes() -> Vec<String> {
    vec!["file".to_string()]
}

fn default_folders() -> Vec<String> {
    vec!["/".to_string()]
}

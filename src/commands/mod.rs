//! Command implementations for the Menuwright CLI.
//!
//! Every command works on a *session*: the stored items loaded into an
//! [`ItemTree`], each root paired with a detached baseline snapshot so the
//! modified/valid flags describe the pending edit. Commands that change the
//! tree save it back unless asked for a dry run.

use crate::config::{
    self, CONFIG_KEYS, ConfigOverrides, MenuwrightConfig, MenuwrightState, OutputFormat,
};
use crate::import::{
    self, AskContext, AskOutcome, AskUser, ExistingItem, ExportFormat, ImportFormat, ImportMode,
    ImportReport, JsonFormat,
};
use crate::models::{self, ItemBody, ItemDocument, ItemFields, ItemKind, ProfileFields};
use crate::status::check_status;
use crate::storage::Storage;
use crate::tree::{self, ItemTree, NodeId};
use crate::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

// ============================================================================
// Session
// ============================================================================

/// Stored items loaded as a working tree with baselines.
struct Session {
    storage: Storage,
    tree: ItemTree,
}

impl Session {
    fn open(data_dir: &Path) -> Result<Self> {
        let storage = Storage::open_with_data_dir(data_dir)?;
        let docs = storage.load_items()?;
        let mut tree = ItemTree::from_documents(&docs)?;
        for root in tree.roots().to_vec() {
            tree.snapshot(root);
            check_status(&mut tree, root);
        }
        Ok(Self { storage, tree })
    }

    fn resolve(&self, path: &str) -> Result<NodeId> {
        self.tree
            .find_path(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    fn save(&mut self) -> Result<()> {
        let docs = self.tree.to_documents();
        self.storage.save_items(&docs)
    }

    /// Flags of `id` and then each ancestor up to the top.
    fn status_chain(&self, id: NodeId) -> Vec<StatusEntry> {
        std::iter::once(id)
            .chain(self.tree.ancestors(id))
            .filter_map(|n| StatusEntry::of(&self.tree, n))
            .collect()
    }
}

/// Cached flags of one node.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub path: String,
    pub kind: ItemKind,
    pub modified: bool,
    pub valid: bool,
}

impl StatusEntry {
    fn of(tree: &ItemTree, id: NodeId) -> Option<Self> {
        let node = tree.get(id)?;
        Some(Self {
            path: tree.path_of(id)?,
            kind: node.kind(),
            modified: tree::is_modified(tree, id),
            valid: tree::is_valid(tree, id),
        })
    }
}

fn flags(modified: bool, valid: bool) -> String {
    let mut parts = Vec::new();
    if modified {
        parts.push("modified");
    }
    if !valid {
        parts.push("invalid");
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" [{}]", parts.join(", "))
    }
}

// ============================================================================
// System
// ============================================================================

#[derive(Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub path: String,
    pub items: usize,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.initialized {
            format!("Initialized item store at {}", self.path)
        } else {
            format!(
                "Item store already initialized at {} ({} menus and actions)",
                self.path, self.items
            )
        }
    }
}

/// Create the store, keeping any existing items.
pub fn system_init(data_dir: &Path) -> Result<InitResult> {
    let existed = Storage::exists_with_data_dir(data_dir);
    let storage = Storage::init_with_data_dir(data_dir)?;
    Ok(InitResult {
        initialized: !existed,
        path: data_dir.display().to_string(),
        items: storage.count_items()?,
    })
}

// ============================================================================
// Show
// ============================================================================

#[derive(Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub id: String,
    pub kind: ItemKind,
    pub label: String,
    pub depth: usize,
    pub modified: bool,
    pub valid: bool,
}

#[derive(Serialize)]
pub struct ShowResult {
    pub count: usize,
    pub items: Vec<TreeEntry>,
}

impl Output for ShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.items.is_empty() {
            return "No items.".to_string();
        }
        self.items
            .iter()
            .map(|e| {
                format!(
                    "{}{} {} ({}){}",
                    "  ".repeat(e.depth),
                    e.kind,
                    e.label,
                    e.id,
                    flags(e.modified, e.valid)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// List the whole tree, or the subtree at `path`.
pub fn show(data_dir: &Path, path: Option<&str>) -> Result<ShowResult> {
    let session = Session::open(data_dir)?;
    let starts = match path {
        Some(p) => vec![session.resolve(p)?],
        None => session.tree.roots().to_vec(),
    };

    let mut items = Vec::new();
    for start in starts {
        for (id, depth) in session.tree.walk(start) {
            let (Some(node), Some(entry)) = (session.tree.get(id), StatusEntry::of(&session.tree, id))
            else {
                continue;
            };
            items.push(TreeEntry {
                path: entry.path,
                id: node.fields.id.clone(),
                kind: entry.kind,
                label: node.fields.label.clone(),
                depth,
                modified: entry.modified,
                valid: entry.valid,
            });
        }
    }
    Ok(ShowResult {
        count: items.len(),
        items,
    })
}

// ============================================================================
// Edits
// ============================================================================

/// Outcome of an edit to the tree.
#[derive(Debug, Serialize)]
pub struct EditResult {
    pub operation: &'static str,
    pub id: String,
    pub path: String,
    pub kind: ItemKind,
    pub dry_run: bool,
    /// Flags of the edited node (or the removed node's parent) and its
    /// ancestors, nearest first
    pub status: Vec<StatusEntry>,
}

impl Output for EditResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let verb = match self.operation {
            "add" => "Added",
            "remove" => "Removed",
            _ => "Updated",
        };
        let mut lines = vec![format!("{} {} {}", verb, self.kind, self.path)];
        if self.dry_run {
            lines.push("(dry run, nothing saved)".to_string());
        }
        for entry in &self.status {
            lines.push(format!(
                "  {} {}{}",
                entry.kind,
                entry.path,
                flags(entry.modified, entry.valid)
            ));
        }
        lines.join("\n")
    }
}

/// Options shared by the `add` commands.
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Parent path; the item becomes top-level when unset
    pub parent: Option<String>,
    /// Explicit ID; generated from the label when unset
    pub id: Option<String>,
}

/// Add a menu.
pub fn add_menu(data_dir: &Path, label: &str, options: &AddOptions) -> Result<EditResult> {
    let doc = ItemDocument::menu(String::new(), label);
    add_item(data_dir, doc, options)
}

/// Add an action. With a command path it gets a first profile running it.
pub fn add_action(
    data_dir: &Path,
    label: &str,
    options: &AddOptions,
    command: Option<&str>,
    parameters: Option<&str>,
) -> Result<EditResult> {
    let mut doc = ItemDocument::action(String::new(), label);
    if let Some(command) = command {
        let mut profile = ItemDocument::profile(
            models::generate_id("profile", label),
            "Default profile",
            command,
        );
        if let (Some(fields), Some(parameters)) = (profile.profile.as_mut(), parameters) {
            fields.parameters = parameters.to_string();
        }
        doc = doc.with_child(profile);
    }
    add_item(data_dir, doc, options)
}

/// Add a profile to the action at `action_path`.
pub fn add_profile(
    data_dir: &Path,
    action_path: &str,
    label: &str,
    command: &str,
    parameters: Option<&str>,
    id: Option<&str>,
) -> Result<EditResult> {
    let fields = ItemFields::new(id.unwrap_or_default(), label);
    let body = ItemBody::Profile {
        conditions: Default::default(),
        profile: ProfileFields {
            path: command.to_string(),
            parameters: parameters.unwrap_or_default().to_string(),
            ..Default::default()
        },
    };
    let options = AddOptions {
        parent: Some(action_path.to_string()),
        id: id.map(str::to_string),
    };
    add_item(data_dir, ItemDocument::from_parts(fields, body), &options)
}

fn add_item(data_dir: &Path, mut doc: ItemDocument, options: &AddOptions) -> Result<EditResult> {
    let mut session = Session::open(data_dir)?;
    let parent = options
        .parent
        .as_deref()
        .map(|p| session.resolve(p))
        .transpose()?;

    doc.fields.id = match &options.id {
        Some(id) => {
            models::validate_id(id)?;
            id.clone()
        }
        None => models::generate_id(doc.kind.as_str(), &doc.fields.label),
    };
    ensure_unique(&session.tree, parent, &doc)?;

    let id = session.tree.insert_document(parent, &doc)?;
    // The parent's child list changed too
    check_status(&mut session.tree, parent.unwrap_or(id));
    session.save()?;

    tracing::debug!(id = %doc.fields.id, kind = %doc.kind, "item added");
    Ok(EditResult {
        operation: "add",
        id: doc.fields.id.clone(),
        path: session.tree.path_of(id).unwrap_or_default(),
        kind: doc.kind,
        dry_run: false,
        status: session.status_chain(id),
    })
}

/// Menu and action IDs are unique across the tree; profile IDs among the
/// profiles of one action.
fn ensure_unique(tree: &ItemTree, parent: Option<NodeId>, doc: &ItemDocument) -> Result<()> {
    let taken = if doc.kind.is_container() {
        tree.find_container(doc.id()).is_some()
    } else {
        parent.is_some_and(|p| {
            tree.children(p)
                .iter()
                .any(|c| tree.get(*c).is_some_and(|n| n.fields.id == doc.fields.id))
        })
    };
    if taken {
        return Err(Error::InvalidId(format!("ID already in use: {}", doc.id())));
    }
    Ok(())
}

/// Change one field of the item at `path`.
pub fn set_field(
    data_dir: &Path,
    path: &str,
    field: &str,
    value: &str,
    dry_run: bool,
) -> Result<EditResult> {
    let mut session = Session::open(data_dir)?;
    let id = session.resolve(path)?;

    let (fields, body) = session
        .tree
        .parts_mut(id)
        .ok_or_else(|| Error::NotFound(path.to_string()))?;
    models::apply_field(fields, body, field, value)?;
    check_status(&mut session.tree, id);

    if !dry_run {
        session.save()?;
    }

    let node = session
        .tree
        .get(id)
        .ok_or_else(|| Error::NotFound(path.to_string()))?;
    Ok(EditResult {
        operation: "set",
        id: node.fields.id.clone(),
        path: session.tree.path_of(id).unwrap_or_default(),
        kind: node.kind(),
        dry_run,
        status: session.status_chain(id),
    })
}

/// Remove the item at `path` with its subtree.
pub fn remove(data_dir: &Path, path: &str) -> Result<EditResult> {
    let mut session = Session::open(data_dir)?;
    let id = session.resolve(path)?;
    let node = session
        .tree
        .get(id)
        .ok_or_else(|| Error::NotFound(path.to_string()))?;
    let (item_id, kind) = (node.fields.id.clone(), node.kind());
    let full_path = session.tree.path_of(id).unwrap_or_default();
    let parent = session.tree.parent(id);

    session.tree.remove(id);
    if let Some(parent) = parent {
        check_status(&mut session.tree, parent);
    }
    session.save()?;

    Ok(EditResult {
        operation: "remove",
        id: item_id,
        path: full_path,
        kind,
        dry_run: false,
        status: parent.map(|p| session.status_chain(p)).unwrap_or_default(),
    })
}

// ============================================================================
// Import / export
// ============================================================================

/// Prompts on a text stream: the candidate and the existing item are
/// described on `output`, the answer is read from `input`.
///
/// Answers are `n` (no-import), `r` (renumber) or `o` (override); a trailing
/// `!` keeps the choice. End of input means no-import.
pub struct PromptAsker<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptAsker<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn describe(
        &mut self,
        candidate: &ItemDocument,
        existing: &ExistingItem,
        context: &AskContext<'_>,
    ) -> io::Result<()> {
        writeln!(
            self.output,
            "{} #{}: {} '{}' has ID {}, already used by {} '{}'",
            context.source,
            context.index + 1,
            candidate.kind,
            candidate.fields.label,
            candidate.id(),
            existing.kind,
            existing.label
        )
    }

    fn offer_choices(&mut self) -> io::Result<()> {
        write!(
            self.output,
            "[n]o-import, [r]enumber, [o]verride (append ! to keep this choice): "
        )?;
        self.output.flush()
    }
}

impl<R: BufRead, W: Write> AskUser for PromptAsker<R, W> {
    fn ask(
        &mut self,
        candidate: &ItemDocument,
        existing: &ExistingItem,
        context: &AskContext<'_>,
    ) -> AskOutcome {
        if let Err(e) = self.describe(candidate, existing, context) {
            tracing::warn!(id = candidate.id(), error = %e, "failed to write import prompt");
        }
        loop {
            if let Err(e) = self.offer_choices() {
                tracing::warn!(error = %e, "failed to write import prompt");
            }

            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) => {
                    return AskOutcome {
                        mode: ImportMode::NoImport,
                        keep_choice: false,
                    };
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read import answer");
                    return AskOutcome {
                        mode: ImportMode::NoImport,
                        keep_choice: false,
                    };
                }
                Ok(_) => {}
            }
            let answer = line.trim();
            let (answer, keep_choice) = match answer.strip_suffix('!') {
                Some(rest) => (rest.trim(), true),
                None => (answer, false),
            };
            let mode = match answer.to_lowercase().as_str() {
                "n" => Some(ImportMode::NoImport),
                "r" => Some(ImportMode::Renumber),
                "o" => Some(ImportMode::Override),
                other => ImportMode::parse(other).filter(|m| *m != ImportMode::Ask),
            };
            if let Some(mode) = mode {
                return AskOutcome { mode, keep_choice };
            }
        }
    }
}

#[derive(Serialize)]
pub struct ImportResult {
    #[serde(flatten)]
    pub report: ImportReport,
    pub dry_run: bool,
}

impl Output for ImportResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = self.report.messages.clone();
        lines.push(format!(
            "{} imported, {} rejected from {}{}",
            self.report.imported,
            self.report.rejected,
            self.report.source,
            if self.dry_run { " (dry run, nothing saved)" } else { "" }
        ));
        lines.join("\n")
    }
}

/// Import the items of a JSON file as top-level items.
///
/// The conflict mode and keep flag resolve like any other config value. A
/// changed keep flag is written to the store's config.kdl and a remembered
/// answer to its state.kdl; nothing is written on a dry run.
pub fn import<A: AskUser>(
    data_dir: &Path,
    file: &Path,
    overrides: &ConfigOverrides,
    dry_run: bool,
    asker: A,
) -> Result<ImportResult> {
    let mut session = Session::open(data_dir)?;
    let resolved = config::resolve_config(&session.storage, overrides)?;
    let prefs = config::resolve_import_preferences(&session.storage, &resolved)?;

    let raw = std::fs::read_to_string(file)?;
    let candidates = JsonFormat.parse(&raw)?;
    let source = file.display().to_string();

    let storage = &session.storage;
    let external = |id: &str| match storage.item_exists(id) {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(id, error = %e, "store lookup failed");
            None
        }
    };
    let report = import::import_items(
        &mut session.tree,
        candidates,
        &source,
        resolved.import_mode(),
        prefs,
        external,
        asker,
    )?;

    if !dry_run {
        session.save()?;

        let mut state = session.storage.read_state()?;
        state.last_import_mode = report.preferences.last_mode;
        state.last_import_at = Some(Utc::now());
        session.storage.write_state(&state)?;

        if report.preferences.keep_choice != prefs.keep_choice {
            let mut store_config = session.storage.read_config()?;
            store_config.keep_last_choice = Some(report.preferences.keep_choice);
            session.storage.write_config(&store_config)?;
        }
    }

    Ok(ImportResult { report, dry_run })
}

pub struct ExportResult {
    pub text: String,
}

impl Output for ExportResult {
    fn to_json(&self) -> String {
        self.text.clone()
    }

    fn to_human(&self) -> String {
        self.text.clone()
    }
}

/// Export every top-level item, or the subtree at `path`, as JSON.
pub fn export(data_dir: &Path, path: Option<&str>) -> Result<ExportResult> {
    let session = Session::open(data_dir)?;
    let docs = match path {
        Some(p) => {
            let id = session.resolve(p)?;
            session.tree.to_document(id).into_iter().collect()
        }
        None => session.tree.to_documents(),
    };
    let text = JsonFormat.render(&docs)?;
    Ok(ExportResult { text })
}

// ============================================================================
// Config
// ============================================================================

#[derive(Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

#[derive(Serialize)]
pub struct ConfigShowResult {
    pub entries: Vec<ConfigEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_import_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_import_at: Option<String>,
}

impl Output for ConfigShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{} = {} ({})", e.key, e.value, e.source))
            .collect();
        if let Some(mode) = &self.last_import_mode {
            lines.push(format!("last import answer: {}", mode));
        }
        if let Some(at) = &self.last_import_at {
            lines.push(format!("last import: {}", at));
        }
        lines.join("\n")
    }
}

/// Show the resolved configuration and where each value comes from.
pub fn config_show(data_dir: &Path, overrides: &ConfigOverrides) -> Result<ConfigShowResult> {
    let storage = Storage::open_with_data_dir(data_dir)?;
    let resolved = config::resolve_config(&storage, overrides)?;
    let state: MenuwrightState = storage.read_state()?;

    let entries = vec![
        ConfigEntry {
            key: CONFIG_KEYS[0],
            value: resolved.output_format().to_string(),
            source: resolved.output_format.source.to_string(),
        },
        ConfigEntry {
            key: CONFIG_KEYS[1],
            value: resolved.import_mode().to_string(),
            source: resolved.import_mode.source.to_string(),
        },
        ConfigEntry {
            key: CONFIG_KEYS[2],
            value: resolved.keep_last_choice().to_string(),
            source: resolved.keep_last_choice.source.to_string(),
        },
    ];
    Ok(ConfigShowResult {
        entries,
        last_import_mode: state.last_import_mode.map(|m| m.to_string()),
        last_import_at: state.last_import_at.map(|t| t.to_rfc3339()),
    })
}

#[derive(Serialize)]
pub struct ConfigSetResult {
    pub key: String,
    pub value: String,
    pub path: String,
}

impl Output for ConfigSetResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path)
    }
}

/// Set a key in the store's config.kdl.
pub fn config_set(data_dir: &Path, key: &str, value: &str) -> Result<ConfigSetResult> {
    let storage = Storage::open_with_data_dir(data_dir)?;
    let mut store_config: MenuwrightConfig = storage.read_config()?;
    store_config.set(key, value).map_err(Error::Config)?;
    storage.write_config(&store_config)?;

    Ok(ConfigSetResult {
        key: key.to_string(),
        value: value.to_string(),
        path: storage.config_path().display().to_string(),
    })
}

/// Output format for this invocation: `-H` wins, then the store and system
/// config. Unreadable config falls back to JSON.
pub fn output_format(data_dir: &Path, human_flag: bool) -> OutputFormat {
    if human_flag {
        return OutputFormat::Human;
    }
    let store = Storage::open_with_data_dir(data_dir)
        .ok()
        .and_then(|s| s.read_config().ok())
        .and_then(|c| c.output_format);
    store
        .or_else(|| {
            Storage::read_system_config()
                .ok()
                .and_then(|c| c.output_format)
        })
        .unwrap_or_default()
}

/// Default store location, as used by the binary.
pub fn default_data_dir() -> Result<PathBuf> {
    crate::storage::get_storage_dir()
}

//! Duplicate-identity resolution for imported items.
//!
//! A [`ConflictResolver`] lives for one import batch (a *conflict run*). Each
//! candidate's identity is looked up, stopping at the first hit, in:
//!
//! 1. the items already accepted earlier in the same run
//! 2. the caller-supplied existence callback (working tree, persisted store)
//!
//! On a collision the configured [`ImportMode`] decides the candidate's fate.
//! In `ask` mode the user is prompted through [`AskUser`], unless the
//! "keep my last choice" preference lets the remembered mode be reused.
//!
//! The resolver never mutates the tree: the caller applies the returned
//! [`Decision`].

use crate::models::{ItemDocument, ItemKind};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// What to do with an imported item whose ID already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ImportMode {
    /// Ask the user for each conflict (or reuse the kept choice)
    #[default]
    Ask,
    /// Discard the imported item
    NoImport,
    /// Import under a freshly allocated ID
    Renumber,
    /// Replace the existing item
    Override,
}

impl ImportMode {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ask" => Some(ImportMode::Ask),
            "no-import" | "no_import" | "skip" => Some(ImportMode::NoImport),
            "renumber" => Some(ImportMode::Renumber),
            "override" | "overwrite" => Some(ImportMode::Override),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Ask => "ask",
            ImportMode::NoImport => "no-import",
            ImportMode::Renumber => "renumber",
            ImportMode::Override => "override",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary of an item found by an existence lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingItem {
    pub id: String,
    pub kind: ItemKind,
    pub label: String,
    /// IDs of the enclosing containers, nearest first
    pub ancestors: Vec<String>,
}

impl From<&ItemDocument> for ExistingItem {
    fn from(doc: &ItemDocument) -> Self {
        Self {
            id: doc.fields.id.clone(),
            kind: doc.kind,
            label: doc.fields.label.clone(),
            ancestors: Vec::new(),
        }
    }
}

/// Menus and actions below `doc`, with their enclosing container IDs.
pub fn nested_containers(doc: &ItemDocument) -> Vec<ExistingItem> {
    let mut found = Vec::new();
    let mut stack: Vec<(&ItemDocument, Vec<String>)> = vec![(doc, Vec::new())];
    while let Some((item, ancestors)) = stack.pop() {
        for child in item.children.iter().filter(|c| c.kind.is_container()) {
            let mut chain = Vec::with_capacity(ancestors.len() + 1);
            chain.push(item.fields.id.clone());
            chain.extend(ancestors.iter().cloned());
            found.push(ExistingItem {
                ancestors: chain.clone(),
                ..ExistingItem::from(child)
            });
            stack.push((child, chain));
        }
    }
    found
}

/// Why a candidate was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The ID already exists and the mode said to discard the candidate
    Duplicate { id: String, existing_label: String },
    /// The candidate carries no ID
    MissingIdentity { label: String },
    /// The candidate cannot be placed in the tree as given
    InvalidStructure { id: String, message: String },
    /// A menu or action inside the candidate already exists
    NestedDuplicate {
        id: String,
        nested_id: String,
        existing_label: String,
    },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Duplicate { id, existing_label } => write!(
                f,
                "Item '{}' already exists as '{}', not imported",
                id, existing_label
            ),
            RejectReason::MissingIdentity { label } => {
                write!(f, "Item '{}' has no ID, not imported", label)
            }
            RejectReason::InvalidStructure { id, message } => {
                write!(f, "Item '{}' not imported: {}", id, message)
            }
            RejectReason::NestedDuplicate {
                id,
                nested_id,
                existing_label,
            } => write!(
                f,
                "Item '{}' not imported: it contains '{}', which already exists as '{}'",
                id, nested_id, existing_label
            ),
        }
    }
}

/// Fate of one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No collision: import as is
    Accepted(ItemDocument),
    /// Skip this candidate
    Rejected(RejectReason),
    /// Import under the new ID carried by the item
    RenumberAndAccept(ItemDocument),
    /// Import, replacing the existing item with the same ID
    OverwriteAccept(ItemDocument),
}

impl Decision {
    /// The item to import, if any.
    pub fn item(&self) -> Option<&ItemDocument> {
        match self {
            Decision::Accepted(item)
            | Decision::RenumberAndAccept(item)
            | Decision::OverwriteAccept(item) => Some(item),
            Decision::Rejected(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Decision::Rejected(_))
    }
}

/// Context handed to the user prompt.
#[derive(Debug, Clone, Copy)]
pub struct AskContext<'a> {
    /// Where the candidate comes from (file name, URI)
    pub source: &'a str,
    /// Position of the candidate in the run
    pub index: usize,
}

/// The user's answer to a conflict prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AskOutcome {
    /// Chosen mode; `Ask` is treated as `NoImport`
    pub mode: ImportMode,
    /// Reuse this choice for the rest of the run and later runs
    pub keep_choice: bool,
}

/// Prompts the user when a conflict needs a decision.
pub trait AskUser {
    fn ask(
        &mut self,
        candidate: &ItemDocument,
        existing: &ExistingItem,
        context: &AskContext<'_>,
    ) -> AskOutcome;
}

impl<T: AskUser + ?Sized> AskUser for &mut T {
    fn ask(
        &mut self,
        candidate: &ItemDocument,
        existing: &ExistingItem,
        context: &AskContext<'_>,
    ) -> AskOutcome {
        (**self).ask(candidate, existing, context)
    }
}

/// An [`AskUser`] that always answers the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub AskOutcome);

impl AskUser for FixedAnswer {
    fn ask(&mut self, _: &ItemDocument, _: &ExistingItem, _: &AskContext<'_>) -> AskOutcome {
        self.0
    }
}

/// Process-scoped "keep my last choice" preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportPreferences {
    pub keep_choice: bool,
    pub last_mode: Option<ImportMode>,
}

/// Decides the fate of each candidate of one import batch.
pub struct ConflictResolver<E, A>
where
    E: Fn(&str) -> Option<ExistingItem>,
    A: AskUser,
{
    mode: ImportMode,
    prefs: ImportPreferences,
    exists: E,
    asker: A,
    accepted: HashMap<String, ExistingItem>,
    seen: usize,
}

impl<E, A> ConflictResolver<E, A>
where
    E: Fn(&str) -> Option<ExistingItem>,
    A: AskUser,
{
    /// Start a run. `exists` must not mutate anything it looks at.
    pub fn new(mode: ImportMode, prefs: ImportPreferences, exists: E, asker: A) -> Self {
        Self {
            mode,
            prefs,
            exists,
            asker,
            accepted: HashMap::new(),
            seen: 0,
        }
    }

    /// Preferences as updated by the user's answers so far.
    pub fn preferences(&self) -> ImportPreferences {
        self.prefs
    }

    /// Count a candidate rejected before reaching [`ConflictResolver::resolve`],
    /// so prompt positions stay aligned with the source.
    pub fn skip(&mut self) {
        self.seen += 1;
    }

    /// Decide the fate of the next candidate, in source order.
    ///
    /// Menus and actions nested in the candidate are looked up as well. A
    /// nested hit rejects the whole candidate, unless the hit lives inside the
    /// item the candidate overwrites.
    pub fn resolve(&mut self, mut candidate: ItemDocument, source: &str) -> Decision {
        let index = self.seen;
        self.seen += 1;

        let id = candidate.fields.id.trim().to_string();
        if id.is_empty() {
            return Decision::Rejected(RejectReason::MissingIdentity {
                label: candidate.fields.label.clone(),
            });
        }

        let mut collisions: Vec<(String, ExistingItem)> = nested_containers(&candidate)
            .into_iter()
            .filter_map(|nested| self.lookup(&nested.id).map(|hit| (nested.id, hit)))
            .collect();
        // A hit outside the item sharing the candidate's ID rejects in any mode
        if let Some(pos) = collisions
            .iter()
            .position(|(_, hit)| !hit.ancestors.contains(&id))
        {
            let (nested_id, hit) = collisions.swap_remove(pos);
            return nested_duplicate(id, nested_id, hit);
        }

        let Some(existing) = self.lookup(&id) else {
            if let Some((nested_id, hit)) = collisions.pop() {
                return nested_duplicate(id, nested_id, hit);
            }
            self.accept(&candidate);
            return Decision::Accepted(candidate);
        };

        let mode = match self.mode {
            ImportMode::Ask => self.ask_mode(&candidate, &existing, source, index),
            fixed => fixed,
        };
        tracing::debug!(id = %id, mode = %mode, source, "import conflict");

        match mode {
            ImportMode::Renumber => {
                if let Some((nested_id, hit)) = collisions.pop() {
                    return nested_duplicate(id, nested_id, hit);
                }
                candidate.fields.id = self.fresh_id();
                self.accept(&candidate);
                Decision::RenumberAndAccept(candidate)
            }
            ImportMode::Override => {
                self.accept(&candidate);
                Decision::OverwriteAccept(candidate)
            }
            ImportMode::NoImport | ImportMode::Ask => Decision::Rejected(RejectReason::Duplicate {
                id,
                existing_label: existing.label,
            }),
        }
    }

    fn lookup(&self, id: &str) -> Option<ExistingItem> {
        self.accepted
            .get(id)
            .cloned()
            .or_else(|| (self.exists)(id))
    }

    fn accept(&mut self, candidate: &ItemDocument) {
        self.accepted
            .insert(candidate.fields.id.clone(), ExistingItem::from(candidate));
        for nested in nested_containers(candidate) {
            self.accepted.insert(nested.id.clone(), nested);
        }
    }

    fn ask_mode(
        &mut self,
        candidate: &ItemDocument,
        existing: &ExistingItem,
        source: &str,
        index: usize,
    ) -> ImportMode {
        let remembered = self.prefs.last_mode.filter(|_| self.prefs.keep_choice);
        if let Some(mode) = remembered.filter(|_| index > 0) {
            return mode;
        }

        let outcome = self
            .asker
            .ask(candidate, existing, &AskContext { source, index });
        let mode = match outcome.mode {
            ImportMode::Ask => ImportMode::NoImport,
            other => other,
        };
        self.prefs.keep_choice = outcome.keep_choice;
        if outcome.keep_choice {
            self.prefs.last_mode = Some(mode);
        }
        mode
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.lookup(&id).is_none() {
                return id;
            }
        }
    }
}

fn nested_duplicate(id: String, nested_id: String, hit: ExistingItem) -> Decision {
    tracing::debug!(id = %id, nested = %nested_id, "nested import conflict");
    Decision::Rejected(RejectReason::NestedDuplicate {
        id,
        nested_id,
        existing_label: hit.label,
    })
}

//! Importing items from an external source into the working tree.
//!
//! [`import_items`] runs one conflict run over a batch of candidates:
//! structure check, duplicate resolution through [`ConflictResolver`], then
//! the accepted items are written into the tree and their flags refreshed.
//!
//! Menu and action IDs stay unique across the tree: a candidate is rejected
//! when any container it carries collides, and a candidate overwriting an
//! item imported earlier in the same run supersedes that item's entry.

pub mod conflict;
pub mod format;

pub use conflict::{
    AskContext, AskOutcome, AskUser, ConflictResolver, Decision, ExistingItem, FixedAnswer,
    ImportMode, ImportPreferences, RejectReason,
};
pub use format::{ExportFormat, ImportFormat, JsonFormat, export_format, import_format};

use crate::models::{ItemDocument, ItemKind, validate_id};
use std::collections::HashSet;
use crate::status::check_status;
use crate::tree::{ItemTree, NodeId};
use crate::{Error, Result};
use serde::Serialize;

/// What happened to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportOutcome {
    Imported,
    Renumbered,
    Overwritten,
    Rejected,
    /// Imported, then replaced by a later candidate of the same run
    Superseded,
}

/// Per-candidate line of an [`ImportReport`].
#[derive(Debug, Clone, Serialize)]
pub struct ImportedItem {
    /// ID the item ended up with (the source ID when rejected)
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_id: Option<String>,
    pub kind: ItemKind,
    pub label: String,
    pub outcome: ImportOutcome,
    /// The item and its descendants
    pub count: usize,
    #[serde(skip)]
    node: Option<NodeId>,
}

/// Result of one import run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub source: String,
    pub mode: String,
    pub imported: usize,
    pub rejected: usize,
    pub items: Vec<ImportedItem>,
    pub messages: Vec<String>,
    /// Preferences after the run, for the caller to persist
    #[serde(skip)]
    pub preferences: ImportPreferences,
    /// Live tree nodes created by the run, in source order
    #[serde(skip)]
    pub inserted: Vec<NodeId>,
}

/// Import `candidates` as top-level items of `tree`.
///
/// Identities are checked against the items accepted earlier in the run, the
/// menus and actions of `tree`, and then `external` (typically the persisted
/// store). Rejected candidates are reported, never fatal.
pub fn import_items<E, A>(
    tree: &mut ItemTree,
    candidates: Vec<ItemDocument>,
    source: &str,
    mode: ImportMode,
    prefs: ImportPreferences,
    external: E,
    asker: A,
) -> Result<ImportReport>
where
    E: Fn(&str) -> Option<ExistingItem>,
    A: AskUser,
{
    let (decisions, preferences) = {
        let view: &ItemTree = tree;
        let in_tree = |id: &str| {
            let node_id = view.find_container(id)?;
            view.get(node_id)
                .map(|node| ExistingItem {
                    id: node.fields.id.clone(),
                    kind: node.kind(),
                    label: node.fields.label.clone(),
                    ancestors: view
                        .ancestors(node_id)
                        .into_iter()
                        .filter_map(|a| view.get(a).map(|n| n.fields.id.clone()))
                        .collect(),
                })
        };
        let exists = |id: &str| in_tree(id).or_else(|| external(id));
        let mut resolver = ConflictResolver::new(mode, prefs, exists, asker);
        let decisions: Vec<(ExistingItem, Decision)> = candidates
            .into_iter()
            .map(|candidate| {
                let summary = ExistingItem::from(&candidate);
                let decision = match check_structure(&candidate) {
                    Ok(()) => resolver.resolve(candidate, source),
                    Err(e) => {
                        resolver.skip();
                        Decision::Rejected(RejectReason::InvalidStructure {
                            id: summary.id.clone(),
                            message: e.to_string(),
                        })
                    }
                };
                (summary, decision)
            })
            .collect();
        (decisions, resolver.preferences())
    };

    let mut report = ImportReport {
        source: source.to_string(),
        mode: mode.to_string(),
        imported: 0,
        rejected: 0,
        items: Vec::new(),
        messages: Vec::new(),
        preferences,
        inserted: Vec::new(),
    };

    for (candidate, decision) in decisions {
        match decision {
            Decision::Rejected(reason) => {
                report.rejected += 1;
                report.messages.push(reason.to_string());
                report.items.push(ImportedItem {
                    id: candidate.id,
                    original_id: None,
                    kind: candidate.kind,
                    label: candidate.label,
                    outcome: ImportOutcome::Rejected,
                    count: 0,
                    node: None,
                });
            }
            Decision::Accepted(item) => {
                let node = tree.insert_document(None, &item)?;
                report.messages.push(format!(
                    "Imported {} '{}' ({})",
                    item.kind,
                    item.fields.label,
                    item.id()
                ));
                report.record(node, &item, None, ImportOutcome::Imported);
            }
            Decision::RenumberAndAccept(item) => {
                let node = tree.insert_document(None, &item)?;
                report.messages.push(format!(
                    "Imported {} '{}' as {} ({} already exists)",
                    item.kind,
                    item.fields.label,
                    item.id(),
                    candidate.id
                ));
                report.record(node, &item, Some(candidate.id), ImportOutcome::Renumbered);
            }
            Decision::OverwriteAccept(item) => {
                let node = overwrite(tree, &item)?;
                report.supersede_released(tree);
                report.messages.push(format!(
                    "Replaced {} '{}' ({})",
                    item.kind,
                    item.fields.label,
                    item.id()
                ));
                report.record(node, &item, None, ImportOutcome::Overwritten);
            }
        }
    }

    for node in &report.inserted {
        check_status(tree, *node);
    }

    tracing::info!(
        source,
        imported = report.imported,
        rejected = report.rejected,
        "import finished"
    );
    Ok(report)
}

impl ImportReport {
    /// Downgrade entries whose node an overwrite just released.
    fn supersede_released(&mut self, tree: &ItemTree) {
        for entry in &mut self.items {
            let Some(node) = entry.node else {
                continue;
            };
            if tree.contains(node) {
                continue;
            }
            entry.node = None;
            entry.outcome = ImportOutcome::Superseded;
            self.imported -= 1;
            self.messages.push(format!(
                "Superseded {} '{}' ({}) by a later item of the same import",
                entry.kind, entry.label, entry.id
            ));
        }
        self.inserted.retain(|node| tree.contains(*node));
    }

    fn record(
        &mut self,
        node: NodeId,
        item: &ItemDocument,
        original_id: Option<String>,
        outcome: ImportOutcome,
    ) {
        self.imported += 1;
        self.inserted.push(node);
        self.items.push(ImportedItem {
            id: item.id().to_string(),
            original_id,
            kind: item.kind,
            label: item.fields.label.clone(),
            outcome,
            count: item.count(),
            node: Some(node),
        });
    }
}

/// Replace the menu or action carrying the item's ID in place, or add the
/// item at the top level when the existing one lives outside the tree.
fn overwrite(tree: &mut ItemTree, item: &ItemDocument) -> Result<NodeId> {
    let Some(existing) = tree.find_container(item.id()) else {
        return tree.insert_document(None, item);
    };
    let parent = tree.parent(existing);
    let siblings = match parent {
        Some(p) => tree.children(p),
        None => tree.roots(),
    };
    let index = siblings
        .iter()
        .position(|s| *s == existing)
        .unwrap_or(siblings.len());

    tree.remove(existing);
    tree.insert_document_at(parent, index, item)
}

/// Kinds must nest as menus > actions > profiles, starting from a menu or an
/// action at the top. Every ID must be addressable by path, and menu and
/// action IDs must not repeat inside the candidate.
fn check_structure(doc: &ItemDocument) -> Result<()> {
    if !doc.kind.can_be_root() {
        return Err(Error::InvalidRoot(doc.kind));
    }
    // An empty top-level ID is reported as a missing identity
    if !doc.id().trim().is_empty() {
        validate_id(doc.id())?;
    }
    let mut containers = HashSet::from([doc.id()]);
    check_children(doc, &mut containers)
}

fn check_children<'a>(doc: &'a ItemDocument, containers: &mut HashSet<&'a str>) -> Result<()> {
    for child in &doc.children {
        if !doc.kind.accepts_child(child.kind) {
            return Err(Error::InvalidChild {
                parent: doc.kind,
                child: child.kind,
            });
        }
        validate_id(child.id())?;
        if child.kind.is_container() && !containers.insert(child.id()) {
            return Err(Error::InvalidId(format!(
                "ID '{}' appears more than once",
                child.id()
            )));
        }
        check_children(child, containers)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{is_modified, is_valid};

    fn no_external(_: &str) -> Option<ExistingItem> {
        None
    }

    fn never_asked() -> FixedAnswer {
        FixedAnswer(AskOutcome {
            mode: ImportMode::NoImport,
            keep_choice: false,
        })
    }

    fn terminal_action(id: &str, label: &str) -> ItemDocument {
        ItemDocument::action(id, label).with_child(ItemDocument::profile("p1", "Default", "/usr/bin/xterm"))
    }

    fn tree_with(docs: &[ItemDocument]) -> ItemTree {
        ItemTree::from_documents(docs).unwrap()
    }

    fn run(tree: &mut ItemTree, mode: ImportMode, candidates: Vec<ItemDocument>) -> ImportReport {
        import_items(
            tree,
            candidates,
            "batch.json",
            mode,
            ImportPreferences::default(),
            no_external,
            never_asked(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_items_appended_as_modified_roots() {
        let mut tree = tree_with(&[terminal_action("a1", "Existing")]);
        let report = run(&mut tree, ImportMode::NoImport, vec![terminal_action("a2", "New")]);

        assert_eq!(report.imported, 1);
        assert_eq!(report.rejected, 0);
        assert_eq!(tree.roots().len(), 2);
        let node = report.inserted[0];
        assert_eq!(tree.roots()[1], node);
        assert!(is_modified(&tree, node));
        assert!(is_valid(&tree, node));
        assert_eq!(report.items[0].outcome, ImportOutcome::Imported);
        assert_eq!(report.items[0].count, 2);
    }

    #[test]
    fn test_no_import_leaves_tree_unchanged() {
        let mut tree = tree_with(&[terminal_action("a1", "Existing")]);
        let report = run(&mut tree, ImportMode::NoImport, vec![terminal_action("a1", "Incoming")]);

        assert_eq!(report.rejected, 1);
        assert_eq!(tree.roots().len(), 1);
        assert_eq!(tree.get(tree.roots()[0]).unwrap().fields.label, "Existing");
        assert!(report.messages[0].contains("already exists"));
    }

    #[test]
    fn test_override_replaces_in_place() {
        let nested = ItemDocument::menu("tools", "Tools")
            .with_child(terminal_action("before", "Before"))
            .with_child(terminal_action("a1", "Old"))
            .with_child(terminal_action("after", "After"));
        let mut tree = tree_with(&[nested]);
        let report = run(&mut tree, ImportMode::Override, vec![terminal_action("a1", "New")]);

        assert_eq!(report.items[0].outcome, ImportOutcome::Overwritten);
        let menu = tree.roots()[0];
        assert_eq!(tree.roots().len(), 1);
        let labels: Vec<String> = tree
            .children(menu)
            .iter()
            .map(|c| tree.get(*c).unwrap().fields.label.clone())
            .collect();
        assert_eq!(labels, ["Before", "New", "After"]);
        assert_eq!(tree.parent(report.inserted[0]), Some(menu));
    }

    #[test]
    fn test_renumber_keeps_both() {
        let mut tree = tree_with(&[terminal_action("a1", "Existing")]);
        let report = run(&mut tree, ImportMode::Renumber, vec![terminal_action("a1", "Incoming")]);

        assert_eq!(tree.roots().len(), 2);
        let entry = &report.items[0];
        assert_eq!(entry.outcome, ImportOutcome::Renumbered);
        assert_eq!(entry.original_id.as_deref(), Some("a1"));
        assert_ne!(entry.id, "a1");
        assert!(tree.find_container(&entry.id).is_some());
    }

    #[test]
    fn test_external_lookup_consulted() {
        let mut tree = ItemTree::new();
        let external = |id: &str| {
            (id == "stored").then(|| ExistingItem {
                id: id.to_string(),
                kind: ItemKind::Menu,
                label: "In store".to_string(),
                ancestors: Vec::new(),
            })
        };
        let report = import_items(
            &mut tree,
            vec![ItemDocument::menu("stored", "Menu")],
            "batch.json",
            ImportMode::NoImport,
            ImportPreferences::default(),
            external,
            never_asked(),
        )
        .unwrap();

        assert_eq!(report.rejected, 1);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_profile_ids_do_not_collide_with_containers() {
        let mut tree = tree_with(&[terminal_action("a1", "Existing")]);
        // "p1" is the ID of the existing action's profile
        let report = run(&mut tree, ImportMode::NoImport, vec![terminal_action("p1", "Action")]);

        assert_eq!(report.imported, 1);
    }

    #[test]
    fn test_invalid_structure_rejected_without_side_effects() {
        let mut tree = ItemTree::new();
        let bad_nesting = ItemDocument::menu("m", "Menu").with_child(ItemDocument::profile("p", "P", "/bin/true"));
        let report = run(
            &mut tree,
            ImportMode::Override,
            vec![
                ItemDocument::profile("p", "Loose profile", "/bin/true"),
                bad_nesting,
                ItemDocument::menu("m", "Fine"),
            ],
        );

        assert_eq!(report.rejected, 2);
        assert_eq!(report.imported, 1);
        // The rejected "m" did not enter the run's accepted set
        assert_eq!(report.items[2].outcome, ImportOutcome::Imported);
        assert_eq!(tree.roots().len(), 1);
    }

    #[test]
    fn test_keep_choice_preferences_returned() {
        let mut tree = tree_with(&[ItemDocument::menu("m", "Menu")]);
        let report = import_items(
            &mut tree,
            vec![ItemDocument::menu("m", "Again")],
            "batch.json",
            ImportMode::Ask,
            ImportPreferences::default(),
            no_external,
            FixedAnswer(AskOutcome {
                mode: ImportMode::Renumber,
                keep_choice: true,
            }),
        )
        .unwrap();

        assert_eq!(report.preferences.last_mode, Some(ImportMode::Renumber));
        assert!(report.preferences.keep_choice);
        assert_eq!(report.imported, 1);
    }

    fn container_count(tree: &ItemTree, id: &str) -> usize {
        tree.roots()
            .iter()
            .flat_map(|root| tree.walk(*root))
            .filter(|(node, _)| {
                let node = tree.get(*node).unwrap();
                node.kind().is_container() && node.id() == id
            })
            .count()
    }

    #[test]
    fn test_menu_carrying_existing_action_rejected() {
        let mut tree = tree_with(&[terminal_action("a1", "Existing")]);
        let incoming = ItemDocument::menu("m2", "Menu").with_child(terminal_action("a1", "Copy"));

        for mode in [ImportMode::NoImport, ImportMode::Renumber, ImportMode::Override] {
            let report = run(&mut tree, mode, vec![incoming.clone()]);

            assert_eq!(report.imported, 0, "mode {}", mode);
            assert_eq!(report.rejected, 1, "mode {}", mode);
            assert!(report.messages[0].contains("contains 'a1'"));
        }
        assert_eq!(container_count(&tree, "a1"), 1);
        assert!(tree.find_container("m2").is_none());
    }

    #[test]
    fn test_nested_ids_of_earlier_candidate_block_later_ones() {
        let mut tree = ItemTree::new();
        let report = run(
            &mut tree,
            ImportMode::NoImport,
            vec![
                ItemDocument::menu("m1", "First").with_child(terminal_action("a1", "Inner")),
                terminal_action("a1", "Loose"),
            ],
        );

        assert_eq!(report.imported, 1);
        assert_eq!(report.items[1].outcome, ImportOutcome::Rejected);
        assert_eq!(container_count(&tree, "a1"), 1);
    }

    #[test]
    fn test_override_of_menu_keeps_its_own_actions() {
        let old = ItemDocument::menu("m1", "Old").with_child(terminal_action("a1", "Old action"));
        let mut tree = tree_with(&[old]);
        let new = ItemDocument::menu("m1", "New").with_child(terminal_action("a1", "New action"));

        let report = run(&mut tree, ImportMode::Override, vec![new]);

        assert_eq!(report.items[0].outcome, ImportOutcome::Overwritten);
        assert_eq!(container_count(&tree, "a1"), 1);
        let action = tree.find_container("a1").unwrap();
        assert_eq!(tree.get(action).unwrap().fields.label, "New action");
    }

    #[test]
    fn test_override_within_run_supersedes_earlier_entry() {
        let mut tree = ItemTree::new();
        let report = run(
            &mut tree,
            ImportMode::Override,
            vec![
                ItemDocument::menu("x", "A").with_child(terminal_action("a1", "Act")),
                ItemDocument::menu("x", "B").with_child(terminal_action("a1", "Act")),
            ],
        );

        assert_eq!(tree.roots().len(), 1);
        assert_eq!(report.imported, 1);
        assert_eq!(report.items[0].outcome, ImportOutcome::Superseded);
        assert_eq!(report.items[1].outcome, ImportOutcome::Overwritten);
        assert_eq!(report.inserted, [tree.roots()[0]]);
        assert_eq!(tree.get(tree.roots()[0]).unwrap().fields.label, "B");
    }

    #[test]
    fn test_unaddressable_ids_rejected() {
        let mut tree = ItemTree::new();
        let report = run(
            &mut tree,
            ImportMode::NoImport,
            vec![
                ItemDocument::menu("a/b", "Slashed").with_child(terminal_action("a1", "Act")),
                ItemDocument::menu("m", "Menu").with_child(terminal_action("x/y", "Act")),
                ItemDocument::menu("ok", "Menu").with_child(terminal_action("a1", "Act")),
            ],
        );

        assert_eq!(report.rejected, 2);
        assert!(report.messages[0].contains("must not contain '/'"));
        assert!(report.messages[1].contains("must not contain '/'"));
        assert_eq!(report.imported, 1);
        assert!(tree.find_path("ok/a1").is_some());
    }

    #[test]
    fn test_repeated_container_id_inside_candidate_rejected() {
        let mut tree = ItemTree::new();
        let report = run(
            &mut tree,
            ImportMode::Override,
            vec![ItemDocument::menu("m", "Menu")
                .with_child(terminal_action("a1", "One"))
                .with_child(terminal_action("a1", "Two"))],
        );

        assert_eq!(report.rejected, 1);
        assert!(report.messages[0].contains("appears more than once"));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_prompt_index_counts_rejected_candidates() {
        struct IndexRecorder(Vec<usize>);
        impl AskUser for IndexRecorder {
            fn ask(&mut self, _: &ItemDocument, _: &ExistingItem, context: &AskContext<'_>) -> AskOutcome {
                self.0.push(context.index);
                AskOutcome {
                    mode: ImportMode::NoImport,
                    keep_choice: false,
                }
            }
        }

        let mut tree = tree_with(&[terminal_action("a1", "Existing")]);
        let mut recorder = IndexRecorder(Vec::new());
        import_items(
            &mut tree,
            vec![
                ItemDocument::profile("p", "Loose profile", "/bin/true"),
                terminal_action("a1", "Incoming"),
            ],
            "batch.json",
            ImportMode::Ask,
            ImportPreferences::default(),
            no_external,
            &mut recorder,
        )
        .unwrap();

        assert_eq!(recorder.0, [1]);
    }
}

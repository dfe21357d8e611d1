//! Equality and validity checks per item kind.
//!
//! Each capability contributes an independent pure check over its own field
//! subset:
//! - identity: the generic [`ItemFields`](crate::models::ItemFields)
//! - conditions: only for kinds carrying execution conditions
//! - kind: the concrete kind's own fields
//!
//! The kind check is a template-method chain over the kind hierarchy
//! (`menu`/`action` -> `container` -> `object`, `profile` -> `object`): each
//! level does its own comparison and explicitly calls the level above it.
//! [`are_equal`] and [`is_valid`] AND the applicable checks together.

use crate::models::{ActionFields, Conditions, ItemFields, ItemKind, ProfileFields};
use crate::tree::{ItemTree, Node, NodeId};

type EqualFn = fn(&ItemTree, &Node, &Node) -> bool;
type ValidFn = fn(&ItemTree, &Node) -> bool;

/// The checks that make up a kind's composite comparison.
struct KindChecks {
    equal: EqualFn,
    valid: ValidFn,
    conditions: bool,
}

fn kind_checks(kind: ItemKind) -> KindChecks {
    match kind {
        ItemKind::Menu => KindChecks {
            equal: menu_equal,
            valid: menu_valid,
            conditions: kind.carries_conditions(),
        },
        ItemKind::Action => KindChecks {
            equal: action_equal,
            valid: action_valid,
            conditions: kind.carries_conditions(),
        },
        ItemKind::Profile => KindChecks {
            equal: profile_equal,
            valid: profile_valid,
            conditions: kind.carries_conditions(),
        },
    }
}

/// Whether two items hold equal content.
///
/// Items of different kinds, or released handles, are never equal.
pub fn are_equal(tree: &ItemTree, a: NodeId, b: NodeId) -> bool {
    let (Some(a), Some(b)) = (tree.get(a), tree.get(b)) else {
        return false;
    };
    if a.kind() != b.kind() {
        return false;
    }
    let checks = kind_checks(a.kind());

    identity_equal(&a.fields, &b.fields)
        && (!checks.conditions || conditions_equal(a, b))
        && (checks.equal)(tree, a, b)
}

/// Whether an item's current content is usable. False for released handles.
pub fn is_valid(tree: &ItemTree, id: NodeId) -> bool {
    let Some(node) = tree.get(id) else {
        return false;
    };
    let checks = kind_checks(node.kind());

    identity_valid(&node.fields)
        && (!checks.conditions || conditions_valid(node))
        && (checks.valid)(tree, node)
}

// ============================================================================
// Capability checks
// ============================================================================

fn identity_equal(a: &ItemFields, b: &ItemFields) -> bool {
    a == b
}

fn identity_valid(fields: &ItemFields) -> bool {
    !fields.label.trim().is_empty()
}

fn conditions_equal(a: &Node, b: &Node) -> bool {
    a.body.conditions() == b.body.conditions()
}

fn conditions_valid(node: &Node) -> bool {
    node.body.conditions().is_some_and(|c: &Conditions| {
        !c.basenames.is_empty()
            && !c.mimetypes.is_empty()
            && !c.schemes.is_empty()
            && !c.folders.is_empty()
    })
}

// ============================================================================
// Kind chain
// ============================================================================

fn object_equal(_tree: &ItemTree, a: &Node, b: &Node) -> bool {
    a.kind() == b.kind()
}

fn object_valid(_tree: &ItemTree, node: &Node) -> bool {
    !node.fields.id.trim().is_empty()
}

/// Same ordered sequence of child IDs.
fn container_equal(tree: &ItemTree, a: &Node, b: &Node) -> bool {
    if !object_equal(tree, a, b) {
        return false;
    }
    a.children().len() == b.children().len()
        && a.children()
            .iter()
            .zip(b.children())
            .all(|(x, y)| match (tree.get(*x), tree.get(*y)) {
                (Some(x), Some(y)) => x.fields.id == y.fields.id,
                _ => false,
            })
}

/// At least one child is currently valid.
fn container_valid(tree: &ItemTree, node: &Node) -> bool {
    object_valid(tree, node)
        && node
            .children()
            .iter()
            .any(|c| tree.get(*c).is_some_and(|c| c.status().valid))
}

fn menu_equal(tree: &ItemTree, a: &Node, b: &Node) -> bool {
    container_equal(tree, a, b)
}

fn menu_valid(tree: &ItemTree, node: &Node) -> bool {
    container_valid(tree, node)
}

/// An action and its profiles are saved as one unit, so a modified profile
/// makes its action differ from the baseline.
fn action_equal(tree: &ItemTree, a: &Node, b: &Node) -> bool {
    container_equal(tree, a, b)
        && a.body.action() == b.body.action()
        && a.children()
            .iter()
            .chain(b.children())
            .all(|c| tree.get(*c).is_some_and(|c| !c.status().modified))
}

fn action_valid(tree: &ItemTree, node: &Node) -> bool {
    container_valid(tree, node) && node.body.action().is_some_and(action_fields_valid)
}

fn action_fields_valid(action: &ActionFields) -> bool {
    let has_target = action.target_selection || action.target_location || action.target_toolbar;
    let toolbar_ok = !action.target_toolbar
        || action
            .toolbar_label
            .as_deref()
            .is_some_and(|l| !l.trim().is_empty());
    has_target && toolbar_ok
}

fn profile_equal(tree: &ItemTree, a: &Node, b: &Node) -> bool {
    object_equal(tree, a, b) && a.body.profile() == b.body.profile()
}

fn profile_valid(tree: &ItemTree, node: &Node) -> bool {
    object_valid(tree, node)
        && node
            .body
            .profile()
            .is_some_and(|p: &ProfileFields| !p.path.trim().is_empty())
}

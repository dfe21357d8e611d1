//! The Duplicable capability: origin tracking and the cached modified/valid flags.
//!
//! Every item may point at the instance it was copied from (its *origin*).
//! The origin is a non-owning handle into the same arena; once the origin is
//! released the item is treated as having no baseline.
//!
//! All functions here silently ignore released handles.

use super::{ItemTree, NodeId};
use crate::status::compare;

/// Copy an item's fields and payload into a new detached node.
///
/// Children are **not** copied: subtree duplication is the caller's job,
/// wired up afterwards with [`reset_origin`] (see [`ItemTree::snapshot`]).
/// The copy has no origin and its cached flags are unset until recomputed.
pub fn duplicate(tree: &mut ItemTree, id: NodeId) -> Option<NodeId> {
    let node = tree.get(id)?;
    let (fields, body) = (node.fields.clone(), node.body.clone());
    Some(tree.alloc(fields, body))
}

/// Make `origin` the comparison baseline of `object`, recursively.
///
/// Each child of `object` is re-paired with the child of `origin` at the same
/// position. `origin` loses its own origin: only one level of lineage is kept.
/// The two subtrees must be structurally identical; extra children on either
/// side are left unpaired.
pub fn reset_origin(tree: &mut ItemTree, object: NodeId, origin: NodeId) {
    if !tree.contains(object) || !tree.contains(origin) {
        return;
    }
    if let Some(node) = tree.get_mut(origin) {
        node.origin = None;
    }
    if let Some(node) = tree.get_mut(object) {
        node.origin = Some(origin);
    }

    let pairs: Vec<(NodeId, NodeId)> = tree
        .children(object)
        .iter()
        .copied()
        .zip(tree.children(origin).iter().copied())
        .collect();
    for (child, child_origin) in pairs {
        reset_origin(tree, child, child_origin);
    }
}

/// The item's origin, if it has one that is still alive.
pub fn origin(tree: &ItemTree, id: NodeId) -> Option<NodeId> {
    tree.get(id)
        .and_then(|n| n.origin)
        .filter(|o| tree.contains(*o))
}

/// Refresh the cached flags of a single item from its current content.
///
/// `modified` is true when there is no live origin or the content differs
/// from it; `valid` depends only on the item's own content (and, for
/// containers, its children's cached validity).
pub fn recompute(tree: &mut ItemTree, id: NodeId) {
    if !tree.contains(id) {
        return;
    }
    let modified = match origin(tree, id) {
        Some(o) => !compare::are_equal(tree, id, o),
        None => true,
    };
    let valid = compare::is_valid(tree, id);
    if let Some(node) = tree.get_mut(id) {
        node.status.modified = modified;
        node.status.valid = valid;
    }
}

/// Cached modified flag; false for released handles.
pub fn is_modified(tree: &ItemTree, id: NodeId) -> bool {
    tree.get(id).is_some_and(|n| n.status.modified)
}

/// Cached valid flag; false for released handles.
pub fn is_valid(tree: &ItemTree, id: NodeId) -> bool {
    tree.get(id).is_some_and(|n| n.status.valid)
}

/// Release an item and its subtree. Releasing twice is a no-op.
pub fn release(tree: &mut ItemTree, id: NodeId) {
    tree.remove(id);
}

//! Incremental modified/valid tracking over the item tree.
//!
//! [`check_status`] is called after every edit on the edited node. It
//! refreshes the whole subtree below the node (children before parents, so a
//! container is never evaluated against stale children) and then walks up the
//! ancestor chain while a level reports a relevant change:
//!
//! - a change of the *valid* flag escalates from any kind
//! - a change of the *modified* flag escalates only from a profile
//!
//! A menu or action whose own modified flag flips does not re-trigger its
//! parent. Menus and actions are saved individually, while an action and its
//! profiles are saved together.

pub mod compare;

pub use compare::{are_equal, is_valid};

use crate::models::ItemKind;
use crate::tree::{self, ItemTree, NodeId, Status};

/// Refresh the flags of `id`, its subtree, and as many ancestors as needed.
///
/// Released handles are ignored.
pub fn check_status(tree: &mut ItemTree, id: NodeId) {
    let Some(before) = tree.get(id).map(|n| n.status()) else {
        return;
    };
    refresh_subtree(tree, id);
    escalate(tree, id, before);
}

/// Post-order recompute: children left to right, then the node itself.
fn refresh_subtree(tree: &mut ItemTree, id: NodeId) {
    let children = tree.children(id).to_vec();
    for child in children {
        refresh_subtree(tree, child);
    }
    tree::recompute(tree, id);
}

fn escalate(tree: &mut ItemTree, id: NodeId, before: Status) {
    let mut current = id;
    let mut before = before;
    loop {
        let Some(node) = tree.get(current) else {
            return;
        };
        let after = node.status();
        let modified_changed = node.kind() == ItemKind::Profile && after.modified != before.modified;
        let valid_changed = after.valid != before.valid;
        if !modified_changed && !valid_changed {
            return;
        }
        let Some(parent) = node.parent() else {
            return;
        };
        let Some(parent_before) = tree.get(parent).map(|n| n.status()) else {
            return;
        };

        tree::recompute(tree, parent);
        tracing::trace!(
            node = %current,
            parent = %parent,
            modified_changed,
            valid_changed,
            "status escalated to parent"
        );

        current = parent;
        before = parent_before;
    }
}

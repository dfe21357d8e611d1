//! Arena storage for the item tree.
//!
//! Nodes live in a single arena addressed by [`NodeId`] handles. Handles are
//! never reused, so a handle whose node was removed simply resolves to
//! nothing; this is what makes the non-owning `origin` back-reference safe.
//!
//! The arena holds:
//! - an ordered list of **roots** (the working set the user edits)
//! - any number of **detached** nodes created by duplication, which serve as
//!   comparison baselines and are reachable only through `origin` links
//!
//! Containers own their children outright: removing a node releases its
//! whole subtree.

pub mod duplicable;

pub use duplicable::{
    duplicate, is_modified, is_valid, origin, recompute, release, reset_origin,
};

use crate::models::{ItemBody, ItemDocument, ItemFields, ItemKind};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Opaque handle to a node in an [`ItemTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Cached Duplicable flags, only correct right after a recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    pub modified: bool,
    pub valid: bool,
}

/// One item in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub fields: ItemFields,
    pub body: ItemBody,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) origin: Option<NodeId>,
    pub(crate) status: Status,
}

impl Node {
    fn new(fields: ItemFields, body: ItemBody) -> Self {
        Self {
            fields,
            body,
            parent: None,
            children: Vec::new(),
            origin: None,
            status: Status::default(),
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.body.kind()
    }

    pub fn id(&self) -> &str {
        &self.fields.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn status(&self) -> Status {
        self.status
    }
}

/// Arena holding the working set of items and their baselines.
#[derive(Debug, Default)]
pub struct ItemTree {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
    next_id: u64,
}

impl ItemTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree whose roots are the given documents, in order.
    pub fn from_documents(docs: &[ItemDocument]) -> Result<Self> {
        let mut tree = Self::new();
        for doc in docs {
            tree.insert_document(None, doc)?;
        }
        Ok(tree)
    }

    /// Number of live nodes, detached baselines included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level items of the working set, in order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Whether the handle still resolves to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn kind(&self, id: NodeId) -> Option<ItemKind> {
        self.get(id).map(Node::kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children of a node, empty for profiles and released handles.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Mutable access to the generic fields. Callers follow edits with
    /// [`crate::status::check_status`].
    pub fn fields_mut(&mut self, id: NodeId) -> Option<&mut ItemFields> {
        self.get_mut(id).map(|n| &mut n.fields)
    }

    /// Mutable access to the kind payload.
    pub fn body_mut(&mut self, id: NodeId) -> Option<&mut ItemBody> {
        self.get_mut(id).map(|n| &mut n.body)
    }

    /// Mutable access to both fields and payload at once.
    pub fn parts_mut(&mut self, id: NodeId) -> Option<(&mut ItemFields, &mut ItemBody)> {
        self.get_mut(id).map(|n| (&mut n.fields, &mut n.body))
    }

    /// Allocate a detached node.
    pub(crate) fn alloc(&mut self, fields: ItemFields, body: ItemBody) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(fields, body));
        id
    }

    /// Add a new top-level item at the end of the working set.
    pub fn insert_root(&mut self, fields: ItemFields, body: ItemBody) -> Result<NodeId> {
        let index = self.roots.len();
        self.insert_root_at(index, fields, body)
    }

    /// Add a new top-level item at `index` (clamped to the end).
    pub fn insert_root_at(
        &mut self,
        index: usize,
        fields: ItemFields,
        body: ItemBody,
    ) -> Result<NodeId> {
        let kind = body.kind();
        if !kind.can_be_root() {
            return Err(Error::InvalidRoot(kind));
        }
        let id = self.alloc(fields, body);
        let index = index.min(self.roots.len());
        self.roots.insert(index, id);
        Ok(id)
    }

    /// Append a new item as the last child of `parent`.
    pub fn append_child(
        &mut self,
        parent: NodeId,
        fields: ItemFields,
        body: ItemBody,
    ) -> Result<NodeId> {
        let index = self.children(parent).len();
        self.insert_child_at(parent, index, fields, body)
    }

    /// Insert a new item as child `index` of `parent` (clamped to the end).
    pub fn insert_child_at(
        &mut self,
        parent: NodeId,
        index: usize,
        fields: ItemFields,
        body: ItemBody,
    ) -> Result<NodeId> {
        let parent_kind = self
            .kind(parent)
            .ok_or_else(|| Error::NotFound(parent.to_string()))?;
        let kind = body.kind();
        if !parent_kind.accepts_child(kind) {
            return Err(Error::InvalidChild {
                parent: parent_kind,
                child: kind,
            });
        }
        let id = self.alloc(fields, body);
        self.attach(parent, index, id);
        Ok(id)
    }

    /// Link an allocated node under `parent`. Kind rules are checked by callers.
    pub(crate) fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            let index = index.min(node.children.len());
            node.children.insert(index, child);
        }
    }

    /// Move the child at position `from` of `parent` to position `to`.
    ///
    /// A `None` parent addresses the roots. Out-of-range positions are ignored.
    pub fn move_child(&mut self, parent: Option<NodeId>, from: usize, to: usize) {
        let list = match parent {
            Some(parent) => match self.get_mut(parent) {
                Some(node) => &mut node.children,
                None => return,
            },
            None => &mut self.roots,
        };
        if from >= list.len() || to >= list.len() || from == to {
            return;
        }
        let child = list.remove(from);
        list.insert(to, child);
    }

    /// Remove a node and release its whole subtree.
    ///
    /// The node is unlinked from its parent (or the roots). Removing a handle
    /// that was already released is a no-op. Nodes whose `origin` pointed into
    /// the released subtree keep the dangling handle, which resolves to "no
    /// baseline" from then on.
    pub fn remove(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match node.parent {
            Some(parent) => {
                if let Some(parent) = self.nodes.get_mut(&parent) {
                    parent.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
        self.release_subtree(id);
    }

    fn release_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children {
                self.release_subtree(child);
            }
        }
    }

    /// Find the first item of the working set with the given item ID,
    /// depth-first, left to right.
    pub fn find_item(&self, item_id: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = self.get(id)?;
            if node.fields.id == item_id {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// First menu or action with the given item ID. Profile IDs are only
    /// unique among siblings and are skipped.
    pub fn find_container(&self, item_id: &str) -> Option<NodeId> {
        self.roots
            .iter()
            .flat_map(|r| self.walk(*r))
            .map(|(id, _)| id)
            .find(|id| {
                self.get(*id)
                    .is_some_and(|n| n.kind().is_container() && n.fields.id == item_id)
            })
    }

    /// Top-level item with the given item ID.
    pub fn find_root(&self, item_id: &str) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|r| self.get(*r).is_some_and(|n| n.fields.id == item_id))
    }

    /// Resolve a slash-separated path of item IDs, starting at the roots.
    ///
    /// A path without `/` falls back to [`ItemTree::find_item`], so unique
    /// IDs can be addressed directly.
    pub fn find_path(&self, path: &str) -> Option<NodeId> {
        let path = path.trim_matches('/');
        if !path.contains('/') {
            return self.find_item(path);
        }
        let mut level: &[NodeId] = &self.roots;
        let mut found = None;
        for segment in path.split('/') {
            let id = level
                .iter()
                .copied()
                .find(|c| self.get(*c).is_some_and(|n| n.fields.id == segment))?;
            level = self.children(id);
            found = Some(id);
        }
        found
    }

    /// Slash-separated path of item IDs from the top of the node's tree.
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        let node = self.get(id)?;
        let mut segments = vec![node.fields.id.clone()];
        for ancestor in self.ancestors(id) {
            if let Some(a) = self.get(ancestor) {
                segments.push(a.fields.id.clone());
            }
        }
        segments.reverse();
        Some(segments.join("/"))
    }

    /// Ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            result.push(parent);
            current = self.parent(parent);
        }
        result
    }

    /// All nodes of a subtree in pre-order, with their depth below `id`.
    pub fn walk(&self, id: NodeId) -> Vec<(NodeId, usize)> {
        let mut result = Vec::new();
        let mut stack = vec![(id, 0)];
        while let Some((current, depth)) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            result.push((current, depth));
            for child in node.children.iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        result
    }

    /// Materialize a document subtree under `parent`, or as a new root.
    pub fn insert_document(&mut self, parent: Option<NodeId>, doc: &ItemDocument) -> Result<NodeId> {
        let index = match parent {
            Some(p) => self.children(p).len(),
            None => self.roots.len(),
        };
        self.insert_document_at(parent, index, doc)
    }

    /// Materialize a document subtree at position `index` of `parent`'s
    /// children (or of the roots).
    pub fn insert_document_at(
        &mut self,
        parent: Option<NodeId>,
        index: usize,
        doc: &ItemDocument,
    ) -> Result<NodeId> {
        let (fields, body) = doc.to_parts();
        let id = match parent {
            Some(p) => self.insert_child_at(p, index, fields, body)?,
            None => self.insert_root_at(index, fields, body)?,
        };
        for child in &doc.children {
            if let Err(e) = self.insert_document(Some(id), child) {
                self.remove(id);
                return Err(e);
            }
        }
        Ok(id)
    }

    /// Serialize a subtree back into a document.
    pub fn to_document(&self, id: NodeId) -> Option<ItemDocument> {
        let node = self.get(id)?;
        let mut doc = ItemDocument::from_parts(node.fields.clone(), node.body.clone());
        doc.children = node
            .children
            .iter()
            .filter_map(|c| self.to_document(*c))
            .collect();
        Some(doc)
    }

    /// Documents for every root of the working set, in order.
    pub fn to_documents(&self) -> Vec<ItemDocument> {
        self.roots
            .iter()
            .filter_map(|r| self.to_document(*r))
            .collect()
    }

    /// Duplicate a whole subtree as a detached baseline and pair it with the
    /// original through `reset_origin`.
    ///
    /// Afterwards every node below `id` has its positional counterpart in the
    /// copy as origin. Returns the copy's root, or `None` if `id` is released.
    pub fn snapshot(&mut self, id: NodeId) -> Option<NodeId> {
        let copy = self.clone_subtree(id)?;
        reset_origin(self, id, copy);
        Some(copy)
    }

    /// Deep copy of a subtree as detached nodes, without origin wiring.
    pub fn clone_subtree(&mut self, id: NodeId) -> Option<NodeId> {
        let copy = duplicate(self, id)?;
        let children: Vec<NodeId> = self.children(id).to_vec();
        for child in children {
            if let Some(child_copy) = self.clone_subtree(child) {
                let index = self.children(copy).len();
                self.attach(copy, index, child_copy);
            }
        }
        Some(copy)
    }
}

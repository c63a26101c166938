//! Structural operations on the editor document tree.
//!
//! Nodes are addressed by paths: a sequence of child ids walked from the
//! root, where the empty path is the root itself. All operations here are
//! total over well-formed input; a path that does not resolve, or an anchor
//! of the wrong kind, leaves the tree untouched and reports `false`. The
//! reducer applies them unconditionally and never needs to pre-validate.

use std::collections::HashSet;

use quill_comm::editor::{EditorGroup, EditorNode, ScopeKind};
use quill_comm::ids::EditorId;

/// Where to splice a new node relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Immediately before the anchor among its siblings.
    Before,
    /// Immediately after the anchor among its siblings.
    After,
    /// Appended to the anchor group's children.
    Child,
}

/// A single-field edit of the node at a path.
///
/// Field updates are an explicit enum rather than a partial-record merge so
/// that the kind contract is checked statically: renames and scope toggles
/// apply to groups, code edits to cells, and a mismatch is a no-op.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorUpdate {
    Rename(String),
    SetCode(String),
    SetScope(ScopeKind),
}

/// Resolve a path to a node. The empty path resolves to `root`; a path that
/// descends into a cell does not resolve.
pub fn locate<'a>(root: &'a EditorNode, path: &[EditorId]) -> Option<&'a EditorNode> {
    let Some((head, rest)) = path.split_first() else {
        return Some(root);
    };
    match root {
        EditorNode::Group(group) => group
            .children
            .iter()
            .find(|child| child.id() == *head)
            .and_then(|child| locate(child, rest)),
        EditorNode::Cell(_) => None,
    }
}

fn locate_mut<'a>(root: &'a mut EditorNode, path: &[EditorId]) -> Option<&'a mut EditorNode> {
    let Some((head, rest)) = path.split_first() else {
        return Some(root);
    };
    match root {
        EditorNode::Group(group) => group
            .children
            .iter_mut()
            .find(|child| child.id() == *head)
            .and_then(|child| locate_mut(child, rest)),
        EditorNode::Cell(_) => None,
    }
}

/// Like `locate_mut`, but a path that runs deeper than a cell stops at the
/// cell instead of failing. Cells have no children, so a replacement aimed
/// below one lands on the cell itself.
fn locate_replace_slot<'a>(
    root: &'a mut EditorNode,
    path: &[EditorId],
) -> Option<&'a mut EditorNode> {
    if path.is_empty() || matches!(root, EditorNode::Cell(_)) {
        return Some(root);
    }
    let (head, rest) = path.split_first()?;
    match root {
        EditorNode::Group(group) => group
            .children
            .iter_mut()
            .find(|child| child.id() == *head)
            .and_then(|child| locate_replace_slot(child, rest)),
        EditorNode::Cell(_) => None,
    }
}

/// Replace the node at `path` with `new_node`. Returns `false` (tree
/// unchanged) if the path does not resolve.
pub fn replace(root: &mut EditorNode, path: &[EditorId], new_node: EditorNode) -> bool {
    match locate_replace_slot(root, path) {
        Some(slot) => {
            *slot = new_node;
            true
        }
        None => false,
    }
}

/// Splice `node` relative to the node at `anchor_path`.
///
/// For `Child` the anchor must be a group; the node is appended and the
/// anchor is added to `open_nodes` so a group expands when it gains its
/// first child. For `Before`/`After` the anchor must have a parent group.
pub fn insert(
    root: &mut EditorNode,
    anchor_path: &[EditorId],
    node: EditorNode,
    mode: InsertMode,
    open_nodes: &mut HashSet<EditorId>,
) -> bool {
    match mode {
        InsertMode::Child => {
            let Some(EditorNode::Group(group)) = locate_mut(root, anchor_path) else {
                return false;
            };
            group.children.push(node);
            open_nodes.insert(group.id);
            true
        }
        InsertMode::Before | InsertMode::After => {
            let Some((anchor_id, parent_path)) = anchor_path.split_last() else {
                // The root has no siblings.
                return false;
            };
            let Some(EditorNode::Group(parent)) = locate_mut(root, parent_path) else {
                return false;
            };
            let Some(index) = parent.children.iter().position(|c| c.id() == *anchor_id) else {
                return false;
            };
            let index = match mode {
                InsertMode::After => index + 1,
                _ => index,
            };
            parent.children.insert(index, node);
            true
        }
    }
}

/// Remove the node at `path` from its parent. The root cannot be removed.
pub fn remove(root: &mut EditorNode, path: &[EditorId]) -> bool {
    let Some((node_id, parent_path)) = path.split_last() else {
        return false;
    };
    let Some(EditorNode::Group(parent)) = locate_mut(root, parent_path) else {
        return false;
    };
    let Some(index) = parent.children.iter().position(|c| c.id() == *node_id) else {
        return false;
    };
    parent.children.remove(index);
    true
}

/// Apply a single-field update to the node at `path`.
pub fn update(root: &mut EditorNode, path: &[EditorId], update: EditorUpdate) -> bool {
    let Some(node) = locate_mut(root, path) else {
        return false;
    };
    match (node, update) {
        (EditorNode::Group(group), EditorUpdate::Rename(name)) => {
            group.name = name;
            true
        }
        (EditorNode::Group(group), EditorUpdate::SetScope(scope)) => {
            group.scope = scope;
            true
        }
        (EditorNode::Cell(cell), EditorUpdate::SetCode(code)) => {
            cell.code = code;
            true
        }
        _ => false,
    }
}

/// Flip a node's membership in the open-node set.
pub fn toggle_open(open_nodes: &mut HashSet<EditorId>, node_id: EditorId) {
    if !open_nodes.remove(&node_id) {
        open_nodes.insert(node_id);
    }
}

/// Build the minimal ancestor chain for executing the node at `path`.
///
/// Every ancestor group along the path is cloned with exactly one child
/// (the next step), and the target node is included in full. The chain
/// carries the enclosing groups' identity and scoping without dragging
/// unrelated siblings into the submission.
pub fn extract_subtree_for_run(root: &EditorNode, path: &[EditorId]) -> Option<EditorNode> {
    let Some((head, rest)) = path.split_first() else {
        return Some(root.clone());
    };
    let EditorNode::Group(group) = root else {
        return None;
    };
    let child = group.children.iter().find(|c| c.id() == *head)?;
    let pruned = extract_subtree_for_run(child, rest)?;
    Some(EditorNode::Group(EditorGroup {
        id: group.id,
        name: group.name.clone(),
        scope: group.scope,
        children: vec![pruned],
    }))
}

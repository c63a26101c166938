//! The editable code structure of a notebook.
//!
//! A notebook document is a strict tree of named groups and code cells.
//! Groups are namespaces: a group with `ScopeKind::Own` executes in a fresh
//! child scope, while `ScopeKind::Inherit` reuses the scope of its nearest
//! `Own` ancestor. The root of every notebook is a group with `Own` scope.
//!
//! These are wire types: the same shapes travel in `RunCode` submissions,
//! `SaveNotebook` payloads, and `NewNotebook` descriptors, and the saved form
//! of a notebook on disk is exactly its root node serialized.

use serde::{Deserialize, Serialize};

use crate::ids::EditorId;

/// Whether a group executes in its own fresh namespace or reuses the
/// namespace of its nearest `Own` ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    Own,
    Inherit,
}

/// A node of the editor document: either a named group or a code cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EditorNode {
    Group(EditorGroup),
    Cell(EditorCell),
}

/// A named namespace holding an ordered sequence of child nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorGroup {
    pub id: EditorId,
    pub name: String,
    pub children: Vec<EditorNode>,
    pub scope: ScopeKind,
}

/// A leaf unit of executable source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorCell {
    pub id: EditorId,
    pub code: String,
}

impl EditorNode {
    pub fn id(&self) -> EditorId {
        match self {
            EditorNode::Group(group) => group.id,
            EditorNode::Cell(cell) => cell.id,
        }
    }

    pub fn as_group(&self) -> Option<&EditorGroup> {
        match self {
            EditorNode::Group(group) => Some(group),
            EditorNode::Cell(_) => None,
        }
    }

    /// Collect the ids of every group in the subtree, in pre-order.
    ///
    /// A freshly opened notebook starts with all of its groups expanded, so
    /// this is what seeds the open-node set.
    pub fn collect_group_ids(&self, out: &mut Vec<EditorId>) {
        if let EditorNode::Group(group) = self {
            out.push(group.id);
            for child in &group.children {
                child.collect_group_ids(out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(code: &str) -> EditorNode {
        EditorNode::Cell(EditorCell {
            id: EditorId::fresh(),
            code: code.to_string(),
        })
    }

    #[test]
    fn test_editor_node_serializes_with_type_tag() {
        let node = EditorNode::Group(EditorGroup {
            id: EditorId::fresh(),
            name: "project".to_string(),
            children: vec![cell("1+1")],
            scope: ScopeKind::Own,
        });

        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["type"], "Group");
        assert_eq!(json["scope"], "Own");
        assert_eq!(json["children"][0]["type"], "Cell");
        assert_eq!(json["children"][0]["code"], "1+1");
    }

    #[test]
    fn test_editor_node_roundtrip() {
        let node = EditorNode::Group(EditorGroup {
            id: EditorId::fresh(),
            name: "outer".to_string(),
            scope: ScopeKind::Own,
            children: vec![
                cell("x = 1"),
                EditorNode::Group(EditorGroup {
                    id: EditorId::fresh(),
                    name: "inner".to_string(),
                    scope: ScopeKind::Inherit,
                    children: vec![cell("x + 1")],
                }),
            ],
        });

        let json = serde_json::to_string(&node).unwrap();
        let back: EditorNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_collect_group_ids_preorder() {
        let inner_id = EditorId::fresh();
        let root_id = EditorId::fresh();
        let node = EditorNode::Group(EditorGroup {
            id: root_id,
            name: "root".to_string(),
            scope: ScopeKind::Own,
            children: vec![
                cell(""),
                EditorNode::Group(EditorGroup {
                    id: inner_id,
                    name: "inner".to_string(),
                    scope: ScopeKind::Inherit,
                    children: vec![],
                }),
            ],
        });

        let mut ids = Vec::new();
        node.collect_group_ids(&mut ids);

        assert_eq!(ids, vec![root_id, inner_id]);
    }

    #[test]
    fn test_collect_group_ids_skips_cells() {
        let node = cell("print(1)");
        let mut ids = Vec::new();
        node.collect_group_ids(&mut ids);
        assert!(ids.is_empty());
    }
}

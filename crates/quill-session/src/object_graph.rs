//! Parsed object graphs for the workspace inspector.
//!
//! The kernel describes one variable as a flat dump of addressable objects:
//! a root id plus a list of nodes whose `children` slots reference other ids
//! in the same dump. Parsing builds the id-to-node map; traversal treats a
//! revisited id as a distinct position, not shared ownership. Graphs are
//! replaced wholesale by the diff engine, never mutated in place.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Deserialize;

/// Identifier of one object inside a single dump. Ids are only meaningful
/// within the graph that defines them.
pub type ObjectId = u64;

/// One addressable object of a dump.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectNode {
    pub id: ObjectId,
    pub repr: String,
    #[serde(default)]
    pub value_type: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    /// Named slots referencing other objects of the same graph.
    #[serde(default)]
    pub children: Option<Vec<(String, ObjectId)>>,
}

#[derive(Debug, Deserialize)]
struct ObjectDump {
    root: ObjectId,
    objects: Vec<ObjectNode>,
}

/// A navigable snapshot of one variable's structure.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectGraph {
    pub root: ObjectId,
    pub objects: HashMap<ObjectId, ObjectNode>,
}

impl ObjectGraph {
    /// Parse a serialized dump. Duplicate ids overwrite (last write wins);
    /// no further validation is performed here.
    pub fn parse(data: &str) -> Result<ObjectGraph, serde_json::Error> {
        let dump: ObjectDump = serde_json::from_str(data)?;
        let mut objects = HashMap::with_capacity(dump.objects.len());
        for object in dump.objects {
            objects.insert(object.id, object);
        }
        Ok(ObjectGraph {
            root: dump.root,
            objects,
        })
    }

    pub fn get(&self, id: ObjectId) -> Option<&ObjectNode> {
        self.objects.get(&id)
    }

    pub fn root_node(&self) -> Option<&ObjectNode> {
        self.objects.get(&self.root)
    }

    /// The `kind` of the root object, used for display ranking.
    pub fn root_kind(&self) -> Option<&str> {
        self.root_node().and_then(|node| node.kind.as_deref())
    }
}

/// Display rank of an object kind: modules first, then classes, then
/// callables, then everything else.
fn kind_rank(kind: Option<&str>) -> u8 {
    match kind {
        Some("module") => 0,
        Some("class") => 1,
        Some("callable") => 2,
        _ => 3,
    }
}

/// Ordering for sibling variables in the workspace: by kind rank, then by
/// byte-wise name comparison (shorter name first when one is a prefix of
/// the other). Locale collation is deliberately not used; the order must be
/// identical on every client.
pub fn compare_variables(a: &(String, ObjectGraph), b: &(String, ObjectGraph)) -> Ordering {
    kind_rank(a.1.root_kind())
        .cmp(&kind_rank(b.1.root_kind()))
        .then_with(|| a.0.as_bytes().cmp(b.0.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn graph_json(root: ObjectId, objects: &[(ObjectId, &str, Option<&str>)]) -> String {
        let objects: Vec<serde_json::Value> = objects
            .iter()
            .map(|(id, repr, kind)| match kind {
                Some(kind) => serde_json::json!({ "id": id, "repr": repr, "kind": kind }),
                None => serde_json::json!({ "id": id, "repr": repr }),
            })
            .collect();
        serde_json::json!({ "root": root, "objects": objects }).to_string()
    }

    #[test]
    fn test_parse_builds_id_map() {
        let data = r#"{
            "root": 0,
            "objects": [
                { "id": 0, "repr": "[1, 2]", "value_type": "list",
                  "children": [["0", 1], ["1", 2]] },
                { "id": 1, "repr": "1" },
                { "id": 2, "repr": "2" }
            ]
        }"#;

        let graph = ObjectGraph::parse(data).unwrap();

        assert_eq!(graph.root, 0);
        assert_eq!(graph.objects.len(), 3);
        let root = graph.root_node().unwrap();
        assert_eq!(root.repr, "[1, 2]");
        assert_eq!(root.value_type.as_deref(), Some("list"));
        assert_eq!(
            root.children.as_deref(),
            Some(&[("0".to_string(), 1), ("1".to_string(), 2)][..])
        );
    }

    #[test]
    fn test_parse_duplicate_ids_last_write_wins() {
        let data = r#"{
            "root": 1,
            "objects": [
                { "id": 1, "repr": "old" },
                { "id": 1, "repr": "new" }
            ]
        }"#;

        let graph = ObjectGraph::parse(data).unwrap();

        assert_eq!(graph.objects.len(), 1);
        assert_eq!(graph.root_node().unwrap().repr, "new");
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(ObjectGraph::parse("not json").is_err());
        assert!(ObjectGraph::parse(r#"{"objects": []}"#).is_err());
    }

    #[test]
    fn test_root_kind() {
        let graph = ObjectGraph::parse(&graph_json(5, &[(5, "<module os>", Some("module"))])).unwrap();
        assert_eq!(graph.root_kind(), Some("module"));

        let graph = ObjectGraph::parse(&graph_json(5, &[(5, "10", None)])).unwrap();
        assert_eq!(graph.root_kind(), None);
    }

    fn var(name: &str, kind: Option<&str>) -> (String, ObjectGraph) {
        let graph = ObjectGraph::parse(&graph_json(0, &[(0, "x", kind)])).unwrap();
        (name.to_string(), graph)
    }

    #[test]
    fn test_kind_rank_order() {
        let mut vars = vec![
            var("gamma", None),
            var("beta", Some("callable")),
            var("alpha", Some("module")),
        ];
        vars.sort_by(compare_variables);
        let names: Vec<_> = vars.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_name_tiebreak_is_bytewise_prefix_first() {
        let mut vars = vec![var("abc", None), var("ab", None), var("aB", None)];
        vars.sort_by(compare_variables);
        let names: Vec<_> = vars.iter().map(|(n, _)| n.as_str()).collect();
        // 'B' (0x42) < 'b' (0x62) byte-wise; "ab" sorts before its extension.
        assert_eq!(names, vec!["aB", "ab", "abc"]);
    }

    #[test]
    fn test_unknown_kind_ranks_last() {
        let mut vars = vec![var("a", Some("dataframe")), var("z", Some("class"))];
        vars.sort_by(compare_variables);
        let names: Vec<_> = vars.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["z", "a"]);
    }
}

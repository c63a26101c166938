//! The workspace variable tree and its incremental patch engine.
//!
//! A run's "globals" mirror the kernel's scope nesting: each scope owns
//! named variables (parsed object graphs) and child scopes. The server
//! avoids re-sending unchanged object graphs by patching: a `null` payload
//! means "same as last time, copy it over", and a name missing from the
//! patch means the variable is gone. The patch is a structural merge, not a
//! set union.

use log::warn;
use quill_comm::ids::ScopeId;
use quill_comm::messages::{GlobalsDump, GlobalsPatch};

use crate::object_graph::{compare_variables, ObjectGraph};

/// One kernel-side scope: named variables plus nested scopes, both kept in
/// display order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Globals {
    pub name: String,
    pub variables: Vec<(String, ObjectGraph)>,
    pub children: Vec<(ScopeId, Globals)>,
}

impl Globals {
    fn variable(&self, name: &str) -> Option<&ObjectGraph> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, graph)| graph)
    }

    fn child(&self, id: ScopeId) -> Option<&Globals> {
        self.children
            .iter()
            .find(|(child_id, _)| *child_id == id)
            .map(|(_, child)| child)
    }

    /// Assemble the next snapshot from a patch and the previous snapshot.
    ///
    /// An unchanged marker that references a variable or scope the previous
    /// snapshot does not have is a server-side defect; the entry is dropped
    /// with a warning rather than failing the session.
    pub fn apply_patch(patch: GlobalsPatch, previous: Option<&Globals>) -> Globals {
        let mut variables = Vec::with_capacity(patch.variables.len());
        for (name, payload) in patch.variables {
            match payload {
                Some(data) => match ObjectGraph::parse(&data) {
                    Ok(graph) => variables.push((name, graph)),
                    Err(err) => {
                        warn!("[workspace] Dropping variable '{}': unparsable object graph: {}", name, err);
                    }
                },
                None => match previous.and_then(|prev| prev.variable(&name)) {
                    Some(graph) => variables.push((name, graph.clone())),
                    None => {
                        warn!(
                            "[workspace] Unchanged marker for unknown variable '{}', dropping",
                            name
                        );
                    }
                },
            }
        }

        let children = patch
            .children
            .into_iter()
            .map(|(id, child_patch)| {
                let prev_child = previous.and_then(|prev| prev.child(id));
                (id, Globals::apply_patch(child_patch, prev_child))
            })
            .collect();

        let mut globals = Globals {
            name: patch.name,
            variables,
            children,
        };
        globals.sort();
        globals
    }

    /// Build a snapshot from a full dump (no markers).
    pub fn from_dump(dump: GlobalsDump) -> Globals {
        Globals::apply_patch(dump_to_patch(dump), None)
    }

    /// Sort variables by kind rank and name, child scopes by display name.
    fn sort(&mut self) {
        self.variables.sort_by(compare_variables);
        self.children
            .sort_by(|(_, a), (_, b)| a.name.cmp(&b.name));
    }
}

fn dump_to_patch(dump: GlobalsDump) -> GlobalsPatch {
    GlobalsPatch {
        name: dump.name,
        variables: dump
            .variables
            .into_iter()
            .map(|(name, data)| (name, Some(data)))
            .collect(),
        children: dump
            .children
            .into_iter()
            .map(|(id, child)| (id, dump_to_patch(child)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn graph_data(repr: &str) -> String {
        serde_json::json!({
            "root": 0,
            "objects": [{ "id": 0, "repr": repr }]
        })
        .to_string()
    }

    fn kinded_graph_data(repr: &str, kind: &str) -> String {
        serde_json::json!({
            "root": 0,
            "objects": [{ "id": 0, "repr": repr, "kind": kind }]
        })
        .to_string()
    }

    fn patch(
        name: &str,
        variables: &[(&str, Option<String>)],
        children: Vec<(ScopeId, GlobalsPatch)>,
    ) -> GlobalsPatch {
        GlobalsPatch {
            name: name.to_string(),
            variables: variables
                .iter()
                .map(|(n, v)| (n.to_string(), v.clone()))
                .collect(),
            children: children.into_iter().collect(),
        }
    }

    fn repr_of<'a>(globals: &'a Globals, name: &str) -> &'a str {
        &globals.variable(name).unwrap().root_node().unwrap().repr
    }

    #[test]
    fn test_apply_patch_parses_fresh_variables() {
        let globals = Globals::apply_patch(
            patch("project", &[("x", Some(graph_data("10")))], vec![]),
            None,
        );

        assert_eq!(globals.name, "project");
        assert_eq!(globals.variables.len(), 1);
        assert_eq!(repr_of(&globals, "x"), "10");
    }

    #[test]
    fn test_apply_patch_carries_over_unchanged() {
        let previous = Globals::apply_patch(
            patch(
                "project",
                &[("x", Some(graph_data("1"))), ("y", Some(graph_data("2")))],
                vec![],
            ),
            None,
        );

        let next = Globals::apply_patch(
            patch(
                "project",
                &[("x", None), ("y", Some(graph_data("3")))],
                vec![],
            ),
            Some(&previous),
        );

        assert_eq!(repr_of(&next, "x"), "1");
        assert_eq!(repr_of(&next, "y"), "3");
    }

    #[test]
    fn test_apply_patch_drops_omitted_variables() {
        let previous = Globals::apply_patch(
            patch(
                "project",
                &[("x", Some(graph_data("1"))), ("y", Some(graph_data("2")))],
                vec![],
            ),
            None,
        );

        let next = Globals::apply_patch(
            patch("project", &[("x", None)], vec![]),
            Some(&previous),
        );

        assert_eq!(next.variables.len(), 1);
        assert!(next.variable("y").is_none());
    }

    #[test]
    fn test_apply_patch_dangling_marker_does_not_panic() {
        let next = Globals::apply_patch(patch("project", &[("ghost", None)], vec![]), None);
        assert!(next.variables.is_empty());
    }

    #[test]
    fn test_apply_patch_unparsable_graph_is_dropped() {
        let next = Globals::apply_patch(
            patch("project", &[("bad", Some("not json".to_string()))], vec![]),
            None,
        );
        assert!(next.variables.is_empty());
    }

    #[test]
    fn test_apply_patch_recurses_into_child_scopes() {
        let scope_id = ScopeId::fresh();
        let previous = Globals::apply_patch(
            patch(
                "project",
                &[],
                vec![(
                    scope_id,
                    patch("helpers", &[("h", Some(graph_data("fn")))], vec![]),
                )],
            ),
            None,
        );

        let next = Globals::apply_patch(
            patch(
                "project",
                &[],
                vec![(scope_id, patch("helpers", &[("h", None)], vec![]))],
            ),
            Some(&previous),
        );

        let child = next.child(scope_id).unwrap();
        assert_eq!(child.name, "helpers");
        assert_eq!(repr_of(child, "h"), "fn");
    }

    #[test]
    fn test_apply_patch_new_scope_has_no_previous() {
        let scope_id = ScopeId::fresh();
        let previous = Globals::apply_patch(patch("project", &[], vec![]), None);

        let next = Globals::apply_patch(
            patch(
                "project",
                &[],
                vec![(
                    scope_id,
                    patch("fresh", &[("v", Some(graph_data("1")))], vec![]),
                )],
            ),
            Some(&previous),
        );

        assert_eq!(next.children.len(), 1);
        assert_eq!(next.child(scope_id).unwrap().name, "fresh");
    }

    #[test]
    fn test_variables_sorted_by_rank_then_name() {
        let globals = Globals::apply_patch(
            patch(
                "project",
                &[
                    ("gamma", Some(graph_data("1"))),
                    ("beta", Some(kinded_graph_data("f", "callable"))),
                    ("alpha", Some(kinded_graph_data("<module>", "module"))),
                ],
                vec![],
            ),
            None,
        );

        let names: Vec<_> = globals.variables.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_child_scopes_sorted_by_name() {
        let id_a = ScopeId::fresh();
        let id_b = ScopeId::fresh();
        let globals = Globals::apply_patch(
            patch(
                "project",
                &[],
                vec![
                    (id_a, patch("zeta", &[], vec![])),
                    (id_b, patch("alpha", &[], vec![])),
                ],
            ),
            None,
        );

        let names: Vec<_> = globals.children.iter().map(|(_, c)| c.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_from_dump() {
        let dump = GlobalsDump {
            name: "project".to_string(),
            variables: [("x".to_string(), graph_data("42"))].into_iter().collect(),
            children: HashMap::new(),
        };

        let globals = Globals::from_dump(dump);

        assert_eq!(globals.name, "project");
        assert_eq!(repr_of(&globals, "x"), "42");
    }
}

//! Node-graph dialect and its lowering to [`ActionSequence`].
//!
//! Authoring tools save sequences as a set of nodes and the connections
//! between their pins:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": "check", "action": "if", "params": { "condition": "f.hp <= 0" } },
//!     { "id": "die", "action": "state_transition", "params": { "to": "dead" } },
//!     { "id": "hurt", "action": "log", "params": { "message": "ouch" } }
//!   ],
//!   "connections": [
//!     { "from": "check", "from_pin": "true", "to": "die" },
//!     { "from": "check", "from_pin": "false", "to": "hurt" }
//!   ]
//! }
//! ```
//!
//! The entry point is the single node with no incoming connection. The pin
//! named [`PRIMARY_PIN`] is the sequential flow; every other pin is a branch.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::script::error::ScriptError;
use crate::script::sequence::{ActionSequence, ActionStep};
use crate::script::value::Value;

/// Name of the sequential output pin.
pub const PRIMARY_PIN: &str = "next";

fn default_pin() -> String {
    PRIMARY_PIN.to_string()
}

/// One action node as saved by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub action: String,
    #[serde(default)]
    pub params: FxHashMap<String, Value>,
    /// Editor-only layout data. Ignored at runtime.
    #[serde(default)]
    pub position: (f32, f32),
}

/// A wire from one node's output pin to another node's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConnection {
    pub from: String,
    #[serde(default = "default_pin")]
    pub from_pin: String,
    pub to: String,
}

/// A complete node graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SequenceGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub connections: Vec<GraphConnection>,
}

impl SequenceGraph {
    pub fn node(mut self, id: &str, action: &str) -> Self {
        self.nodes.push(GraphNode {
            id: id.to_string(),
            action: action.to_string(),
            params: FxHashMap::default(),
            position: (0.0, 0.0),
        });
        self
    }

    pub fn node_with(mut self, id: &str, action: &str, params: &[(&str, Value)]) -> Self {
        self.nodes.push(GraphNode {
            id: id.to_string(),
            action: action.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            position: (0.0, 0.0),
        });
        self
    }

    pub fn connect(mut self, from: &str, from_pin: &str, to: &str) -> Self {
        self.connections.push(GraphConnection {
            from: from.to_string(),
            from_pin: from_pin.to_string(),
            to: to.to_string(),
        });
        self
    }
}

/// Lower a node graph into a branching [`ActionSequence`].
///
/// Step indices follow node order in the graph. An empty graph lowers to an
/// empty sequence.
pub fn lower(graph: &SequenceGraph) -> Result<ActionSequence, ScriptError> {
    if graph.nodes.is_empty() {
        return Ok(ActionSequence {
            steps: Vec::new(),
            entry: None,
            branching: true,
        });
    }

    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    for (i, node) in graph.nodes.iter().enumerate() {
        if index.insert(node.id.as_str(), i).is_some() {
            return Err(ScriptError::DuplicateNode(node.id.clone()));
        }
    }

    let mut steps: Vec<ActionStep> = graph
        .nodes
        .iter()
        .map(|node| ActionStep {
            action: node.action.clone(),
            params: node.params.clone(),
            source: format!("node:{}", node.id),
            next: None,
            pins: FxHashMap::default(),
        })
        .collect();

    let mut has_incoming: FxHashSet<usize> = FxHashSet::default();
    for conn in &graph.connections {
        let from = *index
            .get(conn.from.as_str())
            .ok_or_else(|| ScriptError::UnknownNode(conn.from.clone()))?;
        let to = *index
            .get(conn.to.as_str())
            .ok_or_else(|| ScriptError::UnknownNode(conn.to.clone()))?;
        has_incoming.insert(to);

        let step = &mut steps[from];
        let duplicate = if conn.from_pin == PRIMARY_PIN {
            step.next.replace(to).is_some()
        } else {
            step.pins.insert(conn.from_pin.clone(), to).is_some()
        };
        if duplicate {
            return Err(ScriptError::DuplicatePin {
                node: conn.from.clone(),
                pin: conn.from_pin.clone(),
            });
        }
    }

    let entries: Vec<usize> = (0..steps.len())
        .filter(|i| !has_incoming.contains(i))
        .collect();
    match entries.len() {
        0 => Err(ScriptError::NoEntryNode),
        1 => Ok(ActionSequence {
            steps,
            entry: Some(entries[0]),
            branching: true,
        }),
        count => Err(ScriptError::AmbiguousEntry {
            count,
            ids: entries
                .iter()
                .map(|&i| graph.nodes[i].id.clone())
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_finds_entry_and_links() {
        let graph = SequenceGraph::default()
            .node("b", "log")
            .node("a", "if")
            .node("c", "log")
            .connect("a", "true", "b")
            .connect("a", "next", "c");
        let seq = lower(&graph).unwrap();
        assert!(seq.branching);
        assert_eq!(seq.entry, Some(1));
        assert_eq!(seq.steps[1].pins.get("true"), Some(&0));
        assert_eq!(seq.steps[1].next, Some(2));
        assert_eq!(seq.steps[0].source, "node:b");
    }

    #[test]
    fn test_lower_single_node() {
        let seq = lower(&SequenceGraph::default().node("only", "log")).unwrap();
        assert_eq!(seq.entry, Some(0));
        assert_eq!(seq.steps[0].next, None);
    }

    #[test]
    fn test_lower_ambiguous_entry() {
        let graph = SequenceGraph::default().node("a", "log").node("b", "log");
        assert!(matches!(
            lower(&graph),
            Err(ScriptError::AmbiguousEntry { count: 2, .. })
        ));
    }

    #[test]
    fn test_lower_cycle_without_entry() {
        let graph = SequenceGraph::default()
            .node("a", "log")
            .node("b", "log")
            .connect("a", "next", "b")
            .connect("b", "next", "a");
        assert_eq!(lower(&graph), Err(ScriptError::NoEntryNode));
    }

    #[test]
    fn test_lower_unknown_node() {
        let graph = SequenceGraph::default()
            .node("a", "log")
            .connect("a", "next", "ghost");
        assert_eq!(lower(&graph), Err(ScriptError::UnknownNode("ghost".into())));
    }

    #[test]
    fn test_lower_duplicate_pin() {
        let graph = SequenceGraph::default()
            .node("a", "if")
            .node("b", "log")
            .node("c", "log")
            .connect("a", "true", "b")
            .connect("a", "true", "c");
        assert!(matches!(
            lower(&graph),
            Err(ScriptError::DuplicatePin { .. })
        ));
    }

    #[test]
    fn test_deserialize_default_pin() {
        let json = r#"{
            "nodes": [
                { "id": "a", "action": "wait", "params": { "seconds": 1 } },
                { "id": "b", "action": "log", "position": [120.0, 40.0] }
            ],
            "connections": [ { "from": "a", "to": "b" } ]
        }"#;
        let graph: SequenceGraph = serde_json::from_str(json).unwrap();
        assert_eq!(graph.connections[0].from_pin, PRIMARY_PIN);
        assert_eq!(
            graph.nodes[0].params.get("seconds"),
            Some(&Value::Number(1.0))
        );
        let seq = lower(&graph).unwrap();
        assert_eq!(seq.steps[0].next, Some(1));
    }
}

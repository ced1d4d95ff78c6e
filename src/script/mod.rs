//! Authored behavior scripts.
//!
//! Both authoring dialects lower to the same representation so the
//! interpreter has exactly one execution path:
//!
//! - [`tags`] – flat `[name key=value]` text, always linear
//! - [`graph`] – editor node graphs, may branch on named pins
//! - [`sequence`] – the lowered [`ActionStep`]/[`ActionSequence`] form
//! - [`expr`] – single expressions used by `set_data`, `if` and guards
//! - [`value`] – the dynamic [`Value`] type

pub mod error;
pub mod expr;
pub mod graph;
pub mod sequence;
pub mod tags;
pub mod value;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use error::{ExprError, ScriptError};
pub use graph::SequenceGraph;
pub use sequence::{ActionSequence, ActionStep};
pub use value::Value;

/// A sequence as it appears in content files: either tag text or a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SequenceSource {
    Tags(String),
    Graph(SequenceGraph),
}

impl SequenceSource {
    /// Compile into a shareable sequence.
    pub fn compile(&self) -> Result<Arc<ActionSequence>, ScriptError> {
        let seq = match self {
            SequenceSource::Tags(text) => tags::compile(text)?,
            SequenceSource::Graph(graph) => graph::lower(graph)?,
        };
        Ok(Arc::new(seq))
    }
}

impl From<&str> for SequenceSource {
    fn from(text: &str) -> Self {
        SequenceSource::Tags(text.to_string())
    }
}

/// Compile flat tag text into a shareable sequence.
pub fn compile_tags(text: &str) -> Result<Arc<ActionSequence>, ScriptError> {
    Ok(Arc::new(tags::compile(text)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_deserializes_both_dialects() {
        let tags: SequenceSource = serde_json::from_str(r#""[log message=hi]""#).unwrap();
        assert!(matches!(tags, SequenceSource::Tags(_)));

        let graph: SequenceSource =
            serde_json::from_str(r#"{ "nodes": [ { "id": "a", "action": "log" } ] }"#).unwrap();
        assert!(matches!(graph, SequenceSource::Graph(_)));

        assert!(!tags.compile().unwrap().branching);
        assert!(graph.compile().unwrap().branching);
    }
}

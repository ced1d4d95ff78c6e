//! Lowered step representation shared by both authoring dialects.
//!
//! Flat tag text and node graphs both compile into an [`ActionSequence`]: a
//! list of [`ActionStep`]s with an entry index, a sequential `next` link per
//! step and, for graph sequences, named pin links. The interpreter only ever
//! walks this representation.

use rustc_hash::FxHashMap;

use crate::script::value::Value;

/// A single parameterized action invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionStep {
    /// Registered action name (e.g. `"set_data"`).
    pub action: String,
    /// Parameters as written by the author, before `&{...}` substitution.
    pub params: FxHashMap<String, Value>,
    /// The source fragment this step was compiled from, for diagnostics.
    pub source: String,
    /// Step to run after this one when no pin is taken.
    pub next: Option<usize>,
    /// Pin name -> step index. Always empty for flat sequences.
    pub pins: FxHashMap<String, usize>,
}

impl ActionStep {
    pub fn new(action: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: FxHashMap::default(),
            source: source.into(),
            next: None,
            pins: FxHashMap::default(),
        }
    }

    /// Builder: add a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// An ordered, possibly branching, list of steps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionSequence {
    pub steps: Vec<ActionStep>,
    /// Index of the first step, `None` for an empty sequence.
    pub entry: Option<usize>,
    /// True when the sequence came from a node graph and honours pins.
    pub branching: bool,
}

impl ActionSequence {
    /// Build a linear sequence where each step flows into the next.
    pub fn linear(steps: Vec<ActionStep>) -> Self {
        let mut steps = steps;
        let len = steps.len();
        for (i, step) in steps.iter_mut().enumerate() {
            step.next = if i + 1 < len { Some(i + 1) } else { None };
            step.pins.clear();
        }
        Self {
            entry: if len > 0 { Some(0) } else { None },
            steps,
            branching: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn step(&self, index: usize) -> Option<&ActionStep> {
        self.steps.get(index)
    }

    /// Action names in step order (not execution order for graphs).
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.action.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_links_steps_in_order() {
        let seq = ActionSequence::linear(vec![
            ActionStep::new("a", "[a]"),
            ActionStep::new("b", "[b]"),
            ActionStep::new("c", "[c]"),
        ]);
        assert_eq!(seq.entry, Some(0));
        assert_eq!(seq.steps[0].next, Some(1));
        assert_eq!(seq.steps[1].next, Some(2));
        assert_eq!(seq.steps[2].next, None);
        assert!(!seq.branching);
    }

    #[test]
    fn test_linear_empty() {
        let seq = ActionSequence::linear(Vec::new());
        assert!(seq.is_empty());
        assert_eq!(seq.entry, None);
    }

    #[test]
    fn test_with_param() {
        let step = ActionStep::new("wait", "[wait seconds=2]").with_param("seconds", 2.0);
        assert_eq!(step.params.get("seconds"), Some(&Value::Number(2.0)));
    }
}

//! Application flow controller.
//!
//! The flow is the application's top-level state machine (title, gameplay,
//! menu overlay, cutscene overlay). It has the same transition shape as an
//! entity [`StateMachine`](crate::components::statemachine::StateMachine),
//! but its transitions are selected by named events instead of direct
//! requests:
//!
//! ```json
//! {
//!   "initial": "title",
//!   "states": [
//!     { "name": "title",
//!       "on_enter": "[scene_activate scene=title]",
//!       "on_exit": "[scene_deactivate scene=title]",
//!       "transitions": [ { "event": "START_GAME", "target": "gameplay" } ] },
//!     { "name": "gameplay",
//!       "on_enter": "[scene_activate scene=level1]",
//!       "transitions": [ { "event": "PAUSE", "target": "menu" } ] },
//!     { "name": "menu",
//!       "on_enter": "[world_stop][show_overlay scene=menu wait=false]",
//!       "on_exit": "[close_overlay scene=menu][world_resume]",
//!       "transitions": [ { "event": "RESUME", "target": "@previous" } ] }
//!   ]
//! }
//! ```
//!
//! The reserved target [`PREVIOUS_STATE`] means "the state active
//! immediately before the current one".

use bevy_ecs::prelude::*;
use log::error;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

use crate::script::SequenceSource;
use crate::script::sequence::ActionSequence;

/// Transition target placeholder for the previous state.
pub const PREVIOUS_STATE: &str = "@previous";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowTransitionDef {
    pub event: String,
    #[serde(default)]
    pub target: Option<String>,
    /// Inline sequence run before the old state's onExit.
    #[serde(default)]
    pub action: Option<SequenceSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStateDef {
    pub name: String,
    #[serde(default)]
    pub on_enter: Option<SequenceSource>,
    #[serde(default)]
    pub on_exit: Option<SequenceSource>,
    #[serde(default)]
    pub transitions: Vec<FlowTransitionDef>,
}

/// Serialized flow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub initial: String,
    pub states: Vec<FlowStateDef>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    #[error("initial flow state '{0}' is not defined")]
    UnknownInitial(String),
    #[error("flow state '{0}' is defined twice")]
    DuplicateState(String),
    #[error("transition '{event}' in state '{state}' targets unknown state '{target}'")]
    UnknownTarget {
        state: String,
        event: String,
        target: String,
    },
}

#[derive(Debug, Clone)]
pub struct FlowTransition {
    pub event: String,
    pub target: Option<String>,
    pub action: Option<Arc<ActionSequence>>,
}

#[derive(Debug, Clone, Default)]
pub struct FlowState {
    pub name: String,
    pub on_enter: Option<Arc<ActionSequence>>,
    pub on_exit: Option<Arc<ActionSequence>>,
    pub transitions: Vec<FlowTransition>,
}

impl FlowState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn on_enter(mut self, seq: Arc<ActionSequence>) -> Self {
        self.on_enter = Some(seq);
        self
    }

    pub fn on_exit(mut self, seq: Arc<ActionSequence>) -> Self {
        self.on_exit = Some(seq);
        self
    }

    pub fn transition(mut self, event: &str, target: &str) -> Self {
        self.transitions.push(FlowTransition {
            event: event.to_string(),
            target: Some(target.to_string()),
            action: None,
        });
        self
    }

    pub fn transition_with_action(
        mut self,
        event: &str,
        target: Option<&str>,
        action: Arc<ActionSequence>,
    ) -> Self {
        self.transitions.push(FlowTransition {
            event: event.to_string(),
            target: target.map(str::to_string),
            action: Some(action),
        });
        self
    }

    pub fn find_transition(&self, event: &str) -> Option<&FlowTransition> {
        self.transitions.iter().find(|t| t.event == event)
    }
}

fn compile_or_log(owner: &str, source: Option<&SequenceSource>) -> Option<Arc<ActionSequence>> {
    match source?.compile() {
        Ok(seq) => Some(seq),
        Err(e) => {
            error!("flow {}: {}; sequence skipped", owner, e);
            None
        }
    }
}

/// The global flow controller.
#[derive(Resource, Debug, Clone)]
pub struct FlowController {
    states: FxHashMap<String, FlowState>,
    initial: String,
    current: Option<String>,
    previous: Option<String>,
    pub transitioning: bool,
    /// Source entity for the flow's own sequences, set by `start_flow`.
    pub root: Option<Entity>,
}

impl FlowController {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            states: FxHashMap::default(),
            initial: initial.into(),
            current: None,
            previous: None,
            transitioning: false,
            root: None,
        }
    }

    pub fn with_state(mut self, state: FlowState) -> Self {
        self.states.insert(state.name.clone(), state);
        self
    }

    /// Build from a definition, validating state names and compiling every
    /// sequence. Sequences that fail to compile are logged and left out.
    pub fn from_definition(def: &FlowDefinition) -> Result<Self, FlowError> {
        let mut controller = Self::new(def.initial.clone());
        for state_def in &def.states {
            if controller.states.contains_key(&state_def.name) {
                return Err(FlowError::DuplicateState(state_def.name.clone()));
            }
            let name = &state_def.name;
            let state = FlowState {
                name: name.clone(),
                on_enter: compile_or_log(&format!("{}.on_enter", name), state_def.on_enter.as_ref()),
                on_exit: compile_or_log(&format!("{}.on_exit", name), state_def.on_exit.as_ref()),
                transitions: state_def
                    .transitions
                    .iter()
                    .map(|t| FlowTransition {
                        event: t.event.clone(),
                        target: t.target.clone(),
                        action: compile_or_log(
                            &format!("{}[{}].action", name, t.event),
                            t.action.as_ref(),
                        ),
                    })
                    .collect(),
            };
            controller.states.insert(name.clone(), state);
        }

        if !controller.states.contains_key(&controller.initial) {
            return Err(FlowError::UnknownInitial(controller.initial.clone()));
        }
        for state in controller.states.values() {
            for t in &state.transitions {
                let Some(target) = &t.target else {
                    continue;
                };
                if target != PREVIOUS_STATE && !controller.states.contains_key(target) {
                    return Err(FlowError::UnknownTarget {
                        state: state.name.clone(),
                        event: t.event.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(controller)
    }

    pub fn initial(&self) -> &str {
        &self.initial
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    pub fn is_started(&self) -> bool {
        self.root.is_some()
    }

    pub fn state(&self, name: &str) -> Option<&FlowState> {
        self.states.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn current_state(&self) -> Option<&FlowState> {
        self.current.as_ref().and_then(|c| self.states.get(c))
    }

    /// Resolve a transition target, expanding [`PREVIOUS_STATE`].
    pub fn resolve_target(&self, target: &str) -> Option<String> {
        if target == PREVIOUS_STATE {
            self.previous.clone()
        } else {
            Some(target.to_string())
        }
    }

    pub fn commit(&mut self, to: &str) {
        debug_assert!(self.states.contains_key(to));
        self.previous = self.current.replace(to.to_string());
    }

    pub fn state_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.states.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}

/// Flow events waiting for the next flow pass, in arrival order.
#[derive(Resource, Debug, Clone, Default)]
pub struct FlowEventQueue {
    pending: VecDeque<String>,
}

impl FlowEventQueue {
    pub fn push(&mut self, name: impl Into<String>) {
        self.pending.push_back(name.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition() -> FlowDefinition {
        serde_json::from_str(
            r#"{
                "initial": "title",
                "states": [
                    { "name": "title",
                      "on_enter": "[log message=title]",
                      "transitions": [ { "event": "START_GAME", "target": "gameplay" } ] },
                    { "name": "gameplay",
                      "transitions": [
                          { "event": "PAUSE", "target": "menu" },
                          { "event": "SCORE", "action": "[set_data name=g.score value=1]" }
                      ] },
                    { "name": "menu",
                      "transitions": [ { "event": "RESUME", "target": "@previous" } ] }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_from_definition() {
        let flow = FlowController::from_definition(&definition()).unwrap();
        assert_eq!(flow.initial(), "title");
        assert_eq!(flow.state_names(), vec!["gameplay", "menu", "title"]);
        assert!(flow.state("title").unwrap().on_enter.is_some());
        let score = flow
            .state("gameplay")
            .unwrap()
            .find_transition("SCORE")
            .unwrap();
        assert!(score.target.is_none());
        assert!(score.action.is_some());
        assert!(!flow.is_started());
    }

    #[test]
    fn test_unknown_initial() {
        let mut def = definition();
        def.initial = "nowhere".into();
        assert_eq!(
            FlowController::from_definition(&def).unwrap_err(),
            FlowError::UnknownInitial("nowhere".into())
        );
    }

    #[test]
    fn test_unknown_target() {
        let mut def = definition();
        def.states[0].transitions[0].target = Some("credits".into());
        assert!(matches!(
            FlowController::from_definition(&def),
            Err(FlowError::UnknownTarget { .. })
        ));
    }

    #[test]
    fn test_bad_sequence_is_skipped() {
        let mut def = definition();
        def.states[0].on_enter = Some(SequenceSource::Tags("[unterminated".into()));
        let flow = FlowController::from_definition(&def).unwrap();
        assert!(flow.state("title").unwrap().on_enter.is_none());
    }

    #[test]
    fn test_previous_placeholder() {
        let mut flow = FlowController::from_definition(&definition()).unwrap();
        assert_eq!(flow.resolve_target(PREVIOUS_STATE), None);
        flow.commit("gameplay");
        flow.commit("menu");
        assert_eq!(flow.resolve_target(PREVIOUS_STATE).as_deref(), Some("gameplay"));
        assert_eq!(flow.resolve_target("title").as_deref(), Some("title"));
    }

    #[test]
    fn test_event_queue_fifo() {
        let mut queue = FlowEventQueue::default();
        queue.push("A");
        queue.push("B");
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().as_deref(), Some("A"));
        assert_eq!(queue.pop().as_deref(), Some("B"));
        assert!(queue.is_empty());
    }
}

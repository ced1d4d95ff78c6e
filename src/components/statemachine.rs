//! Per-entity state machine driven by action sequences.
//!
//! The [`StateMachine`] component holds named states, each with optional
//! `on_enter`, `on_update` and `on_exit` [`ActionSequence`]s. Unlike a plain
//! callback machine, every phase may take time: an `on_exit` that waits two
//! seconds delays the switch, and the machine refuses new transition requests
//! until the running one has finished.
//!
//! # Transition Flow
//!
//! 1. [`transition_to`](crate::systems::statemachine::transition_to) validates
//!    the request and sets `transitioning`
//! 2. `on_exit` of the current state runs to completion
//! 3. `current` is switched, a
//!    [`StateChanged`](crate::events::statechanged::StateChanged) event fires
//! 4. `on_enter` of the new state runs to completion
//! 5. `transitioning` is cleared
//!
//! While not transitioning,
//! [`state_machine_update`](crate::systems::statemachine::state_machine_update)
//! starts the current state's `on_update` once per tick without waiting for
//! the previous tick's run.

use bevy_ecs::prelude::Component;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

use crate::script::sequence::ActionSequence;

/// One named state.
#[derive(Clone, Debug, Default)]
pub struct StateDefinition {
    pub name: String,
    pub on_enter: Option<Arc<ActionSequence>>,
    pub on_update: Option<Arc<ActionSequence>>,
    pub on_exit: Option<Arc<ActionSequence>>,
}

impl StateDefinition {
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

    pub fn on_update(mut self, seq: Arc<ActionSequence>) -> Self {
        self.on_update = Some(seq);
        self
    }

    pub fn on_exit(mut self, seq: Arc<ActionSequence>) -> Self {
        self.on_exit = Some(seq);
        self
    }
}

/// Why a transition request was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionRejected {
    /// The requested state is already current.
    SameState,
    /// No state with that name exists.
    UnknownState,
    /// A transition is already running.
    Busy,
    /// The owner of the machine does not exist or has no machine.
    NoMachine,
    /// The current flow state has no transition for the event.
    Unhandled,
}

impl fmt::Display for TransitionRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransitionRejected::SameState => "already in that state",
            TransitionRejected::UnknownState => "unknown state",
            TransitionRejected::Busy => "transition already in progress",
            TransitionRejected::NoMachine => "no state machine",
            TransitionRejected::Unhandled => "no transition for event",
        })
    }
}

/// State machine component.
///
/// # Fields
///
/// - `states` – state name -> definition
/// - `current` – the active state; `None` until the initial transition ran
/// - `previous` – the state before the last transition
/// - `initial` – entered by [`init_state_machines`](crate::systems::statemachine::init_state_machines)
/// - `transitioning` – true while an exit/enter pair is running
/// - `time_in_state` – seconds (scene time) since `current` was set
#[derive(Component, Clone)]
pub struct StateMachine {
    pub states: FxHashMap<String, StateDefinition>,
    pub current: Option<String>,
    pub previous: Option<String>,
    pub initial: Option<String>,
    pub transitioning: bool,
    pub time_in_state: f32,
}

impl StateMachine {
    /// Create a machine that will enter `initial` on its first tick.
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            states: FxHashMap::default(),
            current: None,
            previous: None,
            initial: Some(initial.into()),
            transitioning: false,
            time_in_state: 0.0,
        }
    }

    /// Builder: add a state definition.
    pub fn with_state(mut self, def: StateDefinition) -> Self {
        self.states.insert(def.name.clone(), def);
        self
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn current_definition(&self) -> Option<&StateDefinition> {
        self.current.as_ref().and_then(|c| self.states.get(c))
    }

    /// Check a transition request without changing anything.
    pub fn check_transition(&self, to: &str) -> Result<(), TransitionRejected> {
        if self.transitioning {
            return Err(TransitionRejected::Busy);
        }
        if !self.states.contains_key(to) {
            return Err(TransitionRejected::UnknownState);
        }
        if self.current.as_deref() == Some(to) {
            return Err(TransitionRejected::SameState);
        }
        Ok(())
    }

    /// Switch `current` to `to`. Callers validate with [`check_transition`](Self::check_transition) first.
    pub fn commit(&mut self, to: &str) {
        debug_assert!(self.states.contains_key(to));
        self.previous = self.current.replace(to.to_string());
        self.time_in_state = 0.0;
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.states.keys().collect();
        names.sort();
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("previous", &self.previous)
            .field("initial", &self.initial)
            .field("transitioning", &self.transitioning)
            .field("time_in_state", &self.time_in_state)
            .field("states", &names)
            .finish()
    }
}

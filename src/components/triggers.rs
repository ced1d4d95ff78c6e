//! Trigger bindings: which sequence runs when something happens to an entity.
//!
//! The [`Triggers`] component lists [`TriggerBinding`]s. Each binding names
//! a [`TriggerKind`] from the fixed trigger vocabulary and the sequence to run
//! with the entity as source.
//!
//! - contact kinds require a `peer_group`: the binding only fires when the
//!   other participant belongs to that group, and that participant becomes
//!   the run's target
//! - `state-changed`, `direction-changed` and `behavior-changed` take an
//!   optional guard expression
//! - `click` and `ready` take neither
//!
//! Delivery happens in [`crate::systems::triggers`].

use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::script::expr::Expr;
use crate::script::sequence::ActionSequence;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerKind {
    Click,
    Ready,
    CollisionStart,
    OverlapStart,
    OverlapEnd,
    Stomp,
    Hit,
    Interact,
    StateChanged,
    DirectionChanged,
    BehaviorChanged,
}

impl TriggerKind {
    /// Physical-contact kinds, which require a peer-group filter.
    pub fn is_contact(&self) -> bool {
        matches!(
            self,
            TriggerKind::CollisionStart
                | TriggerKind::OverlapStart
                | TriggerKind::OverlapEnd
                | TriggerKind::Stomp
                | TriggerKind::Hit
                | TriggerKind::Interact
        )
    }

    /// Kinds that may carry a guard expression.
    pub fn accepts_guard(&self) -> bool {
        matches!(
            self,
            TriggerKind::StateChanged | TriggerKind::DirectionChanged | TriggerKind::BehaviorChanged
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Click => "click",
            TriggerKind::Ready => "ready",
            TriggerKind::CollisionStart => "collision-start",
            TriggerKind::OverlapStart => "overlap-start",
            TriggerKind::OverlapEnd => "overlap-end",
            TriggerKind::Stomp => "stomp",
            TriggerKind::Hit => "hit",
            TriggerKind::Interact => "interact",
            TriggerKind::StateChanged => "state-changed",
            TriggerKind::DirectionChanged => "direction-changed",
            TriggerKind::BehaviorChanged => "behavior-changed",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One trigger -> sequence binding.
#[derive(Clone, Debug)]
pub struct TriggerBinding {
    pub kind: TriggerKind,
    /// Required for contact kinds, ignored otherwise.
    pub peer_group: Option<String>,
    /// Optional for guarded kinds, ignored otherwise.
    pub guard: Option<Expr>,
    pub sequence: Arc<ActionSequence>,
}

impl TriggerBinding {
    pub fn new(kind: TriggerKind, sequence: Arc<ActionSequence>) -> Self {
        Self {
            kind,
            peer_group: None,
            guard: None,
            sequence,
        }
    }

    pub fn with_peer_group(mut self, group: impl Into<String>) -> Self {
        self.peer_group = Some(group.into());
        self
    }

    pub fn with_guard(mut self, guard: Expr) -> Self {
        self.guard = Some(guard);
        self
    }
}

#[derive(Component, Clone, Debug, Default)]
pub struct Triggers {
    pub bindings: Vec<TriggerBinding>,
    /// Set once the `ready` bindings have fired.
    pub ready_fired: bool,
}

impl Triggers {
    pub fn with(mut self, binding: TriggerBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn for_kind(&self, kind: TriggerKind) -> impl Iterator<Item = &TriggerBinding> {
        self.bindings.iter().filter(move |b| b.kind == kind)
    }
}

//! Trigger delivery events.
//!
//! Collaborators outside the ECS schedule (input, physics) report what
//! happened with these events instead of calling into the interpreter:
//!
//! - [`TriggerEvent`] – deliver one trigger kind to one entity
//! - [`ContactEvent`] – a contact between two entities, delivered to both

use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use rustc_hash::FxHashMap;

use crate::components::triggers::TriggerKind;
use crate::script::value::Value;
use crate::systems::triggers::{dispatch_trigger, report_contact};

#[derive(Event, Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    pub entity: Entity,
    pub kind: TriggerKind,
    /// The other participant; becomes the run's target.
    pub other: Option<Entity>,
    /// Values visible to the binding's guard expression.
    pub locals: FxHashMap<String, Value>,
}

impl TriggerEvent {
    pub fn new(entity: Entity, kind: TriggerKind) -> Self {
        Self {
            entity,
            kind,
            other: None,
            locals: FxHashMap::default(),
        }
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub kind: TriggerKind,
    pub a: Entity,
    pub b: Entity,
}

pub fn observe_trigger_event(trigger: On<TriggerEvent>, mut commands: Commands) {
    let delivery = trigger.event().clone();
    commands.queue(move |world: &mut World| {
        dispatch_trigger(world, &delivery);
    });
}

pub fn observe_contact_event(trigger: On<ContactEvent>, mut commands: Commands) {
    let ContactEvent { kind, a, b } = *trigger.event();
    commands.queue(move |world: &mut World| {
        report_contact(world, kind, a, b);
    });
}

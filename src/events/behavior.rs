//! Behavior arbitration broadcast.
//!
//! A behavior announces itself with `active: true` when it starts
//! steering and `active: false` when it lets go. Every behavior type listens
//! through its own [`arbitrate`](crate::systems::behavior::arbitrate)
//! observer; there is no central arbiter.

use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use rustc_hash::FxHashMap;

use crate::components::behavior::BehaviorId;
use crate::components::triggers::TriggerKind;
use crate::events::trigger::TriggerEvent;
use crate::script::value::Value;
use crate::systems::triggers::dispatch_trigger;

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BehaviorChanged {
    pub entity: Entity,
    pub source: BehaviorId,
    pub active: bool,
}

/// Run the entity's `behavior-changed` bindings (`behavior`, `active` locals).
pub fn observe_behavior_changed(trigger: On<BehaviorChanged>, mut commands: Commands) {
    let event = *trigger.event();
    let mut locals = FxHashMap::default();
    locals.insert("behavior".to_string(), Value::from(event.source.as_str()));
    locals.insert("active".to_string(), Value::Bool(event.active));
    let delivery = TriggerEvent {
        entity: event.entity,
        kind: TriggerKind::BehaviorChanged,
        other: None,
        locals,
    };
    commands.queue(move |world: &mut World| {
        dispatch_trigger(world, &delivery);
    });
}

//! Entity state machine change notification.
//!
//! Fired by the transition task right after an entity's current state is
//! committed, before the new state's onEnter runs. The observer here turns it
//! into `state-changed` trigger runs on the same entity.

use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use rustc_hash::FxHashMap;

use crate::components::triggers::TriggerKind;
use crate::events::trigger::TriggerEvent;
use crate::script::value::Value;
use crate::systems::triggers::dispatch_trigger;

#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct StateChanged {
    pub entity: Entity,
    pub previous: Option<String>,
    pub current: String,
}

impl StateChanged {
    /// Guard locals: `state` and `previous`.
    pub fn locals(&self) -> FxHashMap<String, Value> {
        let mut locals = FxHashMap::default();
        locals.insert("state".to_string(), Value::from(self.current.as_str()));
        locals.insert(
            "previous".to_string(),
            Value::from(self.previous.clone().unwrap_or_default()),
        );
        locals
    }
}

/// Run the entity's `state-changed` bindings.
pub fn observe_state_changed(trigger: On<StateChanged>, mut commands: Commands) {
    let event = trigger.event();
    let delivery = TriggerEvent {
        entity: event.entity,
        kind: TriggerKind::StateChanged,
        other: None,
        locals: event.locals(),
    };
    commands.queue(move |world: &mut World| {
        dispatch_trigger(world, &delivery);
    });
}

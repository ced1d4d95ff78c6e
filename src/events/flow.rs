//! Application flow events.
//!
//! Producers (input handlers, collaborators, sequences via the `flow_event`
//! action) never switch the top-level mode themselves. They emit a
//! [`FlowEvent`]; the name is queued on
//! [`FlowEventQueue`](crate::resources::flow::FlowEventQueue) and applied by
//! [`process_flow_events`](crate::systems::flow::process_flow_events) on the
//! next tick, once the controller is not mid-transition.

use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use log::debug;

use crate::resources::flow::FlowEventQueue;

/// A named flow event, e.g. `START_GAME`.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct FlowEvent {
    pub name: String,
}

impl FlowEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Fired when the flow controller commits a new state.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct FlowStateChanged {
    pub previous: Option<String>,
    pub current: String,
}

/// Queue the event for the next flow pass.
pub fn observe_flow_event(trigger: On<FlowEvent>, mut queue: ResMut<FlowEventQueue>) {
    let event = trigger.event();
    debug!("flow event '{}' queued", event.name);
    queue.push(event.name.clone());
}

//! Trigger dispatch.
//!
//! Turns delivered [`TriggerEvent`]s into sequence runs on the receiving
//! entity, filtered by peer group (contact kinds) and guard expression
//! (state/direction/behavior changes).

use bevy_ecs::prelude::*;
use log::{debug, warn};
use std::sync::Arc;

use crate::components::group::Group;
use crate::components::triggers::{TriggerKind, Triggers};
use crate::events::trigger::TriggerEvent;
use crate::resources::interpreter::context::lookup_variable;
use crate::resources::interpreter::run_sequence;
use crate::script::sequence::ActionSequence;

/// Run every binding of `event.kind` on `event.entity` that passes its
/// filters. Returns the number of runs started.
pub fn dispatch_trigger(world: &mut World, event: &TriggerEvent) -> usize {
    let Some(triggers) = world.get::<Triggers>(event.entity) else {
        return 0;
    };
    let other_group = event
        .other
        .and_then(|other| world.get::<Group>(other))
        .map(|g| g.name().to_string());

    let mut runs: Vec<Arc<ActionSequence>> = Vec::new();
    for binding in triggers.for_kind(event.kind) {
        if event.kind.is_contact() {
            match (&binding.peer_group, &other_group) {
                (Some(wanted), Some(actual)) if wanted == actual => {}
                _ => continue,
            }
        }
        if let Some(guard) = &binding.guard {
            let lookup = |path: &str| {
                event
                    .locals
                    .get(path)
                    .cloned()
                    .or_else(|| lookup_variable(world, event.entity, event.other, path))
            };
            match guard.eval(&lookup) {
                Ok(v) if v.is_truthy() => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!("{} guard on {:?} failed: {}", event.kind, event.entity, e);
                    continue;
                }
            }
        }
        runs.push(Arc::clone(&binding.sequence));
    }

    if !runs.is_empty() {
        debug!("{} on {:?}: {} run(s)", event.kind, event.entity, runs.len());
    }
    let count = runs.len();
    for seq in runs {
        run_sequence(world, event.entity, seq, event.other);
    }
    count
}

/// Deliver a contact of `kind` to both participants.
pub fn report_contact(world: &mut World, kind: TriggerKind, a: Entity, b: Entity) -> usize {
    let mut to_a = TriggerEvent::new(a, kind);
    to_a.other = Some(b);
    let mut to_b = TriggerEvent::new(b, kind);
    to_b.other = Some(a);
    dispatch_trigger(world, &to_a) + dispatch_trigger(world, &to_b)
}

/// Fire `ready` bindings once for entities that just got [`Triggers`].
pub fn fire_ready_triggers(world: &mut World) {
    let mut query = world.query::<(Entity, &mut Triggers)>();
    let mut fresh: Vec<Entity> = Vec::new();
    for (entity, mut triggers) in query.iter_mut(world) {
        if !triggers.ready_fired {
            triggers.ready_fired = true;
            fresh.push(entity);
        }
    }
    fresh.sort_by_key(|e| e.index_u32());
    for entity in fresh {
        dispatch_trigger(world, &TriggerEvent::new(entity, TriggerKind::Ready));
    }
}

//! Entity state machine systems.
//!
//! - [`transition_to`] – the only way to change an entity's state
//! - [`init_state_machines`] – enter the initial state of new machines
//! - [`state_machine_update`] – start onUpdate runs and track time in state

use bevy_ecs::prelude::*;
use log::{debug, warn};
use std::sync::Arc;

use crate::components::statemachine::{StateMachine, TransitionRejected};
use crate::resources::interpreter::{
    DiagnosticKind, Interpreter, StepDiagnostic, TransitionJob, TransitionOwner, TransitionStart,
    run_sequence, start_transition,
};
use crate::resources::worldtime::WorldTime;
use crate::script::sequence::ActionSequence;
use crate::systems::scene::time_scale_of;

/// Request a transition of `entity` to state `to`.
///
/// Ignored (with an `InvalidTransition` diagnostic) when the entity has no
/// machine, `to` is unknown or already current, or a transition is in
/// progress. Otherwise onExit of the old state runs and is awaited, the state
/// is committed, and onEnter runs and is awaited. The returned handle
/// completes when onEnter has finished.
pub fn transition_to(world: &mut World, entity: Entity, to: &str) -> TransitionStart {
    let check = match world.get::<StateMachine>(entity) {
        Some(sm) => sm.check_transition(to),
        None => Err(TransitionRejected::NoMachine),
    };
    if let Err(reason) = check {
        debug!("{:?}: transition to '{}' ignored: {}", entity, to, reason);
        if let Some(mut interp) = world.get_resource_mut::<Interpreter>() {
            interp.record(StepDiagnostic {
                task: None,
                step: None,
                fragment: format!("transition {:?} -> {}", entity, to),
                kind: DiagnosticKind::InvalidTransition(reason.to_string()),
            });
        }
        return TransitionStart::Ignored(reason);
    }

    let Some(mut sm) = world.get_mut::<StateMachine>(entity) else {
        return TransitionStart::Ignored(TransitionRejected::NoMachine);
    };
    sm.transitioning = true;
    let on_exit = sm.current_definition().and_then(|d| d.on_exit.clone());
    let on_enter = sm.states.get(to).and_then(|d| d.on_enter.clone());
    let job = TransitionJob::new(TransitionOwner::Entity(entity), entity, Some(to.to_string()))
        .with_exit(on_exit)
        .with_enter(on_enter);
    start_transition(world, job)
}

/// Enter the initial state of machines that have no current state yet.
///
/// onExit is naturally skipped since there is no state to leave. A machine
/// whose initial state is not defined is reported once and left idle.
pub fn init_state_machines(world: &mut World) {
    let mut query = world.query::<(Entity, &StateMachine)>();
    let pending: Vec<(Entity, String)> = query
        .iter(world)
        .filter(|(_, sm)| sm.current.is_none() && !sm.transitioning)
        .filter_map(|(entity, sm)| sm.initial.clone().map(|initial| (entity, initial)))
        .collect();

    for (entity, initial) in pending {
        let known = world
            .get::<StateMachine>(entity)
            .is_some_and(|sm| sm.contains(&initial));
        if !known {
            warn!("{:?}: initial state '{}' is not defined", entity, initial);
            if let Some(mut sm) = world.get_mut::<StateMachine>(entity) {
                sm.initial = None;
            }
            continue;
        }
        transition_to(world, entity, &initial);
    }
}

/// Advance time in state and start this tick's onUpdate runs.
///
/// A new onUpdate run starts every tick regardless of whether the previous
/// one finished, so runs of the same state may overlap. Machines that are
/// transitioning, or whose scene is stopped, get no onUpdate.
pub fn state_machine_update(world: &mut World) {
    let dt = world.get_resource::<WorldTime>().map_or(0.0, |t| t.delta);
    let mut query = world.query::<(Entity, &StateMachine)>();
    let machines: Vec<(Entity, Option<Arc<ActionSequence>>)> = query
        .iter(world)
        .filter(|(_, sm)| !sm.transitioning && sm.current.is_some())
        .map(|(entity, sm)| {
            (
                entity,
                sm.current_definition().and_then(|d| d.on_update.clone()),
            )
        })
        .collect();

    for (entity, on_update) in machines {
        let scale = time_scale_of(world, entity);
        if let Some(mut sm) = world.get_mut::<StateMachine>(entity) {
            sm.time_in_state += dt * scale;
        }
        if scale == 0.0 {
            continue;
        }
        if let Some(seq) = on_update {
            run_sequence(world, entity, seq, None);
        }
    }
}

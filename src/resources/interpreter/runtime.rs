//! Spawning, polling and the per-tick scheduler.

use bevy_ecs::prelude::*;
use log::{trace, warn};
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::resources::interpreter::execute::resume_cursor;
use crate::resources::interpreter::task::{
    Progress, RunHandle, SequenceCursor, TaskBody, TaskId,
};
use crate::resources::interpreter::transition::resume_job;
use crate::resources::interpreter::Interpreter;
use crate::resources::worldtime::WorldTime;
use crate::script::sequence::ActionSequence;
use crate::systems::scene::time_scale_of;

/// Upper bound on scheduler rounds within one [`advance_tasks`] pass.
const MAX_ROUNDS_PER_PASS: usize = 64;

/// Start running `sequence` on behalf of `source`.
///
/// The run starts immediately: steps that complete synchronously execute
/// before this returns, so a sequence without waits is already finished when
/// the handle comes back.
pub fn run_sequence(
    world: &mut World,
    source: Entity,
    sequence: Arc<ActionSequence>,
    target: Option<Entity>,
) -> RunHandle {
    let cursor = SequenceCursor::new(sequence, source, target);
    RunHandle {
        id: spawn_task(world, source, TaskBody::Sequence(cursor)),
    }
}

/// Insert a task owned by `owner` and poll it once.
pub fn spawn_task(world: &mut World, owner: Entity, body: TaskBody) -> TaskId {
    let id = world.get_resource_or_init::<Interpreter>().insert(owner, body);
    trace!("spawned {} for {:?}", id, owner);
    poll_task(world, id);
    id
}

/// Resume a task until it finishes or suspends.
pub(crate) fn poll_task(world: &mut World, id: TaskId) {
    let Some(mut body) = world.resource_mut::<Interpreter>().checkout(id) else {
        return;
    };
    let progress = match &mut body {
        TaskBody::Sequence(cursor) => resume_cursor(world, id, cursor),
        TaskBody::Transition(job) => resume_job(world, id, job),
    };
    let mut interp = world.resource_mut::<Interpreter>();
    match progress {
        Progress::Finished => interp.finish(id),
        Progress::Suspended(wait) => interp.checkin(id, body, wait),
    }
}

/// Scheduler pass, run once per tick as an exclusive system.
///
/// 1. Drops tasks whose owner entity no longer exists
/// 2. Applies completions sent through [`CompletionSender`](super::CompletionSender)
/// 3. Ticks `Seconds` waits by the owner's scene time scale
/// 4. Wakes `NextTick` waits
/// 5. Resumes ready tasks, in id order, until none is ready
pub fn advance_tasks(world: &mut World) {
    if !world.contains_resource::<Interpreter>() {
        return;
    }
    let dt = world.get_resource::<WorldTime>().map_or(0.0, |t| t.delta);

    let owners = world.resource::<Interpreter>().owners();
    let mut scales: FxHashMap<Entity, f32> = FxHashMap::default();
    let mut dead: Vec<Entity> = Vec::new();
    for (_, owner) in owners {
        if scales.contains_key(&owner) || dead.contains(&owner) {
            continue;
        }
        if world.get_entity(owner).is_err() {
            dead.push(owner);
        } else {
            scales.insert(owner, time_scale_of(world, owner));
        }
    }

    {
        let mut interp = world.resource_mut::<Interpreter>();
        for owner in dead {
            interp.abandon_owned_by(owner);
        }
        interp.drain_completions();
        interp.tick_timers(dt, |owner| scales.get(&owner).copied().unwrap_or(1.0));
        interp.wake_next_tick();
    }

    for round in 0.. {
        let ready = world.resource::<Interpreter>().ready_tasks();
        if ready.is_empty() {
            break;
        }
        if round == MAX_ROUNDS_PER_PASS {
            warn!(
                "{} task(s) still ready after {} rounds; deferring to next tick",
                ready.len(),
                MAX_ROUNDS_PER_PASS
            );
            break;
        }
        for id in ready {
            poll_task(world, id);
        }
    }
}

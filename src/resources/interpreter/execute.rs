//! Single-step execution.

use bevy_ecs::prelude::*;
use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use crate::resources::actionregistry::ActionRegistry;
use crate::resources::interpreter::context::{ActionContext, ActionOutcome, ActionParams, substitute};
use crate::resources::interpreter::target::{ResolvedTarget, resolve_target};
use crate::resources::interpreter::task::{Progress, SequenceCursor, TaskId, Wait};
use crate::resources::interpreter::{DiagnosticKind, Interpreter, StepDiagnostic};
use crate::script::graph::PRIMARY_PIN;
use crate::script::sequence::ActionStep;
use crate::script::value::Value;

/// Where the run goes after a step.
enum StepFlow {
    Goto(Option<usize>),
    Suspend(Wait, Option<usize>),
}

/// Run steps from the cursor until the run ends, suspends or exhausts the
/// per-resume step budget.
pub(crate) fn resume_cursor(
    world: &mut World,
    task: TaskId,
    cursor: &mut SequenceCursor,
) -> Progress {
    let budget = world
        .resource::<Interpreter>()
        .settings
        .max_steps_per_resume
        .max(1);
    let sequence = Arc::clone(&cursor.sequence);
    let mut executed = 0;

    while let Some(index) = cursor.pc {
        if world.get_entity(cursor.source).is_err() {
            debug!("{}: source {:?} is gone, ending run", task, cursor.source);
            return Progress::Finished;
        }
        if executed == budget {
            debug!("{}: step budget of {} reached, yielding", task, budget);
            return Progress::Suspended(Wait::NextTick);
        }
        executed += 1;

        let Some(step) = sequence.step(index) else {
            warn!("{}: step index {} out of range", task, index);
            return Progress::Finished;
        };
        match execute_step(world, task, cursor, index, step) {
            StepFlow::Goto(next) => cursor.pc = next,
            StepFlow::Suspend(wait, next) => {
                cursor.pc = next;
                return Progress::Suspended(wait);
            }
        }
    }
    Progress::Finished
}

fn execute_step(
    world: &mut World,
    task: TaskId,
    cursor: &SequenceCursor,
    index: usize,
    step: &ActionStep,
) -> StepFlow {
    let handler = world
        .get_resource::<ActionRegistry>()
        .and_then(|registry| registry.lookup(&step.action))
        .map(|def| def.handler);
    let Some(handler) = handler else {
        warn!("unknown action '{}' in {}", step.action, step.source);
        record(world, task, index, step, DiagnosticKind::UnknownAction);
        return StepFlow::Goto(step.next);
    };

    let (source, target) = (cursor.source, cursor.target);
    let mut values: FxHashMap<String, Value> = FxHashMap::default();
    let mut substituted = FxHashSet::default();
    for (k, v) in step.params.iter() {
        if matches!(v, Value::Text(text) if text.contains("&{")) {
            substituted.insert(k.clone());
        }
        values.insert(k.clone(), substitute(world, source, target, v));
    }
    let params = ActionParams::new(values).with_substituted(substituted);
    let resolved = match params.str("target") {
        Some(spec) => resolve_target(world, &spec, source, target),
        None => ResolvedTarget::single(source),
    };

    let mut ctx = ActionContext {
        world: &mut *world,
        task,
        source,
        target,
        resolved,
        sequence: Arc::clone(&cursor.sequence),
        step: index,
    };
    let result = handler(&mut ctx, &params);

    match result {
        Ok(ActionOutcome::Done) => StepFlow::Goto(step.next),
        Ok(ActionOutcome::Wait(wait)) => {
            if world.resource::<Interpreter>().is_satisfied(&wait) {
                StepFlow::Goto(step.next)
            } else {
                StepFlow::Suspend(wait, step.next)
            }
        }
        Ok(ActionOutcome::Pin(pin)) => follow_pin(world, task, cursor, index, step, pin),
        Err(err) => {
            let kind = if err.is_missing_collaborator() {
                DiagnosticKind::MissingCollaborator(err.to_string())
            } else {
                DiagnosticKind::HandlerFailure(err.to_string())
            };
            warn!("{} failed: {}", step.source, err);
            record(world, task, index, step, kind);
            StepFlow::Goto(step.next)
        }
    }
}

fn follow_pin(
    world: &mut World,
    task: TaskId,
    cursor: &SequenceCursor,
    index: usize,
    step: &ActionStep,
    pin: String,
) -> StepFlow {
    if !cursor.sequence.branching {
        debug!("pin '{}' discarded in flat sequence at {}", pin, step.source);
        return StepFlow::Goto(step.next);
    }
    if pin == PRIMARY_PIN {
        return StepFlow::Goto(step.next);
    }
    let declared = world
        .get_resource::<ActionRegistry>()
        .and_then(|registry| registry.lookup(&step.action))
        .is_some_and(|def| def.meta.declares_pin(&pin));
    if !declared {
        warn!("'{}' yielded undeclared pin '{}'", step.action, pin);
        record(world, task, index, step, DiagnosticKind::UndeclaredPin(pin));
        return StepFlow::Goto(step.next);
    }
    match step.pins.get(&pin) {
        Some(&to) => StepFlow::Goto(Some(to)),
        None => {
            debug!("pin '{}' of {} is not wired, run ends", pin, step.source);
            StepFlow::Goto(None)
        }
    }
}

fn record(world: &mut World, task: TaskId, index: usize, step: &ActionStep, kind: DiagnosticKind) {
    world.resource_mut::<Interpreter>().record(StepDiagnostic {
        task: Some(task),
        step: Some(index),
        fragment: step.source.clone(),
        kind,
    });
}

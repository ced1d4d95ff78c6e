//! State transitions as resumable tasks.
//!
//! Entity state machines and the flow controller share one transition shape,
//! run as a [`TransitionJob`] task:
//!
//! 1. optional inline action (flow transitions only)
//! 2. onExit of the old state, awaited
//! 3. commit: current/previous updated, change event fired
//! 4. onEnter of the new state, awaited
//! 5. the owner's `transitioning` flag is cleared
//!
//! The owner's `transitioning` flag is set by whoever starts the job and is
//! what makes transitions non-reentrant.

use bevy_ecs::prelude::*;
use log::{debug, info};
use std::sync::Arc;

use crate::components::statemachine::{StateMachine, TransitionRejected};
use crate::events::flow::FlowStateChanged;
use crate::events::statechanged::StateChanged;
use crate::resources::flow::FlowController;
use crate::resources::interpreter::runtime::{run_sequence, spawn_task};
use crate::resources::interpreter::task::{Progress, RunHandle, TaskBody, TaskId, Wait};
use crate::resources::interpreter::Interpreter;
use crate::script::sequence::ActionSequence;

/// Which machine a transition belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionOwner {
    Entity(Entity),
    Flow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Action,
    Exit,
    Enter,
    Finish,
}

#[derive(Clone, Debug)]
pub struct TransitionJob {
    pub owner: TransitionOwner,
    /// Entity the transition's sequences run on behalf of.
    pub source: Entity,
    pub to: Option<String>,
    pub action: Option<Arc<ActionSequence>>,
    pub on_exit: Option<Arc<ActionSequence>>,
    pub on_enter: Option<Arc<ActionSequence>>,
    stage: Stage,
}

impl TransitionJob {
    pub fn new(owner: TransitionOwner, source: Entity, to: Option<String>) -> Self {
        Self {
            owner,
            source,
            to,
            action: None,
            on_exit: None,
            on_enter: None,
            stage: Stage::Action,
        }
    }

    pub fn with_action(mut self, seq: Option<Arc<ActionSequence>>) -> Self {
        self.action = seq;
        self
    }

    pub fn with_exit(mut self, seq: Option<Arc<ActionSequence>>) -> Self {
        self.on_exit = seq;
        self
    }

    pub fn with_enter(mut self, seq: Option<Arc<ActionSequence>>) -> Self {
        self.on_enter = seq;
        self
    }
}

/// Outcome of a transition request.
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionStart {
    /// Rejected; nothing changed.
    Ignored(TransitionRejected),
    /// Ran to completion synchronously.
    Completed,
    /// Suspended in onExit or onEnter.
    Pending(RunHandle),
}

impl TransitionStart {
    pub fn is_ignored(&self) -> bool {
        matches!(self, TransitionStart::Ignored(_))
    }

    pub fn handle(&self) -> Option<RunHandle> {
        match self {
            TransitionStart::Pending(handle) => Some(*handle),
            _ => None,
        }
    }
}

/// Spawn the job as a task owned by its source and run it as far as it goes.
///
/// The caller must already have set the owner's `transitioning` flag.
pub fn start_transition(world: &mut World, job: TransitionJob) -> TransitionStart {
    let source = job.source;
    let id = spawn_task(world, source, TaskBody::Transition(job));
    if world.resource::<Interpreter>().is_running(id) {
        TransitionStart::Pending(RunHandle { id })
    } else {
        TransitionStart::Completed
    }
}

/// Run a stage sequence; returns the wait if it did not finish synchronously.
fn run_stage(world: &mut World, source: Entity, seq: Option<Arc<ActionSequence>>) -> Option<Wait> {
    let seq = seq?;
    let handle = run_sequence(world, source, seq, None);
    (!handle.is_finished(world)).then(|| handle.wait())
}

pub(crate) fn resume_job(world: &mut World, task: TaskId, job: &mut TransitionJob) -> Progress {
    loop {
        match job.stage {
            Stage::Action => {
                job.stage = if job.to.is_some() {
                    Stage::Exit
                } else {
                    Stage::Finish
                };
                if let Some(wait) = run_stage(world, job.source, job.action.clone()) {
                    return Progress::Suspended(wait);
                }
            }
            Stage::Exit => {
                job.stage = Stage::Enter;
                if let Some(wait) = run_stage(world, job.source, job.on_exit.clone()) {
                    return Progress::Suspended(wait);
                }
            }
            Stage::Enter => {
                job.stage = Stage::Finish;
                if !commit(world, job) {
                    debug!("{}: transition owner is gone", task);
                    return Progress::Finished;
                }
                if let Some(wait) = run_stage(world, job.source, job.on_enter.clone()) {
                    return Progress::Suspended(wait);
                }
            }
            Stage::Finish => {
                release(world, job.owner);
                return Progress::Finished;
            }
        }
    }
}

fn commit(world: &mut World, job: &TransitionJob) -> bool {
    let Some(to) = job.to.as_deref() else {
        return true;
    };
    match job.owner {
        TransitionOwner::Entity(entity) => {
            let Some(mut sm) = world.get_mut::<StateMachine>(entity) else {
                return false;
            };
            sm.commit(to);
            let previous = sm.previous.clone();
            debug!("{:?}: {:?} -> {}", entity, previous, to);
            world.trigger(StateChanged {
                entity,
                previous,
                current: to.to_string(),
            });
            true
        }
        TransitionOwner::Flow => {
            let Some(mut flow) = world.get_resource_mut::<FlowController>() else {
                return false;
            };
            flow.commit(to);
            let previous = flow.previous().map(str::to_string);
            info!("flow: {} -> {}", previous.as_deref().unwrap_or("<start>"), to);
            world.trigger(FlowStateChanged {
                previous,
                current: to.to_string(),
            });
            true
        }
    }
}

fn release(world: &mut World, owner: TransitionOwner) {
    match owner {
        TransitionOwner::Entity(entity) => {
            if let Some(mut sm) = world.get_mut::<StateMachine>(entity) {
                sm.transitioning = false;
            }
        }
        TransitionOwner::Flow => {
            if let Some(mut flow) = world.get_resource_mut::<FlowController>() {
                flow.transitioning = false;
            }
        }
    }
}

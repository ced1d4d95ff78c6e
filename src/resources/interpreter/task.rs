//! Task table entries and wait continuations.

use bevy_ecs::prelude::*;
use std::fmt;
use std::sync::Arc;

use crate::resources::interpreter::Interpreter;
use crate::resources::interpreter::transition::TransitionJob;
use crate::script::sequence::ActionSequence;

/// Identifier of a running task (a sequence run or a transition).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// What a suspended task is waiting for.
#[derive(Clone, Debug, PartialEq)]
pub enum Wait {
    /// Simulation seconds, scaled by the owner's scene time scale.
    Seconds(f32),
    /// An external completion delivered through [`Interpreter::notify`].
    Signal(String),
    /// Another task finishing.
    Task(TaskId),
    /// Resume on the next scheduler pass.
    NextTick,
}

/// Completion handle returned when a run is started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunHandle {
    pub id: TaskId,
}

impl RunHandle {
    /// True once the run has completed or was abandoned.
    pub fn is_finished(&self, world: &World) -> bool {
        world
            .get_resource::<Interpreter>()
            .is_none_or(|interp| !interp.is_running(self.id))
    }

    /// Wait continuation for this run.
    pub fn wait(&self) -> Wait {
        Wait::Task(self.id)
    }
}

/// Position of a sequence run.
#[derive(Clone, Debug)]
pub struct SequenceCursor {
    pub sequence: Arc<ActionSequence>,
    pub source: Entity,
    pub target: Option<Entity>,
    /// Next step to execute, `None` once the run is over.
    pub pc: Option<usize>,
}

impl SequenceCursor {
    pub fn new(sequence: Arc<ActionSequence>, source: Entity, target: Option<Entity>) -> Self {
        let pc = sequence.entry;
        Self {
            sequence,
            source,
            target,
            pc,
        }
    }
}

/// The resumable body of a task.
#[derive(Clone, Debug)]
pub enum TaskBody {
    Sequence(SequenceCursor),
    Transition(TransitionJob),
}

/// A task table entry.
///
/// `body` is `None` while the task is being polled: the body is checked out
/// so the handler can borrow the world mutably.
#[derive(Debug)]
pub(crate) struct TaskSlot {
    pub owner: Entity,
    pub wait: Option<Wait>,
    pub body: Option<TaskBody>,
}

/// Result of polling a task body.
#[derive(Debug, PartialEq)]
pub(crate) enum Progress {
    Finished,
    Suspended(Wait),
}

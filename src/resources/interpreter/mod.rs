//! Cooperative action interpreter.
//!
//! Every running sequence and every state transition is a *task* in the
//! [`Interpreter`] resource. A task runs synchronously until one of its steps
//! yields a [`Wait`]; it is then parked until the wait is satisfied and
//! resumed by [`advance_tasks`], which runs once per tick.
//!
//! # Submodules
//!
//! - [`task`] – task ids, waits and table entries
//! - [`runtime`] – spawning, polling and the per-tick scheduler
//! - [`execute`] – single-step execution and pin handling
//! - [`context`] – what handlers see: [`ActionContext`], [`ActionParams`]
//! - [`target`] – `target=` keyword resolution
//! - [`transition`] – state transitions as resumable jobs
//!
//! # Guarantees
//!
//! Steps of one run execute strictly in order and never interleave with
//! steps of the same run. Independent runs may interleave at wait points.
//! Failures are recorded as [`StepDiagnostic`]s and never abort the run.

pub mod context;
pub mod execute;
pub mod runtime;
pub mod target;
pub mod task;
pub mod transition;

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::debug;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::fmt;

pub use context::{ActionContext, ActionError, ActionOutcome, ActionParams};
pub use runtime::{advance_tasks, run_sequence, spawn_task};
pub use target::{ResolvedTarget, resolve_target};
pub use task::{RunHandle, TaskBody, TaskId, Wait};
pub use transition::{TransitionJob, TransitionOwner, TransitionStart, start_transition};

use task::TaskSlot;

pub const DEFAULT_MAX_STEPS_PER_RESUME: usize = 256;
pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 128;

/// Scheduler limits, usually taken from the engine config.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterpreterSettings {
    /// Steps a single resume may execute before yielding to the next tick.
    pub max_steps_per_resume: usize,
    /// Size of the diagnostics ring.
    pub diagnostics_capacity: usize,
}

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            max_steps_per_resume: DEFAULT_MAX_STEPS_PER_RESUME,
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
        }
    }
}

/// Kind of a contained step failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    UnknownAction,
    HandlerFailure(String),
    MissingCollaborator(String),
    InvalidTransition(String),
    UndeclaredPin(String),
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::UnknownAction => f.write_str("unknown action"),
            DiagnosticKind::HandlerFailure(msg) => write!(f, "handler failed: {}", msg),
            DiagnosticKind::MissingCollaborator(msg) => write!(f, "missing collaborator: {}", msg),
            DiagnosticKind::InvalidTransition(msg) => write!(f, "invalid transition: {}", msg),
            DiagnosticKind::UndeclaredPin(pin) => write!(f, "undeclared pin '{}'", pin),
        }
    }
}

/// A recorded failure with the fragment that caused it.
#[derive(Clone, Debug, PartialEq)]
pub struct StepDiagnostic {
    pub task: Option<TaskId>,
    pub step: Option<usize>,
    pub fragment: String,
    pub kind: DiagnosticKind,
}

/// Cloneable handle for delivering completions from other threads.
///
/// Names sent here are applied by [`advance_tasks`] at the start of the next
/// pass, exactly like [`Interpreter::notify`].
#[derive(Clone, Debug)]
pub struct CompletionSender {
    tx: Sender<String>,
}

impl CompletionSender {
    /// Returns false if the interpreter is gone.
    pub fn send(&self, name: impl Into<String>) -> bool {
        self.tx.send(name.into()).is_ok()
    }
}

/// Task table and scheduler state.
#[derive(Resource)]
pub struct Interpreter {
    tasks: FxHashMap<TaskId, TaskSlot>,
    next_id: u64,
    completion_tx: Sender<String>,
    completion_rx: Receiver<String>,
    diagnostics: VecDeque<StepDiagnostic>,
    pub settings: InterpreterSettings,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(InterpreterSettings::default())
    }
}

impl Interpreter {
    pub fn new(settings: InterpreterSettings) -> Self {
        let (completion_tx, completion_rx) = unbounded();
        Self {
            tasks: FxHashMap::default(),
            next_id: 1,
            completion_tx,
            completion_rx,
            diagnostics: VecDeque::with_capacity(settings.diagnostics_capacity),
            settings,
        }
    }

    pub(crate) fn insert(&mut self, owner: Entity, body: TaskBody) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.insert(
            id,
            TaskSlot {
                owner,
                wait: None,
                body: Some(body),
            },
        );
        id
    }

    /// Take a task's body out for polling.
    pub(crate) fn checkout(&mut self, id: TaskId) -> Option<TaskBody> {
        let slot = self.tasks.get_mut(&id)?;
        slot.wait = None;
        slot.body.take()
    }

    /// Put a suspended body back. Dropped if the task was abandoned meanwhile.
    pub(crate) fn checkin(&mut self, id: TaskId, body: TaskBody, wait: Wait) {
        if let Some(slot) = self.tasks.get_mut(&id) {
            slot.body = Some(body);
            slot.wait = Some(wait);
        } else {
            debug!("{} was abandoned while running", id);
        }
    }

    /// Remove a finished task and wake everything waiting on it.
    pub(crate) fn finish(&mut self, id: TaskId) {
        if self.tasks.remove(&id).is_some() {
            self.wake_waiters_of(id);
        }
    }

    fn wake_waiters_of(&mut self, id: TaskId) {
        for slot in self.tasks.values_mut() {
            if slot.wait == Some(Wait::Task(id)) {
                slot.wait = None;
            }
        }
    }

    pub fn is_running(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn owner_of(&self, id: TaskId) -> Option<Entity> {
        self.tasks.get(&id).map(|slot| slot.owner)
    }

    /// Current wait of a parked task.
    pub fn wait_of(&self, id: TaskId) -> Option<&Wait> {
        self.tasks.get(&id).and_then(|slot| slot.wait.as_ref())
    }

    /// Tasks owned by an entity, sorted by id.
    pub fn tasks_owned_by(&self, owner: Entity) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|(_, slot)| slot.owner == owner)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Deliver an external completion. Returns the number of tasks woken.
    pub fn notify(&mut self, name: &str) -> usize {
        let mut woken = 0;
        for slot in self.tasks.values_mut() {
            if matches!(&slot.wait, Some(Wait::Signal(s)) if s == name) {
                slot.wait = None;
                woken += 1;
            }
        }
        debug!("notify '{}' woke {} task(s)", name, woken);
        woken
    }

    pub fn completion_sender(&self) -> CompletionSender {
        CompletionSender {
            tx: self.completion_tx.clone(),
        }
    }

    pub(crate) fn drain_completions(&mut self) -> usize {
        let names: Vec<String> = self.completion_rx.try_iter().collect();
        names.iter().map(|name| self.notify(name)).sum()
    }

    /// Drop every task owned by `owner`, with its pending wait.
    ///
    /// Tasks waiting on a dropped task are woken so they do not hang.
    pub fn abandon_owned_by(&mut self, owner: Entity) -> usize {
        let dropped = self.tasks_owned_by(owner);
        for id in &dropped {
            self.tasks.remove(id);
        }
        for id in &dropped {
            self.wake_waiters_of(*id);
        }
        if !dropped.is_empty() {
            debug!("abandoned {} task(s) owned by {:?}", dropped.len(), owner);
        }
        dropped.len()
    }

    /// Advance `Seconds` waits; `scale_of` maps an owner to its time scale.
    pub(crate) fn tick_timers(&mut self, dt: f32, scale_of: impl Fn(Entity) -> f32) {
        for slot in self.tasks.values_mut() {
            if let Some(Wait::Seconds(remaining)) = slot.wait.as_mut() {
                *remaining -= dt * scale_of(slot.owner);
                if *remaining <= 0.0 {
                    slot.wait = None;
                }
            }
        }
    }

    /// Wake `NextTick` waits.
    pub(crate) fn wake_next_tick(&mut self) {
        for slot in self.tasks.values_mut() {
            if slot.wait == Some(Wait::NextTick) {
                slot.wait = None;
            }
        }
    }

    /// Parked tasks whose wait is satisfied, in id order.
    pub(crate) fn ready_tasks(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|(_, slot)| slot.wait.is_none() && slot.body.is_some())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Owners of all tasks, for the liveness sweep.
    pub(crate) fn owners(&self) -> Vec<(TaskId, Entity)> {
        self.tasks.iter().map(|(id, slot)| (*id, slot.owner)).collect()
    }

    /// True if the wait is already satisfied and the task may continue.
    pub(crate) fn is_satisfied(&self, wait: &Wait) -> bool {
        match wait {
            Wait::Seconds(s) => *s <= 0.0,
            Wait::Task(id) => !self.is_running(*id),
            Wait::Signal(_) | Wait::NextTick => false,
        }
    }

    pub fn record(&mut self, diagnostic: StepDiagnostic) {
        if self.settings.diagnostics_capacity == 0 {
            return;
        }
        while self.diagnostics.len() >= self.settings.diagnostics_capacity {
            self.diagnostics.pop_front();
        }
        self.diagnostics.push_back(diagnostic);
    }

    /// Recorded diagnostics, oldest first.
    pub fn diagnostics(&self) -> impl Iterator<Item = &StepDiagnostic> {
        self.diagnostics.iter()
    }

    pub fn clear_diagnostics(&mut self) {
        self.diagnostics.clear();
    }
}

//! Flow controller systems.
//!
//! The flow root is a persistent entity spawned by [`start_flow`]; every flow
//! onEnter/onExit and transition action runs on its behalf, so flow
//! sequences are never scaled or abandoned with a scene.

use bevy_ecs::prelude::*;
use log::{debug, info, warn};

use crate::components::group::EntityName;
use crate::components::persistent::Persistent;
use crate::components::statemachine::TransitionRejected;
use crate::resources::flow::{FlowController, FlowEventQueue};
use crate::resources::interpreter::{
    DiagnosticKind, Interpreter, StepDiagnostic, TransitionJob, TransitionOwner, TransitionStart,
    start_transition,
};

pub const FLOW_ROOT_NAME: &str = "flow";

/// Spawn the flow root and enter the initial state.
pub fn start_flow(world: &mut World) -> TransitionStart {
    let Some(flow) = world.get_resource::<FlowController>() else {
        warn!("start_flow: no FlowController");
        return TransitionStart::Ignored(TransitionRejected::NoMachine);
    };
    if flow.is_started() {
        return TransitionStart::Ignored(TransitionRejected::Busy);
    }
    let initial = flow.initial().to_string();
    let on_enter = flow.state(&initial).and_then(|s| s.on_enter.clone());

    let root = world
        .spawn((EntityName::new(FLOW_ROOT_NAME), Persistent))
        .id();
    {
        let mut flow = world.resource_mut::<FlowController>();
        flow.root = Some(root);
        flow.transitioning = true;
    }
    info!("flow starting in '{}'", initial);
    let job = TransitionJob::new(TransitionOwner::Flow, root, Some(initial)).with_enter(on_enter);
    start_transition(world, job)
}

fn reject(world: &mut World, event: &str, reason: TransitionRejected) -> TransitionStart {
    if let Some(mut interp) = world.get_resource_mut::<Interpreter>() {
        interp.record(StepDiagnostic {
            task: None,
            step: None,
            fragment: format!("flow event {}", event),
            kind: DiagnosticKind::InvalidTransition(reason.to_string()),
        });
    }
    TransitionStart::Ignored(reason)
}

/// Apply a flow event to the current state's transition table.
///
/// Unmatched events are logged and ignored. Events arriving while a flow
/// transition is running are rejected; use [`FlowEventQueue`] to have them
/// held until the controller is idle.
pub fn handle_flow_event(world: &mut World, event: &str) -> TransitionStart {
    let Some(flow) = world.get_resource::<FlowController>() else {
        return TransitionStart::Ignored(TransitionRejected::NoMachine);
    };
    let Some(root) = flow.root else {
        debug!("flow event '{}' before start, ignored", event);
        return TransitionStart::Ignored(TransitionRejected::NoMachine);
    };
    if flow.transitioning {
        debug!("flow event '{}' ignored: transition in progress", event);
        return reject(world, event, TransitionRejected::Busy);
    }
    let Some(state) = flow.current_state() else {
        return TransitionStart::Ignored(TransitionRejected::NoMachine);
    };
    let Some(transition) = state.find_transition(event) else {
        info!("flow event '{}' has no transition in '{}'", event, state.name);
        return TransitionStart::Ignored(TransitionRejected::Unhandled);
    };

    let action = transition.action.clone();
    let target = match transition.target.as_deref() {
        None => None,
        Some(raw) => match flow.resolve_target(raw) {
            Some(name) if flow.contains(&name) => Some(name),
            Some(name) => {
                warn!("flow event '{}': unknown target '{}'", event, name);
                return reject(world, event, TransitionRejected::UnknownState);
            }
            None => {
                info!("flow event '{}': no previous state to return to", event);
                return reject(world, event, TransitionRejected::UnknownState);
            }
        },
    };
    // Re-entering the current state only runs the transition's action.
    let target = target.filter(|name| flow.current() != Some(name.as_str()));
    if target.is_none() && action.is_none() {
        return reject(world, event, TransitionRejected::SameState);
    }

    let on_exit = target.as_ref().and_then(|_| state.on_exit.clone());
    let on_enter = target
        .as_deref()
        .and_then(|name| flow.state(name))
        .and_then(|s| s.on_enter.clone());
    let job = TransitionJob::new(TransitionOwner::Flow, root, target)
        .with_action(action)
        .with_exit(on_exit)
        .with_enter(on_enter);

    world.resource_mut::<FlowController>().transitioning = true;
    info!("flow event '{}' accepted", event);
    start_transition(world, job)
}

/// Apply queued flow events while the controller is idle.
///
/// Events stay queued while a transition is running and are applied, in
/// order, once it has finished.
pub fn process_flow_events(world: &mut World) {
    loop {
        let idle = world
            .get_resource::<FlowController>()
            .is_some_and(|flow| flow.is_started() && !flow.transitioning);
        if !idle {
            return;
        }
        let Some(event) = world
            .get_resource_mut::<FlowEventQueue>()
            .and_then(|mut queue| queue.pop())
        else {
            return;
        };
        handle_flow_event(world, &event);
    }
}

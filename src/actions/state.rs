//! State machine and flow actions.

use log::debug;

use crate::actions::add;
use crate::resources::actionregistry::{ActionMeta, ActionRegistryBuilder, ParamKind};
use crate::resources::flow::FlowEventQueue;
use crate::resources::interpreter::{
    ActionContext, ActionError, ActionOutcome, ActionParams, TransitionStart,
};
use crate::systems::statemachine::transition_to;

pub(crate) fn register(builder: &mut ActionRegistryBuilder) {
    add(
        builder,
        "state_transition",
        state_transition_action,
        ActionMeta::new("state", "Transition the target's state machine and wait for onEnter")
            .param("to", ParamKind::Text, "state to enter")
            .optional("target", ParamKind::Target, "entities to transition (default: self)"),
    );
    add(
        builder,
        "flow_event",
        flow_event_action,
        ActionMeta::new("flow", "Queue a flow event for the next flow pass")
            .param("name", ParamKind::Text, "event name"),
    );
}

/// Waits for the last transition that actually started. Rejected requests
/// (busy, unknown or same state) are recorded by `transition_to` and do not
/// fail the step.
fn state_transition_action(
    ctx: &mut ActionContext<'_>,
    params: &ActionParams,
) -> Result<ActionOutcome, ActionError> {
    let to = params.require_str("to")?;
    let mut pending = None;
    for entity in ctx.target_entities()? {
        match transition_to(ctx.world, entity, &to) {
            TransitionStart::Pending(handle) => pending = Some(handle),
            TransitionStart::Completed => {}
            TransitionStart::Ignored(reason) => {
                debug!("state_transition {:?} -> {}: {}", entity, to, reason);
            }
        }
    }
    Ok(match pending {
        Some(handle) => ActionOutcome::Wait(handle.wait()),
        None => ActionOutcome::Done,
    })
}

fn flow_event_action(
    ctx: &mut ActionContext<'_>,
    params: &ActionParams,
) -> Result<ActionOutcome, ActionError> {
    let name = params.require_str("name")?;
    ctx.world
        .get_resource_or_init::<FlowEventQueue>()
        .push(name.as_str());
    debug!("flow event '{}' queued", name);
    Ok(ActionOutcome::Done)
}

//! Requests to the presentation collaborator: text boxes and overlays.

use log::debug;

use crate::actions::add;
use crate::actions::scene::{require_flow_root, scenes_param};
use crate::resources::actionregistry::{ActionMeta, ActionRegistryBuilder, ParamKind};
use crate::resources::interpreter::{ActionContext, ActionError, ActionOutcome, ActionParams, Wait};
use crate::resources::presentation::{
    PresentationQueue, close_overlay, overlay_closed_signal, text_ack_signal,
};
use crate::systems::scene::activate_scene;

pub(crate) fn register(builder: &mut ActionRegistryBuilder) {
    add(
        builder,
        "show_text",
        show_text_action,
        ActionMeta::new("presentation", "Show a text box and wait until it is dismissed")
            .param("text", ParamKind::Text, "text to show")
            .optional("speaker", ParamKind::Text, "speaker name")
            .optional("wait", ParamKind::Boolean, "wait for dismissal (default true)"),
    );
    add(
        builder,
        "show_overlay",
        show_overlay_action,
        ActionMeta::new("presentation", "Activate an overlay scene and wait until it closes")
            .param("scene", ParamKind::Text, "overlay scene name")
            .optional("wait", ParamKind::Boolean, "wait for the overlay to close (default true)"),
    );
    add(
        builder,
        "close_overlay",
        close_overlay_action,
        ActionMeta::new("presentation", "Close an overlay scene")
            .optional("scene", ParamKind::Text, "overlay scene name")
            .optional("all", ParamKind::Boolean, "close every open overlay"),
    );
}

fn show_text_action(ctx: &mut ActionContext<'_>, params: &ActionParams) -> Result<ActionOutcome, ActionError> {
    let text = params.require_str("text")?;
    let speaker = params.str("speaker");
    let token = ctx
        .world
        .get_resource_or_init::<PresentationQueue>()
        .push_text(speaker, text);
    if params.bool("wait").unwrap_or(true) {
        Ok(ActionOutcome::Wait(Wait::Signal(text_ack_signal(token))))
    } else {
        Ok(ActionOutcome::Done)
    }
}

fn show_overlay_action(
    ctx: &mut ActionContext<'_>,
    params: &ActionParams,
) -> Result<ActionOutcome, ActionError> {
    require_flow_root(ctx, "show_overlay")?;
    let name = params.require_str("scene")?;
    for scene in scenes_param(ctx.world, params)? {
        activate_scene(ctx.world, scene);
    }
    ctx.world
        .get_resource_or_init::<PresentationQueue>()
        .push_overlay(name.as_str());
    if params.bool("wait").unwrap_or(true) {
        Ok(ActionOutcome::Wait(Wait::Signal(overlay_closed_signal(&name))))
    } else {
        Ok(ActionOutcome::Done)
    }
}

fn close_overlay_action(
    ctx: &mut ActionContext<'_>,
    params: &ActionParams,
) -> Result<ActionOutcome, ActionError> {
    require_flow_root(ctx, "close_overlay")?;
    let names: Vec<String> = if params.bool("all").unwrap_or(false) {
        ctx.world
            .get_resource::<PresentationQueue>()
            .map(|queue| queue.open_overlays().to_vec())
            .unwrap_or_default()
    } else {
        vec![params.require_str("scene")?]
    };
    for name in names {
        let woken = close_overlay(ctx.world, &name);
        debug!("overlay '{}' closed, {} run(s) woken", name, woken);
    }
    Ok(ActionOutcome::Done)
}

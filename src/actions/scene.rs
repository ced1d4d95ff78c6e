//! Scene and world clock actions.
//!
//! The flow controller owns scenes and the World Clock Gate: these actions run
//! only in sequences whose source is the flow root, and fail with
//! [`ActionError::FlowOnly`] anywhere else.

use bevy_ecs::prelude::*;

use crate::actions::add;
use crate::resources::actionregistry::{ActionMeta, ActionRegistryBuilder, ParamKind};
use crate::resources::clockgate::set_world_stopped;
use crate::resources::flow::FlowController;
use crate::resources::interpreter::{ActionContext, ActionError, ActionOutcome, ActionParams};
use crate::systems::scene::{
    activate_scene, deactivate_scene, find_scenes, set_scene_paused, unload_scene,
};

pub(crate) fn register(builder: &mut ActionRegistryBuilder) {
    let scene_meta = |description: &str| {
        ActionMeta::new("scene", description).param("scene", ParamKind::Text, "scene name or group")
    };
    add(builder, "scene_activate", scene_activate_action, scene_meta("Activate scenes"));
    add(builder, "scene_deactivate", scene_deactivate_action, scene_meta("Deactivate scenes"));
    add(builder, "scene_pause", scene_pause_action, scene_meta("Freeze a scene's time"));
    add(builder, "scene_resume", scene_resume_action, scene_meta("Unfreeze a scene's time"));
    add(
        builder,
        "scene_unload",
        scene_unload_action,
        scene_meta("Despawn scenes and their non-persistent members"),
    );
    add(
        builder,
        "world_stop",
        world_stop_action,
        ActionMeta::new("scene", "Stop the world clock for every active scene"),
    );
    add(
        builder,
        "world_resume",
        world_resume_action,
        ActionMeta::new("scene", "Restart the world clock"),
    );
}

/// Refuse `action` unless the run's source is the flow root.
pub(crate) fn require_flow_root(ctx: &ActionContext<'_>, action: &str) -> Result<(), ActionError> {
    let root = ctx
        .world
        .get_resource::<FlowController>()
        .and_then(|flow| flow.root);
    if root == Some(ctx.source) {
        Ok(())
    } else {
        Err(ActionError::FlowOnly(action.to_string()))
    }
}

/// Scenes matching the `scene` parameter, or `NotFound`.
pub(crate) fn scenes_param(world: &mut World, params: &ActionParams) -> Result<Vec<Entity>, ActionError> {
    let key = params.require_str("scene")?;
    let scenes = find_scenes(world, &key);
    if scenes.is_empty() {
        return Err(ActionError::NotFound(key));
    }
    Ok(scenes)
}

fn for_each_scene(
    ctx: &mut ActionContext<'_>,
    params: &ActionParams,
    action: &str,
    apply: impl Fn(&mut World, Entity),
) -> Result<ActionOutcome, ActionError> {
    require_flow_root(ctx, action)?;
    for scene in scenes_param(ctx.world, params)? {
        apply(ctx.world, scene);
    }
    Ok(ActionOutcome::Done)
}

fn scene_activate_action(
    ctx: &mut ActionContext<'_>,
    params: &ActionParams,
) -> Result<ActionOutcome, ActionError> {
    for_each_scene(ctx, params, "scene_activate", |world, scene| {
        activate_scene(world, scene);
    })
}

fn scene_deactivate_action(
    ctx: &mut ActionContext<'_>,
    params: &ActionParams,
) -> Result<ActionOutcome, ActionError> {
    for_each_scene(ctx, params, "scene_deactivate", |world, scene| {
        deactivate_scene(world, scene);
    })
}

fn scene_pause_action(
    ctx: &mut ActionContext<'_>,
    params: &ActionParams,
) -> Result<ActionOutcome, ActionError> {
    for_each_scene(ctx, params, "scene_pause", |world, scene| {
        set_scene_paused(world, scene, true);
    })
}

fn scene_resume_action(
    ctx: &mut ActionContext<'_>,
    params: &ActionParams,
) -> Result<ActionOutcome, ActionError> {
    for_each_scene(ctx, params, "scene_resume", |world, scene| {
        set_scene_paused(world, scene, false);
    })
}

fn scene_unload_action(
    ctx: &mut ActionContext<'_>,
    params: &ActionParams,
) -> Result<ActionOutcome, ActionError> {
    for_each_scene(ctx, params, "scene_unload", |world, scene| {
        unload_scene(world, scene);
    })
}

fn world_stop_action(ctx: &mut ActionContext<'_>, _params: &ActionParams) -> Result<ActionOutcome, ActionError> {
    require_flow_root(ctx, "world_stop")?;
    set_world_stopped(ctx.world, true);
    Ok(ActionOutcome::Done)
}

fn world_resume_action(
    ctx: &mut ActionContext<'_>,
    _params: &ActionParams,
) -> Result<ActionOutcome, ActionError> {
    require_flow_root(ctx, "world_resume")?;
    set_world_stopped(ctx.world, false);
    Ok(ActionOutcome::Done)
}

//! Entity actions: position, velocity and despawning.

use bevy_ecs::prelude::*;

use crate::actions::add;
use crate::components::mapposition::MapPosition;
use crate::components::rigidbody::RigidBody;
use crate::resources::actionregistry::{ActionMeta, ActionRegistryBuilder, ParamKind};
use crate::resources::interpreter::{
    ActionContext, ActionError, ActionOutcome, ActionParams, ResolvedTarget,
};
use crate::systems::scene::despawn_with_tasks;

pub(crate) fn register(builder: &mut ActionRegistryBuilder) {
    add(
        builder,
        "set_position",
        set_position_action,
        ActionMeta::new("entity", "Move entities to a point")
            .optional("x", ParamKind::Number, "x coordinate")
            .optional("y", ParamKind::Number, "y coordinate")
            .optional(
                "target",
                ParamKind::Target,
                "entities to move (default: self); a point moves self there",
            ),
    );
    add(
        builder,
        "set_velocity",
        set_velocity_action,
        ActionMeta::new("entity", "Set the velocity of rigid bodies")
            .optional("vx", ParamKind::Number, "x velocity (default 0)")
            .optional("vy", ParamKind::Number, "y velocity (default 0)")
            .optional("target", ParamKind::Target, "entities to change (default: self)"),
    );
    add(
        builder,
        "despawn",
        despawn_action,
        ActionMeta::new("entity", "Despawn entities and abandon their runs")
            .optional("target", ParamKind::Target, "entities to despawn (default: self)"),
    );
}

fn move_to(world: &mut World, entity: Entity, x: f32, y: f32) -> Result<(), ActionError> {
    let mut pos = world
        .get_mut::<MapPosition>(entity)
        .ok_or(ActionError::MissingComponent {
            component: "MapPosition",
            entity,
        })?;
    pos.x = x;
    pos.y = y;
    Ok(())
}

fn set_position_action(
    ctx: &mut ActionContext<'_>,
    params: &ActionParams,
) -> Result<ActionOutcome, ActionError> {
    if let ResolvedTarget::Point(x, y) = ctx.resolved {
        move_to(ctx.world, ctx.source, x, y)?;
        return Ok(ActionOutcome::Done);
    }
    let x = params.require_number("x")? as f32;
    let y = params.require_number("y")? as f32;
    for entity in ctx.target_entities()? {
        move_to(ctx.world, entity, x, y)?;
    }
    Ok(ActionOutcome::Done)
}

fn set_velocity_action(
    ctx: &mut ActionContext<'_>,
    params: &ActionParams,
) -> Result<ActionOutcome, ActionError> {
    let vx = params.number("vx")?.unwrap_or(0.0) as f32;
    let vy = params.number("vy")?.unwrap_or(0.0) as f32;
    for entity in ctx.target_entities()? {
        let mut body = ctx
            .world
            .get_mut::<RigidBody>(entity)
            .ok_or(ActionError::MissingComponent {
                component: "RigidBody",
                entity,
            })?;
        body.set_velocity(vx, vy);
    }
    Ok(ActionOutcome::Done)
}

/// Despawning the source ends the current run after this step.
fn despawn_action(ctx: &mut ActionContext<'_>, _params: &ActionParams) -> Result<ActionOutcome, ActionError> {
    for entity in ctx.target_entities()? {
        despawn_with_tasks(ctx.world, entity);
    }
    Ok(ActionOutcome::Done)
}

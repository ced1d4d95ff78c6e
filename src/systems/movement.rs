//! Velocity integration.
//!
//! Positions advance by `velocity * delta * scene time scale`, so a stopped
//! world or paused scene freezes its members in place. A change of dominant
//! heading updates [`Facing`] and delivers a `direction-changed` trigger.

use bevy_ecs::prelude::*;
use rustc_hash::FxHashMap;

use crate::components::facing::{Direction, Facing};
use crate::components::mapposition::MapPosition;
use crate::components::rigidbody::RigidBody;
use crate::components::scene::{Scene, SceneMember};
use crate::components::triggers::TriggerKind;
use crate::events::trigger::TriggerEvent;
use crate::resources::worldtime::WorldTime;
use crate::script::value::Value;
use crate::systems::scene::member_time_scale;

pub fn movement(
    mut commands: Commands,
    time: Res<WorldTime>,
    scenes: Query<&Scene>,
    mut bodies: Query<(
        Entity,
        &mut MapPosition,
        &RigidBody,
        Option<&SceneMember>,
        Option<&mut Facing>,
    )>,
) {
    for (entity, mut position, body, member, facing) in bodies.iter_mut() {
        if body.frozen {
            continue;
        }
        let scale = member_time_scale(&scenes, member);
        if scale == 0.0 {
            continue;
        }
        let step = time.delta * scale;
        position.x += body.vx * step;
        position.y += body.vy * step;

        let (Some(mut facing), Some(heading)) = (facing, Direction::from_velocity(body.vx, body.vy))
        else {
            continue;
        };
        if facing.0 == heading {
            continue;
        }
        let previous = facing.0;
        facing.0 = heading;

        let mut locals = FxHashMap::default();
        locals.insert("direction".to_string(), Value::from(heading.as_str()));
        locals.insert("previous".to_string(), Value::from(previous.as_str()));
        commands.trigger(TriggerEvent {
            entity,
            kind: TriggerKind::DirectionChanged,
            other: None,
            locals,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_scaled_by_scene() {
        let mut world = World::new();
        world.insert_resource(WorldTime::with_delta(1.0));
        let mut scene = Scene::new("level", "gameplay");
        scene.active = true;
        scene.time_scale = 0.5;
        let scene = world.spawn(scene).id();
        let member = world
            .spawn((MapPosition::new(0.0, 0.0), RigidBody::with_velocity(2.0, 0.0), SceneMember(scene)))
            .id();
        let loose = world
            .spawn((MapPosition::new(0.0, 0.0), RigidBody::with_velocity(0.0, 3.0)))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(movement);
        schedule.run(&mut world);

        assert_eq!(world.get::<MapPosition>(member).unwrap().x, 1.0);
        assert_eq!(world.get::<MapPosition>(loose).unwrap().y, 3.0);
    }

    #[test]
    fn test_facing_follows_velocity() {
        let mut world = World::new();
        world.insert_resource(WorldTime::with_delta(0.1));
        let e = world
            .spawn((
                MapPosition::default(),
                RigidBody::with_velocity(-1.0, 0.0),
                Facing::default(),
            ))
            .id();
        let mut schedule = Schedule::default();
        schedule.add_systems(movement);
        schedule.run(&mut world);
        assert_eq!(world.get::<Facing>(e).unwrap().0, Direction::Left);
    }
}

//! Autonomous behavior systems and the arbitration observer.
//!
//! Arbitration is decentralized: each behavior type registers its own
//! [`arbitrate`] observer on the shared [`BehaviorChanged`] broadcast.
//!
//! - `active: true` from another behavior suppresses this one; if it was
//!   steering it stops silently (no broadcast of its own)
//! - `active: false` from another behavior lifts the suppression
//! - a behavior never reacts to its own broadcasts
//!
//! The update systems are chained so a claim made by one is applied before
//! the next one runs. A suppressed sensing behavior (chase, return home)
//! still evaluates its condition and claims when it newly holds. There is
//! no tie-break rule for two behaviors claiming in the same tick; content
//! must not rely on which of them ends up steering.

use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use log::debug;
use std::f32::consts::TAU;

use crate::components::behavior::{AutonomousBehavior, Chase, Patrol, ReturnHome, Wander};
use crate::components::group::Group;
use crate::components::mapposition::MapPosition;
use crate::components::rigidbody::RigidBody;
use crate::components::scene::{Scene, SceneMember};
use crate::events::behavior::BehaviorChanged;
use crate::resources::interpreter::target::PLAYER_GROUP;
use crate::resources::worldtime::WorldTime;
use crate::systems::scene::member_time_scale;

/// Apply a peer's broadcast to behavior `B` on the same entity.
pub fn arbitrate<B: AutonomousBehavior>(trigger: On<BehaviorChanged>, mut behaviors: Query<&mut B>) {
    let event = trigger.event();
    if event.source == B::ID {
        return;
    }
    let Ok(mut behavior) = behaviors.get_mut(event.entity) else {
        return;
    };
    let gate = behavior.gate_mut();
    if event.active {
        if gate.active {
            debug!("{:?}: {} yields to {}", event.entity, B::ID, event.source);
            gate.active = false;
        }
        gate.suppressed = true;
    } else {
        gate.suppressed = false;
    }
}

/// Register the arbitration observer of every built-in behavior.
pub fn register_arbitration_observers(world: &mut World) {
    world.add_observer(arbitrate::<Chase>);
    world.add_observer(arbitrate::<Patrol>);
    world.add_observer(arbitrate::<Wander>);
    world.add_observer(arbitrate::<ReturnHome>);
}

/// Mark `B` active or inactive, broadcasting the change to its peers.
fn set_active<B: AutonomousBehavior>(
    commands: &mut Commands,
    entity: Entity,
    behavior: &mut B,
    active: bool,
) {
    let gate = behavior.gate_mut();
    if gate.active == active {
        return;
    }
    gate.active = active;
    commands.trigger(BehaviorChanged {
        entity,
        source: B::ID,
        active,
    });
}

/// Record the sensed condition of `B`. Returns false when `B` should stay
/// idle this tick: it is suppressed and the condition did not just start.
fn sense_or_yield<B: AutonomousBehavior>(entity: Entity, behavior: &mut B, condition: bool) -> bool {
    let gate = behavior.gate_mut();
    let rising = gate.sense(condition);
    if !gate.suppressed {
        return true;
    }
    if !rising {
        return false;
    }
    debug!("{:?}: {} takes over", entity, B::ID);
    gate.suppressed = false;
    true
}

fn steer(body: &mut RigidBody, from: &MapPosition, to: (f32, f32), speed: f32) {
    let (dx, dy) = from.direction_to(&MapPosition::new(to.0, to.1));
    body.set_velocity(dx * speed, dy * speed);
}

/// Chase the nearest player within sight; give up beyond `lose_radius`.
pub fn update_chase(
    mut commands: Commands,
    players: Query<(&Group, &MapPosition)>,
    mut chasers: Query<(Entity, &mut Chase, &MapPosition, &mut RigidBody)>,
) {
    for (entity, mut chase, pos, mut body) in chasers.iter_mut() {
        let radius = if chase.gate.active {
            chase.lose_radius
        } else {
            chase.sight_radius
        };
        let in_range = players
            .iter()
            .filter(|(group, _)| group.name() == PLAYER_GROUP)
            .map(|(_, p)| (pos.distance_to(p), (p.x, p.y)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .filter(|(dist, _)| *dist <= radius);

        if !sense_or_yield(entity, &mut *chase, in_range.is_some()) {
            continue;
        }
        match in_range {
            Some((_, at)) => {
                set_active(&mut commands, entity, &mut *chase, true);
                steer(&mut body, pos, at, chase.speed);
            }
            None => {
                if chase.gate.active {
                    body.stop();
                    set_active(&mut commands, entity, &mut *chase, false);
                }
            }
        }
    }
}

/// Walk back home once farther than the leash; release on arrival.
pub fn update_return_home(
    mut commands: Commands,
    mut walkers: Query<(Entity, &mut ReturnHome, &MapPosition, &mut RigidBody)>,
) {
    for (entity, mut home, pos, mut body) in walkers.iter_mut() {
        let target = MapPosition::new(home.home.0, home.home.1);
        let dist = pos.distance_to(&target);
        let strayed = dist > home.leash;
        if !sense_or_yield(entity, &mut *home, strayed) {
            continue;
        }
        if !home.gate.active && strayed {
            set_active(&mut commands, entity, &mut *home, true);
        }
        if home.gate.active {
            if dist <= home.arrive_radius {
                body.stop();
                set_active(&mut commands, entity, &mut *home, false);
            } else {
                steer(&mut body, pos, home.home, home.speed);
            }
        }
    }
}

/// Cycle through waypoints while not suppressed.
pub fn update_patrol(
    mut commands: Commands,
    mut walkers: Query<(Entity, &mut Patrol, &MapPosition, &mut RigidBody)>,
) {
    for (entity, mut patrol, pos, mut body) in walkers.iter_mut() {
        if !patrol.gate.is_enabled() {
            continue;
        }
        if patrol.waypoints.is_empty() {
            set_active(&mut commands, entity, &mut *patrol, false);
            continue;
        }
        let index = patrol.current % patrol.waypoints.len();
        let (wx, wy) = patrol.waypoints[index];
        if pos.distance_to(&MapPosition::new(wx, wy)) <= patrol.arrive_radius {
            patrol.current = (index + 1) % patrol.waypoints.len();
        }
        let next = patrol.waypoints[patrol.current];
        set_active(&mut commands, entity, &mut *patrol, true);
        steer(&mut body, pos, next, patrol.speed);
    }
}

/// Pick a random heading every `interval` seconds of scene time.
pub fn update_wander(
    mut commands: Commands,
    time: Res<WorldTime>,
    scenes: Query<&Scene>,
    mut walkers: Query<(Entity, &mut Wander, &mut RigidBody, Option<&SceneMember>)>,
) {
    for (entity, mut wander, mut body, member) in walkers.iter_mut() {
        if !wander.gate.is_enabled() {
            continue;
        }
        wander.remaining -= time.delta * member_time_scale(&scenes, member);
        if wander.remaining <= 0.0 || !wander.gate.active {
            let angle = fastrand::f32() * TAU;
            wander.heading = (angle.cos(), angle.sin());
            wander.remaining = wander.interval;
        }
        set_active(&mut commands, entity, &mut *wander, true);
        body.set_velocity(wander.heading.0 * wander.speed, wander.heading.1 * wander.speed);
    }
}

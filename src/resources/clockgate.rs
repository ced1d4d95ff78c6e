//! World Clock Gate.
//!
//! A single global "world stopped" flag. Changing it rewrites the time scale
//! of every active [`Scene`] in the same call, so no tick can observe a mix
//! of stopped and running scenes. Scenes activated later pick up the current
//! gate (see [`crate::systems::scene::activate_scene`]).

use bevy_ecs::prelude::*;
use log::info;

use crate::components::scene::Scene;

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldClockGate {
    pub stopped: bool,
}

impl WorldClockGate {
    /// Time scale an active scene should run at under this gate.
    pub fn time_scale(&self) -> f32 {
        if self.stopped { 0.0 } else { 1.0 }
    }
}

/// Set or clear the gate and push the matching time scale to every active
/// scene. Returns the number of scenes updated.
pub fn set_world_stopped(world: &mut World, stopped: bool) -> usize {
    let scale = {
        let mut gate = world.get_resource_or_init::<WorldClockGate>();
        gate.stopped = stopped;
        gate.time_scale()
    };
    let mut updated = 0;
    let mut scenes = world.query::<&mut Scene>();
    for mut scene in scenes.iter_mut(world) {
        if scene.active {
            scene.time_scale = scale;
            updated += 1;
        }
    }
    info!(
        "world clock {} ({} active scene(s) at scale {})",
        if stopped { "stopped" } else { "resumed" },
        updated,
        scale
    );
    updated
}

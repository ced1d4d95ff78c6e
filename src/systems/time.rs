//! Time update system.
//!
//! Updates the shared [`WorldTime`](crate::resources::worldtime::WorldTime)
//! resource once per tick. Per-scene scaling is applied by the consumers
//! (timer waits, movement), not here.
use bevy_ecs::prelude::*;

use crate::resources::worldtime::WorldTime;

/// Advance `WorldTime` by the unscaled tick delta `dt` (seconds).
pub fn update_world_time(world: &mut World, dt: f32) {
    let mut wt = world.get_resource_or_init::<WorldTime>();
    wt.elapsed += dt;
    wt.delta = dt;
    wt.frame_count += 1;
}

use bevy_ecs::prelude::Resource;

/// Unscaled wall-clock time of the update loop.
///
/// Per-scene scaling (pause, slow motion) is applied by readers through
/// [`time_scale_of`](crate::systems::scene::time_scale_of); this resource
/// itself always advances.
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct WorldTime {
    pub elapsed: f32,
    pub delta: f32,
    pub frame_count: u64,
}

impl WorldTime {
    pub fn with_delta(delta: f32) -> Self {
        Self {
            delta,
            ..Default::default()
        }
    }
}

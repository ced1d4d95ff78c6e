use bevy_ecs::prelude::Component;

/// World-space position of an entity.
#[derive(Component, Clone, Copy, Debug, PartialEq, Default)]
pub struct MapPosition {
    pub x: f32,
    pub y: f32,
}

impl MapPosition {
    pub fn new(x: f32, y: f32) -> Self {
        MapPosition { x, y }
    }

    pub fn distance_to(&self, other: &MapPosition) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Unit vector pointing at `other`, or zero when both coincide.
    pub fn direction_to(&self, other: &MapPosition) -> (f32, f32) {
        let d = self.distance_to(other);
        if d <= f32::EPSILON {
            (0.0, 0.0)
        } else {
            ((other.x - self.x) / d, (other.y - self.y) / d)
        }
    }
}

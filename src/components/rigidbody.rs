//! Kinematic body component.
//!
//! Physics simulation itself is an external collaborator; this crate only
//! needs a velocity that behaviors and actions can write and that the
//! [`movement`](crate::systems::movement::movement) system integrates using
//! the owning scene's time scale.
//!
//! The `frozen` flag disables integration, for entities whose position is
//! driven from elsewhere.

use bevy_ecs::prelude::Component;

/// Kinematic body storing a velocity in world units per second.
#[derive(Component, Clone, Debug, Default)]
pub struct RigidBody {
    pub vx: f32,
    pub vy: f32,
    /// When true, movement skips this entity.
    pub frozen: bool,
}

impl RigidBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_velocity(vx: f32, vy: f32) -> Self {
        Self {
            vx,
            vy,
            frozen: false,
        }
    }

    pub fn set_velocity(&mut self, vx: f32, vy: f32) {
        self.vx = vx;
        self.vy = vy;
    }

    pub fn stop(&mut self) {
        self.vx = 0.0;
        self.vy = 0.0;
    }

    pub fn speed_sq(&self) -> f32 {
        self.vx * self.vx + self.vy * self.vy
    }
}

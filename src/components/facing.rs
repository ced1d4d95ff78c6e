//! Dominant heading of a moving entity.
//!
//! Updated by the movement system from the entity's velocity. A change of
//! heading fires the `direction-changed` trigger.

use bevy_ecs::prelude::Component;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Dominant axis of a velocity. `None` when at rest.
    pub fn from_velocity(vx: f32, vy: f32) -> Option<Self> {
        if vx == 0.0 && vy == 0.0 {
            return None;
        }
        Some(if vx.abs() >= vy.abs() {
            if vx < 0.0 { Direction::Left } else { Direction::Right }
        } else if vy < 0.0 {
            Direction::Up
        } else {
            Direction::Down
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last known heading. Entities at rest keep their previous heading.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Facing(pub Direction);

impl Default for Facing {
    fn default() -> Self {
        Facing(Direction::Right)
    }
}

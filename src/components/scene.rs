//! Scene root and membership components.
//!
//! A scene is an entity carrying [`Scene`]: one independently clocked
//! simulation (the gameplay level, the pause menu overlay, a cutscene
//! overlay). Scenes sharing a `group` are switched on and off together by
//! flow actions. Entities join a scene through [`SceneMember`].
//!
//! `time_scale` is written by the
//! [`WorldClockGate`](crate::resources::clockgate::WorldClockGate) and by the
//! `scene_pause`/`scene_resume` actions, and read by movement and by timed
//! waits of sequences owned by member entities.

use bevy_ecs::prelude::{Component, Entity};

#[derive(Component, Clone, Debug, PartialEq)]
pub struct Scene {
    pub name: String,
    /// Top-level scene group (e.g. `"gameplay"`, `"menu"`).
    pub group: String,
    pub active: bool,
    pub time_scale: f32,
}

impl Scene {
    /// New inactive scene with a normal clock.
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            active: false,
            time_scale: 1.0,
        }
    }

    /// Effective scale: inactive scenes do not advance.
    pub fn effective_time_scale(&self) -> f32 {
        if self.active { self.time_scale } else { 0.0 }
    }
}

/// Links an entity to its scene root.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneMember(pub Entity);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_scene_is_inactive() {
        let scene = Scene::new("level1", "gameplay");
        assert!(!scene.active);
        assert_eq!(scene.time_scale, 1.0);
        assert_eq!(scene.effective_time_scale(), 0.0);
    }

    #[test]
    fn test_effective_scale_when_active() {
        let mut scene = Scene::new("level1", "gameplay");
        scene.active = true;
        scene.time_scale = 0.5;
        assert_eq!(scene.effective_time_scale(), 0.5);
    }
}

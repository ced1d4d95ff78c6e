//! Persistent entity marker component.
//!
//! Entities with the [`Persistent`] component are never despawned by
//! `scene_unload`, even if they carry a [`SceneMember`](super::scene::SceneMember)
//! link. The flow controller's root entity is persistent.

use bevy_ecs::prelude::Component;

/// Tag component for entities that outlive scene unloading.
#[derive(Component, Clone, Debug)]
pub struct Persistent;

//! Scene registry operations.
//!
//! Scenes are root entities carrying a [`Scene`] component; entities belong
//! to a scene through [`SceneMember`]. Activation, pausing and unloading are
//! only requested by flow onEnter/onExit sequences through the scene
//! actions, never by gameplay code.

use bevy_ecs::prelude::*;
use log::{debug, info};

use crate::components::persistent::Persistent;
use crate::components::scene::{Scene, SceneMember};
use crate::resources::clockgate::WorldClockGate;
use crate::resources::interpreter::Interpreter;

/// Simulation time scale for an entity.
///
/// Scenes use their own effective scale, members use their scene's, and
/// entities outside any scene always run at 1.
pub fn time_scale_of(world: &World, entity: Entity) -> f32 {
    if let Some(scene) = world.get::<Scene>(entity) {
        return scene.effective_time_scale();
    }
    match world.get::<SceneMember>(entity) {
        Some(member) => world
            .get::<Scene>(member.0)
            .map_or(1.0, Scene::effective_time_scale),
        None => 1.0,
    }
}

/// [`time_scale_of`] for systems that hold a scene query.
pub fn member_time_scale(scenes: &Query<&Scene>, member: Option<&SceneMember>) -> f32 {
    match member {
        Some(member) => scenes
            .get(member.0)
            .map_or(1.0, Scene::effective_time_scale),
        None => 1.0,
    }
}

/// Scene entities whose name or group equals `key`, ordered by entity index.
pub fn find_scenes(world: &mut World, key: &str) -> Vec<Entity> {
    let mut query = world.query::<(Entity, &Scene)>();
    let mut found: Vec<Entity> = query
        .iter(world)
        .filter(|(_, scene)| scene.name == key || scene.group == key)
        .map(|(entity, _)| entity)
        .collect();
    found.sort_by_key(|e| e.index_u32());
    found
}

/// Activate a scene, applying the current World Clock Gate.
pub fn activate_scene(world: &mut World, scene: Entity) -> bool {
    let scale = world
        .get_resource::<WorldClockGate>()
        .copied()
        .unwrap_or_default()
        .time_scale();
    let Some(mut s) = world.get_mut::<Scene>(scene) else {
        return false;
    };
    s.active = true;
    s.time_scale = scale;
    info!("scene '{}' activated (scale {})", s.name, scale);
    true
}

pub fn deactivate_scene(world: &mut World, scene: Entity) -> bool {
    let Some(mut s) = world.get_mut::<Scene>(scene) else {
        return false;
    };
    s.active = false;
    info!("scene '{}' deactivated", s.name);
    true
}

/// Pause (`true`) or resume one scene. Resuming honours the clock gate.
pub fn set_scene_paused(world: &mut World, scene: Entity, paused: bool) -> bool {
    let gate_scale = world
        .get_resource::<WorldClockGate>()
        .copied()
        .unwrap_or_default()
        .time_scale();
    let Some(mut s) = world.get_mut::<Scene>(scene) else {
        return false;
    };
    s.time_scale = if paused { 0.0 } else { gate_scale };
    debug!("scene '{}' time scale {}", s.name, s.time_scale);
    true
}

/// Despawn an entity after abandoning every task it owns.
pub fn despawn_with_tasks(world: &mut World, entity: Entity) -> bool {
    if let Some(mut interp) = world.get_resource_mut::<Interpreter>() {
        interp.abandon_owned_by(entity);
    }
    world.despawn(entity)
}

/// Despawn a scene and its members. [`Persistent`] members survive and are
/// detached from the scene. Returns the number of entities despawned.
pub fn unload_scene(world: &mut World, scene: Entity) -> usize {
    let mut query = world.query::<(Entity, &SceneMember, Has<Persistent>)>();
    let members: Vec<(Entity, bool)> = query
        .iter(world)
        .filter(|(_, member, _)| member.0 == scene)
        .map(|(entity, _, persistent)| (entity, persistent))
        .collect();

    let mut despawned = 0;
    for (entity, persistent) in members {
        if persistent {
            world.entity_mut(entity).remove::<SceneMember>();
        } else if despawn_with_tasks(world, entity) {
            despawned += 1;
        }
    }
    if despawn_with_tasks(world, scene) {
        despawned += 1;
    }
    info!("scene {:?} unloaded ({} entities)", scene, despawned);
    despawned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::clockgate::set_world_stopped;

    #[test]
    fn test_time_scale_of() {
        let mut world = World::new();
        let mut scene = Scene::new("level", "gameplay");
        scene.active = true;
        scene.time_scale = 0.5;
        let scene = world.spawn(scene).id();
        let member = world.spawn(SceneMember(scene)).id();
        let loose = world.spawn_empty().id();
        assert_eq!(time_scale_of(&world, member), 0.5);
        assert_eq!(time_scale_of(&world, scene), 0.5);
        assert_eq!(time_scale_of(&world, loose), 1.0);
    }

    #[test]
    fn test_activation_applies_gate() {
        let mut world = World::new();
        let scene = world.spawn(Scene::new("menu", "overlay")).id();
        set_world_stopped(&mut world, true);
        assert!(activate_scene(&mut world, scene));
        let s = world.get::<Scene>(scene).unwrap();
        assert!(s.active);
        assert_eq!(s.time_scale, 0.0);
    }

    #[test]
    fn test_find_by_name_or_group() {
        let mut world = World::new();
        let a = world.spawn(Scene::new("level1", "gameplay")).id();
        let b = world.spawn(Scene::new("hud", "gameplay")).id();
        world.spawn(Scene::new("title", "title"));
        assert_eq!(find_scenes(&mut world, "level1"), vec![a]);
        assert_eq!(find_scenes(&mut world, "gameplay"), vec![a, b]);
        assert!(find_scenes(&mut world, "credits").is_empty());
    }

    #[test]
    fn test_unload_keeps_persistent_members() {
        let mut world = World::new();
        world.init_resource::<Interpreter>();
        let scene = world.spawn(Scene::new("level1", "gameplay")).id();
        let enemy = world.spawn(SceneMember(scene)).id();
        let hero = world.spawn((SceneMember(scene), Persistent)).id();

        assert_eq!(unload_scene(&mut world, scene), 2);
        assert!(world.get_entity(enemy).is_err());
        assert!(world.get_entity(scene).is_err());
        assert!(world.get_entity(hero).is_ok());
        assert!(world.get::<SceneMember>(hero).is_none());
    }
}

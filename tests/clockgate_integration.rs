//! World Clock Gate integration tests.

use bevy_ecs::prelude::*;

use actionflow::components::mapposition::MapPosition;
use actionflow::components::rigidbody::RigidBody;
use actionflow::components::scene::{Scene, SceneMember};
use actionflow::components::signals::Signals;
use actionflow::game;
use actionflow::resources::actionregistry::ActionRegistryBuilder;
use actionflow::resources::clockgate::{WorldClockGate, set_world_stopped};
use actionflow::resources::engineconfig::EngineConfig;
use actionflow::resources::flow::FlowController;
use actionflow::resources::interpreter::{DiagnosticKind, Interpreter, run_sequence};
use actionflow::script::compile_tags;
use actionflow::systems::scene::{activate_scene, time_scale_of};

const DT: f32 = 0.1;

fn make_world() -> (World, Schedule) {
    let mut world = World::new();
    game::setup_world(
        &mut world,
        &EngineConfig::new(),
        ActionRegistryBuilder::with_builtin_actions().build(),
    );
    (world, game::build_update_schedule())
}

fn spawn_scene(world: &mut World, name: &str, active: bool) -> Entity {
    let mut scene = Scene::new(name, "gameplay");
    scene.active = active;
    world.spawn(scene).id()
}

/// Install a flow controller whose root runs the scene and clock actions.
fn flow_root(world: &mut World) -> Entity {
    let root = world.spawn_empty().id();
    let mut flow = FlowController::new("gameplay");
    flow.root = Some(root);
    world.insert_resource(flow);
    root
}

fn scale(world: &World, scene: Entity) -> f32 {
    world.get::<Scene>(scene).unwrap().time_scale
}

#[test]
fn stop_and_resume_cover_every_active_scene_at_once() {
    let (mut world, _) = make_world();
    let a = spawn_scene(&mut world, "a", true);
    let b = spawn_scene(&mut world, "b", true);
    let idle = spawn_scene(&mut world, "idle", false);

    assert_eq!(set_world_stopped(&mut world, true), 2);
    assert_eq!(scale(&world, a), 0.0);
    assert_eq!(scale(&world, b), 0.0);
    assert_eq!(scale(&world, idle), 1.0);

    assert_eq!(set_world_stopped(&mut world, false), 2);
    assert_eq!(scale(&world, a), 1.0);
    assert_eq!(scale(&world, b), 1.0);
}

#[test]
fn members_of_a_stopped_world_do_not_move_or_wait() {
    let (mut world, mut update) = make_world();
    let level = spawn_scene(&mut world, "level", true);
    let walker = world
        .spawn((
            MapPosition::new(0.0, 0.0),
            RigidBody::with_velocity(1.0, 0.0),
            Signals::default(),
            SceneMember(level),
        ))
        .id();
    let outsider = world.spawn(Signals::default()).id();
    let seq = compile_tags("[wait seconds=0.2][set_data name=f.done value=true]").unwrap();
    run_sequence(&mut world, walker, seq.clone(), None);
    run_sequence(&mut world, outsider, seq, None);

    set_world_stopped(&mut world, true);
    for _ in 0..5 {
        game::tick(&mut world, &mut update, DT);
    }
    assert_eq!(world.get::<MapPosition>(walker).unwrap().x, 0.0);
    assert!(!world.get::<Signals>(walker).unwrap().has_flag("done"));
    // Entities outside any scene keep running.
    assert!(world.get::<Signals>(outsider).unwrap().has_flag("done"));

    set_world_stopped(&mut world, false);
    for _ in 0..5 {
        game::tick(&mut world, &mut update, DT);
    }
    assert!(world.get::<MapPosition>(walker).unwrap().x > 0.0);
    assert!(world.get::<Signals>(walker).unwrap().has_flag("done"));
}

#[test]
fn scene_activated_while_stopped_starts_frozen() {
    let (mut world, _) = make_world();
    let overlay = spawn_scene(&mut world, "overlay", false);

    set_world_stopped(&mut world, true);
    assert!(activate_scene(&mut world, overlay));
    assert_eq!(scale(&world, overlay), 0.0);
    assert_eq!(time_scale_of(&world, overlay), 0.0);

    set_world_stopped(&mut world, false);
    assert_eq!(time_scale_of(&world, overlay), 1.0);
}

#[test]
fn world_stop_action_applies_before_the_next_step() {
    let (mut world, _) = make_world();
    let level = spawn_scene(&mut world, "level", true);
    let late = spawn_scene(&mut world, "late", false);
    let root = flow_root(&mut world);

    run_sequence(
        &mut world,
        root,
        compile_tags("[world_stop][scene_activate scene=late]").unwrap(),
        None,
    );
    assert!(world.resource::<WorldClockGate>().stopped);
    assert_eq!(scale(&world, level), 0.0);
    assert_eq!(scale(&world, late), 0.0);
}

#[test]
fn entity_sequences_cannot_stop_the_world() {
    let (mut world, _) = make_world();
    let level = spawn_scene(&mut world, "level", true);
    flow_root(&mut world);
    let guard = world.spawn(Signals::default()).id();

    run_sequence(
        &mut world,
        guard,
        compile_tags("[world_stop][scene_pause scene=level]").unwrap(),
        None,
    );
    assert!(!world.resource::<WorldClockGate>().stopped);
    assert_eq!(scale(&world, level), 1.0);
    assert_eq!(
        world
            .resource::<Interpreter>()
            .diagnostics()
            .filter(|d| matches!(d.kind, DiagnosticKind::HandlerFailure(_)))
            .count(),
        2
    );
}

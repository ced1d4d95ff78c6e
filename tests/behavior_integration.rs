//! Behavior arbitration integration tests.

use bevy_ecs::prelude::*;

use actionflow::components::behavior::{BehaviorId, Chase, Patrol, ReturnHome, Wander};
use actionflow::components::group::Group;
use actionflow::components::mapposition::MapPosition;
use actionflow::components::rigidbody::RigidBody;
use actionflow::components::signals::Signals;
use actionflow::components::triggers::{TriggerBinding, TriggerKind, Triggers};
use actionflow::events::behavior::BehaviorChanged;
use actionflow::game;
use actionflow::resources::actionregistry::ActionRegistryBuilder;
use actionflow::resources::engineconfig::EngineConfig;
use actionflow::script::{compile_tags, expr};

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

#[test]
fn claim_suppresses_peers_but_not_the_sender() {
    let (mut world, _) = make_world();
    let e = world
        .spawn((
            Chase::new(5.0, 1.0),
            Patrol::new(vec![(0.0, 0.0)], 1.0),
            Wander::new(1.0, 2.0),
        ))
        .id();
    world.get_mut::<Patrol>(e).unwrap().gate.active = true;

    world.trigger(BehaviorChanged {
        entity: e,
        source: BehaviorId::Chase,
        active: true,
    });

    assert!(!world.get::<Chase>(e).unwrap().gate.suppressed);
    let patrol = world.get::<Patrol>(e).unwrap();
    assert!(patrol.gate.suppressed);
    assert!(!patrol.gate.active);
    assert!(world.get::<Wander>(e).unwrap().gate.suppressed);

    world.trigger(BehaviorChanged {
        entity: e,
        source: BehaviorId::Chase,
        active: false,
    });
    assert!(!world.get::<Patrol>(e).unwrap().gate.suppressed);
    assert!(!world.get::<Wander>(e).unwrap().gate.suppressed);
}

#[test]
fn release_does_not_lift_the_senders_own_suppression() {
    let (mut world, _) = make_world();
    let e = world
        .spawn((
            Chase::new(5.0, 1.0),
            ReturnHome::new((0.0, 0.0), 10.0, 1.0),
            Patrol::new(vec![(0.0, 0.0)], 1.0),
        ))
        .id();

    world.trigger(BehaviorChanged {
        entity: e,
        source: BehaviorId::ReturnHome,
        active: true,
    });
    assert!(world.get::<Chase>(e).unwrap().gate.suppressed);

    world.trigger(BehaviorChanged {
        entity: e,
        source: BehaviorId::Chase,
        active: false,
    });
    assert!(world.get::<Chase>(e).unwrap().gate.suppressed);
    assert!(!world.get::<ReturnHome>(e).unwrap().gate.suppressed);
    assert!(!world.get::<Patrol>(e).unwrap().gate.suppressed);
}

#[test]
fn broadcast_for_another_entity_is_ignored() {
    let (mut world, _) = make_world();
    let a = world.spawn((Chase::new(5.0, 1.0), Patrol::new(vec![], 1.0))).id();
    let b = world.spawn(Patrol::new(vec![], 1.0)).id();

    world.trigger(BehaviorChanged {
        entity: a,
        source: BehaviorId::Chase,
        active: true,
    });
    assert!(world.get::<Patrol>(a).unwrap().gate.suppressed);
    assert!(!world.get::<Patrol>(b).unwrap().gate.suppressed);
}

#[test]
fn chasing_the_player_takes_over_from_patrol() {
    let (mut world, mut update) = make_world();
    let player = world
        .spawn((Group::new("player"), MapPosition::new(3.0, 0.0)))
        .id();
    let guard = world
        .spawn((
            Chase::new(5.0, 2.0),
            Patrol::new(vec![(0.0, -10.0)], 1.0),
            MapPosition::new(0.0, 0.0),
            RigidBody::new(),
            Signals::default(),
            Triggers::default().with(
                TriggerBinding::new(
                    TriggerKind::BehaviorChanged,
                    compile_tags("[set_data name=f.alert value=true]").unwrap(),
                )
                .with_guard(expr::parse("behavior == \"chase\" && active").unwrap()),
            ),
        ))
        .id();

    game::tick(&mut world, &mut update, DT);

    assert!(world.get::<Chase>(guard).unwrap().gate.active);
    assert!(world.get::<Patrol>(guard).unwrap().gate.suppressed);
    let body = world.get::<RigidBody>(guard).unwrap();
    assert!((body.vx - 2.0).abs() < 1e-5);
    assert!(body.vy.abs() < 1e-5);
    assert!(world.get::<Signals>(guard).unwrap().has_flag("alert"));

    // Player escapes beyond the lose radius: patrol resumes the same tick.
    world.get_mut::<MapPosition>(player).unwrap().x = 100.0;
    game::tick(&mut world, &mut update, DT);

    assert!(!world.get::<Chase>(guard).unwrap().gate.active);
    let patrol = world.get::<Patrol>(guard).unwrap();
    assert!(!patrol.gate.suppressed);
    assert!(patrol.gate.active);
    assert!(world.get::<RigidBody>(guard).unwrap().vy < 0.0);
}

#[test]
fn patrol_and_wander_never_steer_together() {
    let (mut world, mut update) = make_world();
    let walker = world
        .spawn((
            Patrol::new(vec![(0.0, 10.0), (0.0, -10.0)], 1.0),
            Wander::new(1.0, 0.5),
            MapPosition::new(0.0, 0.0),
            RigidBody::new(),
        ))
        .id();

    for _ in 0..10 {
        game::tick(&mut world, &mut update, DT);
        let patrol = world.get::<Patrol>(walker).unwrap();
        let wander = world.get::<Wander>(walker).unwrap();
        assert!(!(patrol.gate.active && wander.gate.active));
        assert!(patrol.gate.active || wander.gate.active);
    }
    assert!(world.get::<Wander>(walker).unwrap().gate.suppressed);
}

#[test]
fn wander_claim_suppresses_an_idle_chase() {
    let (mut world, mut update) = make_world();
    let walker = world
        .spawn((
            Chase::new(5.0, 2.0),
            Wander::new(1.0, 0.5),
            MapPosition::new(0.0, 0.0),
            RigidBody::new(),
        ))
        .id();

    game::tick(&mut world, &mut update, DT);

    assert!(world.get::<Wander>(walker).unwrap().gate.active);
    let chase = world.get::<Chase>(walker).unwrap();
    assert!(chase.gate.suppressed);
    assert!(!chase.gate.active);
}

#[test]
fn sighting_the_player_preempts_an_active_patrol() {
    let (mut world, mut update) = make_world();
    let player = world
        .spawn((Group::new("player"), MapPosition::new(100.0, 0.0)))
        .id();
    let guard = world
        .spawn((
            Chase::new(5.0, 2.0),
            Patrol::new(vec![(0.0, -10.0)], 1.0),
            MapPosition::new(0.0, 0.0),
            RigidBody::new(),
        ))
        .id();

    game::tick(&mut world, &mut update, DT);
    assert!(world.get::<Patrol>(guard).unwrap().gate.active);
    assert!(world.get::<Chase>(guard).unwrap().gate.suppressed);

    // The player walks into sight while patrol holds the claim.
    world.get_mut::<MapPosition>(player).unwrap().x = 3.0;
    game::tick(&mut world, &mut update, DT);

    let chase = world.get::<Chase>(guard).unwrap();
    assert!(chase.gate.active);
    assert!(!chase.gate.suppressed);
    let patrol = world.get::<Patrol>(guard).unwrap();
    assert!(patrol.gate.suppressed);
    assert!(!patrol.gate.active);
    assert!((world.get::<RigidBody>(guard).unwrap().vx - 2.0).abs() < 1e-5);

    // Staying in sight does not make chase claim again, and patrol stays down.
    game::tick(&mut world, &mut update, DT);
    assert!(world.get::<Chase>(guard).unwrap().gate.active);
    assert!(world.get::<Patrol>(guard).unwrap().gate.suppressed);
}

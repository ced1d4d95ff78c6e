//! Flow controller integration tests: transition ordering, `@previous`,
//! queued events and the pause menu pattern.

use bevy_ecs::prelude::*;

use actionflow::components::mapposition::MapPosition;
use actionflow::components::rigidbody::RigidBody;
use actionflow::components::scene::{Scene, SceneMember};
use actionflow::components::statemachine::TransitionRejected;
use actionflow::events::flow::FlowEvent;
use actionflow::game;
use actionflow::resources::actionregistry::{ActionMeta, ActionRegistryBuilder, ParamKind};
use actionflow::resources::clockgate::WorldClockGate;
use actionflow::resources::engineconfig::EngineConfig;
use actionflow::resources::flow::{FlowController, FlowState};
use actionflow::resources::interpreter::{
    ActionContext, ActionError, ActionOutcome, ActionParams, TransitionStart,
};
use actionflow::resources::presentation::PresentationQueue;
use actionflow::script::compile_tags;
use actionflow::systems::flow::{handle_flow_event, start_flow};

const DT: f32 = 0.1;

#[derive(Resource, Default)]
struct CallLog(Vec<String>);

/// Logs `id@<current flow state>`.
fn record(ctx: &mut ActionContext<'_>, params: &ActionParams) -> Result<ActionOutcome, ActionError> {
    let id = params.require_str("id")?;
    let state = ctx
        .world
        .get_resource::<FlowController>()
        .and_then(|flow| flow.current().map(str::to_string))
        .unwrap_or_else(|| "-".to_string());
    ctx.world
        .get_resource_or_init::<CallLog>()
        .0
        .push(format!("{id}@{state}"));
    Ok(ActionOutcome::Done)
}

fn make_world(flow: FlowController) -> (World, Schedule) {
    let mut builder = ActionRegistryBuilder::with_builtin_actions();
    builder
        .register(
            "record",
            record,
            ActionMeta::new("test", "log id with the flow state").param("id", ParamKind::Text, "entry"),
        )
        .unwrap();
    let mut world = World::new();
    game::setup_world(&mut world, &EngineConfig::new(), builder.build());
    world.init_resource::<CallLog>();
    world.insert_resource(flow);
    (world, game::build_update_schedule())
}

fn current(world: &World) -> Option<String> {
    world.resource::<FlowController>().current().map(str::to_string)
}

fn fire(world: &mut World, update: &mut Schedule, event: &str) {
    world.trigger(FlowEvent::new(event));
    game::tick(world, update, DT);
}

#[test]
fn start_game_runs_exit_then_enter() {
    let flow = FlowController::new("title")
        .with_state(
            FlowState::new("title")
                .on_exit(compile_tags("[record id=title_exit]").unwrap())
                .transition("START_GAME", "gameplay"),
        )
        .with_state(FlowState::new("gameplay").on_enter(compile_tags("[record id=gameplay_enter]").unwrap()));
    let (mut world, mut update) = make_world(flow);

    assert_eq!(start_flow(&mut world), TransitionStart::Completed);
    assert_eq!(current(&world).as_deref(), Some("title"));

    fire(&mut world, &mut update, "START_GAME");

    assert_eq!(
        world.resource::<CallLog>().0,
        vec!["title_exit@title", "gameplay_enter@gameplay"]
    );
    let flow = world.resource::<FlowController>();
    assert_eq!(flow.current(), Some("gameplay"));
    assert_eq!(flow.previous(), Some("title"));
    assert!(!flow.transitioning);
}

#[test]
fn previous_placeholder_returns_to_the_prior_state() {
    let flow = FlowController::new("gameplay")
        .with_state(FlowState::new("gameplay").transition("PAUSE", "menu"))
        .with_state(
            FlowState::new("menu")
                .transition("RESUME", "@previous")
                .transition("OPTIONS", "options"),
        )
        .with_state(FlowState::new("options").transition("BACK", "@previous"));
    let (mut world, mut update) = make_world(flow);
    start_flow(&mut world);

    fire(&mut world, &mut update, "PAUSE");
    fire(&mut world, &mut update, "OPTIONS");
    assert_eq!(current(&world).as_deref(), Some("options"));

    fire(&mut world, &mut update, "BACK");
    assert_eq!(current(&world).as_deref(), Some("menu"));

    // `previous` is now options, so RESUME goes back there.
    fire(&mut world, &mut update, "RESUME");
    assert_eq!(current(&world).as_deref(), Some("options"));
}

#[test]
fn events_during_a_transition_wait_their_turn() {
    let flow = FlowController::new("title")
        .with_state(
            FlowState::new("title")
                .on_exit(compile_tags("[wait seconds=0.3][record id=title_exit]").unwrap())
                .transition("START_GAME", "gameplay"),
        )
        .with_state(FlowState::new("gameplay").transition("PAUSE", "menu"))
        .with_state(FlowState::new("menu").on_enter(compile_tags("[record id=menu_enter]").unwrap()));
    let (mut world, mut update) = make_world(flow);
    start_flow(&mut world);

    fire(&mut world, &mut update, "START_GAME");
    assert!(world.resource::<FlowController>().transitioning);
    assert_eq!(current(&world).as_deref(), Some("title"));

    // Direct requests are refused while busy; queued ones are held.
    assert_eq!(
        handle_flow_event(&mut world, "PAUSE"),
        TransitionStart::Ignored(TransitionRejected::Busy)
    );
    world.trigger(FlowEvent::new("PAUSE"));

    for _ in 0..6 {
        game::tick(&mut world, &mut update, DT);
    }
    assert_eq!(current(&world).as_deref(), Some("menu"));
    assert_eq!(
        world.resource::<CallLog>().0,
        vec!["title_exit@title", "menu_enter@menu"]
    );
}

#[test]
fn unmatched_event_is_ignored() {
    let flow = FlowController::new("title")
        .with_state(FlowState::new("title").transition("START_GAME", "gameplay"))
        .with_state(FlowState::new("gameplay"));
    let (mut world, mut update) = make_world(flow);
    start_flow(&mut world);

    assert_eq!(
        handle_flow_event(&mut world, "JUMP"),
        TransitionStart::Ignored(TransitionRejected::Unhandled)
    );
    fire(&mut world, &mut update, "JUMP");
    let flow = world.resource::<FlowController>();
    assert_eq!(flow.current(), Some("title"));
    assert!(!flow.transitioning);
}

#[test]
fn pause_menu_stops_the_world_and_resume_restarts_it() {
    let flow = FlowController::new("gameplay")
        .with_state(
            FlowState::new("gameplay")
                .on_enter(compile_tags("[scene_activate scene=level][world_resume]").unwrap())
                .transition("PAUSE", "menu"),
        )
        .with_state(
            FlowState::new("menu")
                .on_enter(compile_tags("[world_stop][show_overlay scene=menu wait=false]").unwrap())
                .on_exit(compile_tags("[close_overlay scene=menu]").unwrap())
                .transition("RESUME", "@previous"),
        );
    let (mut world, mut update) = make_world(flow);
    let level = world.spawn(Scene::new("level", "gameplay")).id();
    let menu = world.spawn(Scene::new("menu", "ui")).id();
    let walker = world
        .spawn((MapPosition::new(0.0, 0.0), RigidBody::with_velocity(10.0, 0.0), SceneMember(level)))
        .id();
    start_flow(&mut world);

    game::tick(&mut world, &mut update, DT);
    let moved = world.get::<MapPosition>(walker).unwrap().x;
    assert!(moved > 0.0);

    fire(&mut world, &mut update, "PAUSE");
    assert!(world.resource::<WorldClockGate>().stopped);
    assert_eq!(world.get::<Scene>(level).unwrap().time_scale, 0.0);
    assert!(world.get::<Scene>(menu).unwrap().active);
    assert_eq!(
        world.resource::<PresentationQueue>().open_overlays(),
        &["menu".to_string()]
    );
    let frozen = world.get::<MapPosition>(walker).unwrap().x;
    for _ in 0..3 {
        game::tick(&mut world, &mut update, DT);
    }
    assert_eq!(world.get::<MapPosition>(walker).unwrap().x, frozen);

    fire(&mut world, &mut update, "RESUME");
    assert_eq!(current(&world).as_deref(), Some("gameplay"));
    assert!(!world.resource::<WorldClockGate>().stopped);
    assert_eq!(world.get::<Scene>(level).unwrap().time_scale, 1.0);
    assert!(!world.get::<Scene>(menu).unwrap().active);
    assert!(world.resource::<PresentationQueue>().open_overlays().is_empty());

    game::tick(&mut world, &mut update, DT);
    assert!(world.get::<MapPosition>(walker).unwrap().x > frozen);
}

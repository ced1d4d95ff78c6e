//! Interpreter integration tests: ordering, isolation, soft failures,
//! branching graphs and external completions.

use bevy_ecs::prelude::*;
use std::sync::Arc;

use actionflow::components::signals::Signals;
use actionflow::components::statemachine::{StateDefinition, StateMachine};
use actionflow::game;
use actionflow::resources::actionregistry::{ActionMeta, ActionRegistryBuilder, ParamKind};
use actionflow::resources::engineconfig::EngineConfig;
use actionflow::resources::interpreter::{
    ActionContext, ActionError, ActionOutcome, ActionParams, DiagnosticKind, Interpreter,
    run_sequence,
};
use actionflow::script::graph::{self, SequenceGraph};
use actionflow::script::{Value, compile_tags};
use actionflow::systems::scene::despawn_with_tasks;

const DT: f32 = 0.1;

#[derive(Resource, Default)]
struct CallLog(Vec<String>);

fn push(world: &mut World, entry: String) {
    world.get_resource_or_init::<CallLog>().0.push(entry);
}

fn record(ctx: &mut ActionContext<'_>, params: &ActionParams) -> Result<ActionOutcome, ActionError> {
    let id = params.require_str("id")?;
    push(ctx.world, id);
    Ok(ActionOutcome::Done)
}

fn step_a(ctx: &mut ActionContext<'_>, _: &ActionParams) -> Result<ActionOutcome, ActionError> {
    push(ctx.world, "a".into());
    Ok(ActionOutcome::Done)
}

fn step_b(ctx: &mut ActionContext<'_>, _: &ActionParams) -> Result<ActionOutcome, ActionError> {
    push(ctx.world, "b".into());
    Ok(ActionOutcome::Done)
}

fn make_world() -> (World, Schedule) {
    let mut builder = ActionRegistryBuilder::with_builtin_actions();
    builder
        .register(
            "record",
            record,
            ActionMeta::new("test", "append id to the call log").param("id", ParamKind::Text, "entry"),
        )
        .unwrap();
    builder.register("a", step_a, ActionMeta::new("test", "a")).unwrap();
    builder.register("b", step_b, ActionMeta::new("test", "b")).unwrap();

    let mut world = World::new();
    game::setup_world(&mut world, &EngineConfig::new(), builder.build());
    world.init_resource::<CallLog>();
    (world, game::build_update_schedule())
}

fn log(world: &World) -> Vec<String> {
    world.resource::<CallLog>().0.clone()
}

#[test]
fn synchronous_steps_complete_in_order_before_run_returns() {
    let (mut world, _) = make_world();
    let e = world.spawn_empty().id();
    let seq = compile_tags("[record id=1][record id=2] [record id=3]\n[record id=4]").unwrap();

    let handle = run_sequence(&mut world, e, seq, None);

    assert!(handle.is_finished(&world));
    assert_eq!(log(&world), vec!["1", "2", "3", "4"]);
}

#[test]
fn never_completing_run_does_not_block_other_runs() {
    let (mut world, mut update) = make_world();
    let stuck = world.spawn_empty().id();
    let busy = world.spawn_empty().id();

    let stuck_run = run_sequence(
        &mut world,
        stuck,
        compile_tags("[record id=stuck_start][wait_signal name=never][record id=stuck_end]").unwrap(),
        None,
    );
    let busy_run = run_sequence(
        &mut world,
        busy,
        compile_tags("[record id=busy_start][wait seconds=0.25][record id=busy_end]").unwrap(),
        None,
    );

    for _ in 0..10 {
        game::tick(&mut world, &mut update, DT);
    }

    assert!(!stuck_run.is_finished(&world));
    assert!(busy_run.is_finished(&world));
    let entries = log(&world);
    assert!(entries.contains(&"busy_end".to_string()));
    assert!(!entries.contains(&"stuck_end".to_string()));
    assert_eq!(world.resource::<Interpreter>().task_count(), 1);
}

#[test]
fn unknown_action_is_skipped_with_a_warning() {
    let (mut world, _) = make_world();
    let e = world.spawn_empty().id();

    let handle = run_sequence(&mut world, e, compile_tags("[a][no_such_action][b]").unwrap(), None);

    assert!(handle.is_finished(&world));
    assert_eq!(log(&world), vec!["a", "b"]);
    let kinds: Vec<DiagnosticKind> = world
        .resource::<Interpreter>()
        .diagnostics()
        .map(|d| d.kind.clone())
        .collect();
    assert_eq!(kinds, vec![DiagnosticKind::UnknownAction]);
}

#[test]
fn handler_failure_does_not_abort_the_run() {
    let (mut world, _) = make_world();
    let e = world.spawn_empty().id();

    // set_data without a value fails; the run carries on.
    let handle = run_sequence(&mut world, e, compile_tags("[a][set_data name=f.x][b]").unwrap(), None);

    assert!(handle.is_finished(&world));
    assert_eq!(log(&world), vec!["a", "b"]);
    let diagnostic = world.resource::<Interpreter>().diagnostics().next().cloned().unwrap();
    assert!(matches!(diagnostic.kind, DiagnosticKind::HandlerFailure(_)));
    assert_eq!(diagnostic.step, Some(1));
}

#[test]
fn set_data_then_state_transition_example() {
    let (mut world, mut update) = make_world();
    let machine = StateMachine::new("alive")
        .with_state(StateDefinition::new("alive"))
        .with_state(StateDefinition::new("dead").on_enter(
            compile_tags("[wait seconds=0.3][set_data name=f.buried value=true]").unwrap(),
        ));
    let e = world.spawn((machine, Signals::default().with("hp", 30.0))).id();
    // First tick enters the initial state.
    game::tick(&mut world, &mut update, DT);
    assert_eq!(world.get::<StateMachine>(e).unwrap().current(), Some("alive"));

    let handle = run_sequence(
        &mut world,
        e,
        compile_tags("[set_data name=f.hp value=\"f.hp - 10\"][state_transition to=dead]").unwrap(),
        None,
    );
    assert_eq!(world.get::<Signals>(e).unwrap().get_number("hp"), Some(20.0));

    let mut ticks = 0;
    while !handle.is_finished(&world) {
        assert!(!world.get::<Signals>(e).unwrap().has_flag("buried"));
        game::tick(&mut world, &mut update, DT);
        ticks += 1;
        assert!(ticks < 20, "run never finished");
    }
    let sm = world.get::<StateMachine>(e).unwrap();
    assert_eq!(sm.current(), Some("dead"));
    assert!(!sm.transitioning);
    assert!(world.get::<Signals>(e).unwrap().has_flag("buried"));
}

#[test]
fn graph_follows_the_yielded_pin() {
    let (mut world, _) = make_world();
    let graph = SequenceGraph::default()
        .node_with(
            "check",
            "if",
            &[("condition", Value::from("f.hp <= 0"))],
        )
        .node_with("die", "record", &[("id", Value::from("die"))])
        .node_with("hurt", "record", &[("id", Value::from("hurt"))])
        .node_with("after", "record", &[("id", Value::from("after"))])
        .connect("check", "true", "die")
        .connect("check", "false", "hurt")
        .connect("hurt", "next", "after");
    let seq = Arc::new(graph::lower(&graph).unwrap());

    let healthy = world.spawn(Signals::default().with("hp", 3.0)).id();
    run_sequence(&mut world, healthy, Arc::clone(&seq), None);
    assert_eq!(log(&world), vec!["hurt", "after"]);

    world.resource_mut::<CallLog>().0.clear();
    let dying = world.spawn(Signals::default().with("hp", 0.0)).id();
    run_sequence(&mut world, dying, seq, None);
    assert_eq!(log(&world), vec!["die"]);
}

#[test]
fn pins_in_flat_sequences_are_discarded() {
    let (mut world, _) = make_world();
    let e = world.spawn_empty().id();
    run_sequence(
        &mut world,
        e,
        compile_tags("[if condition=false][record id=next]").unwrap(),
        None,
    );
    assert_eq!(log(&world), vec!["next"]);
}

#[test]
fn substitution_reads_variables_at_execution_time() {
    let (mut world, _) = make_world();
    let e = world.spawn_empty().id();
    run_sequence(
        &mut world,
        e,
        compile_tags("[set_data name=g.who value=guard][record id=&{g.who}][record id=\"hello &{g.who}\"]")
            .unwrap(),
        None,
    );
    assert_eq!(log(&world), vec!["guard", "hello guard"]);
}

#[test]
fn despawning_the_owner_abandons_its_runs() {
    let (mut world, mut update) = make_world();
    let e = world.spawn_empty().id();
    let handle = run_sequence(
        &mut world,
        e,
        compile_tags("[wait seconds=0.2][record id=late]").unwrap(),
        None,
    );
    despawn_with_tasks(&mut world, e);

    for _ in 0..5 {
        game::tick(&mut world, &mut update, DT);
    }
    assert!(handle.is_finished(&world));
    assert!(log(&world).is_empty());
    assert_eq!(world.resource::<Interpreter>().task_count(), 0);
}

#[test]
fn completion_sender_wakes_runs_from_another_thread() {
    let (mut world, mut update) = make_world();
    let e = world.spawn_empty().id();
    let handle = run_sequence(
        &mut world,
        e,
        compile_tags("[wait_signal name=loaded][record id=after]").unwrap(),
        None,
    );

    let sender = world.resource::<Interpreter>().completion_sender();
    std::thread::spawn(move || {
        assert!(sender.send("loaded"));
    })
    .join()
    .unwrap();

    game::tick(&mut world, &mut update, DT);
    assert!(handle.is_finished(&world));
    assert_eq!(log(&world), vec!["after"]);
}

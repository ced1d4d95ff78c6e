//! World setup and the per-tick update schedule.
//!
//! The host (the headless runner in `main.rs`, or a game embedding this
//! crate) calls [`setup_world`] once, installs content, starts the flow and
//! then calls [`tick`] with the frame delta.

use bevy_ecs::observer::Observer;
use bevy_ecs::prelude::*;
use log::info;

use crate::components::persistent::Persistent;
use crate::events::behavior::observe_behavior_changed;
use crate::events::flow::observe_flow_event;
use crate::events::statechanged::observe_state_changed;
use crate::events::trigger::{observe_contact_event, observe_trigger_event};
use crate::resources::actionregistry::ActionRegistry;
use crate::resources::clockgate::WorldClockGate;
use crate::resources::engineconfig::EngineConfig;
use crate::resources::flow::FlowEventQueue;
use crate::resources::interpreter::{Interpreter, advance_tasks};
use crate::resources::presentation::PresentationQueue;
use crate::resources::worldtime::WorldTime;
use crate::resources::worldvariables::WorldVariables;
use crate::systems::behavior::{
    register_arbitration_observers, update_chase, update_patrol, update_return_home, update_wander,
};
use crate::systems::flow::process_flow_events;
use crate::systems::movement::movement;
use crate::systems::statemachine::{init_state_machines, state_machine_update};
use crate::systems::time::update_world_time;
use crate::systems::triggers::fire_ready_triggers;

/// Insert the runtime resources and register every observer.
pub fn setup_world(world: &mut World, config: &EngineConfig, registry: ActionRegistry) {
    info!("{} actions registered", registry.len());
    world.insert_resource(registry);
    world.insert_resource(Interpreter::new(config.interpreter_settings()));
    world.insert_resource(WorldTime::default());
    world.insert_resource(WorldVariables::default());
    world.insert_resource(WorldClockGate::default());
    world.insert_resource(FlowEventQueue::default());
    world.insert_resource(PresentationQueue::default());
    world.insert_resource(config.clone());

    world.spawn((Observer::new(observe_state_changed), Persistent));
    world.spawn((Observer::new(observe_behavior_changed), Persistent));
    world.spawn((Observer::new(observe_trigger_event), Persistent));
    world.spawn((Observer::new(observe_contact_event), Persistent));
    world.spawn((Observer::new(observe_flow_event), Persistent));
    register_arbitration_observers(world);
    // Ensure the observers are registered before any system triggers events.
    world.flush();
}

/// The update schedule, in tick order:
///
/// 1. queued flow events are applied
/// 2. suspended runs are resumed
/// 3. new state machines enter their initial state, new triggers fire `ready`
/// 4. behaviors steer (chained so arbitration broadcasts land in between)
/// 5. velocities are integrated
/// 6. onUpdate runs start
pub fn build_update_schedule() -> Schedule {
    let mut update = Schedule::default();
    update.add_systems(
        (
            process_flow_events,
            advance_tasks,
            init_state_machines,
            fire_ready_triggers,
            (update_chase, update_return_home, update_patrol, update_wander).chain(),
            movement,
            state_machine_update,
        )
            .chain(),
    );
    update
}

/// Advance the clock by `dt` seconds and run one update.
pub fn tick(world: &mut World, update: &mut Schedule, dt: f32) {
    update_world_time(world, dt);
    update.run(world);
    world.clear_trackers();
}

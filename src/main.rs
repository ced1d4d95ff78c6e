//! actionflow headless runner.
//!
//! Loads a content file (scenes, prefabs, flow), starts the flow controller
//! and runs a fixed number of ticks without a window. Useful for exercising
//! authored sequences and flow graphs from the command line or CI.
//!
//! # Main Loop
//!
//! 1. Load `config.ini` (defaults for anything missing) and initialise logging
//! 2. Build the action registry and the ECS world
//! 3. Install content and enter the flow's initial state
//! 4. Run the update schedule once per tick:
//!    - scheduled `--event`s are fired as flow events
//!    - text requests are acknowledged immediately (no presentation layer)
//! 5. Print a summary of the final flow state and diagnostics
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --content content.json --ticks 300 --event 10:START_GAME
//! ```

use actionflow::catalog;
use actionflow::content::{ContentFile, install_content};
use actionflow::events::flow::FlowEvent;
use actionflow::game;
use actionflow::resources::actionregistry::ActionRegistryBuilder;
use actionflow::resources::engineconfig::EngineConfig;
use actionflow::resources::flow::FlowController;
use actionflow::resources::interpreter::Interpreter;
use actionflow::resources::presentation::{PresentationQueue, PresentationRequest, acknowledge_text};
use actionflow::systems::flow::start_flow;
use bevy_ecs::prelude::*;
use clap::Parser;
use std::path::PathBuf;

/// Headless runner for actionflow content.
#[derive(Parser)]
#[command(version, about = "Runs actionflow content without a window.")]
struct Cli {
    /// Configuration file (default: ./config.ini).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Content file; overrides `[content] path` from the configuration.
    #[arg(long, value_name = "PATH")]
    content: Option<PathBuf>,

    /// Number of ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Fire a flow event at a tick, as TICK:NAME. May be repeated.
    #[arg(long = "event", value_name = "TICK:NAME", value_parser = parse_scheduled_event)]
    events: Vec<(u64, String)>,

    /// Write the action catalog as JSON and exit.
    /// Optionally provide a path (default: actions.json).
    #[arg(long, value_name = "PATH")]
    dump_actions: Option<Option<PathBuf>>,
}

fn parse_scheduled_event(raw: &str) -> Result<(u64, String), String> {
    let (tick, name) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected TICK:NAME, got '{raw}'"))?;
    let tick = tick
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid tick '{tick}': {e}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing event name in '{raw}'"));
    }
    Ok((tick, name.to_string()))
}

fn main() {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::with_path(path.clone()),
        None => EngineConfig::new(),
    };
    let config_result = config.load_from_file();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();
    if let Err(e) = config_result {
        log::warn!("{}; using defaults", e);
    }

    let registry = ActionRegistryBuilder::with_builtin_actions().build();

    // Early-exit: write the action catalog and quit
    if let Some(maybe_path) = cli.dump_actions {
        let path = maybe_path.unwrap_or_else(|| PathBuf::from("actions.json"));
        match catalog::generate_catalog(&registry) {
            Ok(content) => {
                if let Err(e) = catalog::write_catalog(&path, &content) {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
                println!("Action catalog written to {}", path.display());
            }
            Err(e) => {
                eprintln!("Error generating catalog: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    // --------------- ECS world + content ---------------
    let mut world = World::new();
    game::setup_world(&mut world, &config, registry);

    let content_path = cli.content.unwrap_or_else(|| config.content_path.clone());
    let content = match ContentFile::load(&content_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = install_content(&mut world, &content) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    if world.contains_resource::<FlowController>() {
        start_flow(&mut world);
    } else {
        log::warn!("{} defines no flow", content_path.display());
    }

    // --------------- Main loop ---------------
    let mut update = game::build_update_schedule();
    let dt = config.tick_delta();
    for tick in 0..cli.ticks {
        for (_, name) in cli.events.iter().filter(|(at, _)| *at == tick) {
            log::info!("tick {}: firing flow event '{}'", tick, name);
            world.trigger(FlowEvent::new(name.clone()));
        }

        game::tick(&mut world, &mut update, dt);

        let requests = world.resource_mut::<PresentationQueue>().drain();
        for request in requests {
            match request {
                PresentationRequest::Text {
                    token,
                    speaker,
                    text,
                } => {
                    log::info!("{}: {}", speaker.as_deref().unwrap_or("*"), text);
                    acknowledge_text(&mut world, token);
                }
                PresentationRequest::Overlay { scene } => {
                    log::info!("overlay '{}' opened", scene);
                }
            }
        }
    }

    // --------------- Summary ---------------
    let flow_state = world
        .get_resource::<FlowController>()
        .and_then(|flow| flow.current().map(str::to_string))
        .unwrap_or_else(|| "-".to_string());
    let interpreter = world.resource::<Interpreter>();
    println!("ticks run:        {}", cli.ticks);
    println!("flow state:       {}", flow_state);
    println!("pending tasks:    {}", interpreter.task_count());
    println!("diagnostics:      {}", interpreter.diagnostics().count());
    for diagnostic in interpreter.diagnostics() {
        println!("  {} at {}", diagnostic.kind, diagnostic.fragment);
    }
}

//! Content files: scenes, entity prefabs, flow definition and initial
//! variables, loaded from JSON.
//!
//! ```json
//! {
//!   "variables": { "score": 0 },
//!   "prefabs": {
//!     "guard": {
//!       "group": "enemy",
//!       "velocity": [0, 0],
//!       "behaviors": [ { "kind": "chase", "sight_radius": 80, "speed": 40 } ],
//!       "state_machine": {
//!         "initial": "idle",
//!         "states": [ { "name": "idle" }, { "name": "dead", "on_enter": "[despawn]" } ]
//!       }
//!     }
//!   },
//!   "scenes": [
//!     { "name": "level1", "group": "gameplay",
//!       "entities": [ { "prefab": "guard", "name": "guard1", "position": [10, 20] } ] }
//!   ],
//!   "flow": { "initial": "title", "states": [ { "name": "title" } ] }
//! }
//! ```
//!
//! Sequences that fail to compile are logged with their owner and skipped;
//! structural problems (bad JSON, unknown prefab, invalid flow) fail the load.

use bevy_ecs::prelude::*;
use log::{error, info, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::components::behavior::{Chase, Patrol, ReturnHome, Wander};
use crate::components::facing::Facing;
use crate::components::group::{EntityName, Group};
use crate::components::mapposition::MapPosition;
use crate::components::persistent::Persistent;
use crate::components::rigidbody::RigidBody;
use crate::components::scene::{Scene, SceneMember};
use crate::components::signals::Signals;
use crate::components::statemachine::{StateDefinition, StateMachine};
use crate::components::triggers::{TriggerBinding, TriggerKind, Triggers};
use crate::resources::flow::{FlowController, FlowDefinition, FlowError};
use crate::resources::worldvariables::WorldVariables;
use crate::script::expr;
use crate::script::sequence::ActionSequence;
use crate::script::value::Value;
use crate::script::SequenceSource;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid content: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scene '{scene}' uses unknown prefab '{prefab}'")]
    UnknownPrefab { scene: String, prefab: String },
    #[error(transparent)]
    Flow(#[from] FlowError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDef {
    pub name: String,
    #[serde(default)]
    pub on_enter: Option<SequenceSource>,
    #[serde(default)]
    pub on_update: Option<SequenceSource>,
    #[serde(default)]
    pub on_exit: Option<SequenceSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMachineDef {
    pub initial: String,
    pub states: Vec<StateDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BehaviorDef {
    Chase {
        sight_radius: f32,
        #[serde(default)]
        lose_radius: Option<f32>,
        speed: f32,
    },
    Patrol {
        waypoints: Vec<(f32, f32)>,
        speed: f32,
    },
    Wander {
        speed: f32,
        interval: f32,
    },
    ReturnHome {
        home: (f32, f32),
        leash: f32,
        speed: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDef {
    pub kind: TriggerKind,
    #[serde(default)]
    pub peer_group: Option<String>,
    #[serde(default)]
    pub guard: Option<String>,
    pub sequence: SequenceSource,
}

/// Components of one entity. Every field is optional so a scene placement can
/// override only what differs from its prefab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub position: Option<(f32, f32)>,
    #[serde(default)]
    pub velocity: Option<(f32, f32)>,
    #[serde(default)]
    pub signals: FxHashMap<String, Value>,
    #[serde(default)]
    pub persistent: bool,
    #[serde(default)]
    pub state_machine: Option<StateMachineDef>,
    #[serde(default)]
    pub behaviors: Vec<BehaviorDef>,
    #[serde(default)]
    pub triggers: Vec<TriggerDef>,
}

impl EntityDef {
    /// Layer `overrides` on top of `self`. Lists are appended, signals merged.
    pub fn merged(&self, overrides: &EntityDef) -> EntityDef {
        let mut out = self.clone();
        if overrides.name.is_some() {
            out.name = overrides.name.clone();
        }
        if overrides.group.is_some() {
            out.group = overrides.group.clone();
        }
        if overrides.position.is_some() {
            out.position = overrides.position;
        }
        if overrides.velocity.is_some() {
            out.velocity = overrides.velocity;
        }
        if overrides.state_machine.is_some() {
            out.state_machine = overrides.state_machine.clone();
        }
        out.persistent |= overrides.persistent;
        out.signals
            .extend(overrides.signals.iter().map(|(k, v)| (k.clone(), v.clone())));
        out.behaviors.extend(overrides.behaviors.iter().cloned());
        out.triggers.extend(overrides.triggers.iter().cloned());
        out
    }
}

/// An entity placed in a scene, optionally based on a prefab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementDef {
    #[serde(default)]
    pub prefab: Option<String>,
    #[serde(flatten)]
    pub entity: EntityDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDef {
    pub name: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub entities: Vec<PlacementDef>,
}

/// A whole content file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentFile {
    #[serde(default)]
    pub variables: FxHashMap<String, Value>,
    #[serde(default)]
    pub prefabs: FxHashMap<String, EntityDef>,
    #[serde(default)]
    pub scenes: Vec<SceneDef>,
    #[serde(default)]
    pub flow: Option<FlowDefinition>,
}

impl ContentFile {
    pub fn from_json(text: &str) -> Result<Self, ContentError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Resolve a placement against its prefab.
    fn resolve(&self, scene: &str, placement: &PlacementDef) -> Result<EntityDef, ContentError> {
        match &placement.prefab {
            None => Ok(placement.entity.clone()),
            Some(name) => self
                .prefabs
                .get(name)
                .map(|prefab| prefab.merged(&placement.entity))
                .ok_or_else(|| ContentError::UnknownPrefab {
                    scene: scene.to_string(),
                    prefab: name.clone(),
                }),
        }
    }
}

fn compile_or_log(owner: &str, source: Option<&SequenceSource>) -> Option<Arc<ActionSequence>> {
    match source?.compile() {
        Ok(seq) => Some(seq),
        Err(e) => {
            error!("{}: {}; sequence skipped", owner, e);
            None
        }
    }
}

fn build_state_machine(owner: &str, def: &StateMachineDef) -> StateMachine {
    let mut machine = StateMachine::new(def.initial.clone());
    for state in &def.states {
        let label = format!("{}.{}", owner, state.name);
        let mut definition = StateDefinition::new(state.name.clone());
        definition.on_enter = compile_or_log(&format!("{}.on_enter", label), state.on_enter.as_ref());
        definition.on_update =
            compile_or_log(&format!("{}.on_update", label), state.on_update.as_ref());
        definition.on_exit = compile_or_log(&format!("{}.on_exit", label), state.on_exit.as_ref());
        machine = machine.with_state(definition);
    }
    machine
}

fn build_triggers(owner: &str, defs: &[TriggerDef]) -> Triggers {
    let mut triggers = Triggers::default();
    for def in defs {
        let label = format!("{}.{}", owner, def.kind);
        let Some(sequence) = compile_or_log(&label, Some(&def.sequence)) else {
            continue;
        };
        if def.kind.is_contact() && def.peer_group.is_none() {
            warn!("{}: contact trigger without peer_group never fires", label);
        }
        let mut binding = TriggerBinding::new(def.kind, sequence);
        if let Some(group) = &def.peer_group {
            binding = binding.with_peer_group(group.clone());
        }
        if let Some(src) = &def.guard {
            if !def.kind.accepts_guard() {
                warn!("{}: guard ignored for this trigger kind", label);
            } else {
                match expr::parse(src) {
                    Ok(guard) => binding = binding.with_guard(guard),
                    Err(e) => {
                        error!("{}: bad guard '{}': {}; binding skipped", label, src, e);
                        continue;
                    }
                }
            }
        }
        triggers = triggers.with(binding);
    }
    triggers
}

/// Spawn one entity from a definition, optionally as a member of `scene`.
pub fn spawn_entity(world: &mut World, def: &EntityDef, scene: Option<Entity>) -> Entity {
    let mut entity_mut = world.spawn_empty();
    let entity = entity_mut.id();
    let owner = def
        .name
        .clone()
        .unwrap_or_else(|| format!("{:?}", entity));

    // Name and group
    if let Some(name) = &def.name {
        entity_mut.insert(EntityName::new(name.clone()));
    }
    if let Some(group) = &def.group {
        entity_mut.insert(Group::new(group.clone()));
    }

    // Position
    if let Some((x, y)) = def.position {
        entity_mut.insert(MapPosition::new(x, y));
    }

    // RigidBody
    if let Some((vx, vy)) = def.velocity {
        entity_mut.insert((RigidBody::with_velocity(vx, vy), Facing::default()));
    }

    // Signals
    if !def.signals.is_empty() {
        let mut signals = Signals::default();
        for (key, value) in &def.signals {
            signals.set(key.clone(), value.clone());
        }
        entity_mut.insert(signals);
    }

    // Persistent
    if def.persistent {
        entity_mut.insert(Persistent);
    }

    // Scene membership
    if let Some(scene) = scene {
        entity_mut.insert(SceneMember(scene));
    }

    // StateMachine
    if let Some(machine) = &def.state_machine {
        entity_mut.insert(build_state_machine(&owner, machine));
    }

    // Behaviors
    for behavior in &def.behaviors {
        match behavior {
            BehaviorDef::Chase {
                sight_radius,
                lose_radius,
                speed,
            } => {
                let mut chase = Chase::new(*sight_radius, *speed);
                if let Some(lose) = lose_radius {
                    chase.lose_radius = *lose;
                }
                entity_mut.insert(chase);
            }
            BehaviorDef::Patrol { waypoints, speed } => {
                entity_mut.insert(Patrol::new(waypoints.clone(), *speed));
            }
            BehaviorDef::Wander { speed, interval } => {
                entity_mut.insert(Wander::new(*speed, *interval));
            }
            BehaviorDef::ReturnHome { home, leash, speed } => {
                entity_mut.insert(ReturnHome::new(*home, *leash, *speed));
            }
        }
    }

    // Triggers
    if !def.triggers.is_empty() {
        entity_mut.insert(build_triggers(&owner, &def.triggers));
    }

    entity
}

/// Spawn a scene root (inactive) and its entities.
pub fn spawn_scene(
    world: &mut World,
    content: &ContentFile,
    def: &SceneDef,
) -> Result<Entity, ContentError> {
    // Resolve every placement first so a bad prefab spawns nothing.
    let placements = def
        .entities
        .iter()
        .map(|p| content.resolve(&def.name, p))
        .collect::<Result<Vec<_>, _>>()?;

    let group = def.group.clone().unwrap_or_else(|| def.name.clone());
    let scene = world.spawn(Scene::new(def.name.clone(), group)).id();
    for entity in &placements {
        spawn_entity(world, entity, Some(scene));
    }
    info!("scene '{}' loaded ({} entities)", def.name, placements.len());
    Ok(scene)
}

/// Install a whole content file: variables, scenes and the flow controller.
/// Scenes start inactive; the flow's onEnter sequences activate them.
pub fn install_content(world: &mut World, content: &ContentFile) -> Result<(), ContentError> {
    let flow = content
        .flow
        .as_ref()
        .map(FlowController::from_definition)
        .transpose()?;

    {
        let mut vars = world.get_resource_or_init::<WorldVariables>();
        for (key, value) in &content.variables {
            vars.set(key.clone(), value.clone());
        }
    }
    for scene in &content.scenes {
        spawn_scene(world, content, scene)?;
    }
    if let Some(flow) = flow {
        info!("flow installed with states {:?}", flow.state_names());
        world.insert_resource(flow);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = r#"{
        "variables": { "score": 0 },
        "prefabs": {
            "guard": {
                "group": "enemy",
                "velocity": [0, 0],
                "signals": { "hp": 3 },
                "behaviors": [ { "kind": "chase", "sight_radius": 80, "speed": 40 } ],
                "state_machine": {
                    "initial": "idle",
                    "states": [ { "name": "idle" }, { "name": "dead", "on_enter": "[despawn]" } ]
                },
                "triggers": [
                    { "kind": "hit", "peer_group": "player", "sequence": "[set_data name=f.hp value=\"f.hp - 1\"]" },
                    { "kind": "state-changed", "guard": "state ==", "sequence": "[log message=x]" }
                ]
            }
        },
        "scenes": [
            { "name": "level1", "group": "gameplay",
              "entities": [
                  { "prefab": "guard", "name": "guard1", "position": [10, 20], "signals": { "hp": 5 } },
                  { "name": "door", "position": [0, 0], "persistent": true }
              ] }
        ],
        "flow": {
            "initial": "title",
            "states": [ { "name": "title", "transitions": [ { "event": "START_GAME", "target": "title" } ] } ]
        }
    }"#;

    #[test]
    fn test_parse_and_merge_prefab() {
        let content = ContentFile::from_json(CONTENT).unwrap();
        let resolved = content
            .resolve("level1", &content.scenes[0].entities[0])
            .unwrap();
        assert_eq!(resolved.group.as_deref(), Some("enemy"));
        assert_eq!(resolved.name.as_deref(), Some("guard1"));
        assert_eq!(resolved.position, Some((10.0, 20.0)));
        assert_eq!(resolved.signals.get("hp"), Some(&Value::Number(5.0)));
    }

    #[test]
    fn test_install_spawns_scene_members() {
        let content = ContentFile::from_json(CONTENT).unwrap();
        let mut world = World::new();
        install_content(&mut world, &content).unwrap();

        assert_eq!(world.resource::<WorldVariables>().get_number("score"), Some(0.0));
        assert_eq!(world.resource::<FlowController>().initial(), "title");

        let mut scenes = world.query::<&Scene>();
        let scene = scenes.single(&world).unwrap();
        assert_eq!(scene.group, "gameplay");
        assert!(!scene.active);

        let mut guards = world.query::<(&EntityName, &StateMachine, &Triggers, &Chase, &SceneMember)>();
        let (name, machine, triggers, _, _) = guards.single(&world).unwrap();
        assert_eq!(name.as_str(), "guard1");
        assert!(machine.contains("dead"));
        // The binding with an unparsable guard is skipped.
        assert_eq!(triggers.bindings.len(), 1);

        let mut persistent = world.query_filtered::<&EntityName, With<Persistent>>();
        assert_eq!(persistent.single(&world).unwrap().as_str(), "door");
    }

    #[test]
    fn test_unknown_prefab_fails() {
        let mut content = ContentFile::from_json(CONTENT).unwrap();
        content.scenes[0].entities[0].prefab = Some("dragon".into());
        let mut world = World::new();
        assert!(matches!(
            install_content(&mut world, &content),
            Err(ContentError::UnknownPrefab { .. })
        ));
        assert_eq!(world.query::<&Scene>().iter(&world).count(), 0);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            ContentFile::from_json("{ \"scenes\": 3 }"),
            Err(ContentError::Json(_))
        ));
    }
}

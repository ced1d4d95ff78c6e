//! ECS components for entities.
//!
//! This module groups all component types the runtime attaches to entities:
//! placement and motion, per-entity variables, scene membership, state
//! machines, autonomous behaviors and trigger bindings.
//!
//! Submodules overview:
//! - [`behavior`] – autonomous behaviors and their arbitration gate
//! - [`facing`] – dominant heading derived from velocity
//! - [`group`] – tag component for grouping entities by name, and entity names
//! - [`mapposition`] – world-space position (pivot) for an entity
//! - [`persistent`] – marker for entities that persist across scene unloads
//! - [`rigidbody`] – simple kinematic body storing velocity
//! - [`scene`] – scene roots and scene membership
//! - [`signals`] – per-entity variable storage
//! - [`statemachine`] – named states with onEnter/onUpdate/onExit sequences
//! - [`triggers`] – trigger kinds bound to action sequences

pub mod behavior;
pub mod facing;
pub mod group;
pub mod mapposition;
pub mod persistent;
pub mod rigidbody;
pub mod scene;
pub mod signals;
pub mod statemachine;
pub mod triggers;

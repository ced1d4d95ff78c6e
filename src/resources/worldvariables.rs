//! Global variable store.
//!
//! [`WorldVariables`] is the world-wide half of the variable store; scripts
//! reach it through `g.<key>` paths or any path without a scope prefix.
//! Entity-local values live in [`Signals`](crate::components::signals::Signals).
//!
//! Use cases include:
//! - Score, lives, collected keys
//! - Story flags read by trigger guards and `if` nodes
//! - Values substituted into tags with `&{g.key}`

use bevy_ecs::prelude::{Entity, Resource};
use rustc_hash::FxHashMap;

use crate::script::value::Value;

#[derive(Debug, Clone, Resource, Default)]
pub struct WorldVariables {
    pub values: FxHashMap<String, Value>,
    /// Entities of interest registered by name (e.g. the current player).
    pub entities: FxHashMap<String, Entity>,
}

impl WorldVariables {
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(Value::as_f64)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn has_flag(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(Value::is_truthy)
    }

    pub fn set_entity(&mut self, key: impl Into<String>, entity: Entity) {
        self.entities.insert(key.into(), entity);
    }

    pub fn get_entity(&self, key: &str) -> Option<Entity> {
        self.entities.get(key).copied()
    }

    pub fn remove_entity(&mut self, key: &str) -> Option<Entity> {
        self.entities.remove(key)
    }
}

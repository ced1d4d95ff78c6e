//! Per-entity variable storage.
//!
//! [`Signals`] is the entity-local half of the variable store. Scripts reach
//! it through `f.<key>` (the sequence's source entity) and `t.<key>` (the
//! trigger's target). The global half is
//! [`WorldVariables`](crate::resources::worldvariables::WorldVariables).
//!
//! No locking: any handler may read or write at any time, last write wins.

use bevy_ecs::prelude::Component;
use rustc_hash::FxHashMap;

use crate::script::value::Value;

#[derive(Debug, Clone, Component, Default)]
pub struct Signals {
    pub values: FxHashMap<String, Value>,
}

impl Signals {
    /// Builder: start with a value set.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

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

    /// Flags are boolean values; a missing key reads as false.
    pub fn has_flag(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(Value::is_truthy)
    }

    pub fn set_flag(&mut self, key: impl Into<String>) {
        self.values.insert(key.into(), Value::Bool(true));
    }

    pub fn clear_flag(&mut self, key: &str) {
        self.values.remove(key);
    }
}

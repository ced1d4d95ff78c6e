//! Catalog of executable actions.
//!
//! Every action name maps to an [`ActionDefinition`]: a plain function
//! pointer handler plus declarative [`ActionMeta`] (parameter schema, output
//! pins). Definitions are collected in an [`ActionRegistryBuilder`] at
//! startup and frozen into the immutable [`ActionRegistry`] resource; the
//! interpreter only reads it afterwards.
//!
//! At runtime only `meta.pins` is consulted, to validate the pin a handler
//! yields. The rest of the metadata is for authoring tools (see
//! [`crate::catalog`]).

use bevy_ecs::prelude::Resource;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::resources::interpreter::{ActionContext, ActionError, ActionOutcome, ActionParams};

/// Signature shared by every action handler.
pub type ActionHandler =
    fn(&mut ActionContext<'_>, &ActionParams) -> Result<ActionOutcome, ActionError>;

/// Parameter type hint for authoring tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Text,
    Number,
    Boolean,
    /// Evaluated with [`crate::script::expr`].
    Expression,
    /// Target keyword, group, entity name or `"x,y"`.
    Target,
    Any,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

/// Declarative description of an action.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ActionMeta {
    pub category: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    /// Legal output pins, empty for non-branching actions.
    pub pins: Vec<String>,
}

impl ActionMeta {
    pub fn new(category: &str, description: &str) -> Self {
        Self {
            category: category.to_string(),
            description: description.to_string(),
            params: Vec::new(),
            pins: Vec::new(),
        }
    }

    /// Builder: a required parameter.
    pub fn param(mut self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        });
        self
    }

    /// Builder: an optional parameter.
    pub fn optional(mut self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            kind,
            required: false,
            description: description.to_string(),
        });
        self
    }

    /// Builder: declared output pins.
    pub fn pins(mut self, pins: &[&str]) -> Self {
        self.pins = pins.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn declares_pin(&self, pin: &str) -> bool {
        self.pins.iter().any(|p| p == pin)
    }
}

/// A registered action.
#[derive(Clone)]
pub struct ActionDefinition {
    pub name: String,
    pub handler: ActionHandler,
    pub meta: ActionMeta,
}

impl fmt::Debug for ActionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDefinition")
            .field("name", &self.name)
            .field("meta", &self.meta)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("action '{0}' is already registered")]
    Duplicate(String),
}

/// Mutable registration phase.
#[derive(Default)]
pub struct ActionRegistryBuilder {
    defs: FxHashMap<String, ActionDefinition>,
}

impl ActionRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the built-in action library.
    pub fn with_builtin_actions() -> Self {
        let mut builder = Self::new();
        crate::actions::register_builtin(&mut builder);
        builder
    }

    /// Register an action. Fails if the name is taken.
    pub fn register(
        &mut self,
        name: &str,
        handler: ActionHandler,
        meta: ActionMeta,
    ) -> Result<(), RegistryError> {
        if self.defs.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.defs.insert(
            name.to_string(),
            ActionDefinition {
                name: name.to_string(),
                handler,
                meta,
            },
        );
        Ok(())
    }

    /// Freeze into the immutable registry.
    pub fn build(self) -> ActionRegistry {
        ActionRegistry {
            defs: Arc::new(self.defs),
        }
    }
}

/// Immutable name -> definition table.
#[derive(Resource, Clone, Default)]
pub struct ActionRegistry {
    defs: Arc<FxHashMap<String, ActionDefinition>>,
}

impl ActionRegistry {
    pub fn lookup(&self, name: &str) -> Option<&ActionDefinition> {
        self.defs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// All definitions sorted by name.
    pub fn definitions(&self) -> Vec<&ActionDefinition> {
        let mut defs: Vec<_> = self.defs.values().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn names(&self) -> Vec<&str> {
        self.definitions().into_iter().map(|d| d.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut ActionContext<'_>, _: &ActionParams) -> Result<ActionOutcome, ActionError> {
        Ok(ActionOutcome::Done)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut builder = ActionRegistryBuilder::new();
        builder
            .register("noop", noop, ActionMeta::new("test", "does nothing"))
            .unwrap();
        let registry = builder.build();
        assert!(registry.contains("noop"));
        assert!(registry.lookup("missing").is_none());
        assert_eq!(registry.lookup("noop").unwrap().meta.category, "test");
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut builder = ActionRegistryBuilder::new();
        builder.register("noop", noop, ActionMeta::default()).unwrap();
        assert_eq!(
            builder.register("noop", noop, ActionMeta::default()),
            Err(RegistryError::Duplicate("noop".into()))
        );
    }

    #[test]
    fn test_meta_builder() {
        let meta = ActionMeta::new("flow", "branch")
            .param("condition", ParamKind::Expression, "what to test")
            .optional("note", ParamKind::Text, "ignored")
            .pins(&["true", "false"]);
        assert_eq!(meta.params.len(), 2);
        assert!(meta.params[0].required);
        assert!(!meta.params[1].required);
        assert!(meta.declares_pin("true"));
        assert!(!meta.declares_pin("maybe"));
    }

    #[test]
    fn test_builtin_library_registers_core_actions() {
        let registry = ActionRegistryBuilder::with_builtin_actions().build();
        for name in ["wait", "set_data", "if", "state_transition", "flow_event", "log"] {
            assert!(registry.contains(name), "missing builtin '{}'", name);
        }
        let names = registry.names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}

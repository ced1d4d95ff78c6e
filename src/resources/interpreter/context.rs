//! What an action handler sees.
//!
//! Handlers receive an [`ActionContext`] (world access plus the run's
//! source/target) and the step's [`ActionParams`] after `&{...}`
//! substitution. They return an [`ActionOutcome`] or an [`ActionError`];
//! errors are contained by the interpreter and recorded as diagnostics.

use bevy_ecs::prelude::*;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;

use crate::components::mapposition::MapPosition;
use crate::components::signals::Signals;
use crate::components::statemachine::StateMachine;
use crate::resources::interpreter::runtime::run_sequence;
use crate::resources::interpreter::target::ResolvedTarget;
use crate::resources::interpreter::task::{RunHandle, TaskId, Wait};
use crate::resources::worldvariables::WorldVariables;
use crate::script::error::ExprError;
use crate::script::expr;
use crate::script::sequence::ActionSequence;
use crate::script::value::Value;

/// How a step finished.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutcome {
    /// Continue with the next step.
    Done,
    /// Continue at the step wired to this pin.
    Pin(String),
    /// Suspend the run until the wait is satisfied.
    Wait(Wait),
}

/// Errors a handler may return.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("missing parameter '{0}'")]
    MissingParam(String),
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },
    #[error("no target entity")]
    NoTarget,
    #[error("nothing named '{0}'")]
    NotFound(String),
    #[error("{entity:?} has no {component}")]
    MissingComponent {
        component: &'static str,
        entity: Entity,
    },
    #[error("'{0}' may only run in flow sequences")]
    FlowOnly(String),
    #[error(transparent)]
    Expression(#[from] ExprError),
    #[error("{0}")]
    Failed(String),
}

impl ActionError {
    /// Errors caused by an absent entity or component rather than bad input.
    pub fn is_missing_collaborator(&self) -> bool {
        matches!(
            self,
            ActionError::NoTarget | ActionError::NotFound(_) | ActionError::MissingComponent { .. }
        )
    }
}

/// Step parameters after substitution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionParams {
    values: FxHashMap<String, Value>,
    /// Names whose value came from a `&{...}` reference.
    substituted: FxHashSet<String>,
}

impl ActionParams {
    pub fn new(values: FxHashMap<String, Value>) -> Self {
        Self {
            values,
            substituted: FxHashSet::default(),
        }
    }

    /// Builder: mark parameters whose value was produced by substitution.
    pub fn with_substituted(mut self, names: FxHashSet<String>) -> Self {
        self.substituted = names;
        self
    }

    pub fn is_substituted(&self, name: &str) -> bool {
        self.substituted.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Any value rendered as text.
    pub fn str(&self, name: &str) -> Option<String> {
        self.values.get(name).map(Value::to_string)
    }

    pub fn require_str(&self, name: &str) -> Result<String, ActionError> {
        self.str(name)
            .ok_or_else(|| ActionError::MissingParam(name.to_string()))
    }

    pub fn number(&self, name: &str) -> Result<Option<f64>, ActionError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(v) => v.as_f64().map(Some).ok_or_else(|| ActionError::InvalidParam {
                name: name.to_string(),
                reason: format!("expected a number, got '{}'", v),
            }),
        }
    }

    pub fn require_number(&self, name: &str) -> Result<f64, ActionError> {
        self.number(name)?
            .ok_or_else(|| ActionError::MissingParam(name.to_string()))
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).map(Value::is_truthy)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

/// Execution context handed to every handler.
pub struct ActionContext<'w> {
    pub world: &'w mut World,
    pub task: TaskId,
    /// Entity the run executes on behalf of.
    pub source: Entity,
    /// The run's target entity, if any (e.g. the other party of a contact).
    pub target: Option<Entity>,
    /// This step's resolved `target=` parameter. Defaults to the source.
    pub resolved: ResolvedTarget,
    pub sequence: Arc<ActionSequence>,
    pub step: usize,
}

impl ActionContext<'_> {
    /// Read a variable path (`g.`, `f.`/`self.`, `t.` or unprefixed global).
    pub fn lookup(&self, path: &str) -> Option<Value> {
        lookup_variable(self.world, self.source, self.target, path)
    }

    pub fn store(&mut self, path: &str, value: Value) -> Result<(), ActionError> {
        store_variable(self.world, self.source, self.target, path, value)
    }

    /// Evaluate an expression against the run's variables.
    pub fn evaluate(&self, src: &str) -> Result<Value, ActionError> {
        self.eval_parsed(&expr::parse(src)?)
    }

    fn eval_parsed(&self, parsed: &expr::Expr) -> Result<Value, ActionError> {
        let world: &World = self.world;
        let (source, target) = (self.source, self.target);
        Ok(parsed.eval(&|path| lookup_variable(world, source, target, path))?)
    }

    /// Like [`evaluate_param`](Self::evaluate_param), but text that does not
    /// parse as an expression is returned verbatim.
    pub fn evaluate_or_text(&self, value: &Value) -> Result<Value, ActionError> {
        let Value::Text(src) = value else {
            return Ok(value.clone());
        };
        match expr::parse(src) {
            Ok(parsed) => self.eval_parsed(&parsed),
            Err(err) => {
                debug!("'{}' is not an expression ({}); kept as text", src, err);
                Ok(value.clone())
            }
        }
    }

    /// Evaluate a parameter: text is an expression, other values are literal.
    pub fn evaluate_param(&self, value: &Value) -> Result<Value, ActionError> {
        match value {
            Value::Text(src) => self.evaluate(src),
            other => Ok(other.clone()),
        }
    }

    /// Entities the step targets; fails when the target resolved to nothing.
    pub fn target_entities(&self) -> Result<SmallVec<[Entity; 4]>, ActionError> {
        match &self.resolved {
            ResolvedTarget::Entities(list) if !list.is_empty() => Ok(list.clone()),
            _ => Err(ActionError::NoTarget),
        }
    }

    /// Start a nested run owned by the source and return its wait.
    pub fn run_nested(&mut self, sequence: Arc<ActionSequence>) -> Wait {
        let handle: RunHandle = run_sequence(self.world, self.source, sequence, self.target);
        handle.wait()
    }
}

/// Split `prefix.rest` into a scope and key.
enum Scope<'a> {
    Global(&'a str),
    Source(&'a str),
    Target(&'a str),
}

fn scope_of(path: &str) -> Scope<'_> {
    match path.split_once('.') {
        Some(("g", key)) => Scope::Global(key),
        Some(("f" | "self", key)) => Scope::Source(key),
        Some(("t", key)) => Scope::Target(key),
        _ => Scope::Global(path),
    }
}

fn entity_value(world: &World, entity: Entity, key: &str) -> Option<Value> {
    if let Some(v) = world.get::<Signals>(entity).and_then(|s| s.get(key)) {
        return Some(v.clone());
    }
    // Built-in readouts when the signal store has no such key.
    match key {
        "x" => world.get::<MapPosition>(entity).map(|p| Value::from(p.x)),
        "y" => world.get::<MapPosition>(entity).map(|p| Value::from(p.y)),
        "state" => world
            .get::<StateMachine>(entity)
            .and_then(|sm| sm.current().map(Value::from)),
        _ => None,
    }
}

/// Resolve a variable path.
pub fn lookup_variable(
    world: &World,
    source: Entity,
    target: Option<Entity>,
    path: &str,
) -> Option<Value> {
    match scope_of(path) {
        Scope::Global(key) => world
            .get_resource::<WorldVariables>()
            .and_then(|vars| vars.get(key).cloned()),
        Scope::Source(key) => entity_value(world, source, key),
        Scope::Target(key) => target.and_then(|t| entity_value(world, t, key)),
    }
}

/// Write a variable path. Entity scopes get a [`Signals`] store on demand.
pub fn store_variable(
    world: &mut World,
    source: Entity,
    target: Option<Entity>,
    path: &str,
    value: Value,
) -> Result<(), ActionError> {
    let (entity, key) = match scope_of(path) {
        Scope::Global(key) => {
            world.get_resource_or_init::<WorldVariables>().set(key, value);
            return Ok(());
        }
        Scope::Source(key) => (source, key),
        Scope::Target(key) => (target.ok_or(ActionError::NoTarget)?, key),
    };
    let Ok(mut entity_mut) = world.get_entity_mut(entity) else {
        return Err(ActionError::NoTarget);
    };
    if let Some(mut signals) = entity_mut.get_mut::<Signals>() {
        signals.set(key, value);
    } else {
        debug!("adding Signals to {:?} for '{}'", entity, path);
        entity_mut.insert(Signals::default().with(key, value));
    }
    Ok(())
}

/// Replace `&{path}` references in a parameter value.
///
/// A value that is exactly one reference takes the variable's typed value;
/// embedded references are rendered as text. Unresolved paths become empty.
pub fn substitute(
    world: &World,
    source: Entity,
    target: Option<Entity>,
    value: &Value,
) -> Value {
    let Value::Text(text) = value else {
        return value.clone();
    };
    if !text.contains("&{") {
        return value.clone();
    }
    let trimmed = text.trim();
    if let Some(path) = trimmed
        .strip_prefix("&{")
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|path| !path.contains('}'))
    {
        return lookup_variable(world, source, target, path.trim())
            .unwrap_or_else(|| Value::Text(String::new()));
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    while let Some(start) = rest.find("&{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let path = after[..end].trim();
                if let Some(v) = lookup_variable(world, source, target, path) {
                    out.push_str(&v.to_string());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Value::Text(out)
}

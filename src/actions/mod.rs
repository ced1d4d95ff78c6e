//! Built-in action library.
//!
//! Each submodule contributes handlers and their [`ActionMeta`] to the
//! registry builder. Games add their own actions with
//! [`ActionRegistryBuilder::register`] before calling `build`.

use log::error;

use crate::resources::actionregistry::{ActionHandler, ActionMeta, ActionRegistryBuilder};

pub mod control;
pub mod entity;
pub mod presentation;
pub mod scene;
pub mod state;

/// Register every built-in action.
pub fn register_builtin(builder: &mut ActionRegistryBuilder) {
    control::register(builder);
    state::register(builder);
    entity::register(builder);
    scene::register(builder);
    presentation::register(builder);
}

pub(crate) fn add(
    builder: &mut ActionRegistryBuilder,
    name: &str,
    handler: ActionHandler,
    meta: ActionMeta,
) {
    if let Err(e) = builder.register(name, handler, meta) {
        error!("builtin action: {}", e);
    }
}

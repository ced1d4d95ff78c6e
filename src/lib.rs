//! actionflow library.
//!
//! This module exposes the runtime's script model, ECS components,
//! resources, systems, events and the built-in action library for use in
//! integration tests and by games embedding the interpreter.

pub mod actions;
pub mod catalog;
pub mod components;
pub mod content;
pub mod events;
pub mod game;
pub mod resources;
pub mod script;
pub mod systems;

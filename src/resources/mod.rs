//! ECS resources.
//!
//! Global state shared by systems and action handlers:
//! - [`actionregistry`] – immutable table of executable actions
//! - [`clockgate`] – the world-stopped flag and its propagation to scenes
//! - [`engineconfig`] – INI-backed runtime configuration
//! - [`flow`] – the application flow controller and its event queue
//! - [`interpreter`] – task table, scheduler and step execution
//! - [`presentation`] – text and overlay requests for the presentation collaborator
//! - [`worldtime`] – simulation clock
//! - [`worldvariables`] – global variable store
pub mod actionregistry;
pub mod clockgate;
pub mod engineconfig;
pub mod flow;
pub mod interpreter;
pub mod presentation;
pub mod worldtime;
pub mod worldvariables;

//! Runtime systems.
//!
//! Submodules overview
//! - [`behavior`] – autonomous behaviors and their arbitration observer
//! - [`flow`] – flow start, event handling and the queued event pass
//! - [`movement`] – integrate velocity by scene time scale, track facing
//! - [`scene`] – scene activation, pausing, unloading and time scale lookup
//! - [`statemachine`] – entity transitions, initial states and onUpdate runs
//! - [`time`] – advance the simulation clock
//! - [`triggers`] – deliver trigger kinds to entity bindings

pub mod behavior;
pub mod flow;
pub mod movement;
pub mod scene;
pub mod statemachine;
pub mod time;
pub mod triggers;

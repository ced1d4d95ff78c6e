//! Event types and observers.
//!
//! Events decouple the parts of the runtime: state machines announce
//! changes, behaviors broadcast claims, collaborators report contacts and
//! flow events. Observers living next to each event translate it into
//! trigger runs or queue entries.
//!
//! Submodules:
//! - [`behavior`] – [`BehaviorChanged`](behavior::BehaviorChanged) arbitration broadcast
//! - [`flow`] – flow events and flow state notifications
//! - [`statechanged`] – entity state machine commits
//! - [`trigger`] – trigger and contact delivery from collaborators
pub mod behavior;
pub mod flow;
pub mod statechanged;
pub mod trigger;

//! Requests for the presentation collaborator.
//!
//! Text boxes and overlays are drawn outside this crate. Actions push a
//! [`PresentationRequest`] and wait on a completion signal; the collaborator
//! drains the queue, shows things, and reports back with
//! [`acknowledge_text`] or by closing the overlay.

use bevy_ecs::prelude::*;
use log::debug;
use std::collections::VecDeque;

use crate::resources::interpreter::Interpreter;
use crate::systems::scene::{deactivate_scene, find_scenes};

/// Completion signal name for a text request.
pub fn text_ack_signal(token: u64) -> String {
    format!("text_ack:{}", token)
}

/// Completion signal name for an overlay.
pub fn overlay_closed_signal(scene: &str) -> String {
    format!("overlay_closed:{}", scene)
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresentationRequest {
    Text {
        token: u64,
        speaker: Option<String>,
        text: String,
    },
    Overlay {
        scene: String,
    },
}

#[derive(Resource, Debug, Default)]
pub struct PresentationQueue {
    pending: VecDeque<PresentationRequest>,
    next_token: u64,
    open_overlays: Vec<String>,
}

impl PresentationQueue {
    /// Queue a text box; returns the token to acknowledge it with.
    pub fn push_text(&mut self, speaker: Option<String>, text: impl Into<String>) -> u64 {
        self.next_token += 1;
        let token = self.next_token;
        self.pending.push_back(PresentationRequest::Text {
            token,
            speaker,
            text: text.into(),
        });
        token
    }

    pub fn push_overlay(&mut self, scene: impl Into<String>) {
        let scene = scene.into();
        if !self.open_overlays.contains(&scene) {
            self.open_overlays.push(scene.clone());
        }
        self.pending.push_back(PresentationRequest::Overlay { scene });
    }

    /// Forget an overlay; returns false if it was not open.
    pub fn close_overlay(&mut self, scene: &str) -> bool {
        let before = self.open_overlays.len();
        self.open_overlays.retain(|s| s != scene);
        before != self.open_overlays.len()
    }

    pub fn open_overlays(&self) -> &[String] {
        &self.open_overlays
    }

    /// Take every pending request.
    pub fn drain(&mut self) -> Vec<PresentationRequest> {
        self.pending.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Report that the text box with `token` was dismissed.
pub fn acknowledge_text(world: &mut World, token: u64) -> usize {
    debug!("text {} acknowledged", token);
    world
        .get_resource_mut::<Interpreter>()
        .map_or(0, |mut interp| interp.notify(&text_ack_signal(token)))
}

/// Close an overlay: deactivate its scenes, forget it, and wake every run
/// waiting for it to close. Returns the number of runs woken.
pub fn close_overlay(world: &mut World, scene: &str) -> usize {
    for entity in find_scenes(world, scene) {
        deactivate_scene(world, entity);
    }
    if let Some(mut queue) = world.get_resource_mut::<PresentationQueue>() {
        queue.close_overlay(scene);
    }
    world
        .get_resource_mut::<Interpreter>()
        .map_or(0, |mut interp| interp.notify(&overlay_closed_signal(scene)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_tokens_increase() {
        let mut queue = PresentationQueue::default();
        let a = queue.push_text(None, "hello");
        let b = queue.push_text(Some("guard".into()), "halt");
        assert!(b > a);
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
        assert_eq!(
            drained[1],
            PresentationRequest::Text {
                token: b,
                speaker: Some("guard".into()),
                text: "halt".into()
            }
        );
    }

    #[test]
    fn test_overlay_tracking() {
        let mut queue = PresentationQueue::default();
        queue.push_overlay("menu");
        queue.push_overlay("menu");
        assert_eq!(queue.open_overlays(), &["menu".to_string()]);
        assert!(queue.close_overlay("menu"));
        assert!(!queue.close_overlay("menu"));
    }

    #[test]
    fn test_signal_names() {
        assert_eq!(text_ack_signal(3), "text_ack:3");
        assert_eq!(overlay_closed_signal("menu"), "overlay_closed:menu");
    }
}

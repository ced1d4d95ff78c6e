//! Group and name tags used by target resolution.
//!
//! Scripts address entities symbolically: `player` resolves through the
//! `"player"` [`Group`], any other group id resolves to every member of that
//! group, and an [`EntityName`] lets authors target one specific entity.

use bevy_ecs::prelude::Component;

/// Group membership tag. Each entity belongs to at most one group.
#[derive(Component, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Group(pub String);

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Group(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Unique, author-facing entity name.
#[derive(Component, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityName(pub String);

impl EntityName {
    pub fn new(name: impl Into<String>) -> Self {
        EntityName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

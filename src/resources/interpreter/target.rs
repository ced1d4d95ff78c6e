//! `target=` parameter resolution.
//!
//! Resolution order: keyword (`source`/`self`, `target`, `player`), then
//! `"x,y"` coordinates, then group name, then entity name. Anything else
//! resolves to [`ResolvedTarget::None`].

use bevy_ecs::prelude::*;
use smallvec::{SmallVec, smallvec};

use crate::components::group::{EntityName, Group};

pub const PLAYER_GROUP: &str = "player";

#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedTarget {
    None,
    Entities(SmallVec<[Entity; 4]>),
    Point(f32, f32),
}

impl ResolvedTarget {
    pub fn single(entity: Entity) -> Self {
        ResolvedTarget::Entities(smallvec![entity])
    }

    pub fn first_entity(&self) -> Option<Entity> {
        match self {
            ResolvedTarget::Entities(list) => list.first().copied(),
            _ => None,
        }
    }
}

fn parse_point(spec: &str) -> Option<(f32, f32)> {
    let (x, y) = spec.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// Entities in `group`, ordered by entity index.
pub fn entities_in_group(world: &mut World, group: &str) -> SmallVec<[Entity; 4]> {
    let mut query = world.query::<(Entity, &Group)>();
    let mut found: SmallVec<[Entity; 4]> = query
        .iter(world)
        .filter(|(_, g)| g.name() == group)
        .map(|(e, _)| e)
        .collect();
    found.sort_by_key(|e| e.index_u32());
    found
}

/// Entities carrying `name`, ordered by entity index.
pub fn entities_named(world: &mut World, name: &str) -> SmallVec<[Entity; 4]> {
    let mut query = world.query::<(Entity, &EntityName)>();
    let mut found: SmallVec<[Entity; 4]> = query
        .iter(world)
        .filter(|(_, n)| n.as_str() == name)
        .map(|(e, _)| e)
        .collect();
    found.sort_by_key(|e| e.index_u32());
    found
}

/// Resolve a target specification for a step run by `source`.
pub fn resolve_target(
    world: &mut World,
    spec: &str,
    source: Entity,
    target: Option<Entity>,
) -> ResolvedTarget {
    let spec = spec.trim();
    match spec {
        "source" | "self" => return ResolvedTarget::single(source),
        "target" => {
            return match target {
                Some(t) => ResolvedTarget::single(t),
                None => ResolvedTarget::None,
            };
        }
        "" => return ResolvedTarget::None,
        _ => {}
    }
    if let Some((x, y)) = parse_point(spec) {
        return ResolvedTarget::Point(x, y);
    }
    let grouped = entities_in_group(world, spec);
    if !grouped.is_empty() {
        return ResolvedTarget::Entities(grouped);
    }
    let named = entities_named(world, spec);
    if !named.is_empty() {
        return ResolvedTarget::Entities(named);
    }
    ResolvedTarget::None
}

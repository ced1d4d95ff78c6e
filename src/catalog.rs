//! Action catalog generator for authoring tools.
//!
//! Serializes the metadata of every registered action (category,
//! description, parameter schema, output pins) into a deterministic JSON
//! document grouped by category. Editors use it to build node palettes and
//! validate tag text without linking against the runtime.

use serde::Serialize;
use std::path::Path;

use crate::resources::actionregistry::{ActionRegistry, ParamSpec};

/// Category display order for deterministic output. Unknown categories
/// follow in alphabetical order.
const CATEGORY_ORDER: &[&str] = &[
    "control",
    "data",
    "state",
    "flow",
    "entity",
    "scene",
    "presentation",
    "debug",
];

#[derive(Debug, Serialize)]
struct CatalogAction<'a> {
    name: &'a str,
    description: &'a str,
    params: &'a [ParamSpec],
    #[serde(skip_serializing_if = "no_pins")]
    pins: &'a [String],
}

fn no_pins(pins: &&[String]) -> bool {
    pins.is_empty()
}

#[derive(Debug, Serialize)]
struct CatalogCategory<'a> {
    category: &'a str,
    actions: Vec<CatalogAction<'a>>,
}

#[derive(Debug, Serialize)]
struct Catalog<'a> {
    version: &'static str,
    categories: Vec<CatalogCategory<'a>>,
}

fn category_rank(category: &str) -> (usize, &str) {
    let rank = CATEGORY_ORDER
        .iter()
        .position(|c| *c == category)
        .unwrap_or(CATEGORY_ORDER.len());
    (rank, category)
}

/// Build the catalog JSON for a registry.
pub fn generate_catalog(registry: &ActionRegistry) -> Result<String, String> {
    let mut categories: Vec<CatalogCategory<'_>> = Vec::new();
    // definitions() is sorted by name, so actions stay sorted per category.
    for def in registry.definitions() {
        let action = CatalogAction {
            name: &def.name,
            description: &def.meta.description,
            params: &def.meta.params,
            pins: &def.meta.pins,
        };
        match categories
            .iter_mut()
            .find(|c| c.category == def.meta.category)
        {
            Some(category) => category.actions.push(action),
            None => categories.push(CatalogCategory {
                category: &def.meta.category,
                actions: vec![action],
            }),
        }
    }
    categories.sort_by(|a, b| category_rank(a.category).cmp(&category_rank(b.category)));

    let catalog = Catalog {
        version: env!("CARGO_PKG_VERSION"),
        categories,
    };
    serde_json::to_string_pretty(&catalog).map_err(|e| format!("Failed to serialize catalog: {e}"))
}

/// Write catalog content to a file.
pub fn write_catalog(path: &Path, content: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    std::fs::write(path, content).map_err(|e| format!("Failed to write {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::actionregistry::ActionRegistryBuilder;

    #[test]
    fn test_catalog_lists_every_action_once() {
        let registry = ActionRegistryBuilder::with_builtin_actions().build();
        let json = generate_catalog(&registry).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let names: Vec<&str> = value["categories"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|c| c["actions"].as_array().unwrap().iter())
            .map(|a| a["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), registry.len());
        for name in registry.names() {
            assert!(names.contains(&name), "catalog misses '{}'", name);
        }
    }

    #[test]
    fn test_categories_follow_display_order() {
        let registry = ActionRegistryBuilder::with_builtin_actions().build();
        let json = generate_catalog(&registry).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let order: Vec<&str> = value["categories"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["category"].as_str().unwrap())
            .collect();
        assert_eq!(order.first(), Some(&"control"));
        assert_eq!(order.last(), Some(&"debug"));
    }

    #[test]
    fn test_if_declares_pins() {
        let registry = ActionRegistryBuilder::with_builtin_actions().build();
        let json = generate_catalog(&registry).unwrap();
        assert!(json.contains("\"true\""));
        assert!(json.contains("\"false\""));
    }
}

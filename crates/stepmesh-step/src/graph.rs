//! Indexed, read-only view of the data section.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, StepError};
use crate::parser::Entity;

/// All data-section entities with forward, reverse and per-type indexes.
///
/// Built once after parsing and never mutated, so it can be shared across
/// tessellation workers without locking.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    by_id: HashMap<u64, Entity>,
    adjacency: HashMap<u64, Vec<u64>>,
    reverse_adjacency: HashMap<u64, Vec<u64>>,
    by_type: HashMap<String, Vec<u64>>,
}

impl EntityGraph {
    /// Index entities given in file order. Fails on a repeated id.
    pub fn from_entities(entities: Vec<Entity>) -> Result<Self> {
        let mut graph = EntityGraph {
            by_id: HashMap::with_capacity(entities.len()),
            adjacency: HashMap::with_capacity(entities.len()),
            ..Default::default()
        };
        for entity in entities {
            let id = entity.id;
            if graph.by_id.contains_key(&id) {
                return Err(StepError::DuplicateEntity(id));
            }
            for name in entity.type_names() {
                graph.by_type.entry(name.to_string()).or_default().push(id);
            }
            for &target in &entity.refs {
                graph.reverse_adjacency.entry(target).or_default().push(id);
            }
            graph.adjacency.insert(id, entity.refs.clone());
            graph.by_id.insert(id, entity);
        }
        Ok(graph)
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the graph has no entities.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Look up an entity.
    pub fn get(&self, id: u64) -> Option<&Entity> {
        self.by_id.get(&id)
    }

    /// Look up an entity, failing with [`StepError::MissingEntity`].
    pub fn require(&self, id: u64) -> Result<&Entity> {
        self.by_id.get(&id).ok_or(StepError::MissingEntity(id))
    }

    /// All entities, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.by_id.values()
    }

    /// Ids referenced by `id`.
    pub fn references(&self, id: u64) -> &[u64] {
        self.adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of entities that reference `id`, in file order.
    pub fn referrers(&self, id: u64) -> &[u64] {
        self.reverse_adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of entities of (or with a complex part of) type `name`, in file order.
    pub fn ids_of_type(&self, name: &str) -> &[u64] {
        self.by_type.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entities of type `name`, in file order.
    pub fn entities_of_type<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.ids_of_type(name).iter().filter_map(|id| self.by_id.get(id))
    }

    /// Entity count per type name. Complex instances count under every part.
    pub fn type_counts(&self) -> BTreeMap<String, usize> {
        self.by_type
            .iter()
            .map(|(name, ids)| (name.clone(), ids.len()))
            .collect()
    }

    /// References whose target id is not defined, as `(from, to)` pairs
    /// sorted by source id.
    pub fn dangling_references(&self) -> Vec<(u64, u64)> {
        let mut dangling: Vec<(u64, u64)> = self
            .adjacency
            .iter()
            .flat_map(|(&from, targets)| targets.iter().map(move |&to| (from, to)))
            .filter(|(_, to)| !self.by_id.contains_key(to))
            .collect();
        dangling.sort_unstable();
        dangling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsedValue;

    fn point(id: u64) -> Entity {
        Entity::new(
            id,
            "CARTESIAN_POINT",
            vec![
                ParsedValue::Text(String::new()),
                ParsedValue::List(vec![ParsedValue::Number(0.0); 3]),
            ],
        )
    }

    fn vertex(id: u64, point: u64) -> Entity {
        Entity::new(
            id,
            "VERTEX_POINT",
            vec![ParsedValue::Text(String::new()), ParsedValue::Reference(point)],
        )
    }

    #[test]
    fn test_indexes() {
        let graph =
            EntityGraph::from_entities(vec![vertex(3, 1), point(1), vertex(2, 1), vertex(4, 9)]).unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.ids_of_type("VERTEX_POINT"), &[3, 2, 4]);
        assert_eq!(graph.referrers(1), &[3, 2]);
        assert_eq!(graph.references(4), &[9]);
        assert!(graph.referrers(3).is_empty());
        assert_eq!(graph.entities_of_type("CARTESIAN_POINT").count(), 1);
        assert_eq!(graph.type_counts().get("VERTEX_POINT"), Some(&3));
        assert_eq!(graph.dangling_references(), vec![(4, 9)]);
        assert!(matches!(graph.require(9), Err(StepError::MissingEntity(9))));
    }

    #[test]
    fn test_duplicate() {
        let err = EntityGraph::from_entities(vec![point(1), point(1)]).unwrap_err();
        assert!(matches!(err, StepError::DuplicateEntity(1)));
    }
}

//! Per-diagram arena of entities and relationships.
//!
//! The store is the single owner of a diagram's data: layouts write
//! positions and paths into it, the renderer reads from it and writes
//! routed paths back, and interaction mutates it during drags. Both tables
//! keep insertion order so every traversal is deterministic.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, warn};
use thiserror::Error;

use crate::{
    geometry::{Bounds, Point},
    identifier::{EntityId, RelationshipId},
    model::{VisualEntity, VisualRelationship},
};

/// Which end of a relationship a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole {
    Source,
    Target,
}

impl std::fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Target => f.write_str("target"),
        }
    }
}

/// A relationship references an entity id that is not in the diagram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("relationship `{relationship}` references missing {end} entity `{entity}`")]
pub struct MissingEntity {
    pub relationship: RelationshipId,
    pub entity: EntityId,
    pub end: EndpointRole,
}

/// Owned entities and relationships of one diagram.
#[derive(Debug, Clone, Default)]
pub struct DiagramStore {
    entities: IndexMap<EntityId, VisualEntity>,
    relationships: IndexMap<RelationshipId, VisualRelationship>,
    incidence: HashMap<EntityId, Vec<RelationshipId>>,
}

impl DiagramStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from input lists. Duplicate ids keep the first
    /// occurrence.
    pub fn from_parts(
        entities: impl IntoIterator<Item = VisualEntity>,
        relationships: impl IntoIterator<Item = VisualRelationship>,
    ) -> Self {
        let mut store = Self::new();
        for entity in entities {
            store.insert_entity(entity);
        }
        for relationship in relationships {
            store.insert_relationship(relationship);
        }
        debug!(
            entities = store.entities.len(),
            relationships = store.relationships.len();
            "Diagram store built"
        );
        store
    }

    /// Inserts an entity; returns false (and keeps the existing one) when the
    /// id is already taken.
    pub fn insert_entity(&mut self, entity: VisualEntity) -> bool {
        if self.entities.contains_key(entity.id()) {
            warn!(entity_id = entity.id().as_str(); "Duplicate entity id, keeping first");
            return false;
        }
        self.entities.insert(entity.id().clone(), entity);
        true
    }

    /// Inserts a relationship and indexes it under both endpoints. Dangling
    /// relationships are stored too; see [`Self::missing_endpoints`].
    pub fn insert_relationship(&mut self, relationship: VisualRelationship) -> bool {
        if self.relationships.contains_key(relationship.id()) {
            warn!(
                relationship_id = relationship.id().as_str();
                "Duplicate relationship id, keeping first"
            );
            return false;
        }

        let id = relationship.id().clone();
        self.incidence
            .entry(relationship.source().clone())
            .or_default()
            .push(id.clone());
        if !relationship.is_self_loop() {
            self.incidence
                .entry(relationship.target().clone())
                .or_default()
                .push(id.clone());
        }
        self.relationships.insert(id, relationship);
        true
    }

    pub fn entity(&self, id: &EntityId) -> Option<&VisualEntity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: &EntityId) -> Option<&mut VisualEntity> {
        self.entities.get_mut(id)
    }

    pub fn relationship(&self, id: &RelationshipId) -> Option<&VisualRelationship> {
        self.relationships.get(id)
    }

    pub fn relationship_mut(&mut self, id: &RelationshipId) -> Option<&mut VisualRelationship> {
        self.relationships.get_mut(id)
    }

    pub fn contains_entity(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn contains_relationship(&self, id: &RelationshipId) -> bool {
        self.relationships.contains_key(id)
    }

    /// Entities in input order.
    pub fn entities(&self) -> impl Iterator<Item = &VisualEntity> {
        self.entities.values()
    }

    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut VisualEntity> {
        self.entities.values_mut()
    }

    /// All relationships in input order, dangling ones included.
    pub fn relationships(&self) -> impl Iterator<Item = &VisualRelationship> {
        self.relationships.values()
    }

    pub fn relationships_mut(&mut self) -> impl Iterator<Item = &mut VisualRelationship> {
        self.relationships.values_mut()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Position of an entity in input order.
    pub fn entity_index(&self, id: &EntityId) -> Option<usize> {
        self.entities.get_index_of(id)
    }

    /// Returns the first missing endpoint of `relationship`, if any.
    pub fn check_endpoints(&self, relationship: &VisualRelationship) -> Option<MissingEntity> {
        if !self.contains_entity(relationship.source()) {
            return Some(MissingEntity {
                relationship: relationship.id().clone(),
                entity: relationship.source().clone(),
                end: EndpointRole::Source,
            });
        }
        if !self.contains_entity(relationship.target()) {
            return Some(MissingEntity {
                relationship: relationship.id().clone(),
                entity: relationship.target().clone(),
                end: EndpointRole::Target,
            });
        }
        None
    }

    /// Relationships whose endpoints both exist.
    pub fn resolved_relationships(&self) -> impl Iterator<Item = &VisualRelationship> {
        self.relationships
            .values()
            .filter(|relationship| self.check_endpoints(relationship).is_none())
    }

    /// One diagnostic per dangling relationship, in input order.
    pub fn missing_endpoints(&self) -> Vec<MissingEntity> {
        self.relationships
            .values()
            .filter_map(|relationship| self.check_endpoints(relationship))
            .collect()
    }

    /// Ids of relationships whose source or target is `entity`.
    pub fn incident_relationships(&self, entity: &EntityId) -> &[RelationshipId] {
        self.incidence
            .get(entity)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Moves an entity's top-left corner. Returns false for unknown ids.
    pub fn move_entity(&mut self, id: &EntityId, position: Point) -> bool {
        match self.entities.get_mut(id) {
            Some(entity) => {
                entity.set_position(position);
                true
            }
            None => false,
        }
    }

    /// Bounding box of the given entities, or `None` when none match.
    pub fn content_bounds(&self, mut include: impl FnMut(&VisualEntity) -> bool) -> Option<Bounds> {
        self.entities
            .values()
            .filter(|entity| include(entity))
            .map(VisualEntity::bounds)
            .reduce(|acc, bounds| acc.merge(&bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::Size,
        model::{EntityKind, RelationshipKind},
    };

    fn entity(id: &str) -> VisualEntity {
        VisualEntity::new(id, id.to_uppercase(), EntityKind::Table)
    }

    fn rel(id: &str, source: &str, target: &str) -> VisualRelationship {
        VisualRelationship::new(id, source, target, RelationshipKind::OneToMany)
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let first = entity("a");
        let mut second = entity("a");
        second.set_label("Replacement");

        let store = DiagramStore::from_parts([first, second], []);
        assert_eq!(store.entity_count(), 1);
        assert_eq!(store.entity(&"a".into()).unwrap().label(), "A");
    }

    #[test]
    fn test_incidence_index() {
        let store = DiagramStore::from_parts(
            [entity("a"), entity("b"), entity("c")],
            [rel("ab", "a", "b"), rel("bc", "b", "c"), rel("aa", "a", "a")],
        );

        let ids: Vec<_> = store
            .incident_relationships(&"a".into())
            .iter()
            .map(RelationshipId::as_str)
            .collect();
        assert_eq!(ids, vec!["ab", "aa"]);
        assert_eq!(store.incident_relationships(&"b".into()).len(), 2);
        assert!(store.incident_relationships(&"zzz".into()).is_empty());
    }

    #[test]
    fn test_missing_endpoints_reported_not_dropped() {
        let store = DiagramStore::from_parts(
            [entity("a")],
            [rel("dangling", "a", "missing"), rel("self", "a", "a")],
        );

        assert_eq!(store.relationship_count(), 2);
        assert_eq!(store.resolved_relationships().count(), 1);

        let missing = store.missing_endpoints();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].entity.as_str(), "missing");
        assert_eq!(missing[0].end, EndpointRole::Target);
        assert_eq!(
            missing[0].to_string(),
            "relationship `dangling` references missing target entity `missing`"
        );
    }

    #[test]
    fn test_content_bounds() {
        let mut a = entity("a");
        a.set_position(Point::new(0.0, 0.0));
        let mut b = entity("b");
        b.set_position(Point::new(300.0, 100.0));
        let b_size: Size = b.dimensions();

        let store = DiagramStore::from_parts([a, b], []);
        let bounds = store.content_bounds(|_| true).unwrap();
        assert_eq!(bounds.max_x(), 300.0 + b_size.width());
        assert_eq!(bounds.max_y(), 100.0 + b_size.height());

        let only_a = store.content_bounds(|e| e.id().as_str() == "a").unwrap();
        assert_eq!(only_a.min_point(), Point::new(0.0, 0.0));
        assert!(store.content_bounds(|_| false).is_none());
    }

    #[test]
    fn test_move_entity() {
        let mut store = DiagramStore::from_parts([entity("a")], []);
        assert!(store.move_entity(&"a".into(), Point::new(5.0, 6.0)));
        assert!(!store.move_entity(&"nope".into(), Point::new(5.0, 6.0)));
        assert_eq!(
            store.entity(&"a".into()).unwrap().position(),
            Point::new(5.0, 6.0)
        );
    }
}

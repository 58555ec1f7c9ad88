//! Routed geometry of a rendered diagram.
//!
//! A [`Scene`] holds one visual per entity and one routed path per
//! resolvable relationship. Paths run between the boundaries of the two
//! entity boxes rather than their centers, so arrow heads and cardinality
//! glyphs sit on the box outline.

use indexmap::IndexMap;
use log::{debug, trace, warn};

use schemascope_core::{
    geometry::{Bounds, Point, rectangle_boundary_point},
    identifier::{EntityId, RelationshipId},
    model::{DiagramStore, MissingEntity, RelationshipKind, VisualEntity, VisualRelationship},
};

/// Horizontal reach of a self-loop beyond the right edge of its entity.
const SELF_LOOP_REACH: f32 = 30.0;

/// Routed path of one relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipVisual {
    pub id: RelationshipId,
    pub source: EntityId,
    pub target: EntityId,
    pub kind: RelationshipKind,
    pub path: Vec<Point>,
}

impl RelationshipVisual {
    /// Point where the relationship label is placed.
    pub fn label_anchor(&self) -> Option<Point> {
        match self.path.as_slice() {
            [] => None,
            [only] => Some(*only),
            [first, last] => Some(first.midpoint(*last)),
            path => Some(path[path.len() / 2]),
        }
    }
}

/// Routes a relationship between two entity boxes.
///
/// - A self-loop leaves and re-enters the right edge of its entity.
/// - A relationship whose previous path has three or more points keeps a
///   bend halfway between the two boundary points.
/// - Everything else is a straight segment.
pub fn route_relationship(
    source: &VisualEntity,
    target: &VisualEntity,
    previous: &[Point],
) -> Vec<Point> {
    if source.id() == target.id() {
        return self_loop(source);
    }

    let source_center = source.center();
    let target_center = target.center();
    let start = rectangle_boundary_point(source_center, source.dimensions(), target_center);
    let end = rectangle_boundary_point(target_center, target.dimensions(), source_center);

    if previous.len() >= 3 {
        vec![start, start.midpoint(end), end]
    } else {
        vec![start, end]
    }
}

fn self_loop(entity: &VisualEntity) -> Vec<Point> {
    let bounds = entity.bounds();
    let center = bounds.center();
    let quarter = bounds.height() / 4.0;
    let right = bounds.max_x();

    vec![
        Point::new(right, center.y() - quarter),
        Point::new(right + SELF_LOOP_REACH, center.y() - quarter),
        Point::new(right + SELF_LOOP_REACH, center.y() + quarter),
        Point::new(right, center.y() + quarter),
    ]
}

/// Entity and relationship visuals keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    entities: IndexMap<EntityId, Bounds>,
    relationships: IndexMap<RelationshipId, RelationshipVisual>,
    skipped: Vec<MissingEntity>,
}

impl Scene {
    /// Builds the full scene and writes every routed path back to the store.
    ///
    /// Relationships with a missing endpoint are left out of the scene and
    /// reported by [`Scene::skipped`].
    pub fn build(store: &mut DiagramStore) -> Self {
        let mut scene = Self::default();

        for entity in store.entities() {
            scene.entities.insert(entity.id().clone(), entity.bounds());
        }

        for relationship in store.relationships() {
            if let Some(missing) = store.check_endpoints(relationship) {
                warn!(err:err = missing; "Skipping relationship");
                scene.skipped.push(missing);
                continue;
            }
            if let Some(visual) = Self::route(store, relationship) {
                scene.relationships.insert(visual.id.clone(), visual);
            }
        }

        for (id, visual) in &scene.relationships {
            if let Some(relationship) = store.relationship_mut(id) {
                relationship.set_path(visual.path.clone());
            }
        }

        debug!(
            entities = scene.entities.len(),
            relationships = scene.relationships.len(),
            skipped = scene.skipped.len();
            "Scene built"
        );
        scene
    }

    fn route(store: &DiagramStore, relationship: &VisualRelationship) -> Option<RelationshipVisual> {
        let source = store.entity(relationship.source())?;
        let target = store.entity(relationship.target())?;

        Some(RelationshipVisual {
            id: relationship.id().clone(),
            source: source.id().clone(),
            target: target.id().clone(),
            kind: relationship.kind(),
            path: route_relationship(source, target, relationship.path()),
        })
    }

    /// Re-routes only the relationships incident to `entity` after it moved.
    ///
    /// Returns the ids of the relationships whose path was updated, both in
    /// the scene and in the store. All other paths stay untouched.
    pub fn reroute_incident(
        &mut self,
        store: &mut DiagramStore,
        entity: &EntityId,
    ) -> Vec<RelationshipId> {
        let Some(moved) = store.entity(entity) else {
            return Vec::new();
        };
        self.entities.insert(entity.clone(), moved.bounds());

        let incident = store.incident_relationships(entity).to_vec();
        let mut updated = Vec::with_capacity(incident.len());

        for id in incident {
            let Some(visual) = store
                .relationship(&id)
                .filter(|relationship| store.check_endpoints(relationship).is_none())
                .and_then(|relationship| Self::route(store, relationship))
            else {
                continue;
            };

            if let Some(relationship) = store.relationship_mut(&id) {
                relationship.set_path(visual.path.clone());
            }
            self.relationships.insert(id.clone(), visual);
            updated.push(id);
        }

        trace!(entity:% = entity, updated = updated.len(); "Rerouted incident relationships");
        updated
    }

    /// Bounds of an entity as last routed.
    pub fn entity_bounds(&self, id: &EntityId) -> Option<Bounds> {
        self.entities.get(id).copied()
    }

    /// Entity ids in drawing order, bottom first.
    pub fn entity_ids(&self) -> impl DoubleEndedIterator<Item = &EntityId> {
        self.entities.keys()
    }

    pub fn relationship(&self, id: &RelationshipId) -> Option<&RelationshipVisual> {
        self.relationships.get(id)
    }

    /// Relationship visuals in drawing order, bottom first.
    pub fn relationships(&self) -> impl DoubleEndedIterator<Item = &RelationshipVisual> {
        self.relationships.values()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Relationships left out because an endpoint is missing.
    pub fn skipped(&self) -> &[MissingEntity] {
        &self.skipped
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use schemascope_core::model::{EntityKind, EntityProperty};

    use super::*;

    fn entity_at(id: &str, x: f32, y: f32) -> VisualEntity {
        let mut entity = VisualEntity::new(id, id.to_uppercase(), EntityKind::Table)
            .with_property(EntityProperty::new("id", "uuid").primary());
        entity.set_position(Point::new(x, y));
        entity
    }

    fn store() -> DiagramStore {
        DiagramStore::from_parts(
            [
                entity_at("a", 0.0, 0.0),
                entity_at("b", 400.0, 0.0),
                entity_at("c", 0.0, 300.0),
            ],
            [
                VisualRelationship::new("ab", "a", "b", RelationshipKind::OneToMany),
                VisualRelationship::new("ac", "a", "c", RelationshipKind::Reference),
                VisualRelationship::new("bc", "b", "c", RelationshipKind::Association),
            ],
        )
    }

    #[test]
    fn test_horizontal_path_runs_between_side_edges() {
        let mut store = store();
        let scene = Scene::build(&mut store);

        let a = store.entity(&"a".into()).unwrap().bounds();
        let b = store.entity(&"b".into()).unwrap().bounds();
        let path = &scene.relationship(&"ab".into()).unwrap().path;

        assert_eq!(path.len(), 2);
        assert_approx_eq!(f32, path[0].x(), a.max_x(), epsilon = 0.01);
        assert_approx_eq!(f32, path[0].y(), a.center().y(), epsilon = 0.01);
        assert_approx_eq!(f32, path[1].x(), b.min_x(), epsilon = 0.01);
    }

    #[test]
    fn test_vertical_path_runs_between_top_and_bottom_edges() {
        let mut store = store();
        let scene = Scene::build(&mut store);

        let a = store.entity(&"a".into()).unwrap().bounds();
        let c = store.entity(&"c".into()).unwrap().bounds();
        let path = &scene.relationship(&"ac".into()).unwrap().path;

        assert_approx_eq!(f32, path[0].y(), a.max_y(), epsilon = 0.01);
        assert_approx_eq!(f32, path[1].y(), c.min_y(), epsilon = 0.01);
    }

    #[test]
    fn test_build_writes_paths_back() {
        let mut store = store();
        let scene = Scene::build(&mut store);

        for visual in scene.relationships() {
            assert_eq!(store.relationship(&visual.id).unwrap().path(), visual.path);
        }
    }

    #[test]
    fn test_bend_is_kept_for_three_point_paths() {
        let mut store = store();
        store
            .relationship_mut(&"ab".into())
            .unwrap()
            .set_path(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 2.0)]);

        let scene = Scene::build(&mut store);
        let path = &scene.relationship(&"ab".into()).unwrap().path;
        assert_eq!(path.len(), 3);
        assert_eq!(path[1], path[0].midpoint(path[2]));
    }

    #[test]
    fn test_dangling_relationship_is_skipped() {
        let mut store = store();
        store.insert_relationship(VisualRelationship::new(
            "dangling",
            "a",
            "ghost",
            RelationshipKind::OneToOne,
        ));

        let scene = Scene::build(&mut store);
        assert_eq!(scene.relationship_count(), 3);
        assert_eq!(scene.skipped().len(), 1);
        assert_eq!(scene.skipped()[0].entity, EntityId::from("ghost"));
        assert!(store.relationship(&"dangling".into()).unwrap().path().is_empty());
    }

    #[test]
    fn test_self_loop_on_right_edge() {
        let mut store = DiagramStore::from_parts(
            [entity_at("a", 10.0, 10.0)],
            [VisualRelationship::new("aa", "a", "a", RelationshipKind::OneToMany)],
        );
        let scene = Scene::build(&mut store);
        let bounds = store.entity(&"a".into()).unwrap().bounds();
        let path = &scene.relationship(&"aa".into()).unwrap().path;

        assert_eq!(path.len(), 4);
        assert_eq!(path[0].x(), bounds.max_x());
        assert_eq!(path[3].x(), bounds.max_x());
        assert!(path[1].x() > bounds.max_x());
    }

    #[test]
    fn test_reroute_touches_only_incident_relationships() {
        let mut store = store();
        let mut scene = Scene::build(&mut store);
        let untouched = store.relationship(&"bc".into()).unwrap().path().to_vec();

        store.move_entity(&"a".into(), Point::new(-100.0, -50.0));
        let updated = scene.reroute_incident(&mut store, &"a".into());

        assert_eq!(updated, vec![RelationshipId::from("ab"), RelationshipId::from("ac")]);
        assert_eq!(store.relationship(&"bc".into()).unwrap().path(), untouched);
        assert_eq!(
            scene.entity_bounds(&"a".into()).unwrap().min_point(),
            Point::new(-100.0, -50.0)
        );
        let ab = store.relationship(&"ab".into()).unwrap().path();
        assert_eq!(ab, scene.relationship(&"ab".into()).unwrap().path);
    }

    #[test]
    fn test_label_anchor() {
        let visual = RelationshipVisual {
            id: "r".into(),
            source: "a".into(),
            target: "b".into(),
            kind: RelationshipKind::OneToOne,
            path: vec![Point::new(0.0, 0.0), Point::new(10.0, 20.0)],
        };
        assert_eq!(visual.label_anchor(), Some(Point::new(5.0, 10.0)));
    }
}

//! Layout of schema diagrams.
//!
//! A layout never touches the [`DiagramStore`] directly. The store is first
//! projected into a [`LayoutGraph`] (entity sizes plus the relationships
//! whose endpoints both exist), the layout computes a [`LayoutResult`] from
//! that projection, and the result is then applied back to the store. This
//! keeps layouts free of borrows while they yield, and lets the caller drop
//! a result that arrives after the diagram was destroyed or updated.

mod engines;

use indexmap::IndexMap;
use log::{debug, warn};

use schemascope_core::{
    geometry::{Point, Size},
    identifier::{EntityId, RelationshipId},
    model::{DiagramStore, LayoutOptions, MissingEntity, RelationshipKind},
};

pub use engines::{
    CircularLayout, FORCE_YIELD_BATCH, ForceLayout, HierarchicalLayout, Layout, LayoutRegistry,
};

/// Metadata key under which the hierarchical level of an entity is stored.
pub const LEVEL_METADATA_KEY: &str = "layout.level";

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: EntityId,
    pub size: Size,
}

/// A relationship with both endpoints resolved to node indices.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEdge {
    pub id: RelationshipId,
    pub source: usize,
    pub target: usize,
    pub kind: RelationshipKind,
}

impl LayoutEdge {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Owned snapshot of the parts of a diagram a layout needs.
#[derive(Debug, Clone, Default)]
pub struct LayoutGraph {
    nodes: Vec<LayoutNode>,
    edges: Vec<LayoutEdge>,
    skipped: Vec<MissingEntity>,
}

impl LayoutGraph {
    /// Projects a store. Relationships with a missing endpoint are left out
    /// and reported through [`Self::skipped`].
    pub fn from_store(store: &DiagramStore) -> Self {
        let nodes: Vec<LayoutNode> = store
            .entities()
            .map(|entity| LayoutNode {
                id: entity.id().clone(),
                size: entity.dimensions(),
            })
            .collect();

        let mut edges = Vec::new();
        let mut skipped = Vec::new();
        for relationship in store.relationships() {
            if let Some(missing) = store.check_endpoints(relationship) {
                warn!(
                    relationship_id = missing.relationship.as_str(),
                    entity_id = missing.entity.as_str(),
                    end:% = missing.end;
                    "Skipping relationship with missing endpoint"
                );
                skipped.push(missing);
                continue;
            }

            // Both lookups succeed once the endpoints are known to exist
            if let (Some(source), Some(target)) = (
                store.entity_index(relationship.source()),
                store.entity_index(relationship.target()),
            ) {
                edges.push(LayoutEdge {
                    id: relationship.id().clone(),
                    source,
                    target,
                    kind: relationship.kind(),
                });
            }
        }

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            skipped = skipped.len();
            "Layout graph projected"
        );

        Self {
            nodes,
            edges,
            skipped,
        }
    }

    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[LayoutEdge] {
        &self.edges
    }

    /// Relationships left out because an endpoint is missing.
    pub fn skipped(&self) -> &[MissingEntity] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Positions (top-left corners), relationship paths and optional hierarchy
/// levels produced by a layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    positions: IndexMap<EntityId, Point>,
    paths: IndexMap<RelationshipId, Vec<Point>>,
    levels: IndexMap<EntityId, usize>,
}

impl LayoutResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a result from per-node center points, with straight
    /// center-to-center paths for every edge.
    pub fn from_centers(graph: &LayoutGraph, centers: &[Point]) -> Self {
        let mut result = Self::new();
        for (node, center) in graph.nodes().iter().zip(centers) {
            result
                .positions
                .insert(node.id.clone(), center.sub_point(node.size.half()));
        }
        for edge in graph.edges() {
            result
                .paths
                .insert(edge.id.clone(), vec![centers[edge.source], centers[edge.target]]);
        }
        result
    }

    pub fn set_position(&mut self, id: EntityId, top_left: Point) {
        self.positions.insert(id, top_left);
    }

    pub fn set_path(&mut self, id: RelationshipId, path: Vec<Point>) {
        self.paths.insert(id, path);
    }

    pub fn set_level(&mut self, id: EntityId, level: usize) {
        self.levels.insert(id, level);
    }

    pub fn position(&self, id: &EntityId) -> Option<Point> {
        self.positions.get(id).copied()
    }

    pub fn path(&self, id: &RelationshipId) -> Option<&[Point]> {
        self.paths.get(id).map(Vec::as_slice)
    }

    pub fn level(&self, id: &EntityId) -> Option<usize> {
        self.levels.get(id).copied()
    }

    pub fn positions(&self) -> impl Iterator<Item = (&EntityId, Point)> {
        self.positions.iter().map(|(id, point)| (id, *point))
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Writes positions, paths and levels into `store`. Ids the store does
    /// not know are ignored.
    pub fn apply(&self, store: &mut DiagramStore) {
        for (id, position) in &self.positions {
            store.move_entity(id, *position);
        }
        for (id, path) in &self.paths {
            if let Some(relationship) = store.relationship_mut(id) {
                relationship.set_path(path.clone());
            }
        }
        for (id, level) in &self.levels {
            if let Some(entity) = store.entity_mut(id) {
                entity.set_metadata(LEVEL_METADATA_KEY, level.to_string());
            }
        }
    }
}

/// Runs `layout` over a store the caller owns: project, lay out, apply.
///
/// An empty store is left untouched. Returns the relationships that were
/// skipped because an endpoint is missing.
pub async fn calculate_positions(
    layout: &dyn Layout,
    store: &mut DiagramStore,
    options: &LayoutOptions,
) -> Vec<MissingEntity> {
    let graph = LayoutGraph::from_store(store);
    if graph.is_empty() {
        debug!(layout = layout.name(); "No entities to lay out");
        return graph.skipped;
    }

    let result = layout.calculate_positions(&graph, options).await;
    result.apply(store);
    graph.skipped
}

#[cfg(test)]
mod tests {
    use schemascope_core::model::{EntityKind, VisualEntity, VisualRelationship};

    use super::*;

    fn store() -> DiagramStore {
        DiagramStore::from_parts(
            [
                VisualEntity::new("a", "A", EntityKind::Table),
                VisualEntity::new("b", "B", EntityKind::Table),
            ],
            [
                VisualRelationship::new("ab", "a", "b", RelationshipKind::OneToMany),
                VisualRelationship::new("ax", "a", "x", RelationshipKind::Reference),
            ],
        )
    }

    #[test]
    fn test_projection_skips_dangling_relationships() {
        let graph = LayoutGraph::from_store(&store());

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edges()[0].source, 0);
        assert_eq!(graph.edges()[0].target, 1);
        assert_eq!(graph.skipped().len(), 1);
        assert_eq!(graph.skipped()[0].relationship.as_str(), "ax");
    }

    #[test]
    fn test_result_from_centers_and_apply() {
        let mut store = store();
        let graph = LayoutGraph::from_store(&store);
        let centers = [Point::new(100.0, 100.0), Point::new(400.0, 100.0)];

        let mut result = LayoutResult::from_centers(&graph, &centers);
        result.set_level("b".into(), 1);
        result.apply(&mut store);

        let a = store.entity(&"a".into()).unwrap();
        assert_eq!(a.center(), Point::new(100.0, 100.0));
        let b = store.entity(&"b".into()).unwrap();
        assert_eq!(b.metadata().get(LEVEL_METADATA_KEY).map(String::as_str), Some("1"));

        let ab = store.relationship(&"ab".into()).unwrap();
        assert_eq!(ab.path(), &centers);
        assert!(store.relationship(&"ax".into()).unwrap().path().is_empty());
    }

    #[tokio::test]
    async fn test_calculate_positions_on_empty_store_is_noop() {
        let mut store = DiagramStore::from_parts(
            [],
            [VisualRelationship::new("r", "a", "b", RelationshipKind::Reference)],
        );
        let skipped =
            calculate_positions(&ForceLayout::new(), &mut store, &LayoutOptions::default()).await;

        assert_eq!(skipped.len(), 1);
        assert!(store.relationship(&"r".into()).unwrap().path().is_empty());
    }
}

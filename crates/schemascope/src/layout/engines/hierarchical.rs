//! Hierarchical layout engine
//!
//! Builds a parent → child graph from the relationships, assigns every
//! entity a level, orders each level with a barycenter pass and stacks the
//! levels along the configured direction.
//!
//! Parent and child per relationship kind:
//!
//! | Kind | Parent |
//! |------|--------|
//! | composition, aggregation | source |
//! | inheritance | target (the supertype) |
//! | anything else, `TB`/`LR` | source |
//! | anything else, `BT`/`RL` | target |

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use log::{debug, trace};
use petgraph::{
    Direction as EdgeDirection,
    graph::{DiGraph, EdgeIndex, NodeIndex},
    visit::EdgeRef,
};

use schemascope_core::{
    geometry::{Point, Size},
    model::{Direction, HierarchyRole, LayoutOptions},
};

use crate::layout::{LayoutEdge, LayoutGraph, LayoutResult, engines::Layout};

/// Hierarchical layout engine
#[derive(Debug, Default)]
pub struct Engine;

impl Engine {
    /// Create a new hierarchical layout engine
    pub fn new() -> Self {
        Self
    }
}

/// Returns `(parent, child)` node indices for an edge.
fn parent_child(edge: &LayoutEdge, direction: Direction) -> (usize, usize) {
    match edge.kind.hierarchy_role() {
        HierarchyRole::SourceIsParent => (edge.source, edge.target),
        HierarchyRole::TargetIsParent => (edge.target, edge.source),
        HierarchyRole::FollowsDirection if direction.is_reversed() => (edge.target, edge.source),
        HierarchyRole::FollowsDirection => (edge.source, edge.target),
    }
}

/// Parent → child graph over node indices. Node `i` of the layout graph is
/// `NodeIndex::new(i)` here.
///
/// Entities without any parent or child are attached below the first root
/// that has children, or below the first root when none has, so the result
/// is one connected hierarchy.
fn build_hierarchy(graph: &LayoutGraph, direction: Direction) -> DiGraph<usize, ()> {
    let mut hierarchy = DiGraph::with_capacity(graph.node_count(), graph.edges().len());
    for i in 0..graph.node_count() {
        hierarchy.add_node(i);
    }

    for edge in graph.edges() {
        if edge.is_self_loop() {
            continue;
        }
        let (parent, child) = parent_child(edge, direction);
        hierarchy.update_edge(NodeIndex::new(parent), NodeIndex::new(child), ());
    }

    let has_parent = |idx: NodeIndex, h: &DiGraph<usize, ()>| {
        h.neighbors_directed(idx, EdgeDirection::Incoming)
            .next()
            .is_some()
    };
    let has_children = |idx: NodeIndex, h: &DiGraph<usize, ()>| {
        h.neighbors_directed(idx, EdgeDirection::Outgoing)
            .next()
            .is_some()
    };

    let isolated: Vec<NodeIndex> = hierarchy
        .node_indices()
        .filter(|&idx| !has_parent(idx, &hierarchy) && !has_children(idx, &hierarchy))
        .collect();
    if isolated.is_empty() {
        return hierarchy;
    }

    let anchor = hierarchy
        .node_indices()
        .find(|&idx| !has_parent(idx, &hierarchy) && has_children(idx, &hierarchy))
        .unwrap_or(isolated[0]);

    for idx in isolated {
        if idx != anchor {
            hierarchy.add_edge(anchor, idx, ());
        }
    }

    hierarchy
}

/// Edges that close a cycle, found by a depth-first walk from `roots`.
/// Also returns which nodes the walk reached.
fn find_back_edges(
    hierarchy: &DiGraph<usize, ()>,
    roots: &[NodeIndex],
) -> (HashSet<EdgeIndex>, Vec<bool>) {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        OnStack,
        Done,
    }

    let outgoing = |node: NodeIndex| -> Vec<(EdgeIndex, NodeIndex)> {
        hierarchy
            .edges(node)
            .map(|edge| (edge.id(), edge.target()))
            .collect()
    };

    let mut marks = vec![Mark::New; hierarchy.node_count()];
    let mut back_edges = HashSet::new();

    for &root in roots {
        if marks[root.index()] != Mark::New {
            continue;
        }
        marks[root.index()] = Mark::OnStack;
        let mut stack = vec![(root, outgoing(root))];

        while let Some((node, pending)) = stack.last_mut() {
            let node = *node;
            match pending.pop() {
                Some((edge, child)) => match marks[child.index()] {
                    Mark::New => {
                        marks[child.index()] = Mark::OnStack;
                        stack.push((child, outgoing(child)));
                    }
                    Mark::OnStack => {
                        back_edges.insert(edge);
                    }
                    Mark::Done => {}
                },
                None => {
                    marks[node.index()] = Mark::Done;
                    stack.pop();
                }
            }
        }
    }

    let reached = marks.into_iter().map(|mark| mark != Mark::New).collect();
    (back_edges, reached)
}

/// Level of every node: roots are 0, a child sits one below its deepest
/// parent. Nodes the walk from the roots cannot reach stay at 0.
fn assign_levels(hierarchy: &DiGraph<usize, ()>) -> Vec<usize> {
    let node_count = hierarchy.node_count();
    let mut roots: Vec<NodeIndex> = hierarchy
        .node_indices()
        .filter(|&idx| {
            hierarchy
                .neighbors_directed(idx, EdgeDirection::Incoming)
                .next()
                .is_none()
        })
        .collect();
    if roots.is_empty() && node_count > 0 {
        // Everything sits on a cycle; start from the first entity
        roots.push(NodeIndex::new(0));
    }

    let (back_edges, reached) = find_back_edges(hierarchy, &roots);

    let mut indegree = vec![0usize; node_count];
    for edge in hierarchy.edge_references() {
        if reached[edge.source().index()] && !back_edges.contains(&edge.id()) {
            indegree[edge.target().index()] += 1;
        }
    }

    let mut levels = vec![0usize; node_count];
    let mut queue: VecDeque<NodeIndex> = roots
        .into_iter()
        .filter(|root| indegree[root.index()] == 0)
        .collect();

    while let Some(node) = queue.pop_front() {
        for edge in hierarchy.edges(node) {
            if back_edges.contains(&edge.id()) {
                continue;
            }
            let child = edge.target().index();
            levels[child] = levels[child].max(levels[node.index()] + 1);
            indegree[child] -= 1;
            if indegree[child] == 0 {
                queue.push_back(edge.target());
            }
        }
    }

    levels
}

/// Mean order-axis center of the already placed neighbours of `node`.
fn barycenter(
    hierarchy: &DiGraph<usize, ()>,
    node: usize,
    order_centers: &[Option<f32>],
) -> Option<f32> {
    let placed: Vec<f32> = hierarchy
        .neighbors_undirected(NodeIndex::new(node))
        .filter_map(|neighbor| order_centers[neighbor.index()])
        .collect();
    if placed.is_empty() {
        None
    } else {
        Some(placed.iter().sum::<f32>() / placed.len() as f32)
    }
}

/// Extent of a node along the order axis.
fn order_extent(size: Size, direction: Direction) -> f32 {
    if direction.is_vertical() {
        size.width()
    } else {
        size.height()
    }
}

#[async_trait(?Send)]
impl Layout for Engine {
    fn name(&self) -> &str {
        "hierarchical"
    }

    async fn calculate_positions(
        &self,
        graph: &LayoutGraph,
        options: &LayoutOptions,
    ) -> LayoutResult {
        if graph.is_empty() {
            return LayoutResult::new();
        }

        let settings = &options.hierarchical;
        let direction = settings.direction;
        let nodes = graph.nodes();

        let hierarchy = build_hierarchy(graph, direction);
        let levels = assign_levels(&hierarchy);
        let level_count = levels.iter().copied().max().unwrap_or(0) + 1;

        debug!(
            nodes = nodes.len(),
            levels = level_count,
            direction:% = direction;
            "Hierarchy built"
        );

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); level_count];
        for (node, &level) in levels.iter().enumerate() {
            members[level].push(node);
        }

        let mut order_centers: Vec<Option<f32>> = vec![None; nodes.len()];
        for (level, level_members) in members.iter_mut().enumerate() {
            // Unplaced-neighbour nodes first, then by barycenter, then input order
            let mut keyed: Vec<(Option<f32>, usize)> = level_members
                .iter()
                .map(|&node| (barycenter(&hierarchy, node, &order_centers), node))
                .collect();
            keyed.sort_by(|(a_bary, a_idx), (b_bary, b_idx)| {
                a_bary
                    .is_some()
                    .cmp(&b_bary.is_some())
                    .then_with(|| a_bary.unwrap_or(0.0).total_cmp(&b_bary.unwrap_or(0.0)))
                    .then_with(|| a_idx.cmp(b_idx))
            });
            *level_members = keyed.into_iter().map(|(_, node)| node).collect();

            let extents: Vec<f32> = level_members
                .iter()
                .map(|&node| order_extent(nodes[node].size, direction))
                .collect();
            let total = extents.iter().sum::<f32>()
                + settings.node_distance * extents.len().saturating_sub(1) as f32;

            let mut cursor = -total / 2.0;
            for (&node, extent) in level_members.iter().zip(&extents) {
                order_centers[node] = Some(cursor + extent / 2.0);
                cursor += extent + settings.node_distance;
            }

            trace!(level = level, members = level_members.len(); "Level ordered");
            tokio::task::yield_now().await;
        }

        // Leading edges of each level sit on its level line
        let mut top_lefts: Vec<Point> = Vec::with_capacity(nodes.len());
        for (node, &level) in levels.iter().enumerate() {
            let size = nodes[node].size;
            let mut level_coord = level as f32 * settings.level_distance;
            if direction.is_reversed() {
                level_coord = -level_coord;
            }
            let order_center = order_centers[node].unwrap_or(0.0);

            let top_left = if direction.is_vertical() {
                Point::new(order_center - size.width() / 2.0, level_coord)
            } else {
                Point::new(level_coord, order_center - size.height() / 2.0)
            };
            top_lefts.push(top_left);
        }

        // Center the whole hierarchy on the canvas
        let (min, max) = nodes.iter().zip(&top_lefts).fold(
            (Point::new(f32::MAX, f32::MAX), Point::new(f32::MIN, f32::MIN)),
            |(min, max), (node, top_left)| {
                let bottom_right = top_left.add_point(Point::new(
                    node.size.width(),
                    node.size.height(),
                ));
                (
                    Point::new(min.x().min(top_left.x()), min.y().min(top_left.y())),
                    Point::new(
                        max.x().max(bottom_right.x()),
                        max.y().max(bottom_right.y()),
                    ),
                )
            },
        );
        let offset = options.canvas_center().sub_point(min.midpoint(max));

        let mut result = LayoutResult::new();
        let mut centers = Vec::with_capacity(nodes.len());
        for ((node, top_left), &level) in nodes.iter().zip(&top_lefts).zip(&levels) {
            let top_left = top_left.add_point(offset);
            result.set_position(node.id.clone(), top_left);
            result.set_level(node.id.clone(), level);
            centers.push(top_left.add_point(node.size.half()));
        }

        for edge in graph.edges() {
            let source = centers[edge.source];
            let target = centers[edge.target];
            result.set_path(edge.id.clone(), vec![source, source.midpoint(target), target]);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use schemascope_core::model::{
        DiagramStore, EntityKind, EntityProperty, HierarchicalOptionsPatch, LayoutOptionsPatch,
        RelationshipKind, VisualEntity, VisualRelationship,
    };

    use super::*;

    fn entity(id: &str) -> VisualEntity {
        VisualEntity::new(id, id.to_uppercase(), EntityKind::Table)
    }

    fn rel(id: &str, source: &str, target: &str, kind: RelationshipKind) -> VisualRelationship {
        VisualRelationship::new(id, source, target, kind)
    }

    fn options(direction: Direction) -> LayoutOptions {
        LayoutOptions::default().merged(&LayoutOptionsPatch {
            hierarchical: Some(HierarchicalOptionsPatch {
                direction: Some(direction),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    async fn run(
        entities: Vec<VisualEntity>,
        relationships: Vec<VisualRelationship>,
        options: &LayoutOptions,
    ) -> (LayoutGraph, LayoutResult) {
        let graph = LayoutGraph::from_store(&DiagramStore::from_parts(entities, relationships));
        let result = Engine::new().calculate_positions(&graph, options).await;
        (graph, result)
    }

    #[tokio::test]
    async fn test_single_entity_centered_at_level_zero() {
        let options = LayoutOptions::default();
        let (graph, result) = run(vec![entity("a")], vec![], &options).await;

        let a = &graph.nodes()[0];
        let center = result.position(&a.id).unwrap().add_point(a.size.half());
        assert_eq!(result.level(&a.id), Some(0));
        assert_approx_eq!(f32, center.x(), options.width / 2.0);
        assert_approx_eq!(f32, center.y(), options.height / 2.0);
    }

    #[tokio::test]
    async fn test_composition_puts_target_one_level_below() {
        let options = options(Direction::TB);
        let (_, result) = run(
            vec![entity("a"), entity("b")],
            vec![rel("ab", "a", "b", RelationshipKind::Composition)],
            &options,
        )
        .await;

        assert_eq!(result.level(&"a".into()), Some(0));
        assert_eq!(result.level(&"b".into()), Some(1));
        let a = result.position(&"a".into()).unwrap();
        let b = result.position(&"b".into()).unwrap();
        assert_approx_eq!(f32, b.y(), a.y() + options.hierarchical.level_distance, epsilon = 0.01);
    }

    #[tokio::test]
    async fn test_inheritance_puts_supertype_on_top() {
        let (_, result) = run(
            vec![entity("dog"), entity("animal")],
            vec![rel("isa", "dog", "animal", RelationshipKind::Inheritance)],
            &options(Direction::TB),
        )
        .await;

        assert_eq!(result.level(&"animal".into()), Some(0));
        assert_eq!(result.level(&"dog".into()), Some(1));
    }

    #[tokio::test]
    async fn test_direction_decides_parent_for_plain_kinds() {
        let entities = || vec![entity("a"), entity("b")];
        let rels = || vec![rel("ab", "a", "b", RelationshipKind::OneToMany)];

        let (_, top_down) = run(entities(), rels(), &options(Direction::TB)).await;
        assert_eq!(top_down.level(&"a".into()), Some(0));

        let (_, bottom_up) = run(entities(), rels(), &options(Direction::BT)).await;
        assert_eq!(bottom_up.level(&"b".into()), Some(0));
        assert_eq!(bottom_up.level(&"a".into()), Some(1));
        let a = bottom_up.position(&"a".into()).unwrap();
        let b = bottom_up.position(&"b".into()).unwrap();
        assert!(a.y() < b.y(), "BT stacks levels upward");
    }

    #[tokio::test]
    async fn test_left_to_right_stacks_levels_horizontally() {
        let options = options(Direction::LR);
        let (_, result) = run(
            vec![entity("a"), entity("b")],
            vec![rel("ab", "a", "b", RelationshipKind::Reference)],
            &options,
        )
        .await;

        let a = result.position(&"a".into()).unwrap();
        let b = result.position(&"b".into()).unwrap();
        assert_approx_eq!(f32, b.x(), a.x() + options.hierarchical.level_distance, epsilon = 0.01);
    }

    #[tokio::test]
    async fn test_multi_parent_node_sinks_to_deepest_parent() {
        // a -> b -> c and a -> c: c must be below b
        let (_, result) = run(
            vec![entity("a"), entity("b"), entity("c")],
            vec![
                rel("ab", "a", "b", RelationshipKind::Composition),
                rel("bc", "b", "c", RelationshipKind::Composition),
                rel("ac", "a", "c", RelationshipKind::Composition),
            ],
            &options(Direction::TB),
        )
        .await;

        assert_eq!(result.level(&"c".into()), Some(2));
    }

    #[tokio::test]
    async fn test_isolated_entities_attach_below_root_with_children() {
        let (_, result) = run(
            vec![entity("lonely"), entity("a"), entity("b")],
            vec![rel("ab", "a", "b", RelationshipKind::Composition)],
            &options(Direction::TB),
        )
        .await;

        assert_eq!(result.level(&"a".into()), Some(0));
        assert_eq!(result.level(&"lonely".into()), Some(1));
    }

    #[tokio::test]
    async fn test_cycle_terminates_with_finite_levels() {
        let (_, result) = run(
            vec![entity("a"), entity("b"), entity("c")],
            vec![
                rel("ab", "a", "b", RelationshipKind::Composition),
                rel("bc", "b", "c", RelationshipKind::Composition),
                rel("ca", "c", "a", RelationshipKind::Composition),
            ],
            &options(Direction::TB),
        )
        .await;

        assert_eq!(result.level(&"a".into()), Some(0));
        assert_eq!(result.level(&"b".into()), Some(1));
        assert_eq!(result.level(&"c".into()), Some(2));
    }

    #[tokio::test]
    async fn test_barycenter_orders_children_under_parents() {
        // Two parents, each with one child; children listed in reverse order
        let (_, result) = run(
            vec![
                entity("p1"),
                entity("p2"),
                entity("c2"),
                entity("c1"),
            ],
            vec![
                rel("p1c1", "p1", "c1", RelationshipKind::Composition),
                rel("p2c2", "p2", "c2", RelationshipKind::Composition),
            ],
            &options(Direction::TB),
        )
        .await;

        let p1 = result.position(&"p1".into()).unwrap();
        let p2 = result.position(&"p2".into()).unwrap();
        let c1 = result.position(&"c1".into()).unwrap();
        let c2 = result.position(&"c2".into()).unwrap();
        assert!(p1.x() < p2.x());
        assert!(c1.x() < c2.x(), "children follow their parents' order");
    }

    #[tokio::test]
    async fn test_paths_have_three_points() {
        let (graph, result) = run(
            vec![entity("a"), entity("b")],
            vec![rel("ab", "a", "b", RelationshipKind::Aggregation)],
            &options(Direction::TB),
        )
        .await;

        let path = result.path(&graph.edges()[0].id).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[1], path[0].midpoint(path[2]));
    }

    #[tokio::test]
    async fn test_same_level_boxes_keep_node_distance() {
        let wide = entity("wide").with_property(EntityProperty::new(
            "an_exceptionally_long_column_name",
            "varchar(1024)",
        ));
        let options = options(Direction::TB);
        let (graph, result) = run(
            vec![entity("root"), wide, entity("narrow")],
            vec![
                rel("r1", "root", "wide", RelationshipKind::Composition),
                rel("r2", "root", "narrow", RelationshipKind::Composition),
            ],
            &options,
        )
        .await;

        let wide_node = &graph.nodes()[1];
        let wide_pos = result.position(&wide_node.id).unwrap();
        let narrow_pos = result.position(&"narrow".into()).unwrap();
        assert_approx_eq!(
            f32,
            narrow_pos.x() - (wide_pos.x() + wide_node.size.width()),
            options.hierarchical.node_distance,
            epsilon = 0.01
        );
    }
}

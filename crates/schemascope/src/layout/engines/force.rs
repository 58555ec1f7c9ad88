//! Force-directed layout engine
//!
//! Entities are point charges that repel each other, relationships are
//! springs pulling their endpoints toward a rest length. The simulation
//! runs a fixed number of steps; there is no convergence check, so the
//! output depends only on the input order, the options and the seed.

use async_trait::async_trait;
use log::debug;
use rand::{Rng, SeedableRng, rngs::StdRng};

use schemascope_core::{geometry::Point, model::LayoutOptions};

use crate::layout::{LayoutGraph, LayoutResult, engines::Layout};

/// Number of simulation steps between two cooperative yields.
pub const FORCE_YIELD_BATCH: usize = 25;

/// Force layout engine
///
/// The repulsion strength, spring rest length, step count, damping and seed
/// come from [`ForceOptions`](schemascope_core::model::ForceOptions) on each
/// call; the engine itself only carries the tuning constants below.
pub struct Engine {
    spring_constant: f32,
    // Extra clearance added to the size-derived minimum distance
    padding: f32,
    // Upper bound of the displacement of a node in one step
    max_step: f32,
    jitter: f32,
}

impl Engine {
    /// Create a new force layout engine
    pub fn new() -> Self {
        Self {
            spring_constant: 0.05,
            padding: 40.0,
            max_step: 50.0,
            jitter: 20.0,
        }
    }

    /// Place nodes on a grid with seeded jitter
    fn initialize_positions(&self, graph: &LayoutGraph, distance: f32, seed: u64) -> Vec<Point> {
        let mut rng = StdRng::seed_from_u64(seed);

        let largest = graph
            .nodes()
            .iter()
            .map(|node| node.size.width().max(node.size.height()))
            .fold(0.0, f32::max);
        let cell_size = distance.max(largest + self.padding);
        let grid_size = (graph.node_count() as f32).sqrt().ceil().max(1.0) as usize;

        (0..graph.node_count())
            .map(|i| {
                let row = i / grid_size;
                let col = i % grid_size;
                let base = Point::new(col as f32 * cell_size, row as f32 * cell_size);

                let jitter = Point::new(
                    rng.random_range(-self.jitter..self.jitter),
                    rng.random_range(-self.jitter..self.jitter),
                );
                base.add_point(jitter)
            })
            .collect()
    }

    /// One simulation step; returns nothing, mutates positions and velocities.
    fn step(
        &self,
        graph: &LayoutGraph,
        options: &LayoutOptions,
        positions: &mut [Point],
        velocities: &mut [Point],
    ) {
        let force_options = &options.force;
        let nodes = graph.nodes();
        let mut forces = vec![Point::default(); nodes.len()];

        // Repulsion between every pair
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let trans = positions[i].sub_point(positions[j]);
                let size_i = nodes[i].size;
                let size_j = nodes[j].size;
                let min_dist = (size_i.width() + size_j.width() + size_i.height() + size_j.height())
                    / 4.0
                    + self.padding;

                // Avoid division by zero
                let distance = trans.hypot().max(1.0);
                let direction = if trans.is_zero() {
                    // Coincident nodes: push apart along a fixed axis
                    Point::new(1.0, 0.0)
                } else {
                    trans.scale(1.0 / distance)
                };

                // Stronger repulsion when boxes are too close
                let magnitude = if distance < min_dist {
                    force_options.strength * (min_dist / distance).powi(2) / min_dist
                } else {
                    force_options.strength / distance
                };

                let force = direction.scale(magnitude);
                forces[i] = forces[i].add_point(force);
                forces[j] = forces[j].sub_point(force);
            }
        }

        // Springs along relationships
        for edge in graph.edges() {
            if edge.is_self_loop() {
                continue;
            }
            let delta = positions[edge.target].sub_point(positions[edge.source]);
            let distance = delta.hypot().max(1.0);
            let magnitude = self.spring_constant * (distance - force_options.distance);
            let force = delta.scale(magnitude / distance);

            forces[edge.source] = forces[edge.source].add_point(force);
            forces[edge.target] = forces[edge.target].sub_point(force);
        }

        for ((position, velocity), force) in positions
            .iter_mut()
            .zip(velocities.iter_mut())
            .zip(forces)
        {
            let mut next = velocity.add_point(force).scale(force_options.damping);
            if !next.is_finite() {
                next = Point::default();
            }
            let speed = next.hypot();
            if speed > self.max_step {
                next = next.scale(self.max_step / speed);
            }
            *velocity = next;
            *position = position.add_point(next);
        }
    }

    /// Shift all centers so the bounding box of the boxes sits on the canvas midpoint
    fn center_on_canvas(&self, graph: &LayoutGraph, options: &LayoutOptions, centers: &mut [Point]) {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;

        for (node, center) in graph.nodes().iter().zip(centers.iter()) {
            let half = node.size.half();
            min_x = min_x.min(center.x() - half.x());
            min_y = min_y.min(center.y() - half.y());
            max_x = max_x.max(center.x() + half.x());
            max_y = max_y.max(center.y() + half.y());
        }

        let current = Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
        let offset = options.canvas_center().sub_point(current);
        for center in centers.iter_mut() {
            *center = center.add_point(offset);
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Layout for Engine {
    fn name(&self) -> &str {
        "force"
    }

    async fn calculate_positions(
        &self,
        graph: &LayoutGraph,
        options: &LayoutOptions,
    ) -> LayoutResult {
        if graph.is_empty() {
            return LayoutResult::new();
        }

        let force_options = &options.force;
        debug!(
            nodes = graph.node_count(),
            edges = graph.edges().len(),
            iterations = force_options.iterations;
            "Running force simulation"
        );

        let mut positions =
            self.initialize_positions(graph, force_options.distance, force_options.seed);
        let mut velocities = vec![Point::default(); positions.len()];

        for iteration in 0..force_options.iterations {
            self.step(graph, options, &mut positions, &mut velocities);

            if (iteration + 1) % FORCE_YIELD_BATCH == 0 {
                tokio::task::yield_now().await;
            }
        }

        self.center_on_canvas(graph, options, &mut positions);
        LayoutResult::from_centers(graph, &positions)
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use schemascope_core::model::{
        DiagramStore, EntityKind, ForceOptionsPatch, LayoutOptionsPatch, RelationshipKind,
        VisualEntity, VisualRelationship,
    };

    use super::*;

    fn graph(count: usize, chain: bool) -> LayoutGraph {
        let entities: Vec<_> = (0..count)
            .map(|i| VisualEntity::new(format!("e{i}"), format!("E{i}"), EntityKind::Table))
            .collect();
        let relationships: Vec<_> = if chain {
            (1..count)
                .map(|i| {
                    VisualRelationship::new(
                        format!("r{i}"),
                        format!("e{}", i - 1),
                        format!("e{i}"),
                        RelationshipKind::OneToMany,
                    )
                })
                .collect()
        } else {
            Vec::new()
        };
        LayoutGraph::from_store(&DiagramStore::from_parts(entities, relationships))
    }

    fn options(iterations: usize, seed: u64) -> LayoutOptions {
        LayoutOptions::default().merged(&LayoutOptionsPatch {
            force: Some(ForceOptionsPatch {
                iterations: Some(iterations),
                seed: Some(seed),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_empty_graph_gives_empty_result() {
        let result = Engine::new()
            .calculate_positions(&LayoutGraph::default(), &LayoutOptions::default())
            .await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_same_seed_is_reproducible() {
        let graph = graph(6, true);
        let engine = Engine::new();

        let first = engine.calculate_positions(&graph, &options(60, 7)).await;
        let second = engine.calculate_positions(&graph, &options(60, 7)).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_layout_is_centered_on_canvas() {
        let graph = graph(5, true);
        let options = options(100, 1);
        let result = Engine::new().calculate_positions(&graph, &options).await;

        let mut min_x = f32::MAX;
        let mut max_x = f32::MIN;
        let mut min_y = f32::MAX;
        let mut max_y = f32::MIN;
        for node in graph.nodes() {
            let top_left = result.position(&node.id).unwrap();
            min_x = min_x.min(top_left.x());
            min_y = min_y.min(top_left.y());
            max_x = max_x.max(top_left.x() + node.size.width());
            max_y = max_y.max(top_left.y() + node.size.height());
        }

        assert_approx_eq!(f32, (min_x + max_x) / 2.0, options.width / 2.0, epsilon = 0.01);
        assert_approx_eq!(f32, (min_y + max_y) / 2.0, options.height / 2.0, epsilon = 0.01);
    }

    #[tokio::test]
    async fn test_unconnected_nodes_are_pushed_apart() {
        let graph = graph(2, false);
        let result = Engine::new().calculate_positions(&graph, &options(200, 3)).await;

        let a = result.position(&"e0".into()).unwrap();
        let b = result.position(&"e1".into()).unwrap();
        let size = graph.nodes()[0].size;
        let gap_x = (a.x() - b.x()).abs() - size.width();
        let gap_y = (a.y() - b.y()).abs() - size.height();
        assert!(gap_x > 0.0 || gap_y > 0.0, "boxes overlap: {a:?} {b:?}");
    }

    #[tokio::test]
    async fn test_paths_connect_centers() {
        let graph = graph(3, true);
        let result = Engine::new().calculate_positions(&graph, &options(30, 5)).await;

        let path = result.path(&"r1".into()).unwrap();
        assert_eq!(path.len(), 2);
        let source_center = result
            .position(&"e0".into())
            .unwrap()
            .add_point(graph.nodes()[0].size.half());
        assert_approx_eq!(f32, path[0].x(), source_center.x(), epsilon = 0.01);
        assert_approx_eq!(f32, path[0].y(), source_center.y(), epsilon = 0.01);
    }

    #[tokio::test]
    async fn test_zero_iterations_keeps_grid() {
        let graph = graph(4, false);
        let result = Engine::new().calculate_positions(&graph, &options(0, 9)).await;
        assert_eq!(result.positions().count(), 4);
    }
}

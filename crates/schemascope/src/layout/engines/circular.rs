//! Circular layout engine
//!
//! Entities are spread at equal angular steps around a ring centered on
//! the canvas. Angles are in radians and grow clockwise on screen, since
//! the y axis points down.

use async_trait::async_trait;
use log::debug;

use schemascope_core::{geometry::Point, model::LayoutOptions};

use crate::layout::{LayoutGraph, LayoutResult, engines::Layout};

/// Circular layout engine
#[derive(Debug, Default)]
pub struct Engine;

impl Engine {
    /// Create a new circular layout engine
    pub fn new() -> Self {
        Self
    }

    /// Center point of the `index`-th of `count` entities.
    fn ring_point(index: usize, count: usize, options: &LayoutOptions) -> Point {
        let circular = &options.circular;
        let step = (circular.end_angle - circular.start_angle) / count as f32;
        let angle = circular.start_angle + index as f32 * step;

        options
            .canvas_center()
            .add_point(Point::new(angle.cos(), angle.sin()).scale(circular.radius))
    }
}

#[async_trait(?Send)]
impl Layout for Engine {
    fn name(&self) -> &str {
        "circular"
    }

    async fn calculate_positions(
        &self,
        graph: &LayoutGraph,
        options: &LayoutOptions,
    ) -> LayoutResult {
        let count = graph.node_count();
        if count == 0 {
            return LayoutResult::new();
        }

        debug!(
            nodes = count,
            radius = options.circular.radius;
            "Placing entities on a ring"
        );

        let centers: Vec<Point> = if count == 1 {
            // A ring of one is its center
            vec![options.canvas_center()]
        } else {
            (0..count)
                .map(|index| Self::ring_point(index, count, options))
                .collect()
        };

        tokio::task::yield_now().await;
        LayoutResult::from_centers(graph, &centers)
    }
}

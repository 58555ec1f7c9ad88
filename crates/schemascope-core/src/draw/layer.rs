//! Z-ordered layers of a rendered diagram.
//!
//! Renderers walk entities and relationships in store order, but the
//! document needs relationship paths under entity boxes and selection
//! outlines above everything. Nodes are tagged with a [`RenderLayer`] as
//! they are produced and [`LayeredOutput::render`] emits one group per
//! layer, bottom first.
//!
//! ```
//! # use schemascope_core::draw::{LayeredOutput, RenderLayer};
//! # use svg::node::element::{Path, Rectangle};
//! let mut output = LayeredOutput::new();
//! output.add_to_layer(RenderLayer::Entity, Box::new(Rectangle::new()));
//! output.add_to_layer(RenderLayer::Relationship, Box::new(Path::new()));
//!
//! let groups = output.render();
//! assert_eq!(groups.len(), 2);
//! assert!(groups[0].to_string().contains(r#"data-layer="relationships""#));
//! ```

use std::collections::BTreeMap;

use svg::node::element::Group;

pub type SvgNode = Box<dyn svg::Node>;

/// Rendering layers, bottom first. `Ord` follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderLayer {
    /// Relationship paths and their end markers
    Relationship,
    /// Entity boxes, headers and property rows
    Entity,
    /// Relationship labels
    Label,
    /// Selection outlines
    Selection,
}

impl RenderLayer {
    /// Value of the group's `data-layer` attribute.
    pub fn name(self) -> &'static str {
        match self {
            Self::Relationship => "relationships",
            Self::Entity => "entities",
            Self::Label => "labels",
            Self::Selection => "selection",
        }
    }
}

/// SVG nodes collected per layer.
#[derive(Debug, Default)]
pub struct LayeredOutput {
    layers: BTreeMap<RenderLayer, Vec<SvgNode>>,
}

impl LayeredOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_layer(&mut self, layer: RenderLayer, node: SvgNode) {
        self.layers.entry(layer).or_default().push(node);
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Number of nodes on `layer`.
    pub fn layer_len(&self, layer: RenderLayer) -> usize {
        self.layers.get(&layer).map_or(0, Vec::len)
    }

    /// One `<g data-layer="...">` per non-empty layer, bottom first. Nodes
    /// keep their insertion order inside a layer.
    pub fn render(self) -> Vec<SvgNode> {
        self.layers
            .into_iter()
            .map(|(layer, nodes)| {
                let group = nodes
                    .into_iter()
                    .fold(Group::new().set("data-layer", layer.name()), Group::add);
                Box::new(group) as SvgNode
            })
            .collect()
    }
}

//! Layout engine registry
//!
//! Layouts are looked up by name at diagram generation time. The registry
//! ships with the three built-in strategies and accepts new ones at
//! runtime through [`LayoutRegistry::register`].

mod circular;
mod force;
mod hierarchical;

use std::{fmt, rc::Rc};

use async_trait::async_trait;
use indexmap::IndexMap;
use log::debug;

use schemascope_core::model::LayoutOptions;

use crate::{
    error::DiagramError,
    layout::{LayoutGraph, LayoutResult},
};

pub use circular::Engine as CircularLayout;
pub use force::{Engine as ForceLayout, FORCE_YIELD_BATCH};
pub use hierarchical::Engine as HierarchicalLayout;

/// Trait implemented by every layout strategy.
///
/// Implementations must return an empty result for an empty graph and
/// must yield to the executor between batches of work so long layouts do
/// not starve input handling.
#[async_trait(?Send)]
pub trait Layout {
    /// Registry name of the layout, e.g. `"force"`.
    fn name(&self) -> &str;

    /// Calculate positions for every node and paths for every edge.
    ///
    /// - `graph`: the projected diagram; dangling relationships are already removed
    /// - `options`: the full layout configuration; each layout reads its own section
    async fn calculate_positions(&self, graph: &LayoutGraph, options: &LayoutOptions)
    -> LayoutResult;
}

/// Name → layout mapping.
#[derive(Clone)]
pub struct LayoutRegistry {
    layouts: IndexMap<String, Rc<dyn Layout>>,
}

impl LayoutRegistry {
    /// Creates a registry without any layouts.
    pub fn empty() -> Self {
        Self {
            layouts: IndexMap::new(),
        }
    }

    /// Creates a registry with `force`, `hierarchical` and `circular`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Rc::new(ForceLayout::new()));
        registry.register(Rc::new(HierarchicalLayout::new()));
        registry.register(Rc::new(CircularLayout::new()));
        registry
    }

    /// Registers a layout under its own name, replacing any previous layout
    /// with that name.
    pub fn register(&mut self, layout: Rc<dyn Layout>) -> Option<Rc<dyn Layout>> {
        let name = layout.name().to_string();
        debug!(layout = name.as_str(); "Registering layout");
        self.layouts.insert(name, layout)
    }

    /// Looks a layout up by name.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Configuration`] for an unknown name.
    pub fn get(&self, name: &str) -> Result<Rc<dyn Layout>, DiagramError> {
        self.layouts.get(name).cloned().ok_or_else(|| {
            DiagramError::Configuration(format!(
                "unknown layout `{name}`, available: {}",
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layouts.keys().map(String::as_str)
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LayoutRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

//! Data model shared by layouts, renderers and the interaction layer.
//!
//! - [`VisualEntity`] / [`VisualRelationship`]: nodes and edges of a schema diagram
//! - [`LayoutOptions`]: per-strategy layout configuration with partial updates
//! - [`InteractionState`]: zoom/pan transform, selection, visibility and highlights
//! - [`DiagramStore`]: the per-diagram arena that owns entities and relationships

mod entity;
mod options;
mod relationship;
mod state;
mod store;

pub use entity::{
    EntityFlags, EntityKind, EntityProperty, HEADER_HEIGHT, HORIZONTAL_PADDING, ROW_FONT_SIZE,
    ROW_HEIGHT, TITLE_FONT_SIZE, VisualEntity, measure_text,
};
pub use options::{
    CircularOptions, CircularOptionsPatch, Direction, ForceOptions, ForceOptionsPatch,
    HierarchicalOptions, HierarchicalOptionsPatch, LayoutOptions, LayoutOptionsPatch,
};
pub use relationship::{Cardinality, HierarchyRole, RelationshipKind, VisualRelationship};
pub use state::{InteractionState, Selection, ViewTransform};
pub use store::{DiagramStore, EndpointRole, MissingEntity};

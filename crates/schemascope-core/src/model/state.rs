//! Live interaction state of a diagram session.

use indexmap::IndexSet;
use serde::Serialize;

use crate::{
    geometry::Point,
    identifier::{EntityId, RelationshipId},
};

/// Zoom and pan applied to the whole scene: `screen = diagram * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewTransform {
    scale: f32,
    translate: Point,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate: Point::default(),
        }
    }
}

impl ViewTransform {
    pub fn new(scale: f32, translate: Point) -> Self {
        Self { scale, translate }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn translate(&self) -> Point {
        self.translate
    }

    pub fn to_screen(&self, point: Point) -> Point {
        point.scale(self.scale).add_point(self.translate)
    }

    pub fn to_diagram(&self, point: Point) -> Point {
        point.sub_point(self.translate).scale(1.0 / self.scale)
    }

    /// Shifts the view by a screen-space delta.
    pub fn pan_by(&mut self, delta: Point) {
        self.translate = self.translate.add_point(delta);
    }

    /// Sets a new scale while keeping the diagram point under the screen
    /// point `anchor` fixed.
    pub fn zoom_about(&mut self, scale: f32, anchor: Point) {
        let fixed = self.to_diagram(anchor);
        self.scale = scale;
        self.translate = anchor.sub_point(fixed.scale(scale));
    }

    /// SVG `transform` attribute value.
    pub fn to_svg_value(&self) -> String {
        format!(
            "translate({},{}) scale({})",
            self.translate.x(),
            self.translate.y(),
            self.scale
        )
    }
}

/// A snapshot of the selected ids, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub entities: Vec<EntityId>,
    pub relationships: Vec<RelationshipId>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

/// Zoom/pan plus the selected, hidden and highlighted element sets.
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    transform: ViewTransform,
    selected_entities: IndexSet<EntityId>,
    selected_relationships: IndexSet<RelationshipId>,
    hidden_entities: IndexSet<EntityId>,
    highlighted_entities: IndexSet<EntityId>,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn transform_mut(&mut self) -> &mut ViewTransform {
        &mut self.transform
    }

    pub fn set_transform(&mut self, transform: ViewTransform) {
        self.transform = transform;
    }

    pub fn selection(&self) -> Selection {
        Selection {
            entities: self.selected_entities.iter().cloned().collect(),
            relationships: self.selected_relationships.iter().cloned().collect(),
        }
    }

    pub fn is_entity_selected(&self, id: &EntityId) -> bool {
        self.selected_entities.contains(id)
    }

    pub fn is_relationship_selected(&self, id: &RelationshipId) -> bool {
        self.selected_relationships.contains(id)
    }

    /// Replaces the selection with exactly one entity.
    pub fn select_only_entity(&mut self, id: EntityId) {
        self.clear_selection();
        self.selected_entities.insert(id);
    }

    /// Replaces the selection with exactly one relationship.
    pub fn select_only_relationship(&mut self, id: RelationshipId) {
        self.clear_selection();
        self.selected_relationships.insert(id);
    }

    /// Toggles an entity in or out of the selection; returns the new state.
    pub fn toggle_entity(&mut self, id: EntityId) -> bool {
        if self.selected_entities.shift_remove(&id) {
            false
        } else {
            self.selected_entities.insert(id);
            true
        }
    }

    /// Toggles a relationship in or out of the selection; returns the new state.
    pub fn toggle_relationship(&mut self, id: RelationshipId) -> bool {
        if self.selected_relationships.shift_remove(&id) {
            false
        } else {
            self.selected_relationships.insert(id);
            true
        }
    }

    pub fn add_entities(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.selected_entities.extend(ids);
    }

    pub fn add_relationships(&mut self, ids: impl IntoIterator<Item = RelationshipId>) {
        self.selected_relationships.extend(ids);
    }

    pub fn clear_selection(&mut self) {
        self.selected_entities.clear();
        self.selected_relationships.clear();
    }

    /// Drops selected, hidden and highlighted ids for which `keep` is false.
    pub fn retain_entities(&mut self, keep: impl Fn(&EntityId) -> bool) {
        self.selected_entities.retain(|id| keep(id));
        self.hidden_entities.retain(|id| keep(id));
        self.highlighted_entities.retain(|id| keep(id));
    }

    pub fn retain_relationships(&mut self, keep: impl Fn(&RelationshipId) -> bool) {
        self.selected_relationships.retain(|id| keep(id));
    }

    pub fn is_hidden(&self, id: &EntityId) -> bool {
        self.hidden_entities.contains(id)
    }

    pub fn hidden_entities(&self) -> impl Iterator<Item = &EntityId> {
        self.hidden_entities.iter()
    }

    pub fn set_hidden(&mut self, id: EntityId, hidden: bool) {
        if hidden {
            self.hidden_entities.insert(id);
        } else {
            self.hidden_entities.shift_remove(&id);
        }
    }

    pub fn is_highlighted(&self, id: &EntityId) -> bool {
        self.highlighted_entities.contains(id)
    }

    pub fn highlighted_entities(&self) -> impl Iterator<Item = &EntityId> {
        self.highlighted_entities.iter()
    }

    /// Replaces the highlighted set.
    pub fn set_highlighted(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.highlighted_entities = ids.into_iter().collect();
    }

    /// Back to identity transform with every set empty.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

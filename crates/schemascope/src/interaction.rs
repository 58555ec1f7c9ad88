//! Pointer, wheel and keyboard handling.
//!
//! The host forwards raw input as [`InputEvent`]s. The [`InteractionHandler`]
//! hit-tests them against the current scene, mutates the interaction state
//! and the store, and returns the events to publish. It never publishes by
//! itself so the caller can release its borrows first.

use indexmap::IndexMap;
use log::{debug, trace};

use schemascope_core::{
    geometry::{Point, distance_to_polyline},
    identifier::{EntityId, RelationshipId},
    model::{DiagramStore, InteractionState, VisualEntity},
};

use crate::{config::InteractionConfig, events::Event, render::Scene};

/// Identifies one pointer (mouse, pen or touch contact).
pub type PointerId = u32;

/// Modifier keys held during a click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::default()
        }
    }

    /// Ctrl or Cmd turn a click into a selection toggle.
    pub fn toggles_selection(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Raw input in screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Click { point: Point, modifiers: Modifiers },
    DoubleClick { point: Point },
    PointerDown { pointer: PointerId, point: Point },
    PointerMove { pointer: PointerId, point: Point },
    PointerUp { pointer: PointerId, point: Point },
    /// Positive `delta` zooms out, negative zooms in.
    Wheel { point: Point, delta: f32 },
    /// Key name as reported by the host, e.g. `"Delete"` or `"Escape"`.
    KeyDown { key: String },
}

/// What an input landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    Entity(EntityId),
    Relationship(RelationshipId),
}

/// Result of handling one input event.
#[derive(Debug, Default, PartialEq)]
pub struct Outcome {
    /// Events to publish, in order.
    pub events: Vec<Event>,
    /// Whether the document must be drawn again.
    pub redraw: bool,
}

impl Outcome {
    fn none() -> Self {
        Self::default()
    }

    fn push(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// Mutable parts of a diagram session an input may touch.
pub struct InteractionContext<'a> {
    pub store: &'a mut DiagramStore,
    pub scene: &'a mut Scene,
    pub state: &'a mut InteractionState,
}

fn is_visible(entity: &VisualEntity, state: &InteractionState) -> bool {
    entity.flags().visible && !state.is_hidden(entity.id())
}

/// Finds the topmost element under a diagram-space point.
///
/// Entities win over relationships; among entities the last drawn wins.
/// `tolerance` is the maximum distance, in diagram units, between the
/// point and a relationship path.
pub fn hit_test(
    store: &DiagramStore,
    scene: &Scene,
    state: &InteractionState,
    point: Point,
    tolerance: f32,
) -> Option<Hit> {
    let entity = scene.entity_ids().rev().find(|id| {
        store
            .entity(id)
            .is_some_and(|entity| is_visible(entity, state) && entity.bounds().contains(point))
    });
    if let Some(id) = entity {
        return Some(Hit::Entity(id.clone()));
    }

    scene
        .relationships()
        .rev()
        .filter(|visual| {
            [&visual.source, &visual.target]
                .into_iter()
                .all(|id| store.entity(id).is_some_and(|entity| is_visible(entity, state)))
        })
        .find(|visual| distance_to_polyline(point, &visual.path) <= tolerance)
        .map(|visual| Hit::Relationship(visual.id.clone()))
}

/// Copies selection, highlight and visibility from the interaction state
/// into the flags of the stored elements.
pub(crate) fn sync_flags(store: &mut DiagramStore, state: &InteractionState) {
    for entity in store.entities_mut() {
        let id = entity.id().clone();
        entity.set_selected(state.is_entity_selected(&id));
        entity.set_highlighted(state.is_highlighted(&id));
        entity.set_visible(!state.is_hidden(&id));
    }
    for relationship in store.relationships_mut() {
        let selected = state.is_relationship_selected(relationship.id());
        relationship.set_selected(selected);
    }
}

#[derive(Debug, Clone)]
struct Drag {
    entity: EntityId,
    // Pointer position relative to the entity's top-left corner
    grab_offset: Point,
}

/// Tracks drags and pans across pointer events.
#[derive(Debug, Default)]
pub struct InteractionHandler {
    config: InteractionConfig,
    drags: IndexMap<PointerId, Drag>,
    pans: IndexMap<PointerId, Point>,
}

impl InteractionHandler {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            drags: IndexMap::new(),
            pans: IndexMap::new(),
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    /// Entity currently dragged by `pointer`, if any.
    pub fn dragged_entity(&self, pointer: PointerId) -> Option<&EntityId> {
        self.drags.get(&pointer).map(|drag| &drag.entity)
    }

    /// Forgets all drags and pans.
    pub fn reset(&mut self) {
        self.drags.clear();
        self.pans.clear();
    }

    /// Handles one input event.
    pub fn handle(&mut self, input: InputEvent, cx: InteractionContext<'_>) -> Outcome {
        trace!(input:? = input; "Handling input");
        match input {
            InputEvent::Click { point, modifiers } => self.click(cx, point, modifiers),
            InputEvent::DoubleClick { point } => self.double_click(cx, point),
            InputEvent::PointerDown { pointer, point } => self.pointer_down(cx, pointer, point),
            InputEvent::PointerMove { pointer, point } => self.pointer_move(cx, pointer, point),
            InputEvent::PointerUp { pointer, point } => self.pointer_up(cx, pointer, point),
            InputEvent::Wheel { point, delta } => self.wheel(cx, point, delta),
            InputEvent::KeyDown { key } => self.key_down(cx, &key),
        }
    }

    fn hit(&self, cx: &InteractionContext<'_>, screen_point: Point) -> (Point, Option<Hit>) {
        let transform = cx.state.transform();
        let point = transform.to_diagram(screen_point);
        let tolerance = self.config.hit_tolerance() / transform.scale();
        (point, hit_test(&*cx.store, &*cx.scene, &*cx.state, point, tolerance))
    }

    fn click(
        &mut self,
        cx: InteractionContext<'_>,
        screen_point: Point,
        modifiers: Modifiers,
    ) -> Outcome {
        let (point, hit) = self.hit(&cx, screen_point);
        let before = cx.state.selection();
        let mut outcome = Outcome::none();

        match hit {
            Some(Hit::Entity(entity)) => {
                let selected = if modifiers.toggles_selection() {
                    cx.state.toggle_entity(entity.clone())
                } else {
                    cx.state.select_only_entity(entity.clone());
                    true
                };
                outcome.push(Event::EntityClick {
                    entity,
                    selected,
                    selected_entities: cx.state.selection().entities,
                    point,
                });
            }
            Some(Hit::Relationship(relationship)) => {
                let selected = if modifiers.toggles_selection() {
                    cx.state.toggle_relationship(relationship.clone())
                } else {
                    cx.state.select_only_relationship(relationship.clone());
                    true
                };
                outcome.push(Event::RelationshipClick {
                    relationship,
                    selected,
                    selected_relationships: cx.state.selection().relationships,
                    point,
                });
            }
            None => {
                cx.state.clear_selection();
                outcome.push(Event::SelectionCleared { point });
            }
        }

        let after = cx.state.selection();
        if after != before {
            sync_flags(cx.store, cx.state);
            outcome.push(Event::SelectionChanged(after));
            outcome.redraw = true;
        }
        outcome
    }

    fn double_click(&mut self, cx: InteractionContext<'_>, screen_point: Point) -> Outcome {
        let (point, hit) = self.hit(&cx, screen_point);
        let mut outcome = Outcome::none();

        match hit {
            Some(Hit::Entity(entity)) => {
                if let Some(visual) = cx.store.entity_mut(&entity) {
                    let expanded = visual.flags().expanded;
                    visual.set_expanded(!expanded);
                    debug!(entity:% = entity, expanded = !expanded; "Toggled entity rows");
                }
                cx.scene.reroute_incident(cx.store, &entity);
                outcome.push(Event::EntityDoubleClick { entity, point });
                outcome.redraw = true;
            }
            Some(Hit::Relationship(relationship)) => {
                outcome.push(Event::RelationshipDoubleClick {
                    relationship,
                    point,
                });
            }
            None => {}
        }
        outcome
    }

    fn pointer_down(
        &mut self,
        cx: InteractionContext<'_>,
        pointer: PointerId,
        screen_point: Point,
    ) -> Outcome {
        let (point, hit) = self.hit(&cx, screen_point);

        match hit {
            Some(Hit::Entity(entity)) => {
                if self.drags.values().any(|drag| drag.entity == entity) {
                    debug!(entity:% = entity, pointer = pointer; "Entity already dragged, ignoring pointer");
                    return Outcome::none();
                }
                let Some(position) = cx.store.entity(&entity).map(VisualEntity::position) else {
                    return Outcome::none();
                };

                self.drags.insert(
                    pointer,
                    Drag {
                        entity: entity.clone(),
                        grab_offset: point.sub_point(position),
                    },
                );
                Outcome {
                    events: vec![Event::DragStart { entity, position }],
                    redraw: false,
                }
            }
            // Relationships are not draggable; pressing on one pans like the canvas
            Some(Hit::Relationship(_)) | None => {
                self.pans.insert(pointer, screen_point);
                Outcome::none()
            }
        }
    }

    fn pointer_move(
        &mut self,
        cx: InteractionContext<'_>,
        pointer: PointerId,
        screen_point: Point,
    ) -> Outcome {
        if let Some(drag) = self.drags.get(&pointer) {
            let point = cx.state.transform().to_diagram(screen_point);
            let position = point.sub_point(drag.grab_offset);
            let entity = drag.entity.clone();

            if !cx.store.move_entity(&entity, position) {
                return Outcome::none();
            }
            let rerouted = cx.scene.reroute_incident(cx.store, &entity);
            trace!(entity:% = entity, rerouted = rerouted.len(); "Dragged entity");

            return Outcome {
                events: vec![Event::Drag { entity, position }],
                redraw: true,
            };
        }

        if let Some(last) = self.pans.get_mut(&pointer) {
            let delta = screen_point.sub_point(*last);
            *last = screen_point;
            if delta.is_zero() {
                return Outcome::none();
            }
            cx.state.transform_mut().pan_by(delta);
            return Outcome {
                events: vec![Event::Pan {
                    translate: cx.state.transform().translate(),
                    delta,
                }],
                redraw: true,
            };
        }

        Outcome::none()
    }

    fn pointer_up(
        &mut self,
        cx: InteractionContext<'_>,
        pointer: PointerId,
        _screen_point: Point,
    ) -> Outcome {
        self.pans.shift_remove(&pointer);

        let Some(drag) = self.drags.shift_remove(&pointer) else {
            return Outcome::none();
        };
        let Some(position) = cx.store.entity(&drag.entity).map(VisualEntity::position) else {
            return Outcome::none();
        };
        Outcome {
            events: vec![Event::DragEnd {
                entity: drag.entity,
                position,
            }],
            redraw: false,
        }
    }

    fn wheel(&mut self, cx: InteractionContext<'_>, point: Point, delta: f32) -> Outcome {
        if !delta.is_finite() || !point.x().is_finite() || !point.y().is_finite() {
            debug!(delta = delta; "Ignoring non-finite wheel input");
            return Outcome::none();
        }
        let current = cx.state.transform().scale();
        let scale = self
            .config
            .clamp_zoom(current * self.config.zoom_step().powf(-delta));
        if scale == current {
            return Outcome::none();
        }

        cx.state.transform_mut().zoom_about(scale, point);
        Outcome {
            events: vec![Event::Zoom { scale, point }],
            redraw: true,
        }
    }

    fn key_down(&mut self, cx: InteractionContext<'_>, key: &str) -> Outcome {
        match key {
            "Delete" | "Backspace" => {
                let selection = cx.state.selection();
                if selection.is_empty() {
                    return Outcome::none();
                }
                Outcome {
                    events: vec![Event::DeleteSelected(selection)],
                    redraw: false,
                }
            }
            "Escape" => {
                if cx.state.selection().is_empty() {
                    return Outcome::none();
                }
                cx.state.clear_selection();
                sync_flags(cx.store, cx.state);
                Outcome {
                    events: vec![Event::SelectionChanged(cx.state.selection())],
                    redraw: true,
                }
            }
            _ => Outcome::none(),
        }
    }
}

//! The live diagram session handed back to the host.
//!
//! A [`DiagramController`] exclusively owns the store, the scene and the
//! interaction state of one diagram. Events are always published after the
//! session borrow is released, so subscribers may call back into the
//! controller.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use log::{debug, info, warn};
use serde::Deserialize;
use uuid::Uuid;

use schemascope_core::{
    geometry::{Bounds, Insets, Point},
    identifier::{EntityId, RelationshipId},
    model::{
        DiagramStore, InteractionState, LayoutOptions, LayoutOptionsPatch, MissingEntity,
        Selection, ViewTransform, VisualEntity, VisualRelationship,
    },
};

use crate::{
    config::InteractionConfig,
    container::Container,
    error::DiagramError,
    events::{Event, EventBus},
    interaction::{InputEvent, InteractionContext, InteractionHandler, sync_flags},
    layout::{Layout, LayoutGraph},
    render::{Renderer, Scene},
};

/// Space kept around the content by [`DiagramController::fit_to_view`].
const FIT_MARGIN: f32 = 40.0;

/// Programmatic selection change.
///
/// With `clear` set the current selection is dropped first; the listed ids
/// are then added. Ids unknown to the diagram are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SelectionRequest {
    pub entities: Vec<EntityId>,
    pub relationships: Vec<RelationshipId>,
    pub clear: bool,
}

impl SelectionRequest {
    /// A request that empties the selection.
    pub fn clear() -> Self {
        Self {
            clear: true,
            ..Self::default()
        }
    }

    /// A request that replaces the selection with `entities`.
    pub fn only_entities(entities: impl IntoIterator<Item = impl Into<EntityId>>) -> Self {
        Self {
            entities: entities.into_iter().map(Into::into).collect(),
            clear: true,
            ..Self::default()
        }
    }
}

/// Snapshot returned by [`DiagramController::get_info`].
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramInfo {
    pub diagram_id: String,
    pub layout: String,
    pub renderer: String,
    pub entity_count: usize,
    pub relationship_count: usize,
    pub selection: Selection,
    pub hidden: Vec<EntityId>,
    pub highlighted: Vec<EntityId>,
    pub transform: ViewTransform,
    /// Bounds of the visible entities in diagram space.
    pub content_bounds: Option<Bounds>,
    pub skipped_relationships: usize,
}

/// Collaborators resolved by the facade before a diagram is generated.
pub(crate) struct DiagramSetup {
    pub container: Rc<Container>,
    pub layout: Rc<dyn Layout>,
    pub renderer: Rc<dyn Renderer>,
    pub options: LayoutOptions,
    pub bus: Rc<EventBus>,
    pub interaction: InteractionConfig,
}

struct Session {
    store: DiagramStore,
    scene: Scene,
    state: InteractionState,
    handler: InteractionHandler,
}

impl Session {
    fn is_visible(&self, entity: &VisualEntity) -> bool {
        entity.flags().visible && !self.state.is_hidden(entity.id())
    }

    fn content_bounds(&self) -> Option<Bounds> {
        self.store.content_bounds(|entity| self.is_visible(entity))
    }
}

/// Handle to one rendered diagram.
pub struct DiagramController {
    diagram_id: String,
    container: Rc<Container>,
    layout: Rc<dyn Layout>,
    renderer: Rc<dyn Renderer>,
    options: RefCell<LayoutOptions>,
    bus: Rc<EventBus>,
    session: RefCell<Option<Session>>,
    // Bumped by every update and by destroy; a layout result is only applied
    // if the generation did not move while it was computed.
    generation: Cell<u64>,
}

impl DiagramController {
    /// Lays out and renders a new diagram.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::InvalidContainer`] if the container cannot be
    /// mounted into. Dangling relationships are not errors; see
    /// [`DiagramController::diagnostics`].
    pub(crate) async fn generate(
        setup: DiagramSetup,
        entities: Vec<VisualEntity>,
        relationships: Vec<VisualRelationship>,
    ) -> Result<Self, DiagramError> {
        let DiagramSetup {
            container,
            layout,
            renderer,
            options,
            bus,
            interaction,
        } = setup;
        container.ensure_mountable()?;

        let diagram_id = Uuid::new_v4().to_string();
        info!(
            diagram_id = diagram_id.as_str(),
            layout = layout.name(),
            renderer = renderer.name(),
            entity_count = entities.len(),
            relationship_count = relationships.len();
            "Generating diagram"
        );

        let mut store = DiagramStore::from_parts(entities, relationships);
        crate::layout::calculate_positions(layout.as_ref(), &mut store, &options).await;

        let state = InteractionState::new();
        let scene = renderer.render(&container, &mut store, &state)?;

        Ok(Self {
            diagram_id,
            container,
            layout,
            renderer,
            options: RefCell::new(options),
            bus,
            session: RefCell::new(Some(Session {
                store,
                scene,
                state,
                handler: InteractionHandler::new(interaction),
            })),
            generation: Cell::new(0),
        })
    }

    pub fn diagram_id(&self) -> &str {
        &self.diagram_id
    }

    /// The bus this diagram publishes on.
    pub fn event_bus(&self) -> Rc<EventBus> {
        Rc::clone(&self.bus)
    }

    pub fn container(&self) -> &Rc<Container> {
        &self.container
    }

    pub fn is_destroyed(&self) -> bool {
        self.session.borrow().is_none()
    }

    fn ensure_live(&self, operation: &str) -> Result<(), DiagramError> {
        if self.is_destroyed() {
            return Err(DiagramError::destroyed(&self.diagram_id, operation));
        }
        Ok(())
    }

    /// Runs `f` on the live session.
    fn with_session<R>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut Session) -> Result<R, DiagramError>,
    ) -> Result<R, DiagramError> {
        let mut session = self.session.borrow_mut();
        let session = session
            .as_mut()
            .ok_or_else(|| DiagramError::destroyed(&self.diagram_id, operation))?;
        f(session)
    }

    fn redraw(&self, session: &Session) -> Result<(), DiagramError> {
        self.renderer
            .redraw(&self.container, &session.scene, &session.store, &session.state)
    }

    fn publish_all(&self, events: Vec<Event>) {
        for event in events {
            self.bus.publish(event);
        }
    }

    /// Replaces entities and relationships wholesale, then lays out and
    /// renders the new set.
    ///
    /// Selection, hidden and highlighted ids that no longer exist are
    /// dropped. If the controller is destroyed, or another update starts,
    /// while the layout is running, this call returns `Ok(())` without
    /// touching the diagram.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Lifecycle`] on a destroyed controller and
    /// [`DiagramError::InvalidContainer`] if the container can no longer be
    /// mounted into. A failed render leaves the previous diagram in place.
    pub async fn update(
        &self,
        entities: Vec<VisualEntity>,
        relationships: Vec<VisualRelationship>,
    ) -> Result<(), DiagramError> {
        self.ensure_live("update")?;
        self.container.ensure_mountable()?;

        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let mut store = DiagramStore::from_parts(entities, relationships);
        let options = self.options.borrow().clone();
        let graph = LayoutGraph::from_store(&store);
        let result = self.layout.calculate_positions(&graph, &options).await;

        if self.is_destroyed() {
            debug!(
                diagram_id = self.diagram_id.as_str();
                "Diagram destroyed during update, dropping layout"
            );
            return Ok(());
        }
        if self.generation.get() != generation {
            debug!(diagram_id = self.diagram_id.as_str(); "Update superseded, dropping layout");
            return Ok(());
        }

        result.apply(&mut store);

        // Nothing is committed to the session until the new scene is mounted.
        let changed = self.with_session("update", |session| {
            let mut state = session.state.clone();
            state.retain_entities(|id| store.contains_entity(id));
            state.retain_relationships(|id| store.contains_relationship(id));
            sync_flags(&mut store, &state);

            let scene = self.renderer.render(&self.container, &mut store, &state)?;

            let before = session.state.selection();
            let after = state.selection();
            session.store = store;
            session.scene = scene;
            session.state = state;
            session.handler.reset();
            Ok((after != before).then_some(after))
        })?;

        info!(
            diagram_id = self.diagram_id.as_str(),
            generation = generation;
            "Diagram updated"
        );
        if let Some(selection) = changed {
            self.bus.publish(Event::SelectionChanged(selection));
        }
        Ok(())
    }

    /// Merges `patch` into the layout options used by the next update.
    pub fn update_layout_options(&self, patch: &LayoutOptionsPatch) -> Result<(), DiagramError> {
        self.ensure_live("update layout options")?;
        self.options.borrow_mut().update(patch);
        Ok(())
    }

    /// Releases the diagram. Calling it again does nothing.
    pub fn destroy(&self) {
        let Some(session) = self.session.borrow_mut().take() else {
            debug!(diagram_id = self.diagram_id.as_str(); "Diagram already destroyed");
            return;
        };
        self.generation.set(self.generation.get() + 1);
        self.container.clear();
        info!(
            diagram_id = self.diagram_id.as_str(),
            entity_count = session.store.entity_count();
            "Diagram destroyed"
        );
    }

    /// Sets the selection programmatically. Returns whether it changed;
    /// `selectionChanged` is published only in that case.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Lifecycle`] on a destroyed controller.
    pub fn select(&self, request: SelectionRequest) -> Result<bool, DiagramError> {
        let changed = self.with_session("select", |session| {
            let before = session.state.selection();
            if request.clear {
                session.state.clear_selection();
            }

            let (entities, unknown_entities): (Vec<_>, Vec<_>) = request
                .entities
                .into_iter()
                .partition(|id| session.store.contains_entity(id));
            let (relationships, unknown_relationships): (Vec<_>, Vec<_>) = request
                .relationships
                .into_iter()
                .partition(|id| session.store.contains_relationship(id));
            if !unknown_entities.is_empty() || !unknown_relationships.is_empty() {
                debug!(
                    unknown_entities = unknown_entities.len(),
                    unknown_relationships = unknown_relationships.len();
                    "Ignoring unknown ids in selection"
                );
            }
            session.state.add_entities(entities);
            session.state.add_relationships(relationships);

            let after = session.state.selection();
            if after == before {
                return Ok(None);
            }
            sync_flags(&mut session.store, &session.state);
            self.redraw(session)?;
            Ok(Some(after))
        })?;

        match changed {
            Some(selection) => {
                self.bus.publish(Event::SelectionChanged(selection));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Snapshot of the diagram.
    pub fn get_info(&self) -> Result<DiagramInfo, DiagramError> {
        self.with_session("get info", |session| {
            Ok(DiagramInfo {
                diagram_id: self.diagram_id.clone(),
                layout: self.layout.name().to_string(),
                renderer: self.renderer.name().to_string(),
                entity_count: session.store.entity_count(),
                relationship_count: session.store.relationship_count(),
                selection: session.state.selection(),
                hidden: session.state.hidden_entities().cloned().collect(),
                highlighted: session.state.highlighted_entities().cloned().collect(),
                transform: session.state.transform(),
                content_bounds: session.content_bounds(),
                skipped_relationships: session.scene.skipped().len(),
            })
        })
    }

    /// Feeds one input event through hit testing and interaction handling,
    /// publishes the resulting events and returns them.
    ///
    /// The scene is updated in place (a drag reroutes only the relationships
    /// touching the dragged entity), but the mounted document is always
    /// serialized again in full, since the container holds one SVG string.
    pub fn handle_input(&self, input: InputEvent) -> Result<Vec<Event>, DiagramError> {
        let events = self.with_session("handle input", |session| {
            let Session {
                store,
                scene,
                state,
                handler,
            } = &mut *session;
            let outcome = handler.handle(input, InteractionContext { store, scene, state });
            if outcome.redraw {
                self.redraw(session)?;
            }
            Ok(outcome.events)
        })?;

        self.publish_all(events.clone());
        Ok(events)
    }

    /// Hides or shows entities; relationships touching a hidden entity are
    /// hidden with it.
    pub fn set_hidden(
        &self,
        ids: impl IntoIterator<Item = EntityId>,
        hidden: bool,
    ) -> Result<(), DiagramError> {
        self.with_session("set hidden", |session| {
            for id in ids {
                if session.store.contains_entity(&id) {
                    session.state.set_hidden(id, hidden);
                } else {
                    warn!(entity:% = id; "Cannot hide unknown entity");
                }
            }
            sync_flags(&mut session.store, &session.state);
            self.redraw(session)
        })
    }

    /// Replaces the set of highlighted entities.
    pub fn highlight(&self, ids: impl IntoIterator<Item = EntityId>) -> Result<(), DiagramError> {
        self.with_session("highlight", |session| {
            let ids: Vec<_> = ids
                .into_iter()
                .filter(|id| session.store.contains_entity(id))
                .collect();
            session.state.set_highlighted(ids);
            sync_flags(&mut session.store, &session.state);
            self.redraw(session)
        })
    }

    fn set_transform(
        &self,
        operation: &str,
        transform: ViewTransform,
        point: Point,
    ) -> Result<(), DiagramError> {
        let scale = self.with_session(operation, |session| {
            session.state.set_transform(transform);
            self.redraw(session)?;
            Ok(transform.scale())
        })?;
        self.bus.publish(Event::Zoom { scale, point });
        Ok(())
    }

    /// Zooms to `scale` keeping the screen point `point` fixed. The scale is
    /// clamped to the configured zoom range.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Configuration`] if `scale` is not a positive
    /// finite number or `point` is not finite.
    pub fn zoom_to(&self, scale: f32, point: Point) -> Result<(), DiagramError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(DiagramError::Configuration(format!(
                "zoom scale must be a positive number, got {scale}"
            )));
        }
        if !point.x().is_finite() || !point.y().is_finite() {
            return Err(DiagramError::Configuration(format!(
                "zoom anchor must be finite, got {point:?}"
            )));
        }
        let transform = self.with_session("zoom", |session| {
            let mut transform = session.state.transform();
            transform.zoom_about(session.handler.config().clamp_zoom(scale), point);
            Ok(transform)
        })?;
        self.set_transform("zoom", transform, point)
    }

    /// Back to scale 1 without translation.
    pub fn reset_view(&self) -> Result<(), DiagramError> {
        self.set_transform("reset view", ViewTransform::default(), Point::default())
    }

    /// Scales and translates the view so every visible entity fits into the
    /// viewport with a margin.
    pub fn fit_to_view(&self) -> Result<(), DiagramError> {
        let viewport = self.container.viewport();
        let transform = self.with_session("fit to view", |session| {
            let Some(bounds) = session.content_bounds() else {
                return Ok(ViewTransform::default());
            };

            let margin = Insets::uniform(FIT_MARGIN);
            let available_width = (viewport.width() - margin.horizontal_sum()).max(1.0);
            let available_height = (viewport.height() - margin.vertical_sum()).max(1.0);
            let content = bounds.to_size();
            let scale = (available_width / content.width().max(1.0))
                .min(available_height / content.height().max(1.0));
            let scale = session.handler.config().clamp_zoom(scale);

            let viewport_center = Point::new(viewport.width() / 2.0, viewport.height() / 2.0);
            let translate = viewport_center.sub_point(bounds.center().scale(scale));
            Ok(ViewTransform::new(scale, translate))
        })?;
        self.set_transform("fit to view", transform, viewport.half())
    }

    /// The currently mounted document.
    pub fn svg(&self) -> Result<String, DiagramError> {
        self.ensure_live("read document")?;
        self.container
            .document()
            .ok_or_else(|| DiagramError::Export("no document is mounted".to_string()))
    }

    /// Relationships skipped by the last render because an endpoint is missing.
    pub fn diagnostics(&self) -> Result<Vec<MissingEntity>, DiagramError> {
        self.with_session("read diagnostics", |session| {
            Ok(session.scene.skipped().to_vec())
        })
    }

    /// Runs `f` with read access to the diagram's entities and relationships.
    pub fn with_store<R>(&self, f: impl FnOnce(&DiagramStore) -> R) -> Result<R, DiagramError> {
        self.with_session("read store", |session| Ok(f(&session.store)))
    }
}

impl Drop for DiagramController {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use schemascope_core::{
        geometry::Size,
        model::{EntityKind, RelationshipKind},
    };

    use super::*;
    use crate::{events::Topic, layout::HierarchicalLayout, render::SvgRenderer};

    async fn controller(
        entities: Vec<VisualEntity>,
        relationships: Vec<VisualRelationship>,
    ) -> DiagramController {
        let setup = DiagramSetup {
            container: Rc::new(Container::new("diagram", Size::new(800.0, 600.0))),
            layout: Rc::new(HierarchicalLayout::new()),
            renderer: Rc::new(SvgRenderer::default()),
            options: LayoutOptions::default(),
            bus: Rc::new(EventBus::new()),
            interaction: InteractionConfig::default(),
        };
        DiagramController::generate(setup, entities, relationships)
        .await
        .unwrap()
    }

    fn entities(ids: &[&str]) -> Vec<VisualEntity> {
        ids.iter()
            .map(|id| VisualEntity::new(*id, id.to_uppercase(), EntityKind::Table))
            .collect()
    }

    fn count(bus: &EventBus, topic: Topic) -> (Rc<Cell<usize>>, crate::events::Subscription) {
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        let subscription = bus.subscribe(topic, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        (seen, subscription)
    }

    #[tokio::test]
    async fn test_generate_mounts_document() {
        let controller = controller(entities(&["a", "b"]), Vec::new()).await;
        let document = controller.svg().unwrap();
        assert!(document.contains("data-id=\"a\""));
        assert_eq!(controller.get_info().unwrap().entity_count, 2);
    }

    #[tokio::test]
    async fn test_select_then_clear_publishes_once_per_change() {
        let controller = controller(entities(&["a", "b"]), Vec::new()).await;
        let (seen, _subscription) = count(&controller.event_bus(), Topic::SelectionChanged);

        assert!(controller.select(SelectionRequest::only_entities(["a"])).unwrap());
        assert!(!controller.select(SelectionRequest::only_entities(["a"])).unwrap());
        assert!(controller.select(SelectionRequest::clear()).unwrap());
        assert!(!controller.select(SelectionRequest::clear()).unwrap());

        assert_eq!(seen.get(), 2);
        assert!(controller.get_info().unwrap().selection.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_selected() {
        let controller = controller(entities(&["a"]), Vec::new()).await;
        assert!(!controller.select(SelectionRequest::only_entities(["ghost"])).unwrap());
    }

    #[tokio::test]
    async fn test_destroy_twice_and_lifecycle_errors() {
        let controller = controller(entities(&["a"]), Vec::new()).await;
        controller.destroy();
        controller.destroy();

        assert!(controller.is_destroyed());
        assert!(!controller.container().is_mounted());
        assert!(matches!(
            controller.select(SelectionRequest::clear()),
            Err(DiagramError::Lifecycle(_))
        ));
        assert!(matches!(controller.get_info(), Err(DiagramError::Lifecycle(_))));
        assert!(matches!(
            controller.update(entities(&["b"]), Vec::new()).await,
            Err(DiagramError::Lifecycle(_))
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_data_and_prunes_selection() {
        let controller = controller(entities(&["a", "b"]), Vec::new()).await;
        controller
            .select(SelectionRequest::only_entities(["a", "b"]))
            .unwrap();
        let (seen, _subscription) = count(&controller.event_bus(), Topic::SelectionChanged);

        controller
            .update(
                entities(&["b", "c"]),
                vec![VisualRelationship::new("bc", "b", "c", RelationshipKind::Composition)],
            )
            .await
            .unwrap();

        let info = controller.get_info().unwrap();
        assert_eq!(info.entity_count, 2);
        assert_eq!(info.relationship_count, 1);
        assert_eq!(info.selection.entities, vec![EntityId::from("b")]);
        assert_eq!(seen.get(), 1);
        assert!(!controller.svg().unwrap().contains("data-id=\"a\""));
    }

    #[tokio::test]
    async fn test_fit_to_view_contains_content() {
        let controller = controller(entities(&["a", "b", "c", "d"]), Vec::new()).await;
        controller.fit_to_view().unwrap();

        let info = controller.get_info().unwrap();
        let bounds = info.content_bounds.unwrap();
        let top_left = info.transform.to_screen(bounds.min_point());
        let bottom_right = info
            .transform
            .to_screen(Point::new(bounds.max_x(), bounds.max_y()));
        assert!(top_left.x() >= FIT_MARGIN - 0.01 && top_left.y() >= FIT_MARGIN - 0.01);
        assert!(bottom_right.x() <= 800.0 - FIT_MARGIN + 0.01);
        assert!(bottom_right.y() <= 600.0 - FIT_MARGIN + 0.01);
    }

    #[tokio::test]
    async fn test_zoom_is_clamped() {
        let controller = controller(entities(&["a"]), Vec::new()).await;
        controller.zoom_to(100.0, Point::default()).unwrap();
        assert_eq!(controller.get_info().unwrap().transform.scale(), 4.0);

        controller.reset_view().unwrap();
        assert_eq!(controller.get_info().unwrap().transform, ViewTransform::default());
    }

    #[tokio::test]
    async fn test_zoom_rejects_degenerate_scales() {
        let controller = controller(entities(&["a"]), Vec::new()).await;
        let zooms = count(&controller.event_bus(), Topic::Zoom);

        for scale in [f32::NAN, f32::INFINITY, 0.0, -2.0] {
            let result = controller.zoom_to(scale, Point::default());
            assert!(matches!(result, Err(DiagramError::Configuration(_))), "{scale}");
        }
        let result = controller.zoom_to(2.0, Point::new(f32::NAN, 0.0));
        assert!(matches!(result, Err(DiagramError::Configuration(_))));

        assert_eq!(controller.get_info().unwrap().transform, ViewTransform::default());
        assert_eq!(zooms.0.get(), 0);
    }

    #[tokio::test]
    async fn test_hidden_entity_left_out_of_document() {
        let controller = controller(
            entities(&["a", "b"]),
            vec![VisualRelationship::new("ab", "a", "b", RelationshipKind::OneToOne)],
        )
        .await;
        controller.set_hidden(["b".into()], true).unwrap();

        let document = controller.svg().unwrap();
        assert!(!document.contains("data-id=\"b\""));
        assert!(!document.contains("data-id=\"ab\""));
        assert_eq!(controller.get_info().unwrap().hidden, vec![EntityId::from("b")]);

        controller.set_hidden(["b".into()], false).unwrap();
        assert!(controller.svg().unwrap().contains("data-id=\"ab\""));
    }
}

//! Rendering of laid-out diagrams.
//!
//! Rendering happens in two steps. [`Scene::build`] routes every
//! relationship between the boundaries of its entities and writes the
//! routed paths back into the store. A [`Renderer`] then draws the scene
//! into a document that is mounted into the [`Container`]. `render` always
//! rebuilds the whole scene; interaction updates the existing scene in
//! place and only calls `redraw`.

mod scene;
mod svg;

use std::{fmt, rc::Rc};

use indexmap::IndexMap;
use log::debug;

use schemascope_core::{
    color::Color,
    geometry::Size,
    model::{DiagramStore, InteractionState},
};

use crate::{config::StyleConfig, container::Container, error::DiagramError};

pub use scene::{RelationshipVisual, Scene, route_relationship};
pub use self::svg::SvgRenderer;

/// Resolved colors used while drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub background: Color,
    pub entity_fill: Color,
    pub header_fill: Color,
    pub stroke: Color,
    pub selection: Color,
    pub highlight: Color,
    pub text: Color,
    pub font_family: String,
}

impl Theme {
    /// Resolves a style configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Configuration`] if any configured color is invalid.
    pub fn from_style(style: &StyleConfig) -> Result<Self, DiagramError> {
        Ok(Self {
            background: style.background_color().map_err(DiagramError::Configuration)?,
            entity_fill: style.entity_fill().map_err(DiagramError::Configuration)?,
            header_fill: style.header_fill().map_err(DiagramError::Configuration)?,
            stroke: style.stroke_color().map_err(DiagramError::Configuration)?,
            selection: style.selection_color().map_err(DiagramError::Configuration)?,
            highlight: style.highlight_color().map_err(DiagramError::Configuration)?,
            text: style.stroke_color().map_err(DiagramError::Configuration)?,
            font_family: "Arial, Helvetica, sans-serif".to_string(),
        })
    }
}

impl Default for Theme {
    fn default() -> Self {
        let style = StyleConfig::default();
        // The built-in palette always parses; fall back to black regardless
        let color = |result: Result<Color, String>| result.unwrap_or_default();
        Self {
            background: color(style.background_color()),
            entity_fill: color(style.entity_fill()),
            header_fill: color(style.header_fill()),
            stroke: color(style.stroke_color()),
            selection: color(style.selection_color()),
            highlight: color(style.highlight_color()),
            text: color(style.stroke_color()),
            font_family: "Arial, Helvetica, sans-serif".to_string(),
        }
    }
}

/// Everything a renderer needs to draw one frame.
pub struct Frame<'a> {
    pub scene: &'a Scene,
    pub store: &'a DiagramStore,
    pub state: &'a InteractionState,
    pub viewport: Size,
}

/// Trait implemented by every renderer.
pub trait Renderer {
    /// Registry name of the renderer, e.g. `"svg"`.
    fn name(&self) -> &str;

    /// Draws a frame into a document.
    fn draw(&self, frame: &Frame<'_>) -> Result<String, DiagramError>;

    /// Rebuilds the scene from the store, draws it and mounts the result.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::InvalidContainer`] before touching the store
    /// when the container cannot be mounted into.
    fn render(
        &self,
        container: &Container,
        store: &mut DiagramStore,
        state: &InteractionState,
    ) -> Result<Scene, DiagramError> {
        container.ensure_mountable()?;
        let scene = Scene::build(store);
        self.redraw(container, &scene, store, state)?;
        Ok(scene)
    }

    /// Draws an existing scene and mounts the result.
    fn redraw(
        &self,
        container: &Container,
        scene: &Scene,
        store: &DiagramStore,
        state: &InteractionState,
    ) -> Result<(), DiagramError> {
        let document = self.draw(&Frame {
            scene,
            store,
            state,
            viewport: container.viewport(),
        })?;
        container.mount(document)
    }
}

/// Name → renderer mapping.
#[derive(Clone)]
pub struct RendererRegistry {
    renderers: IndexMap<String, Rc<dyn Renderer>>,
}

impl RendererRegistry {
    pub fn empty() -> Self {
        Self {
            renderers: IndexMap::new(),
        }
    }

    /// Creates a registry with the SVG renderer using `theme`.
    pub fn with_theme(theme: Theme) -> Self {
        let mut registry = Self::empty();
        registry.register(Rc::new(SvgRenderer::new(theme)));
        registry
    }

    /// Registers a renderer under its own name, replacing any previous one.
    pub fn register(&mut self, renderer: Rc<dyn Renderer>) -> Option<Rc<dyn Renderer>> {
        let name = renderer.name().to_string();
        debug!(renderer = name.as_str(); "Registering renderer");
        self.renderers.insert(name, renderer)
    }

    /// Looks a renderer up by name.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Configuration`] for an unknown name.
    pub fn get(&self, name: &str) -> Result<Rc<dyn Renderer>, DiagramError> {
        self.renderers.get(name).cloned().ok_or_else(|| {
            DiagramError::Configuration(format!(
                "unknown renderer `{name}`, available: {}",
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.renderers.keys().map(String::as_str)
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::with_theme(Theme::default())
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use schemascope_core::model::{EntityKind, RelationshipKind, VisualEntity, VisualRelationship};

    use super::*;

    #[test]
    fn test_theme_from_invalid_style() {
        let style = StyleConfig::with_background("nope");
        assert!(matches!(
            Theme::from_style(&style),
            Err(DiagramError::Configuration(_))
        ));
    }

    #[test]
    fn test_default_theme_matches_default_style() {
        assert_eq!(
            Theme::from_style(&StyleConfig::default()).unwrap(),
            Theme::default()
        );
    }

    #[test]
    fn test_registry_lookup() {
        let registry = RendererRegistry::default();
        assert_eq!(registry.get("svg").unwrap().name(), "svg");
        let Err(err) = registry.get("canvas") else {
            panic!("expected an error for an unknown renderer");
        };
        assert!(matches!(err, DiagramError::Configuration(_)));
    }

    #[test]
    fn test_render_into_detached_container_fails_before_routing() {
        let container = Container::new("c", Size::new(400.0, 300.0));
        container.detach();
        let mut store = DiagramStore::from_parts(
            [
                VisualEntity::new("a", "A", EntityKind::Table),
                VisualEntity::new("b", "B", EntityKind::Table),
            ],
            [VisualRelationship::new("ab", "a", "b", RelationshipKind::OneToOne)],
        );

        let result = SvgRenderer::default().render(&container, &mut store, &InteractionState::new());
        assert!(matches!(result, Err(DiagramError::InvalidContainer(_))));
        assert!(store.relationship(&"ab".into()).unwrap().path().is_empty());
    }
}

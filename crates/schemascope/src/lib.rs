//! Schemascope - layout, rendering and interaction for schema diagrams.
//!
//! Entities and relationships extracted from a repository's schemas go in;
//! a laid-out, rendered and interactive diagram comes out. The entry point
//! is [`DiagramApi::generate_diagram`], which resolves a layout and a
//! renderer by name, runs them and returns a [`DiagramController`] for the
//! live session.

pub mod config;
pub mod container;
pub mod controller;
pub mod error;
pub mod events;
pub mod interaction;
pub mod layout;
pub mod render;

pub use schemascope_core::{color, draw, geometry, identifier, model};

pub use container::Container;
pub use controller::{DiagramController, DiagramInfo, SelectionRequest};
pub use error::DiagramError;
pub use events::{Event, EventBus, Topic};

use std::rc::Rc;

use log::{debug, info};

use schemascope_core::model::{LayoutOptions, LayoutOptionsPatch, VisualEntity, VisualRelationship};

use config::AppConfig;
use controller::DiagramSetup;
use layout::{Layout, LayoutRegistry};
use render::{Renderer, RendererRegistry, Theme};

/// Per-call options of [`DiagramApi::generate_diagram`].
///
/// Unset names fall back to the configured defaults. Without an explicit
/// bus the diagram gets a fresh one of its own.
#[derive(Clone, Default)]
pub struct DiagramOptions {
    pub layout: Option<String>,
    pub renderer: Option<String>,
    pub layout_options: Option<LayoutOptionsPatch>,
    pub event_bus: Option<Rc<EventBus>>,
}

impl DiagramOptions {
    /// Options selecting the layout `name`.
    pub fn with_layout(name: impl Into<String>) -> Self {
        Self {
            layout: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Facade owning the layout and renderer registries.
///
/// # Examples
///
/// ```rust,no_run
/// use std::rc::Rc;
///
/// use schemascope::{Container, DiagramApi, DiagramOptions, SelectionRequest};
/// use schemascope::geometry::Size;
/// use schemascope::model::{EntityKind, RelationshipKind, VisualEntity, VisualRelationship};
///
/// # async fn run() -> Result<(), schemascope::DiagramError> {
/// let api = DiagramApi::default();
/// let container = Rc::new(Container::new("diagram", Size::new(1200.0, 800.0)));
///
/// let controller = api
///     .generate_diagram(
///         container,
///         vec![
///             VisualEntity::new("users", "Users", EntityKind::Table),
///             VisualEntity::new("posts", "Posts", EntityKind::Table),
///         ],
///         vec![VisualRelationship::new("writes", "users", "posts", RelationshipKind::OneToMany)],
///         DiagramOptions::with_layout("hierarchical"),
///     )
///     .await?;
///
/// controller.select(SelectionRequest::only_entities(["users"]))?;
/// println!("{}", controller.svg()?);
/// controller.destroy();
/// # Ok(())
/// # }
/// ```
pub struct DiagramApi {
    config: AppConfig,
    layouts: LayoutRegistry,
    renderers: RendererRegistry,
}

impl DiagramApi {
    /// Creates a facade with the built-in layouts and the SVG renderer
    /// styled by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Configuration`] if a configured color is invalid.
    pub fn new(config: AppConfig) -> Result<Self, DiagramError> {
        let theme = Theme::from_style(config.style())?;
        Ok(Self {
            config,
            layouts: LayoutRegistry::new(),
            renderers: RendererRegistry::with_theme(theme),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn layouts(&self) -> &LayoutRegistry {
        &self.layouts
    }

    pub fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }

    /// Adds or replaces a layout at runtime.
    pub fn register_layout(&mut self, layout: Rc<dyn Layout>) {
        self.layouts.register(layout);
    }

    /// Adds or replaces a renderer at runtime.
    pub fn register_renderer(&mut self, renderer: Rc<dyn Renderer>) {
        self.renderers.register(renderer);
    }

    /// Layout options for a container: the canvas is the container's
    /// viewport, then the configured and per-call patches apply in order.
    fn layout_options(
        &self,
        container: &Container,
        patch: Option<&LayoutOptionsPatch>,
    ) -> LayoutOptions {
        let viewport = container.viewport();
        let mut options = LayoutOptions {
            width: viewport.width(),
            height: viewport.height(),
            ..LayoutOptions::default()
        };
        options.update(self.config.layout().options());
        if let Some(patch) = patch {
            options.update(patch);
        }
        options
    }

    /// Lays out and renders a diagram into `container`.
    ///
    /// # Errors
    ///
    /// - [`DiagramError::Configuration`] for an unknown layout or renderer name
    /// - [`DiagramError::InvalidContainer`] if the container cannot be mounted into
    ///
    /// Relationships referencing missing entities are skipped and reported
    /// through [`DiagramController::diagnostics`].
    pub async fn generate_diagram(
        &self,
        container: Rc<Container>,
        entities: Vec<VisualEntity>,
        relationships: Vec<VisualRelationship>,
        options: DiagramOptions,
    ) -> Result<DiagramController, DiagramError> {
        let layout_name = options
            .layout
            .as_deref()
            .unwrap_or(self.config.layout().engine());
        let renderer_name = options
            .renderer
            .as_deref()
            .unwrap_or(self.config.layout().renderer());
        debug!(layout = layout_name, renderer = renderer_name; "Resolving diagram pipeline");

        let layout = self.layouts.get(layout_name)?;
        let renderer = self.renderers.get(renderer_name)?;
        let layout_options = self.layout_options(&container, options.layout_options.as_ref());

        let setup = DiagramSetup {
            container,
            layout,
            renderer,
            options: layout_options,
            bus: options.event_bus.unwrap_or_default(),
            interaction: self.config.interaction().clone(),
        };
        let controller = DiagramController::generate(setup, entities, relationships).await?;

        info!(diagram_id = controller.diagram_id(); "Diagram ready");
        Ok(controller)
    }
}

impl Default for DiagramApi {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            layouts: LayoutRegistry::default(),
            renderers: RendererRegistry::default(),
        }
    }
}

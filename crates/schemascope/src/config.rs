//! Configuration types for Schemascope diagrams.
//!
//! All types implement [`serde::Deserialize`] so hosts can load them from
//! TOML or JSON. Every field has a default, so an empty document is a valid
//! configuration.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`LayoutConfig`] - Default layout engine, renderer and layout options.
//! - [`StyleConfig`] - Colors used by the renderer.
//! - [`InteractionConfig`] - Zoom limits and hit-testing tolerance.
//!
//! # Example
//!
//! ```
//! # use schemascope::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.layout().engine(), "hierarchical");
//! assert!(config.style().background_color().is_ok());
//! ```

use serde::Deserialize;

use schemascope_core::{color::Color, model::LayoutOptionsPatch};

use crate::error::DiagramError;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    layout: LayoutConfig,

    #[serde(default)]
    style: StyleConfig,

    #[serde(default)]
    interaction: InteractionConfig,
}

impl AppConfig {
    pub fn new(layout: LayoutConfig, style: StyleConfig, interaction: InteractionConfig) -> Self {
        Self {
            layout,
            style,
            interaction,
        }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn interaction(&self) -> &InteractionConfig {
        &self.interaction
    }
}

/// Default layout and renderer selection.
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    /// Name of the layout used when a diagram does not request one.
    #[serde(default = "default_engine")]
    engine: String,

    /// Name of the renderer used when a diagram does not request one.
    #[serde(default = "default_renderer")]
    renderer: String,

    /// Options merged over the built-in layout defaults.
    #[serde(default)]
    options: LayoutOptionsPatch,
}

fn default_engine() -> String {
    "hierarchical".to_string()
}

fn default_renderer() -> String {
    "svg".to_string()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            renderer: default_renderer(),
            options: LayoutOptionsPatch::default(),
        }
    }
}

impl LayoutConfig {
    pub fn new(
        engine: impl Into<String>,
        renderer: impl Into<String>,
        options: LayoutOptionsPatch,
    ) -> Self {
        Self {
            engine: engine.into(),
            renderer: renderer.into(),
            options,
        }
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn renderer(&self) -> &str {
        &self.renderer
    }

    pub fn options(&self) -> &LayoutOptionsPatch {
        &self.options
    }
}

/// Renderer colors, as CSS color strings.
///
/// Unset fields fall back to the built-in palette. Colors are validated when
/// read, not when the configuration is deserialized.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StyleConfig {
    #[serde(default)]
    background_color: Option<String>,
    #[serde(default)]
    entity_fill: Option<String>,
    #[serde(default)]
    header_fill: Option<String>,
    #[serde(default)]
    stroke_color: Option<String>,
    #[serde(default)]
    selection_color: Option<String>,
    #[serde(default)]
    highlight_color: Option<String>,
}

macro_rules! color_accessor {
    ($(#[$meta:meta])* $name:ident, $default:literal) => {
        $(#[$meta])*
        ///
        /// # Errors
        ///
        /// Returns an error if the configured string is not a valid color.
        pub fn $name(&self) -> Result<Color, String> {
            parse_color(self.$name.as_deref(), $default, stringify!($name))
        }
    };
}

impl StyleConfig {
    /// Creates a style with only the background color set.
    pub fn with_background(color: impl Into<String>) -> Self {
        Self {
            background_color: Some(color.into()),
            ..Self::default()
        }
    }

    color_accessor!(
        /// Canvas background
        background_color,
        "white"
    );
    color_accessor!(
        /// Body fill of entity boxes
        entity_fill,
        "#ffffff"
    );
    color_accessor!(
        /// Title band fill of entity boxes
        header_fill,
        "#e2e8f0"
    );
    color_accessor!(
        /// Entity outlines and relationship lines
        stroke_color,
        "#334155"
    );
    color_accessor!(
        /// Outline of selected elements
        selection_color,
        "#2563eb"
    );
    color_accessor!(
        /// Fill of highlighted entities
        highlight_color,
        "#fef08a"
    );
}

fn parse_color(value: Option<&str>, default: &str, field: &str) -> Result<Color, String> {
    Color::new(value.unwrap_or(default))
        .map_err(|err| format!("Invalid {field} in config: {err}"))
}

/// Interaction tuning.
///
/// Zoom limits are checked on construction and on deserialization, so a
/// loaded configuration can never produce a zero or non-finite scale.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "InteractionRecord")]
pub struct InteractionConfig {
    min_zoom: f32,
    max_zoom: f32,
    /// Multiplicative zoom factor per wheel unit
    zoom_step: f32,
    /// Screen-space distance within which a click hits a relationship
    hit_tolerance: f32,
}

/// Unchecked form of [`InteractionConfig`] as it appears in a config file.
#[derive(Deserialize)]
struct InteractionRecord {
    #[serde(default = "default_min_zoom")]
    min_zoom: f32,
    #[serde(default = "default_max_zoom")]
    max_zoom: f32,
    #[serde(default = "default_zoom_step")]
    zoom_step: f32,
    #[serde(default = "default_hit_tolerance")]
    hit_tolerance: f32,
}

impl TryFrom<InteractionRecord> for InteractionConfig {
    type Error = DiagramError;

    fn try_from(record: InteractionRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.min_zoom,
            record.max_zoom,
            record.zoom_step,
            record.hit_tolerance,
        )
    }
}

fn default_min_zoom() -> f32 {
    0.1
}

fn default_max_zoom() -> f32 {
    4.0
}

fn default_zoom_step() -> f32 {
    1.1
}

fn default_hit_tolerance() -> f32 {
    6.0
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            zoom_step: default_zoom_step(),
            hit_tolerance: default_hit_tolerance(),
        }
    }
}

impl InteractionConfig {
    /// # Errors
    ///
    /// Returns [`DiagramError::Configuration`] unless
    /// `0 < min_zoom <= max_zoom`, `zoom_step > 1` and `hit_tolerance >= 0`,
    /// all finite.
    pub fn new(
        min_zoom: f32,
        max_zoom: f32,
        zoom_step: f32,
        hit_tolerance: f32,
    ) -> Result<Self, DiagramError> {
        let invalid = |message: String| Err(DiagramError::Configuration(message));
        if !min_zoom.is_finite() || min_zoom <= 0.0 {
            return invalid(format!("min_zoom must be a positive number, got {min_zoom}"));
        }
        if !max_zoom.is_finite() || max_zoom < min_zoom {
            return invalid(format!(
                "max_zoom must be at least min_zoom ({min_zoom}), got {max_zoom}"
            ));
        }
        if !zoom_step.is_finite() || zoom_step <= 1.0 {
            return invalid(format!("zoom_step must be greater than 1, got {zoom_step}"));
        }
        if !hit_tolerance.is_finite() || hit_tolerance < 0.0 {
            return invalid(format!(
                "hit_tolerance must not be negative, got {hit_tolerance}"
            ));
        }

        Ok(Self {
            min_zoom,
            max_zoom,
            zoom_step,
            hit_tolerance,
        })
    }

    pub fn min_zoom(&self) -> f32 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f32 {
        self.max_zoom
    }

    pub fn zoom_step(&self) -> f32 {
        self.zoom_step
    }

    pub fn hit_tolerance(&self) -> f32 {
        self.hit_tolerance
    }

    /// Clamps a scale into `[min_zoom, max_zoom]`. The caller rejects
    /// non-finite scales first.
    pub fn clamp_zoom(&self, scale: f32) -> f32 {
        scale.clamp(self.min_zoom, self.max_zoom)
    }
}

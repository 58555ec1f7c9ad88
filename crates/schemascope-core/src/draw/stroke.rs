//! Stroke definitions for entity outlines, relationship paths and
//! selection overlays.
//!
//! The [`apply_stroke!`](crate::apply_stroke!) macro writes a
//! [`StrokeDefinition`] onto an SVG element.

use crate::{color::Color, model::RelationshipKind};

/// Dash pattern of a line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LinePattern {
    #[default]
    Solid,
    /// 6px dash, 4px gap
    Dashed,
    /// 2px dot, 3px gap
    Dotted,
}

impl LinePattern {
    /// Pattern a relationship of `kind` is drawn with.
    pub fn for_relationship(kind: RelationshipKind) -> Self {
        if kind.is_dashed() {
            Self::Dashed
        } else {
            Self::Solid
        }
    }

    /// SVG `stroke-dasharray` value, `None` for solid lines.
    pub fn dasharray(self) -> Option<&'static str> {
        match self {
            Self::Solid => None,
            Self::Dashed => Some("6,4"),
            Self::Dotted => Some("2,3"),
        }
    }
}

/// Color, width and pattern of a stroked outline or path.
///
/// # Examples
///
/// ```
/// use schemascope_core::color::Color;
/// use schemascope_core::draw::{LinePattern, StrokeDefinition};
/// use schemascope_core::model::RelationshipKind;
///
/// let stroke = StrokeDefinition::for_relationship(
///     RelationshipKind::Dependency,
///     Color::new("#334155").unwrap(),
///     1.5,
/// );
/// assert_eq!(stroke.pattern(), LinePattern::Dashed);
/// assert!(stroke.is_rounded());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeDefinition {
    color: Color,
    width: f32,
    pattern: LinePattern,
    rounded: bool,
}

impl StrokeDefinition {
    /// A solid stroke with square corners, used for entity boxes.
    pub fn new(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            pattern: LinePattern::Solid,
            rounded: false,
        }
    }

    pub fn dashed(color: Color, width: f32) -> Self {
        Self::new(color, width).with_pattern(LinePattern::Dashed)
    }

    /// Relationship paths get round caps and joins so bends and self-loops
    /// stay smooth.
    pub fn for_relationship(kind: RelationshipKind, color: Color, width: f32) -> Self {
        Self {
            rounded: true,
            ..Self::new(color, width).with_pattern(LinePattern::for_relationship(kind))
        }
    }

    pub fn with_pattern(mut self, pattern: LinePattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn pattern(&self) -> LinePattern {
        self.pattern
    }

    pub fn is_rounded(&self) -> bool {
        self.rounded
    }

    /// `stroke-linecap` and `stroke-linejoin` value.
    pub fn corner_value(&self) -> &'static str {
        if self.rounded { "round" } else { "miter" }
    }
}

impl Default for StrokeDefinition {
    fn default() -> Self {
        Self::new(Color::default(), 1.0)
    }
}

/// Apply all stroke attributes to an SVG element.
///
/// ```
/// use schemascope_core::color::Color;
/// use schemascope_core::draw::StrokeDefinition;
/// use svg::node::element as svg_element;
///
/// let stroke = StrokeDefinition::new(Color::new("black").unwrap(), 2.0);
/// let rect = svg_element::Rectangle::new().set("width", 100).set("height", 50);
/// let rect = schemascope_core::apply_stroke!(rect, &stroke);
/// # let _ = rect;
/// ```
#[macro_export]
macro_rules! apply_stroke {
    ($element:expr, $stroke:expr) => {{
        let mut elem = $element
            .set("stroke", $stroke.color().to_string())
            .set("stroke-opacity", $stroke.color().alpha())
            .set("stroke-width", $stroke.width());

        if $stroke.is_rounded() {
            elem = elem
                .set("stroke-linecap", $stroke.corner_value())
                .set("stroke-linejoin", $stroke.corner_value());
        }
        if let Some(dasharray) = $stroke.pattern().dasharray() {
            elem = elem.set("stroke-dasharray", dasharray);
        }

        elem
    }};
}

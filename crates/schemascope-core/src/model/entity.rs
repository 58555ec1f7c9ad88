//! Visual entities: the boxes of a schema diagram.
//!
//! An entity's dimensions are never set directly. They are derived from the
//! title and the property rows every time either changes, so a rendered box
//! always has room for its content.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::{
    geometry::{Bounds, Point, Size},
    identifier::EntityId,
};

/// Font size of the entity title, in pixels
pub const TITLE_FONT_SIZE: f32 = 14.0;
/// Font size of the property rows, in pixels
pub const ROW_FONT_SIZE: f32 = 12.0;
/// Height of the title band
pub const HEADER_HEIGHT: f32 = 32.0;
/// Height of a single property row
pub const ROW_HEIGHT: f32 = 22.0;
/// Padding left and right of any text inside the box
pub const HORIZONTAL_PADDING: f32 = 16.0;
/// Space below the last property row
pub const BOTTOM_PADDING: f32 = 8.0;
/// Entities never get narrower than this
pub const MIN_WIDTH: f32 = 160.0;

// Average glyph advance relative to the font size for the default sans-serif face.
const GLYPH_ADVANCE: f32 = 0.6;

/// Estimates the rendered width of a single line of text.
///
/// Wide (CJK) characters count as two cells.
pub fn measure_text(text: &str, font_size: f32) -> f32 {
    text.width() as f32 * font_size * GLYPH_ADVANCE
}

/// The kind of schema object an entity was extracted from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    #[default]
    Table,
    View,
    Api,
    Document,
    Enum,
    Type,
    Other(String),
}

impl EntityKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Table => "table",
            Self::View => "view",
            Self::Api => "api",
            Self::Document => "document",
            Self::Enum => "enum",
            Self::Type => "type",
            Self::Other(kind) => kind,
        }
    }
}

impl From<String> for EntityKind {
    fn from(kind: String) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "table" => Self::Table,
            "view" => Self::View,
            "api" | "endpoint" => Self::Api,
            "document" | "collection" => Self::Document,
            "enum" => Self::Enum,
            "type" | "record" => Self::Type,
            _ => Self::Other(kind),
        }
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column, field or attribute of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityProperty {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_foreign: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EntityProperty {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            ..Self::default()
        }
    }

    /// Marks the property as (part of) the primary key.
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self.is_required = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn foreign(mut self) -> Self {
        self.is_foreign = true;
        self
    }

    /// The text drawn for this property's row, e.g. `PK id: uuid`.
    pub fn row_text(&self) -> String {
        let marker = match (self.is_primary, self.is_foreign) {
            (true, _) => "PK ",
            (false, true) => "FK ",
            (false, false) => "",
        };
        let optional = if self.is_required || self.is_primary {
            ""
        } else {
            "?"
        };

        if self.data_type.is_empty() {
            format!("{marker}{}{optional}", self.name)
        } else {
            format!("{marker}{}{optional}: {}", self.name, self.data_type)
        }
    }
}

/// Display and interaction flags of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFlags {
    pub selected: bool,
    pub highlighted: bool,
    pub visible: bool,
    pub expanded: bool,
}

impl Default for EntityFlags {
    fn default() -> Self {
        Self {
            selected: false,
            highlighted: false,
            visible: true,
            expanded: true,
        }
    }
}

/// A renderable node representing a schema-derived table or object.
///
/// `position` is the top-left corner of the box.
///
/// # Examples
///
/// ```
/// use schemascope_core::model::{EntityKind, EntityProperty, VisualEntity};
///
/// let users = VisualEntity::new("users", "Users", EntityKind::Table)
///     .with_property(EntityProperty::new("id", "uuid").primary())
///     .with_property(EntityProperty::new("email", "text").required());
///
/// let collapsed_height = VisualEntity::new("users", "Users", EntityKind::Table)
///     .dimensions()
///     .height();
/// assert!(users.dimensions().height() > collapsed_height);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntityRecord", rename_all = "camelCase")]
pub struct VisualEntity {
    id: EntityId,
    label: String,
    #[serde(rename = "type")]
    kind: EntityKind,
    properties: Vec<EntityProperty>,
    position: Point,
    dimensions: Size,
    metadata: IndexMap<String, String>,
    flags: EntityFlags,
}

impl VisualEntity {
    pub fn new(id: impl Into<EntityId>, label: impl Into<String>, kind: EntityKind) -> Self {
        let mut entity = Self {
            id: id.into(),
            label: label.into(),
            kind,
            properties: Vec::new(),
            position: Point::default(),
            dimensions: Size::default(),
            metadata: IndexMap::new(),
            flags: EntityFlags::default(),
        };
        entity.recompute_dimensions();
        entity
    }

    /// Appends a property, builder style.
    pub fn with_property(mut self, property: EntityProperty) -> Self {
        self.push_property(property);
        self
    }

    /// Sets a metadata entry, builder style.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn properties(&self) -> &[EntityProperty] {
        &self.properties
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn dimensions(&self) -> Size {
        self.dimensions
    }

    pub fn metadata(&self) -> &IndexMap<String, String> {
        &self.metadata
    }

    pub fn flags(&self) -> EntityFlags {
        self.flags
    }

    /// Center of the entity box.
    pub fn center(&self) -> Point {
        self.position.add_point(self.dimensions.half())
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new_from_top_left(self.position, self.dimensions)
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
        self.recompute_dimensions();
    }

    pub fn set_properties(&mut self, properties: Vec<EntityProperty>) {
        self.properties = properties;
        self.recompute_dimensions();
    }

    pub fn push_property(&mut self, property: EntityProperty) {
        self.properties.push(property);
        self.recompute_dimensions();
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    /// Moves the entity so its center lands on `center`.
    pub fn set_center(&mut self, center: Point) {
        self.position = center.sub_point(self.dimensions.half());
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.flags.selected = selected;
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        self.flags.highlighted = highlighted;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.flags.visible = visible;
    }

    /// Collapsing hides the property rows and shrinks the box to its header.
    pub fn set_expanded(&mut self, expanded: bool) {
        self.flags.expanded = expanded;
        self.recompute_dimensions();
    }

    /// Baseline-left point of the property row at `index`, relative to the
    /// entity's top-left corner.
    pub fn row_offset(index: usize) -> Point {
        Point::new(
            HORIZONTAL_PADDING,
            HEADER_HEIGHT + ROW_HEIGHT * index as f32 + ROW_HEIGHT * 0.7,
        )
    }

    fn recompute_dimensions(&mut self) {
        let title_width = measure_text(&self.label, TITLE_FONT_SIZE);
        let rows_width = self
            .properties
            .iter()
            .map(|property| measure_text(&property.row_text(), ROW_FONT_SIZE))
            .fold(0.0, f32::max);

        let width = (title_width.max(rows_width) + HORIZONTAL_PADDING * 2.0).max(MIN_WIDTH);
        let height = if self.flags.expanded && !self.properties.is_empty() {
            HEADER_HEIGHT + ROW_HEIGHT * self.properties.len() as f32 + BOTTOM_PADDING
        } else {
            HEADER_HEIGHT
        };

        self.dimensions = Size::new(width, height);
    }
}

/// Wire shape accepted when deserializing an entity.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityRecord {
    id: EntityId,
    #[serde(default)]
    label: Option<String>,
    #[serde(rename = "type", default)]
    kind: EntityKind,
    #[serde(default)]
    properties: Vec<EntityProperty>,
    #[serde(default)]
    position: Option<Point>,
    #[serde(default)]
    metadata: IndexMap<String, String>,
}

impl From<EntityRecord> for VisualEntity {
    fn from(record: EntityRecord) -> Self {
        let label = record.label.unwrap_or_else(|| record.id.to_string());
        let mut entity = VisualEntity::new(record.id, label, record.kind);
        entity.metadata = record.metadata;
        entity.set_properties(record.properties);
        if let Some(position) = record.position {
            entity.set_position(position);
        }
        entity
    }
}

//! Visual relationships: the edges between entities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    geometry::Point,
    identifier::{EntityId, RelationshipId},
};

/// How a relationship kind decides which end is the parent in a hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyRole {
    /// The source owns the target (composition, aggregation).
    SourceIsParent,
    /// The target is the supertype of the source (inheritance).
    TargetIsParent,
    /// Parent and child follow the configured layout direction.
    FollowsDirection,
}

/// The kind of a detected relationship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipKind {
    OneToOne,
    #[default]
    OneToMany,
    ManyToOne,
    ManyToMany,
    Composition,
    Aggregation,
    Inheritance,
    Reference,
    Association,
    Dependency,
}

impl RelationshipKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToOne => "oneToOne",
            Self::OneToMany => "oneToMany",
            Self::ManyToOne => "manyToOne",
            Self::ManyToMany => "manyToMany",
            Self::Composition => "composition",
            Self::Aggregation => "aggregation",
            Self::Inheritance => "inheritance",
            Self::Reference => "reference",
            Self::Association => "association",
            Self::Dependency => "dependency",
        }
    }

    pub fn hierarchy_role(self) -> HierarchyRole {
        match self {
            Self::Composition | Self::Aggregation => HierarchyRole::SourceIsParent,
            Self::Inheritance => HierarchyRole::TargetIsParent,
            _ => HierarchyRole::FollowsDirection,
        }
    }

    /// Cardinality markers drawn when the input does not specify any,
    /// as `(source, target)`.
    pub fn default_cardinality(self) -> (Cardinality, Cardinality) {
        match self {
            Self::OneToOne => (Cardinality::One, Cardinality::One),
            Self::OneToMany => (Cardinality::One, Cardinality::Many),
            Self::ManyToOne => (Cardinality::Many, Cardinality::One),
            Self::ManyToMany => (Cardinality::Many, Cardinality::Many),
            _ => (Cardinality::None, Cardinality::None),
        }
    }

    /// Reference-like kinds are drawn with a dashed line.
    pub fn is_dashed(self) -> bool {
        matches!(self, Self::Reference | Self::Dependency)
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multiplicity glyph drawn at one end of a relationship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    One,
    ZeroOrOne,
    Many,
    OneOrMany,
    #[default]
    None,
}

impl Cardinality {
    pub fn is_many(self) -> bool {
        matches!(self, Self::Many | Self::OneOrMany)
    }

    /// Short text form used in tooltips and labels.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::One => "1",
            Self::ZeroOrOne => "0..1",
            Self::Many => "*",
            Self::OneOrMany => "1..*",
            Self::None => "",
        }
    }
}

/// A renderable edge between two entities.
///
/// `path` is empty until a layout or the renderer routes the relationship;
/// once routed it always holds at least two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RelationshipRecord", rename_all = "camelCase")]
pub struct VisualRelationship {
    id: RelationshipId,
    source: EntityId,
    target: EntityId,
    #[serde(rename = "type")]
    kind: RelationshipKind,
    label: Option<String>,
    source_cardinality: Cardinality,
    target_cardinality: Cardinality,
    path: Vec<Point>,
    selected: bool,
}

impl VisualRelationship {
    pub fn new(
        id: impl Into<RelationshipId>,
        source: impl Into<EntityId>,
        target: impl Into<EntityId>,
        kind: RelationshipKind,
    ) -> Self {
        let (source_cardinality, target_cardinality) = kind.default_cardinality();
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind,
            label: None,
            source_cardinality,
            target_cardinality,
            path: Vec::new(),
            selected: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_cardinality(mut self, source: Cardinality, target: Cardinality) -> Self {
        self.source_cardinality = source;
        self.target_cardinality = target;
        self
    }

    pub fn id(&self) -> &RelationshipId {
        &self.id
    }

    pub fn source(&self) -> &EntityId {
        &self.source
    }

    pub fn target(&self) -> &EntityId {
        &self.target
    }

    pub fn kind(&self) -> RelationshipKind {
        self.kind
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn source_cardinality(&self) -> Cardinality {
        self.source_cardinality
    }

    pub fn target_cardinality(&self) -> Cardinality {
        self.target_cardinality
    }

    pub fn path(&self) -> &[Point] {
        &self.path
    }

    pub fn selected(&self) -> bool {
        self.selected
    }

    /// Returns true when the relationship touches `entity` at either end.
    pub fn is_incident_to(&self, entity: &EntityId) -> bool {
        &self.source == entity || &self.target == entity
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Replaces the routed path. Paths with fewer than two points are ignored.
    pub fn set_path(&mut self, path: Vec<Point>) -> bool {
        if path.len() < 2 {
            return false;
        }
        self.path = path;
        true
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelationshipRecord {
    id: RelationshipId,
    source: EntityId,
    target: EntityId,
    #[serde(rename = "type", default)]
    kind: RelationshipKind,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    source_cardinality: Option<Cardinality>,
    #[serde(default)]
    target_cardinality: Option<Cardinality>,
    #[serde(default)]
    path: Vec<Point>,
}

impl From<RelationshipRecord> for VisualRelationship {
    fn from(record: RelationshipRecord) -> Self {
        let mut relationship =
            VisualRelationship::new(record.id, record.source, record.target, record.kind);
        relationship.label = record.label;
        if let Some(cardinality) = record.source_cardinality {
            relationship.source_cardinality = cardinality;
        }
        if let Some(cardinality) = record.target_cardinality {
            relationship.target_cardinality = cardinality;
        }
        relationship.set_path(record.path);
        relationship
    }
}

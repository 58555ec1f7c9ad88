//! SVG renderer
//!
//! Draws the scene into a standalone SVG document. The view transform is
//! applied to one root group so zooming and panning never touch entity
//! coordinates.

use log::trace;
use svg::{
    Document,
    node::{
        Text as SvgText,
        element::{self as svg_element, Definitions, Marker},
    },
};

use schemascope_core::{
    apply_stroke,
    color::Color,
    draw::{LayeredOutput, RenderLayer, StrokeDefinition},
    geometry::Point,
    model::{
        Cardinality, HEADER_HEIGHT, ROW_FONT_SIZE, RelationshipKind, TITLE_FONT_SIZE,
        VisualEntity, VisualRelationship, measure_text,
    },
};

use crate::{
    error::DiagramError,
    render::{Frame, Renderer, Theme, scene::RelationshipVisual},
};

const LABEL_FONT_SIZE: f32 = 12.0;
const SELECTION_PADDING: f32 = 4.0;

/// Glyph drawn at one end of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Arrow,
    Triangle,
    FilledDiamond,
    HollowDiamond,
    One,
    Many,
}

impl MarkerKind {
    const ALL: [MarkerKind; 6] = [
        Self::Arrow,
        Self::Triangle,
        Self::FilledDiamond,
        Self::HollowDiamond,
        Self::One,
        Self::Many,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Arrow => "arrow",
            Self::Triangle => "triangle",
            Self::FilledDiamond => "diamond-filled",
            Self::HollowDiamond => "diamond-hollow",
            Self::One => "one",
            Self::Many => "many",
        }
    }

    fn id(self, color: &Color) -> String {
        format!("{}-{}", self.name(), color.to_id_safe_string())
    }

    fn url(self, color: &Color) -> String {
        format!("url(#{})", self.id(color))
    }

    fn from_cardinality(cardinality: Cardinality) -> Option<Self> {
        match cardinality {
            Cardinality::One | Cardinality::ZeroOrOne => Some(Self::One),
            Cardinality::Many | Cardinality::OneOrMany => Some(Self::Many),
            Cardinality::None => None,
        }
    }

    /// Markers for the `(source, target)` ends of a relationship.
    ///
    /// The kind's own glyph wins; an end without one falls back to its
    /// cardinality glyph.
    fn for_relationship(relationship: &VisualRelationship) -> (Option<Self>, Option<Self>) {
        let (source, target) = match relationship.kind() {
            RelationshipKind::Composition => (Some(Self::FilledDiamond), None),
            RelationshipKind::Aggregation => (Some(Self::HollowDiamond), None),
            RelationshipKind::Inheritance => (None, Some(Self::Triangle)),
            RelationshipKind::Reference | RelationshipKind::Dependency => (None, Some(Self::Arrow)),
            _ => (None, None),
        };
        (
            source.or_else(|| Self::from_cardinality(relationship.source_cardinality())),
            target.or_else(|| Self::from_cardinality(relationship.target_cardinality())),
        )
    }

    // Glyphs point along the path; tips sit at x = 10 which is the entity edge.
    fn marker(self, color: &Color, background: &Color) -> Marker {
        let marker = Marker::new()
            .set("id", self.id(color))
            .set("viewBox", "0 0 10 10")
            .set("refX", 10)
            .set("refY", 5)
            .set("markerWidth", 10)
            .set("markerHeight", 10)
            .set("orient", "auto-start-reverse");

        let glyph = match self {
            Self::Arrow => svg_element::Path::new()
                .set("d", "M 0 0 L 10 5 L 0 10 z")
                .set("fill", color.to_string()),
            Self::Triangle => svg_element::Path::new()
                .set("d", "M 0 0 L 10 5 L 0 10 z")
                .set("fill", background.to_string())
                .set("stroke", color.to_string()),
            Self::FilledDiamond => svg_element::Path::new()
                .set("d", "M 0 5 L 5 1 L 10 5 L 5 9 z")
                .set("fill", color.to_string()),
            Self::HollowDiamond => svg_element::Path::new()
                .set("d", "M 0 5 L 5 1 L 10 5 L 5 9 z")
                .set("fill", background.to_string())
                .set("stroke", color.to_string()),
            Self::One => svg_element::Path::new()
                .set("d", "M 6 0 L 6 10")
                .set("fill", "none")
                .set("stroke", color.to_string()),
            Self::Many => svg_element::Path::new()
                .set("d", "M 0 5 L 10 0 M 0 5 L 10 5 M 0 5 L 10 10")
                .set("fill", "none")
                .set("stroke", color.to_string()),
        };

        marker.add(glyph)
    }
}

/// Creates marker definitions for every glyph in each of the given colors.
fn create_marker_definitions<'a, I>(colors: I, background: &Color) -> Definitions
where
    I: Iterator<Item = &'a Color>,
{
    let mut defs = Definitions::new();
    for color in colors {
        for kind in MarkerKind::ALL {
            defs = defs.add(kind.marker(color, background));
        }
    }
    defs
}

/// Path data from a polyline.
fn create_path_data(points: &[Point]) -> String {
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let command = if i == 0 { "M" } else { "L" };
            format!("{command} {} {}", point.x(), point.y())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders scenes to SVG documents.
#[derive(Debug, Default)]
pub struct SvgRenderer {
    theme: Theme,
}

impl SvgRenderer {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    fn text(&self, x: f32, y: f32, font_size: f32, content: &str) -> svg_element::Text {
        svg_element::Text::new("")
            .set("x", x)
            .set("y", y)
            .set("font-family", self.theme.font_family.as_str())
            .set("font-size", font_size)
            .set("fill", self.theme.text.to_string())
            .add(SvgText::new(content))
    }

    fn render_entity(&self, entity: &VisualEntity, highlighted: bool, output: &mut LayeredOutput) {
        let bounds = entity.bounds();
        let stroke = StrokeDefinition::new(self.theme.stroke, 1.0);
        let body_fill = if highlighted {
            self.theme.highlight
        } else {
            self.theme.entity_fill
        };

        let body = svg_element::Rectangle::new()
            .set("x", bounds.min_x())
            .set("y", bounds.min_y())
            .set("width", bounds.width())
            .set("height", bounds.height())
            .set("rx", 4.0)
            .set("fill", body_fill.to_string());
        let body = apply_stroke!(body, &stroke);

        let header = svg_element::Rectangle::new()
            .set("x", bounds.min_x())
            .set("y", bounds.min_y())
            .set("width", bounds.width())
            .set("height", HEADER_HEIGHT.min(bounds.height()))
            .set("rx", 4.0)
            .set("fill", self.theme.header_fill.to_string());
        let header = apply_stroke!(header, &stroke);

        let title = self
            .text(
                bounds.center().x(),
                bounds.min_y() + HEADER_HEIGHT / 2.0,
                TITLE_FONT_SIZE,
                entity.label(),
            )
            .set("text-anchor", "middle")
            .set("dominant-baseline", "central")
            .set("font-weight", "bold");

        let mut group = svg_element::Group::new()
            .set("class", "entity")
            .set("data-id", entity.id().as_str())
            .set("data-kind", entity.kind().as_str())
            .add(body)
            .add(header)
            .add(title);

        if entity.flags().expanded {
            for (index, property) in entity.properties().iter().enumerate() {
                let offset = VisualEntity::row_offset(index);
                let row = self.text(
                    bounds.min_x() + offset.x(),
                    bounds.min_y() + offset.y(),
                    ROW_FONT_SIZE,
                    &property.row_text(),
                );
                group = group.add(row);
            }
        }

        output.add_to_layer(RenderLayer::Entity, Box::new(group));
    }

    fn render_entity_selection(&self, entity: &VisualEntity, output: &mut LayeredOutput) {
        let bounds = entity.bounds();
        let stroke = StrokeDefinition::dashed(self.theme.selection, 2.0);
        let outline = svg_element::Rectangle::new()
            .set("x", bounds.min_x() - SELECTION_PADDING)
            .set("y", bounds.min_y() - SELECTION_PADDING)
            .set("width", bounds.width() + SELECTION_PADDING * 2.0)
            .set("height", bounds.height() + SELECTION_PADDING * 2.0)
            .set("rx", 6.0)
            .set("fill", "none")
            .set("data-selected", entity.id().as_str());
        output.add_to_layer(RenderLayer::Selection, Box::new(apply_stroke!(outline, &stroke)));
    }

    fn render_relationship(
        &self,
        visual: &RelationshipVisual,
        relationship: &VisualRelationship,
        selected: bool,
        output: &mut LayeredOutput,
    ) {
        let color = if selected {
            self.theme.selection
        } else {
            self.theme.stroke
        };
        let width = if selected { 2.5 } else { 1.5 };
        let stroke = StrokeDefinition::for_relationship(visual.kind, color, width);

        let mut path = svg_element::Path::new()
            .set("d", create_path_data(&visual.path))
            .set("fill", "none")
            .set("class", "relationship")
            .set("data-id", visual.id.as_str())
            .set("data-kind", visual.kind.as_str());
        path = apply_stroke!(path, &stroke);

        let (start, end) = MarkerKind::for_relationship(relationship);
        if let Some(start) = start {
            path = path.set("marker-start", start.url(&color));
        }
        if let Some(end) = end {
            path = path.set("marker-end", end.url(&color));
        }
        output.add_to_layer(RenderLayer::Relationship, Box::new(path));

        if let (Some(label), Some(anchor)) = (relationship.label(), visual.label_anchor()) {
            self.render_label(label, anchor, output);
        }
    }

    fn render_label(&self, label: &str, anchor: Point, output: &mut LayeredOutput) {
        let width = measure_text(label, LABEL_FONT_SIZE);
        let height = LABEL_FONT_SIZE * 1.2;

        let bg = svg_element::Rectangle::new()
            .set("x", anchor.x() - width / 2.0 - 5.0)
            .set("y", anchor.y() - height / 2.0 - 3.0)
            .set("width", width + 10.0)
            .set("height", height + 6.0)
            .set("fill", self.theme.background.to_string())
            .set("fill-opacity", 0.8)
            .set("rx", 3.0);

        let text = self
            .text(anchor.x(), anchor.y(), LABEL_FONT_SIZE, label)
            .set("text-anchor", "middle")
            .set("dominant-baseline", "central");

        let group = svg_element::Group::new().add(bg).add(text);
        output.add_to_layer(RenderLayer::Label, Box::new(group));
    }
}

impl Renderer for SvgRenderer {
    fn name(&self) -> &str {
        "svg"
    }

    fn draw(&self, frame: &Frame<'_>) -> Result<String, DiagramError> {
        let Frame {
            scene,
            store,
            state,
            viewport,
        } = frame;

        let is_visible = |entity: &VisualEntity| entity.flags().visible && !state.is_hidden(entity.id());

        let mut output = LayeredOutput::new();

        for id in scene.entity_ids() {
            let Some(entity) = store.entity(id).filter(|entity| is_visible(entity)) else {
                continue;
            };
            self.render_entity(entity, state.is_highlighted(id), &mut output);
            if state.is_entity_selected(id) {
                self.render_entity_selection(entity, &mut output);
            }
        }

        for visual in scene.relationships() {
            let endpoints_visible = [&visual.source, &visual.target]
                .into_iter()
                .all(|id| store.entity(id).is_some_and(|entity| is_visible(entity)));
            let Some(relationship) = store.relationship(&visual.id) else {
                continue;
            };
            if !endpoints_visible {
                continue;
            }
            self.render_relationship(
                visual,
                relationship,
                state.is_relationship_selected(&visual.id),
                &mut output,
            );
        }

        let background = svg_element::Rectangle::new()
            .set("x", 0)
            .set("y", 0)
            .set("width", viewport.width())
            .set("height", viewport.height())
            .set("fill", self.theme.background.to_string())
            .set("class", "background");

        let mut root = svg_element::Group::new()
            .set("class", "viewport")
            .set("transform", state.transform().to_svg_value());
        for node in output.render() {
            root = root.add(node);
        }

        let colors = [self.theme.stroke, self.theme.selection];
        let doc = Document::new()
            .set(
                "viewBox",
                format!("0 0 {} {}", viewport.width(), viewport.height()),
            )
            .set("width", viewport.width())
            .set("height", viewport.height())
            .add(create_marker_definitions(colors.iter(), &self.theme.background))
            .add(background)
            .add(root);

        let document = doc.to_string();
        trace!(bytes = document.len(); "SVG document drawn");
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use schemascope_core::{
        geometry::Size,
        model::{DiagramStore, EntityKind, EntityProperty, InteractionState},
    };

    use super::*;
    use crate::render::Scene;

    fn store() -> DiagramStore {
        let mut users = VisualEntity::new("users", "Users", EntityKind::Table)
            .with_property(EntityProperty::new("id", "uuid").primary());
        users.set_position(Point::new(0.0, 0.0));
        let mut posts = VisualEntity::new("posts", "Posts", EntityKind::Table)
            .with_property(EntityProperty::new("author_id", "uuid").foreign());
        posts.set_position(Point::new(400.0, 0.0));

        DiagramStore::from_parts(
            [users, posts],
            [
                VisualRelationship::new("writes", "users", "posts", RelationshipKind::OneToMany)
                    .with_label("authored by"),
            ],
        )
    }

    fn draw(store: &mut DiagramStore, state: &InteractionState) -> String {
        let scene = Scene::build(store);
        SvgRenderer::default()
            .draw(&Frame {
                scene: &scene,
                store,
                state,
                viewport: Size::new(800.0, 600.0),
            })
            .unwrap()
    }

    #[test]
    fn test_path_data() {
        let points = [Point::new(0.0, 0.0), Point::new(10.0, 5.0), Point::new(20.0, 0.0)];
        assert_eq!(create_path_data(&points), "M 0 0 L 10 5 L 20 0");
    }

    #[test]
    fn test_markers_by_kind_and_cardinality() {
        let composition = VisualRelationship::new("c", "a", "b", RelationshipKind::Composition);
        assert_eq!(
            MarkerKind::for_relationship(&composition),
            (Some(MarkerKind::FilledDiamond), None)
        );

        let inheritance = VisualRelationship::new("i", "a", "b", RelationshipKind::Inheritance);
        assert_eq!(
            MarkerKind::for_relationship(&inheritance),
            (None, Some(MarkerKind::Triangle))
        );

        let one_to_many = VisualRelationship::new("o", "a", "b", RelationshipKind::OneToMany);
        assert_eq!(
            MarkerKind::for_relationship(&one_to_many),
            (Some(MarkerKind::One), Some(MarkerKind::Many))
        );

        let association = VisualRelationship::new("s", "a", "b", RelationshipKind::Association);
        assert_eq!(MarkerKind::for_relationship(&association), (None, None));
    }

    #[test]
    fn test_document_contains_entities_and_relationship() {
        let document = draw(&mut store(), &InteractionState::new());

        assert!(document.starts_with("<svg"));
        assert!(document.contains("viewBox=\"0 0 800 600\""));
        assert!(document.contains("data-id=\"users\""));
        assert!(document.contains("data-id=\"posts\""));
        assert!(document.contains("data-id=\"writes\""));
        assert!(document.contains("PK id: uuid"));
        assert!(document.contains("FK author_id: uuid"));
        assert!(document.contains("authored by"));
        assert!(document.contains("marker-end=\"url(#many-"));
        assert!(document.contains("transform=\"translate(0,0) scale(1)\""));
    }

    #[test]
    fn test_hidden_entity_and_incident_relationships_are_omitted() {
        let mut state = InteractionState::new();
        state.set_hidden("posts".into(), true);
        let document = draw(&mut store(), &state);

        assert!(document.contains("data-id=\"users\""));
        assert!(!document.contains("data-id=\"posts\""));
        assert!(!document.contains("data-id=\"writes\""));
    }

    #[test]
    fn test_selection_outline_drawn() {
        let mut state = InteractionState::new();
        state.select_only_entity("users".into());
        let document = draw(&mut store(), &state);

        assert!(document.contains("data-selected=\"users\""));
        assert!(!document.contains("data-selected=\"posts\""));
    }

    #[test]
    fn test_label_text_is_escaped() {
        let mut store = DiagramStore::from_parts(
            [VisualEntity::new("a", "A<B>", EntityKind::Table)],
            [],
        );
        let document = draw(&mut store, &InteractionState::new());
        assert!(document.contains("A&lt;B&gt;"));
    }
}

//! Layout configuration.
//!
//! [`LayoutOptions`] holds one sub-configuration per layout kind plus the
//! canvas size. [`LayoutOptionsPatch`] mirrors it with every field optional
//! and is merged into a full configuration with [`LayoutOptions::update`].

use std::{f32::consts::TAU, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Size};

/// Direction in which hierarchy levels stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Top to bottom
    #[default]
    TB,
    /// Bottom to top
    BT,
    /// Left to right
    LR,
    /// Right to left
    RL,
}

impl Direction {
    /// Levels advance along the y axis.
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::TB | Self::BT)
    }

    /// Levels advance toward decreasing coordinates.
    pub fn is_reversed(self) -> bool {
        matches!(self, Self::BT | Self::RL)
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TB" | "TD" => Ok(Self::TB),
            "BT" => Ok(Self::BT),
            "LR" => Ok(Self::LR),
            "RL" => Ok(Self::RL),
            _ => Err(format!("unknown direction `{s}`, expected TB, BT, LR or RL")),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TB => "TB",
            Self::BT => "BT",
            Self::LR => "LR",
            Self::RL => "RL",
        };
        f.write_str(name)
    }
}

/// Force-directed layout parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceOptions {
    /// Repulsion magnitude between every pair of entities
    pub strength: f32,
    /// Rest length of relationship springs
    pub distance: f32,
    /// Number of simulation steps, always run to completion
    pub iterations: usize,
    /// Seed of the initial placement jitter
    pub seed: u64,
    /// Velocity retained after each step
    pub damping: f32,
}

impl Default for ForceOptions {
    fn default() -> Self {
        Self {
            strength: 1000.0,
            distance: 200.0,
            iterations: 300,
            seed: 42,
            damping: 0.85,
        }
    }
}

/// Hierarchical layout parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchicalOptions {
    pub direction: Direction,
    /// Distance between consecutive level lines
    pub level_distance: f32,
    /// Gap between neighbouring entities on the same level
    pub node_distance: f32,
}

impl Default for HierarchicalOptions {
    fn default() -> Self {
        Self {
            direction: Direction::TB,
            level_distance: 150.0,
            node_distance: 50.0,
        }
    }
}

/// Circular layout parameters. Angles are in radians, clockwise on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircularOptions {
    pub radius: f32,
    pub start_angle: f32,
    pub end_angle: f32,
}

impl Default for CircularOptions {
    fn default() -> Self {
        Self {
            radius: 300.0,
            start_angle: 0.0,
            end_angle: TAU,
        }
    }
}

/// Complete layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOptions {
    pub width: f32,
    pub height: f32,
    pub force: ForceOptions,
    pub hierarchical: HierarchicalOptions,
    pub circular: CircularOptions,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            force: ForceOptions::default(),
            hierarchical: HierarchicalOptions::default(),
            circular: CircularOptions::default(),
        }
    }
}

impl LayoutOptions {
    pub fn canvas(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn canvas_center(&self) -> Point {
        self.canvas().half()
    }

    /// Merges a partial configuration into this one. Values present in
    /// `patch` win; absent values keep their current setting.
    ///
    /// # Examples
    ///
    /// ```
    /// # use schemascope_core::model::{Direction, HierarchicalOptionsPatch, LayoutOptions, LayoutOptionsPatch};
    /// let mut options = LayoutOptions::default();
    /// options.update(&LayoutOptionsPatch {
    ///     hierarchical: Some(HierarchicalOptionsPatch {
    ///         direction: Some(Direction::LR),
    ///         ..Default::default()
    ///     }),
    ///     ..Default::default()
    /// });
    ///
    /// assert_eq!(options.hierarchical.direction, Direction::LR);
    /// assert_eq!(options.hierarchical.level_distance, 150.0);
    /// ```
    pub fn update(&mut self, patch: &LayoutOptionsPatch) {
        merge(&mut self.width, patch.width);
        merge(&mut self.height, patch.height);

        if let Some(force) = &patch.force {
            merge(&mut self.force.strength, force.strength);
            merge(&mut self.force.distance, force.distance);
            merge(&mut self.force.iterations, force.iterations);
            merge(&mut self.force.seed, force.seed);
            merge(&mut self.force.damping, force.damping);
        }

        if let Some(hierarchical) = &patch.hierarchical {
            merge(&mut self.hierarchical.direction, hierarchical.direction);
            merge(&mut self.hierarchical.level_distance, hierarchical.level_distance);
            merge(&mut self.hierarchical.node_distance, hierarchical.node_distance);
        }

        if let Some(circular) = &patch.circular {
            merge(&mut self.circular.radius, circular.radius);
            merge(&mut self.circular.start_angle, circular.start_angle);
            merge(&mut self.circular.end_angle, circular.end_angle);
        }
    }

    /// Returns a copy with `patch` merged in.
    pub fn merged(&self, patch: &LayoutOptionsPatch) -> Self {
        let mut options = self.clone();
        options.update(patch);
        options
    }
}

fn merge<T: Copy>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForceOptionsPatch {
    pub strength: Option<f32>,
    pub distance: Option<f32>,
    pub iterations: Option<usize>,
    pub seed: Option<u64>,
    pub damping: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HierarchicalOptionsPatch {
    pub direction: Option<Direction>,
    pub level_distance: Option<f32>,
    pub node_distance: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircularOptionsPatch {
    pub radius: Option<f32>,
    pub start_angle: Option<f32>,
    pub end_angle: Option<f32>,
}

/// Partial layout configuration; see [`LayoutOptions::update`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptionsPatch {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub force: Option<ForceOptionsPatch>,
    pub hierarchical: Option<HierarchicalOptionsPatch>,
    pub circular: Option<CircularOptionsPatch>,
}

impl LayoutOptionsPatch {
    /// Combines two patches; fields set in `later` win.
    pub fn then(&self, later: &LayoutOptionsPatch) -> Self {
        fn pick<T: Clone>(earlier: &Option<T>, later: &Option<T>) -> Option<T> {
            later.clone().or_else(|| earlier.clone())
        }

        let force = match (&self.force, &later.force) {
            (Some(a), Some(b)) => Some(ForceOptionsPatch {
                strength: pick(&a.strength, &b.strength),
                distance: pick(&a.distance, &b.distance),
                iterations: pick(&a.iterations, &b.iterations),
                seed: pick(&a.seed, &b.seed),
                damping: pick(&a.damping, &b.damping),
            }),
            (a, b) => pick(a, b),
        };
        let hierarchical = match (&self.hierarchical, &later.hierarchical) {
            (Some(a), Some(b)) => Some(HierarchicalOptionsPatch {
                direction: pick(&a.direction, &b.direction),
                level_distance: pick(&a.level_distance, &b.level_distance),
                node_distance: pick(&a.node_distance, &b.node_distance),
            }),
            (a, b) => pick(a, b),
        };
        let circular = match (&self.circular, &later.circular) {
            (Some(a), Some(b)) => Some(CircularOptionsPatch {
                radius: pick(&a.radius, &b.radius),
                start_angle: pick(&a.start_angle, &b.start_angle),
                end_angle: pick(&a.end_angle, &b.end_angle),
            }),
            (a, b) => pick(a, b),
        };

        Self {
            width: pick(&self.width, &later.width),
            height: pick(&self.height, &later.height),
            force,
            hierarchical,
            circular,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_later_values_win() {
        let mut options = LayoutOptions::default();
        options.update(&LayoutOptionsPatch {
            width: Some(640.0),
            force: Some(ForceOptionsPatch {
                iterations: Some(10),
                ..Default::default()
            }),
            ..Default::default()
        });

        assert_eq!(options.width, 640.0);
        assert_eq!(options.height, 800.0);
        assert_eq!(options.force.iterations, 10);
        assert_eq!(options.force.strength, 1000.0);
    }

    #[test]
    fn test_empty_patch_is_identity() {
        let options = LayoutOptions::default();
        assert_eq!(options.merged(&LayoutOptionsPatch::default()), options);
    }

    #[test]
    fn test_patch_then_combines_nested_fields() {
        let first = LayoutOptionsPatch {
            circular: Some(CircularOptionsPatch {
                radius: Some(100.0),
                start_angle: Some(1.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let second = LayoutOptionsPatch {
            circular: Some(CircularOptionsPatch {
                radius: Some(200.0),
                ..Default::default()
            }),
            ..Default::default()
        };

        let combined = first.then(&second);
        let circular = combined.circular.unwrap();
        assert_eq!(circular.radius, Some(200.0));
        assert_eq!(circular.start_angle, Some(1.0));
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("lr".parse::<Direction>(), Ok(Direction::LR));
        assert_eq!("TD".parse::<Direction>(), Ok(Direction::TB));
        assert!("diagonal".parse::<Direction>().is_err());
        assert!(Direction::BT.is_reversed());
        assert!(!Direction::RL.is_vertical());
    }

    #[test]
    fn test_patch_deserializes_partial_json() {
        let patch: LayoutOptionsPatch =
            serde_json::from_str(r#"{"hierarchical": {"levelDistance": 90}}"#).unwrap();
        let options = LayoutOptions::default().merged(&patch);
        assert_eq!(options.hierarchical.level_distance, 90.0);
        assert_eq!(options.hierarchical.direction, Direction::TB);
    }
}

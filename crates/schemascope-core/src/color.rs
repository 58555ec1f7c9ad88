//! Color handling for schema diagrams
//!
//! [`Color`] wraps the `DynamicColor` type from the color crate so that
//! style configuration can be written as plain CSS color strings and
//! rendered straight back into SVG attributes.

use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use color::DynamicColor;

/// A CSS color usable for fills, strokes and marker glyphs.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Color {
    color: DynamicColor,
}

impl Eq for Color {}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl Color {
    /// Parse a CSS color string such as `"#ff0000"`, `"rgb(255, 0, 0)"` or `"red"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use schemascope_core::color::Color;
    ///
    /// let accent = Color::new("#2563eb").unwrap();
    /// assert!(Color::new("definitely-not-a-color").is_err());
    /// # let _ = accent;
    /// ```
    pub fn new(color_str: &str) -> Result<Self, String> {
        DynamicColor::from_str(color_str)
            .map(|color| Self { color })
            .map_err(|err| format!("invalid color `{color_str}`: {err}"))
    }

    /// Returns a string usable inside an SVG `id` attribute.
    ///
    /// Marker definitions are generated per stroke color, so their ids
    /// embed the color. The result only contains alphanumerics and
    /// underscores and always starts with a letter.
    pub fn to_id_safe_string(self) -> String {
        let mut sanitized = self
            .to_string()
            .replace('#', "hex")
            .replace(['(', ')', ',', ' ', ';', '.', '%'], "_");

        if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            sanitized = format!("c_{sanitized}");
        }

        sanitized
    }

    /// Alpha component, written as `stroke-opacity`.
    pub fn alpha(&self) -> f32 {
        self.color.components[3]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new("black").expect("'black' is a valid CSS color")
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.color)
    }
}

impl From<Color> for svg::node::Value {
    fn from(color: Color) -> Self {
        Self::from(color.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_color_new() {
        assert!(Color::new("#ff0000").is_ok());
        assert!(Color::new("steelblue").is_ok());
        assert!(Color::new("not-a-color").is_err());
    }

    #[test]
    fn test_color_default_is_black() {
        assert_eq!(Color::default().to_string(), "black");
    }

    #[test]
    fn test_color_id_safe_string() {
        let safe = Color::new("rgb(10, 20, 30)").unwrap().to_id_safe_string();
        assert!(safe.chars().all(|c| c.is_alphanumeric() || c == '_'));
        assert!(safe.chars().next().is_some_and(|c| c.is_alphabetic()));
    }

    #[test]
    fn test_color_parse_via_from_str() {
        let parsed: Color = "blue".parse().unwrap();
        assert_eq!(parsed, Color::new("blue").unwrap());
    }

    #[test]
    fn test_color_eq_hash() {
        let mut set = HashSet::new();
        set.insert(Color::new("red").unwrap());
        assert!(set.contains(&Color::new("red").unwrap()));
        assert!(!set.contains(&Color::new("blue").unwrap()));
    }
}

//! Drawing primitives shared by renderers.
//!
//! - [`StrokeDefinition`] and [`LinePattern`] describe how outlines and paths are stroked.
//! - [`RenderLayer`] and [`LayeredOutput`] collect SVG nodes by z-order layer.

mod layer;
mod stroke;

pub use layer::{LayeredOutput, RenderLayer, SvgNode};
pub use stroke::{LinePattern, StrokeDefinition};

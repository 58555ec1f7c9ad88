//! Schemascope Core Types and Definitions
//!
//! This crate provides the foundational types for the Schemascope diagram
//! engine. It includes:
//!
//! - **Identifiers**: Typed identifiers for entities and relationships ([`identifier`])
//! - **Colors**: Color handling with CSS color support ([`color::Color`])
//! - **Geometry**: Basic geometric types and boundary intersection ([`geometry`] module)
//! - **Draw**: Stroke and render-layer primitives for SVG output ([`draw`] module)
//! - **Model**: Visual entities, relationships, layout options, interaction
//!   state and the per-diagram store ([`model`] module)

pub mod color;
pub mod draw;
pub mod geometry;
pub mod identifier;
pub mod model;

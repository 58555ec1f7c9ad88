//! JSON input format of the CLI.
//!
//! ```json
//! {
//!   "entities": [{"id": "users", "label": "Users", "type": "table"}],
//!   "relationships": [{"id": "r1", "source": "users", "target": "posts", "type": "oneToMany"}]
//! }
//! ```

use std::io;

use log::debug;
use serde::Deserialize;

use schemascope::{
    DiagramError,
    model::{VisualEntity, VisualRelationship},
};

/// Entities and relationships read from an input file.
#[derive(Debug, Default, Deserialize)]
pub struct DiagramInput {
    #[serde(default)]
    pub entities: Vec<VisualEntity>,
    #[serde(default)]
    pub relationships: Vec<VisualRelationship>,
}

/// Parses the JSON input document.
///
/// # Errors
///
/// Returns [`DiagramError::Io`] with [`io::ErrorKind::InvalidData`] for
/// malformed JSON or records that do not match the schema.
pub fn parse_input(source: &str) -> Result<DiagramInput, DiagramError> {
    let input: DiagramInput = serde_json::from_str(source).map_err(io::Error::from)?;
    debug!(
        entities = input.entities.len(),
        relationships = input.relationships.len();
        "Parsed input"
    );
    Ok(input)
}

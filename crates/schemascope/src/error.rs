//! Error types for Schemascope operations.
//!
//! [`DiagramError`] covers every failure a facade or controller call can
//! return. Configuration and container problems are fatal to the call that
//! hit them. Dangling relationship references are not errors at this level:
//! they surface as [`MissingEntity`] diagnostics while the rest of the
//! diagram renders.

use std::io;

use thiserror::Error;

pub use schemascope_core::model::MissingEntity;

/// The main error type for Schemascope operations.
#[derive(Debug, Error)]
pub enum DiagramError {
    /// Unknown layout or renderer name, or invalid option values.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The mount container is missing, detached or has no area.
    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    #[error("Missing entity: {0}")]
    MissingEntity(#[from] MissingEntity),

    /// The diagram controller has been destroyed.
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DiagramError {
    pub(crate) fn destroyed(diagram_id: &str, operation: &str) -> Self {
        Self::Lifecycle(format!(
            "cannot {operation}: diagram `{diagram_id}` has been destroyed"
        ))
    }
}

#[cfg(test)]
mod tests {
    use schemascope_core::model::EndpointRole;

    use super::*;

    #[test]
    fn test_missing_entity_converts() {
        let missing = MissingEntity {
            relationship: "r1".into(),
            entity: "ghost".into(),
            end: EndpointRole::Source,
        };
        let err: DiagramError = missing.into();
        assert_eq!(
            err.to_string(),
            "Missing entity: relationship `r1` references missing source entity `ghost`"
        );
    }

    #[test]
    fn test_destroyed_message() {
        let err = DiagramError::destroyed("d-1", "select");
        assert!(matches!(err, DiagramError::Lifecycle(_)));
        assert_eq!(
            err.to_string(),
            "Lifecycle error: cannot select: diagram `d-1` has been destroyed"
        );
    }
}

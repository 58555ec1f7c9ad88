//! Error adapter for converting Schemascope errors to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI. Skipped
//! relationships are not failures, so they are reported as warnings.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, Severity};

use schemascope::{DiagramError, error::MissingEntity};

/// Adapter for a relationship that was left out of the diagram.
pub struct MissingEntityAdapter<'a>(pub &'a MissingEntity);

impl fmt::Debug for MissingEntityAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for MissingEntityAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for MissingEntityAdapter<'_> {}

impl MietteDiagnostic for MissingEntityAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("schemascope::missing_entity"))
    }

    fn severity(&self) -> Option<Severity> {
        Some(Severity::Warning)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!(
            "add an entity with id `{}` or remove relationship `{}`",
            self.0.entity, self.0.relationship
        )))
    }
}

/// Adapter for [`DiagramError`] variants.
pub struct ErrorAdapter<'a>(pub &'a DiagramError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            DiagramError::Configuration(_) => "schemascope::configuration",
            DiagramError::InvalidContainer(_) => "schemascope::container",
            DiagramError::MissingEntity(_) => "schemascope::missing_entity",
            DiagramError::Lifecycle(_) => "schemascope::lifecycle",
            DiagramError::Export(_) => "schemascope::export",
            DiagramError::Io(_) => "schemascope::io",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.0 {
            DiagramError::Configuration(_) => Some(Box::new(
                "built-in layouts are `force`, `hierarchical` and `circular`; the renderer is `svg`",
            )),
            _ => None,
        }
    }
}

/// A reportable error or warning that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A relationship skipped because an endpoint is missing.
    Skipped(MissingEntityAdapter<'a>),
    /// An error that aborted the run.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Skipped(s) => fmt::Display::fmt(s, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Skipped(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Skipped(s) => s.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<Severity> {
        match self {
            Reportable::Skipped(s) => s.severity(),
            Reportable::Error(e) => e.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Skipped(s) => s.help(),
            Reportable::Error(e) => e.help(),
        }
    }
}

/// Convert a [`DiagramError`] into a list of reportable errors.
pub fn to_reportables(err: &DiagramError) -> Vec<Reportable<'_>> {
    match err {
        DiagramError::MissingEntity(missing) => {
            vec![Reportable::Skipped(MissingEntityAdapter(missing))]
        }
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

/// One warning per relationship skipped while rendering.
pub fn skipped_reportables(skipped: &[MissingEntity]) -> Vec<Reportable<'_>> {
    skipped
        .iter()
        .map(|missing| Reportable::Skipped(MissingEntityAdapter(missing)))
        .collect()
}

#[cfg(test)]
mod tests {
    use schemascope::model::EndpointRole;

    use super::*;

    fn missing() -> MissingEntity {
        MissingEntity {
            relationship: "r1".into(),
            entity: "ghost".into(),
            end: EndpointRole::Target,
        }
    }

    #[test]
    fn test_configuration_error_has_code_and_help() {
        let err = DiagramError::Configuration("unknown layout `spiral`".to_string());
        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 1);
        let reportable = &reportables[0];
        assert_eq!(
            reportable.to_string(),
            "Configuration error: unknown layout `spiral`"
        );
        assert_eq!(
            reportable.code().unwrap().to_string(),
            "schemascope::configuration"
        );
        assert!(reportable.help().is_some());
    }

    #[test]
    fn test_skipped_relationships_are_warnings() {
        let skipped = vec![missing(), missing()];
        let reportables = skipped_reportables(&skipped);

        assert_eq!(reportables.len(), 2);
        assert!(matches!(reportables[0].severity(), Some(Severity::Warning)));
        assert!(reportables[0].help().unwrap().to_string().contains("ghost"));
    }

    #[test]
    fn test_missing_entity_error_is_reported_as_skipped() {
        let err = DiagramError::from(missing());
        let reportables = to_reportables(&err);
        assert!(matches!(reportables.as_slice(), [Reportable::Skipped(_)]));
    }
}

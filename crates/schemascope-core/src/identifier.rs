//! Typed identifiers for diagram elements.
//!
//! Entity and relationship ids come from the upstream schema extraction and
//! are plain strings. Wrapping them in distinct types keeps an entity id from
//! being passed where a relationship id is expected.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a [`VisualEntity`](crate::model::VisualEntity), unique within a diagram.
    EntityId
);

string_id!(
    /// Identifier of a [`VisualRelationship`](crate::model::VisualRelationship), unique within a diagram.
    RelationshipId
);

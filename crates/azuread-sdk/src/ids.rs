//! Directory object and relationship identifiers.
//!
//! Directory object IDs are assigned by the remote directory and never
//! generated locally. Relationship IDs are composed locally as
//! `{parentId}/{childId}` and are the only key the host keeps between runs,
//! so they must round-trip through [`RelationshipId::parse`] without loss.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The identifier was empty.
    #[error("identifier is empty")]
    Empty,

    /// The identifier contains a character the directory never issues.
    #[error("identifier {value:?} contains invalid character {ch:?}")]
    InvalidCharacter { value: String, ch: char },

    /// A relationship ID did not have exactly two segments.
    #[error("expected an ID of the form {{parentId}}/{{childId}}, got {0:?}")]
    MalformedRelationship(String),

    /// A legacy path ID could not be recognised.
    #[error("unrecognised legacy ID {0:?}")]
    UnrecognisedLegacy(String),

    /// The value is not a UUID.
    #[error("expected a UUID, got {0:?}")]
    NotUuid(String),
}

/// Identifier of any object in the directory (user, group, application,
/// service principal, directory role, app role assignment, sync job).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DirectoryObjectId(String);

impl DirectoryObjectId {
    /// Parses an identifier, rejecting empty values and separators.
    pub fn parse(value: &str) -> Result<Self, IdError> {
        if value.is_empty() {
            return Err(IdError::Empty);
        }

        if let Some(ch) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(IdError::InvalidCharacter {
                value: value.to_string(),
                ch,
            });
        }

        Ok(Self(value.to_string()))
    }

    /// Parses an identifier that must also be a UUID (object IDs of
    /// principals, roles and applications).
    pub fn parse_uuid(value: &str) -> Result<Self, IdError> {
        let id = Self::parse(value)?;
        if !id.is_uuid() {
            return Err(IdError::NotUuid(value.to_string()));
        }
        Ok(id)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier is a UUID.
    #[must_use]
    pub fn is_uuid(&self) -> bool {
        Uuid::parse_str(&self.0).is_ok()
    }

    /// Compares two identifiers the way the directory does (ASCII
    /// case-insensitive).
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for DirectoryObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DirectoryObjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DirectoryObjectId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DirectoryObjectId> for String {
    fn from(id: DirectoryObjectId) -> Self {
        id.0
    }
}

impl AsRef<str> for DirectoryObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Composite `{parentId}/{childId}` identifier of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelationshipId {
    parent: DirectoryObjectId,
    child: DirectoryObjectId,
}

impl RelationshipId {
    /// Composes a relationship ID from its parts.
    #[must_use]
    pub fn new(parent: DirectoryObjectId, child: DirectoryObjectId) -> Self {
        Self { parent, child }
    }

    /// Parses a `{parentId}/{childId}` string.
    pub fn parse(value: &str) -> Result<Self, IdError> {
        let mut parts = value.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(parent), Some(child), None) => Ok(Self {
                parent: DirectoryObjectId::parse(parent)?,
                child: DirectoryObjectId::parse(child)?,
            }),
            _ => Err(IdError::MalformedRelationship(value.to_string())),
        }
    }

    /// Parses an ID written by older provider releases.
    ///
    /// Accepts the canonical form as well as `{parent}/{segment}/{child}`
    /// and `/{collection}/{parent}/{segment}/{child}`, where `segment` is one
    /// of `segments` (compared case-insensitively) and may itself contain a
    /// `/`, as in `synchronization/jobs`.
    pub fn parse_legacy(value: &str, segments: &[&str]) -> Result<Self, IdError> {
        if let Ok(id) = Self::parse(value) {
            return Ok(id);
        }

        let known = |middle: &[&str]| {
            let joined = middle.join("/");
            !middle.is_empty() && segments.iter().any(|s| s.eq_ignore_ascii_case(&joined))
        };

        let parts: Vec<&str> = value.trim_start_matches('/').split('/').collect();
        let (parent, child) = match parts.as_slice() {
            [parent, middle @ .., child] if known(middle) => (*parent, *child),
            [_collection, parent, middle @ .., child] if known(middle) => (*parent, *child),
            _ => return Err(IdError::UnrecognisedLegacy(value.to_string())),
        };

        Ok(Self {
            parent: DirectoryObjectId::parse(parent)?,
            child: DirectoryObjectId::parse(child)?,
        })
    }

    /// The parent directory object.
    #[must_use]
    pub fn parent(&self) -> &DirectoryObjectId {
        &self.parent
    }

    /// The child reference on the parent.
    #[must_use]
    pub fn child(&self) -> &DirectoryObjectId {
        &self.child
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent, self.child)
    }
}

impl FromStr for RelationshipId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RelationshipId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RelationshipId> for String {
    fn from(id: RelationshipId) -> Self {
        id.to_string()
    }
}

/// Returns true if `value` is a UUID. Used as a field validator.
pub fn validate_uuid(value: &str) -> Result<(), String> {
    Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| format!("expected a valid UUID, got {value:?}"))
}

/// Field validator for directory object IDs.
pub fn validate_object_id(value: &str) -> Result<(), String> {
    DirectoryObjectId::parse(value)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

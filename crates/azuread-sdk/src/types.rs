//! Shared enums for lifecycle operations and API routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Lifecycle operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Exists,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Create => "creating",
            Self::Read => "retrieving",
            Self::Update => "updating",
            Self::Delete => "deleting",
            Self::Exists => "checking for existence of",
        };
        f.write_str(verb)
    }
}

/// Version surface of the Graph API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiSurface {
    /// The `v1.0` endpoint.
    #[default]
    Stable,
    /// The `beta` endpoint.
    Beta,
}

impl ApiSurface {
    /// Path segment for this surface.
    #[must_use]
    pub fn version(&self) -> &'static str {
        match self {
            Self::Stable => "v1.0",
            Self::Beta => "beta",
        }
    }
}

impl fmt::Display for ApiSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.version())
    }
}

/// Per-operation choice of API surface.
///
/// Anything without an explicit route uses [`ApiSurface::Stable`].
#[derive(Debug, Clone, Default)]
pub struct SurfaceRoutes {
    routes: HashMap<(String, Operation), ApiSurface>,
}

impl SurfaceRoutes {
    /// Creates an empty routing table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes one operation of one resource type to `surface`.
    #[must_use]
    pub fn route(mut self, resource_type: &str, operation: Operation, surface: ApiSurface) -> Self {
        self.routes
            .insert((resource_type.to_string(), operation), surface);
        self
    }

    /// Looks up the surface for an operation.
    #[must_use]
    pub fn surface_for(&self, resource_type: &str, operation: Operation) -> ApiSurface {
        self.routes
            .get(&(resource_type.to_string(), operation))
            .copied()
            .unwrap_or_default()
    }
}

/// Deadlines per operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(10 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(10 * 60),
            delete: Duration::from_secs(5 * 60),
        }
    }
}

impl Timeouts {
    /// Deadline for `operation`. Existence checks share the read deadline.
    #[must_use]
    pub fn for_operation(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Create => self.create,
            Operation::Read | Operation::Exists => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }

    /// Uses the same deadline for every operation.
    #[must_use]
    pub fn uniform(duration: Duration) -> Self {
        Self {
            create: duration,
            read: duration,
            update: duration,
            delete: duration,
        }
    }
}

//! # Azure AD Provider SDK
//!
//! Framework shared by every relationship resource of the Azure AD provider.
//!
//! A relationship resource attaches a child reference to a parent directory
//! object (an owner to an application, a member to a group). Sibling
//! resources on the same parent mutate one remote collection, so every
//! mutating operation serialises on a per-parent named lock.
//!
//! ## Architecture
//!
//! - [`Resource`] - remote hooks each resource implements (find, add, fetch,
//!   converge, remove)
//! - [`Lifecycle`] - the common driver: validation, locking, deadlines and the
//!   404 semantics of read, delete and exists
//! - [`DynResource`] - type-erased JSON surface used by the provider registry
//! - [`LockManager`] - process-local named mutexes
//!
//! ## Crate Organization
//!
//! - [`ids`] - `DirectoryObjectId` and the `{parentId}/{childId}` relationship ID
//! - [`types`] - operations, API surfaces and deadlines
//! - [`error`] - error taxonomy returned to the host
//! - [`schema`] - static attribute tables and the attribute codec
//! - [`registration`] - service manifest entries

pub mod dispatch;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod locks;
pub mod registration;
pub mod schema;
pub mod suppress;
pub mod types;

pub use dispatch::{read_data_source, DataSource, DynResource, ResourceResponse};
pub use error::{RemoteFailure, ResourceError, ResourceResult};
pub use ids::{DirectoryObjectId, IdError, RelationshipId};
pub use lifecycle::{GoneReason, Lifecycle, OperationContext, Presence, ReadOutcome, Resource};
pub use locks::{LockGuard, LockManager};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::dispatch::{DataSource, DynResource, ResourceResponse};
    pub use crate::error::{BoxError, RemoteFailure, ResourceError, ResourceResult};
    pub use crate::ids::{validate_object_id, validate_uuid, DirectoryObjectId, IdError, RelationshipId};
    pub use crate::lifecycle::{
        GoneReason, Lifecycle, OperationContext, Presence, ReadOutcome, Resource,
    };
    pub use crate::locks::LockManager;
    pub use crate::registration::ServiceRegistration;
    pub use crate::schema::{Attributes, FieldSpec, Schema, SchemaError};
    pub use crate::suppress::DiffSuppress;
    pub use crate::types::{ApiSurface, Operation, SurfaceRoutes, Timeouts};
}

// Re-export async_trait for resource implementors
pub use async_trait::async_trait;

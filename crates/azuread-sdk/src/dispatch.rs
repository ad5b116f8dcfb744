//! Type-erased entry points used by the provider registry.
//!
//! The host speaks JSON attributes and string IDs. [`DynResource`] adapts
//! any [`Resource`] to that surface so the provider can keep resources of
//! different model types in one map.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::error::{ResourceError, ResourceResult};
use crate::ids::RelationshipId;
use crate::lifecycle::{Lifecycle, ReadOutcome, Resource};
use crate::schema::{Attributes, Schema};
use crate::types::Operation;

/// State returned to the host after an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceResponse {
    pub id: String,
    pub state: Value,
}

/// Object-safe view of a relationship resource.
#[async_trait]
pub trait DynResource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn attribute_schema(&self) -> Schema;

    fn updatable(&self) -> bool;

    /// Decodes `config` and creates the relationship.
    async fn create(&self, lifecycle: &Lifecycle, config: &Value) -> ResourceResult<ResourceResponse>;

    /// Reads state back. `None` means the resource should be dropped from
    /// state.
    async fn read(&self, lifecycle: &Lifecycle, id: &str) -> ResourceResult<Option<ResourceResponse>>;

    /// Applies changed attributes in place.
    async fn update(
        &self,
        lifecycle: &Lifecycle,
        id: &str,
        config: &Value,
    ) -> ResourceResult<ResourceResponse>;

    async fn delete(&self, lifecycle: &Lifecycle, id: &str) -> ResourceResult<()>;

    async fn exists(&self, lifecycle: &Lifecycle, id: &str) -> ResourceResult<bool>;

    /// Reads an existing remote relationship into state. Accepts any ID form
    /// the resource recognises and returns the canonical one.
    async fn import(&self, lifecycle: &Lifecycle, id: &str) -> ResourceResult<ResourceResponse>;
}

fn decode_model<R: Resource>(resource: &R, config: &Value) -> ResourceResult<R::Model> {
    let resource_type = resource.resource_type();
    let attrs = Attributes::decode(&resource.schema(), config)
        .map_err(|e| ResourceError::validation(resource_type, e.to_string()))?;
    resource
        .decode(&attrs)
        .map_err(|m| ResourceError::validation(resource_type, m))
}

fn parse_id<R: Resource>(resource: &R, id: &str) -> ResourceResult<RelationshipId> {
    resource
        .parse_id(id)
        .map_err(|e| ResourceError::validation(resource.resource_type(), e.to_string()))
}

fn respond<R: Resource>(resource: &R, id: &RelationshipId, model: &R::Model) -> ResourceResponse {
    let mut state = resource.encode(model).encode();
    if let Value::Object(object) = &mut state {
        object.insert("id".to_string(), Value::String(id.to_string()));
    }
    ResourceResponse {
        id: id.to_string(),
        state,
    }
}

#[async_trait]
impl<R: Resource> DynResource for R {
    fn type_name(&self) -> &'static str {
        Resource::resource_type(self)
    }

    fn attribute_schema(&self) -> Schema {
        Resource::schema(self)
    }

    fn updatable(&self) -> bool {
        Resource::supports_update(self)
    }

    async fn create(&self, lifecycle: &Lifecycle, config: &Value) -> ResourceResult<ResourceResponse> {
        let model = decode_model(self, config)?;
        let id = lifecycle.create(self, &model).await?;

        // Server-computed attributes only show up on read.
        match lifecycle.read(self, &id).await? {
            ReadOutcome::Present(current) => Ok(respond(self, &id, &current)),
            ReadOutcome::Gone(_) => Ok(respond(self, &id, &model)),
        }
    }

    async fn read(&self, lifecycle: &Lifecycle, id: &str) -> ResourceResult<Option<ResourceResponse>> {
        let id = parse_id(self, id)?;
        Ok(match lifecycle.read(self, &id).await? {
            ReadOutcome::Present(model) => Some(respond(self, &id, &model)),
            ReadOutcome::Gone(_) => None,
        })
    }

    async fn update(
        &self,
        lifecycle: &Lifecycle,
        id: &str,
        config: &Value,
    ) -> ResourceResult<ResourceResponse> {
        let id = parse_id(self, id)?;
        let desired = decode_model(self, config)?;
        lifecycle.update(self, &id, &desired).await?;

        match lifecycle.read(self, &id).await? {
            ReadOutcome::Present(current) => Ok(respond(self, &id, &current)),
            ReadOutcome::Gone(_) => Err(ResourceError::Gone {
                operation: Operation::Update,
                id: id.to_string(),
            }),
        }
    }

    async fn delete(&self, lifecycle: &Lifecycle, id: &str) -> ResourceResult<()> {
        let id = parse_id(self, id)?;
        lifecycle.delete(self, &id).await
    }

    async fn exists(&self, lifecycle: &Lifecycle, id: &str) -> ResourceResult<bool> {
        let id = parse_id(self, id)?;
        lifecycle.exists(self, &id).await
    }

    async fn import(&self, lifecycle: &Lifecycle, id: &str) -> ResourceResult<ResourceResponse> {
        let id = parse_id(self, id)?;
        match lifecycle.read(self, &id).await? {
            ReadOutcome::Present(model) => Ok(respond(self, &id, &model)),
            ReadOutcome::Gone(_) => Err(ResourceError::Gone {
                operation: Operation::Read,
                id: id.to_string(),
            }),
        }
    }
}

/// A read-only lookup exposed to configurations.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn read_timeout(&self) -> Duration {
        Duration::from_secs(5 * 60)
    }

    /// Produces the data source state for `config`.
    async fn read(&self, config: &Attributes) -> ResourceResult<ResourceResponse>;
}

/// Validates `config` against the data source schema and reads it under the
/// data source deadline.
pub async fn read_data_source(
    source: &dyn DataSource,
    config: &Value,
) -> ResourceResult<ResourceResponse> {
    let attrs = Attributes::decode(&source.schema(), config)
        .map_err(|e| ResourceError::validation(source.name(), e.to_string()))?;

    let deadline = source.read_timeout();
    tokio::time::timeout(deadline, source.read(&attrs))
        .await
        .unwrap_or_else(|_| {
            Err(ResourceError::Timeout {
                operation: Operation::Read,
                id: source.name().to_string(),
                after: deadline,
            })
        })
}

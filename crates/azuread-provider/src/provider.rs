//! Provider registry: resources and data sources by type name.

use azuread_graph::{GraphClient, GraphError};
use azuread_sdk::prelude::*;
use azuread_sdk::read_data_source;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::{ConfigError, ProviderConfig};
use crate::services::{self, SERVICES};

/// Errors raised by the provider registry.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("creating Graph client: {0}")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// No resource or data source of that type is registered.
    #[error("unknown resource type {0:?}")]
    UnknownResource(String),

    /// A type is implemented but missing from the service manifest, or
    /// listed in the manifest without an implementation.
    #[error("{0} is not registered by exactly one service")]
    Unregistered(String),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// The set of resources and data sources the provider serves, sharing one
/// Graph client and one lock registry.
#[derive(Clone)]
pub struct Provider {
    lifecycle: Lifecycle,
    resources: BTreeMap<&'static str, Arc<dyn DynResource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DataSource>>,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("lifecycle", &self.lifecycle)
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Provider {
    /// Builds the provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Graph client cannot be created or the
    /// registry is inconsistent.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = GraphClient::new(config.graph_config(), config.credentials())?;
        Self::with_client(client, config.surface_routes())
    }

    /// Builds the provider around an existing client.
    ///
    /// # Errors
    ///
    /// Returns an error if a schema is inconsistent or the registered types
    /// disagree with the service manifest.
    pub fn with_client(client: GraphClient, routes: SurfaceRoutes) -> Result<Self, ProviderError> {
        let mut resources = BTreeMap::new();
        for resource in services::resources(&client) {
            let name = resource.type_name();
            resource.attribute_schema().check_consistency(name)?;
            if resources.insert(name, resource).is_some() {
                return Err(ProviderError::Unregistered(name.to_string()));
            }
        }

        let mut data_sources = BTreeMap::new();
        for source in services::data_sources(&client) {
            let name = source.name();
            source.schema().check_consistency(name)?;
            if data_sources.insert(name, source).is_some() {
                return Err(ProviderError::Unregistered(name.to_string()));
            }
        }

        check_manifest(&resources, &data_sources)?;

        info!(
            resources = resources.len(),
            data_sources = data_sources.len(),
            "Azure AD provider initialised"
        );

        Ok(Self {
            lifecycle: Lifecycle::new(LockManager::new(), routes),
            resources,
            data_sources,
        })
    }

    /// The lifecycle driver shared by every resource.
    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    #[must_use]
    pub fn services(&self) -> &'static [ServiceRegistration] {
        SERVICES
    }

    /// Registered resource type names, sorted.
    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    /// Registered data source names, sorted.
    pub fn data_source_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }

    /// Looks up a resource by type name.
    pub fn resource(&self, resource_type: &str) -> Result<Arc<dyn DynResource>, ProviderError> {
        self.resources
            .get(resource_type)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    /// Looks up a data source by name.
    pub fn data_source(&self, name: &str) -> Result<Arc<dyn DataSource>, ProviderError> {
        self.data_sources
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResource(name.to_string()))
    }

    #[instrument(skip(self, config))]
    pub async fn create(&self, resource_type: &str, config: &Value) -> Result<ResourceResponse, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(resource.create(&self.lifecycle, config).await?)
    }

    /// Reads a resource. `None` tells the host to drop it from state.
    #[instrument(skip(self))]
    pub async fn read(&self, resource_type: &str, id: &str) -> Result<Option<ResourceResponse>, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(resource.read(&self.lifecycle, id).await?)
    }

    #[instrument(skip(self, config))]
    pub async fn update(
        &self,
        resource_type: &str,
        id: &str,
        config: &Value,
    ) -> Result<ResourceResponse, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(resource.update(&self.lifecycle, id, config).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, resource_type: &str, id: &str) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(resource.delete(&self.lifecycle, id).await?)
    }

    #[instrument(skip(self))]
    pub async fn exists(&self, resource_type: &str, id: &str) -> Result<bool, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(resource.exists(&self.lifecycle, id).await?)
    }

    /// Imports an existing relationship, accepting legacy ID forms.
    #[instrument(skip(self))]
    pub async fn import(&self, resource_type: &str, id: &str) -> Result<ResourceResponse, ProviderError> {
        let resource = self.resource(resource_type)?;
        let response = resource.import(&self.lifecycle, id).await?;
        debug!(id = %response.id, "imported {resource_type}");
        Ok(response)
    }

    #[instrument(skip(self, config))]
    pub async fn read_data_source(&self, name: &str, config: &Value) -> Result<ResourceResponse, ProviderError> {
        let source = self.data_source(name)?;
        Ok(read_data_source(source.as_ref(), config).await?)
    }
}

/// Every implemented type must be listed by exactly one service, and every
/// listed type must be implemented.
fn check_manifest(
    resources: &BTreeMap<&'static str, Arc<dyn DynResource>>,
    data_sources: &BTreeMap<&'static str, Arc<dyn DataSource>>,
) -> Result<(), ProviderError> {
    let implemented = resources.keys().chain(data_sources.keys());
    for name in implemented {
        let owners = SERVICES.iter().filter(|s| s.provides(name)).count();
        if owners != 1 {
            return Err(ProviderError::Unregistered((*name).to_string()));
        }
    }

    for service in SERVICES {
        for name in service.resources {
            if !resources.contains_key(name) {
                return Err(ProviderError::Unregistered((*name).to_string()));
            }
        }
        for name in service.data_sources {
            if !data_sources.contains_key(name) {
                return Err(ProviderError::Unregistered((*name).to_string()));
            }
        }
    }

    Ok(())
}

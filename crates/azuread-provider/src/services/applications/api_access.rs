//! `azuread_application_api_access`: the API permissions an application
//! requests from one API.
//!
//! All API access resources of an application share its
//! `requiredResourceAccess` collection, which Graph only accepts as a whole.
//! Every mutation therefore reads the application, edits the entry for this
//! API and writes the full collection back under the application lock.

use async_trait::async_trait;
use azuread_graph::models::{RequiredResourceAccess, ResourceAccess, ResourceAccessType};
use azuread_graph::{GraphClient, GraphError};
use azuread_sdk::prelude::*;
use azuread_sdk::schema::normalize_set;
use tracing::{debug, info};

use super::{application_resource_id, parse_application_id, validate_application_id, APPLICATION_RESOURCE_NAME};

static FIELDS: &[FieldSpec] = &[
    FieldSpec::string(
        "application_id",
        "The resource ID of the application to which this API access is granted",
    )
    .required()
    .force_new()
    .validated(validate_application_id),
    FieldSpec::string(
        "api_client_id",
        "The client ID of the API to which access is being granted",
    )
    .required()
    .force_new()
    .validated(validate_uuid)
    .suppress(DiffSuppress::CaseDifference),
    FieldSpec::string_set(
        "role_ids",
        "A set of role IDs to be granted to the application, as published by the API",
    )
    .validated(validate_uuid),
    FieldSpec::string_set(
        "scope_ids",
        "A set of scope IDs to be granted to the application, as published by the API",
    )
    .validated(validate_uuid),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiAccessModel {
    pub application_id: DirectoryObjectId,
    pub api_client_id: String,
    pub role_ids: Vec<String>,
    pub scope_ids: Vec<String>,
}

impl ApiAccessModel {
    fn from_entry(application_id: DirectoryObjectId, entry: &RequiredResourceAccess) -> Self {
        let ids_of = |kind: ResourceAccessType| {
            normalize_set(
                entry
                    .resource_access
                    .iter()
                    .filter(|a| a.kind == kind)
                    .map(|a| a.id.clone())
                    .collect(),
            )
        };

        Self {
            application_id,
            api_client_id: entry.resource_app_id.clone(),
            role_ids: ids_of(ResourceAccessType::Role),
            scope_ids: ids_of(ResourceAccessType::Scope),
        }
    }

    fn to_entry(&self) -> RequiredResourceAccess {
        let roles = self.role_ids.iter().map(|id| ResourceAccess {
            id: id.clone(),
            kind: ResourceAccessType::Role,
        });
        let scopes = self.scope_ids.iter().map(|id| ResourceAccess {
            id: id.clone(),
            kind: ResourceAccessType::Scope,
        });

        RequiredResourceAccess {
            resource_app_id: self.api_client_id.clone(),
            resource_access: roles.chain(scopes).collect(),
        }
    }

    fn grants_match(&self, other: &Self) -> bool {
        same_ids(&self.role_ids, &other.role_ids) && same_ids(&self.scope_ids, &other.scope_ids)
    }
}

/// Compares two normalized ID sets, ignoring case.
fn same_ids(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

/// Manages the permissions an application requests from a single API.
#[derive(Debug, Clone)]
pub struct ApplicationApiAccessResource {
    client: GraphClient,
}

impl ApplicationApiAccessResource {
    #[must_use]
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    async fn required_access(
        &self,
        surface: ApiSurface,
        application_id: &DirectoryObjectId,
    ) -> Result<Vec<RequiredResourceAccess>, GraphError> {
        let application = self
            .client
            .get_application(surface, application_id.as_str())
            .await?;
        Ok(application.required_resource_access)
    }

    async fn write_access(
        &self,
        surface: ApiSurface,
        application_id: &DirectoryObjectId,
        access: &[RequiredResourceAccess],
    ) -> Result<(), GraphError> {
        self.client
            .update_required_resource_access(surface, application_id.as_str(), access)
            .await
    }
}

#[async_trait]
impl Resource for ApplicationApiAccessResource {
    type Model = ApiAccessModel;
    type Error = GraphError;

    fn resource_type(&self) -> &'static str {
        "azuread_application_api_access"
    }

    fn lock_scope(&self) -> &'static str {
        APPLICATION_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(FIELDS)
    }

    fn decode(&self, attrs: &Attributes) -> Result<Self::Model, String> {
        let application_id = attrs.required_string("application_id").map_err(|e| e.to_string())?;
        let api_client_id = attrs.required_string("api_client_id").map_err(|e| e.to_string())?;

        Ok(ApiAccessModel {
            application_id: parse_application_id(application_id)?,
            api_client_id: api_client_id.to_string(),
            role_ids: attrs.string_set("role_ids"),
            scope_ids: attrs.string_set("scope_ids"),
        })
    }

    fn encode(&self, model: &Self::Model) -> Attributes {
        Attributes::new()
            .with_string("application_id", application_resource_id(&model.application_id))
            .with_string("api_client_id", &model.api_client_id)
            .with_string_set("role_ids", model.role_ids.iter().cloned())
            .with_string_set("scope_ids", model.scope_ids.iter().cloned())
    }

    fn validate(&self, model: &Self::Model) -> Result<(), String> {
        if model.role_ids.is_empty() && model.scope_ids.is_empty() {
            return Err("at least one of `role_ids` or `scope_ids` must be specified".to_string());
        }
        Ok(())
    }

    fn parent_of(&self, model: &Self::Model) -> Result<DirectoryObjectId, String> {
        Ok(model.application_id.clone())
    }

    fn planned_id(&self, model: &Self::Model) -> Option<RelationshipId> {
        DirectoryObjectId::parse(&model.api_client_id)
            .ok()
            .map(|api| RelationshipId::new(model.application_id.clone(), api))
    }

    fn parse_id(&self, id: &str) -> Result<RelationshipId, IdError> {
        RelationshipId::parse_legacy(id, &["apiAccess"])
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn find(
        &self,
        ctx: OperationContext,
        model: &Self::Model,
    ) -> Result<Option<RelationshipId>, GraphError> {
        let access = self.required_access(ctx.surface, &model.application_id).await?;
        let existing = access
            .iter()
            .find(|a| a.resource_app_id.eq_ignore_ascii_case(&model.api_client_id));

        match existing {
            Some(entry) => {
                let api = DirectoryObjectId::parse(&entry.resource_app_id).map_err(|e| {
                    GraphError::UnexpectedResponse(format!("invalid resourceAppId: {e}"))
                })?;
                Ok(Some(RelationshipId::new(model.application_id.clone(), api)))
            }
            None => Ok(None),
        }
    }

    async fn add(&self, ctx: OperationContext, model: &Self::Model) -> Result<RelationshipId, GraphError> {
        let mut access = self.required_access(ctx.surface, &model.application_id).await?;
        access.push(model.to_entry());
        self.write_access(ctx.surface, &model.application_id, &access).await?;

        let api = DirectoryObjectId::parse(&model.api_client_id)
            .map_err(|e| GraphError::UnexpectedResponse(format!("invalid api_client_id: {e}")))?;
        Ok(RelationshipId::new(model.application_id.clone(), api))
    }

    async fn fetch(
        &self,
        ctx: OperationContext,
        id: &RelationshipId,
    ) -> Result<Presence<Self::Model>, GraphError> {
        let access = self.required_access(ctx.surface, id.parent()).await?;
        let entry = access
            .iter()
            .find(|a| id.child().matches(&a.resource_app_id));

        Ok(match entry {
            Some(entry) => Presence::Present(ApiAccessModel::from_entry(id.parent().clone(), entry)),
            None => Presence::Absent,
        })
    }

    async fn converge(
        &self,
        ctx: OperationContext,
        id: &RelationshipId,
        current: &Self::Model,
        desired: &Self::Model,
    ) -> Result<usize, GraphError> {
        if current.grants_match(desired) {
            debug!("API access {id} already matches configuration");
            return Ok(0);
        }

        let mut access = self.required_access(ctx.surface, id.parent()).await?;
        let mut entry = desired.to_entry();
        match access
            .iter_mut()
            .find(|a| id.child().matches(&a.resource_app_id))
        {
            Some(existing) => {
                entry.resource_app_id = existing.resource_app_id.clone();
                *existing = entry;
            }
            None => access.push(entry),
        }

        self.write_access(ctx.surface, id.parent(), &access).await?;
        info!(
            "Updated API access {id}: {} roles, {} scopes",
            desired.role_ids.len(),
            desired.scope_ids.len()
        );
        Ok(1)
    }

    async fn remove(&self, ctx: OperationContext, id: &RelationshipId) -> Result<(), GraphError> {
        let mut access = self.required_access(ctx.surface, id.parent()).await?;
        let before = access.len();
        access.retain(|a| !id.child().matches(&a.resource_app_id));

        if access.len() == before {
            debug!("API access {id} was already removed");
            return Ok(());
        }

        self.write_access(ctx.surface, id.parent(), &access).await
    }
}

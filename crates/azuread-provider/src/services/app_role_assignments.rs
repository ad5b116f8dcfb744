//! App role assignments service: `azuread_app_role_assignment`.
//!
//! Assignments are created on the resource service principal's
//! `appRoleAssignedTo` collection. Graph assigns the ID, so the resource ID
//! is `{resourceObjectId}/{assignmentId}` and duplicates are detected by
//! principal and app role rather than by ID.

use async_trait::async_trait;
use azuread_graph::models::{AppRoleAssignment, NewAppRoleAssignment};
use azuread_graph::{GraphClient, GraphError};
use azuread_sdk::prelude::*;
use std::sync::Arc;

use crate::services::{found, required_object_id};

pub const REGISTRATION: ServiceRegistration = ServiceRegistration {
    name: "App Role Assignments",
    package: "app_role_assignments",
    github_label: Some("feature/app-role-assignments"),
    website_categories: &["App Role Assignments"],
    resources: &["azuread_app_role_assignment"],
    data_sources: &[],
};

pub(crate) fn resources(client: &GraphClient) -> Vec<Arc<dyn DynResource>> {
    vec![Arc::new(AppRoleAssignmentResource::new(client.clone()))]
}

/// App role ID granting default access, for resources that define no app roles.
pub const DEFAULT_ACCESS_APP_ROLE_ID: &str = "00000000-0000-0000-0000-000000000000";

static FIELDS: &[FieldSpec] = &[
    FieldSpec::string(
        "app_role_id",
        "The ID of the app role to be assigned, or the all-zero ID for default access",
    )
    .required()
    .force_new()
    .validated(validate_uuid),
    FieldSpec::string(
        "principal_object_id",
        "The object ID of the user, group or service principal to be assigned this app role",
    )
    .required()
    .force_new()
    .validated(validate_uuid),
    FieldSpec::string(
        "resource_object_id",
        "The object ID of the service principal representing the resource",
    )
    .required()
    .force_new()
    .validated(validate_uuid),
    FieldSpec::string(
        "principal_display_name",
        "The display name of the principal to which the app role is assigned",
    )
    .computed(),
    FieldSpec::string("principal_type", "The object type of the principal").computed(),
    FieldSpec::string(
        "resource_display_name",
        "The display name of the application representing the resource",
    )
    .computed(),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRoleAssignmentModel {
    pub app_role_id: String,
    pub principal_object_id: DirectoryObjectId,
    pub resource_object_id: DirectoryObjectId,
    pub principal_display_name: Option<String>,
    pub principal_type: Option<String>,
    pub resource_display_name: Option<String>,
}

impl AppRoleAssignmentModel {
    fn from_remote(assignment: &AppRoleAssignment) -> Result<Self, GraphError> {
        let parse = |value: &str| {
            DirectoryObjectId::parse(value).map_err(|e| {
                GraphError::UnexpectedResponse(format!("app role assignment {}: {e}", assignment.id))
            })
        };

        Ok(Self {
            app_role_id: assignment.app_role_id.clone(),
            principal_object_id: parse(&assignment.principal_id)?,
            resource_object_id: parse(&assignment.resource_id)?,
            principal_display_name: assignment.principal_display_name.clone(),
            principal_type: assignment.principal_type.clone(),
            resource_display_name: assignment.resource_display_name.clone(),
        })
    }

    fn is_same_grant(&self, assignment: &AppRoleAssignment) -> bool {
        self.principal_object_id.matches(&assignment.principal_id)
            && self.app_role_id.eq_ignore_ascii_case(&assignment.app_role_id)
    }
}

fn assignment_id(resource: &DirectoryObjectId, assignment: &AppRoleAssignment) -> Result<RelationshipId, GraphError> {
    let child = DirectoryObjectId::parse(&assignment.id)
        .map_err(|e| GraphError::UnexpectedResponse(format!("invalid app role assignment ID: {e}")))?;
    Ok(RelationshipId::new(resource.clone(), child))
}

/// Assigns an app role of a resource service principal to a user, group or
/// service principal.
#[derive(Debug, Clone)]
pub struct AppRoleAssignmentResource {
    client: GraphClient,
}

impl AppRoleAssignmentResource {
    #[must_use]
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for AppRoleAssignmentResource {
    type Model = AppRoleAssignmentModel;
    type Error = GraphError;

    fn resource_type(&self) -> &'static str {
        "azuread_app_role_assignment"
    }

    fn lock_scope(&self) -> &'static str {
        "azuread_service_principal"
    }

    fn schema(&self) -> Schema {
        Schema::new(FIELDS)
    }

    fn decode(&self, attrs: &Attributes) -> Result<Self::Model, String> {
        let app_role_id = attrs.required_string("app_role_id").map_err(|e| e.to_string())?;
        Ok(AppRoleAssignmentModel {
            app_role_id: app_role_id.to_string(),
            principal_object_id: required_object_id(attrs, "principal_object_id")?,
            resource_object_id: required_object_id(attrs, "resource_object_id")?,
            principal_display_name: attrs.string("principal_display_name").map(str::to_string),
            principal_type: attrs.string("principal_type").map(str::to_string),
            resource_display_name: attrs.string("resource_display_name").map(str::to_string),
        })
    }

    fn encode(&self, model: &Self::Model) -> Attributes {
        Attributes::new()
            .with_string("app_role_id", &model.app_role_id)
            .with_string("principal_object_id", model.principal_object_id.as_str())
            .with_string("resource_object_id", model.resource_object_id.as_str())
            .with_optional_string("principal_display_name", model.principal_display_name.as_deref())
            .with_optional_string("principal_type", model.principal_type.as_deref())
            .with_optional_string("resource_display_name", model.resource_display_name.as_deref())
    }

    fn parent_of(&self, model: &Self::Model) -> Result<DirectoryObjectId, String> {
        Ok(model.resource_object_id.clone())
    }

    fn parse_id(&self, id: &str) -> Result<RelationshipId, IdError> {
        RelationshipId::parse_legacy(id, &["appRoleAssignedTo"])
    }

    async fn find(
        &self,
        ctx: OperationContext,
        model: &Self::Model,
    ) -> Result<Option<RelationshipId>, GraphError> {
        let assignments = self
            .client
            .list_app_role_assigned_to(ctx.surface, model.resource_object_id.as_str())
            .await?;

        assignments
            .iter()
            .find(|a| model.is_same_grant(a))
            .map(|a| assignment_id(&model.resource_object_id, a))
            .transpose()
    }

    async fn add(&self, ctx: OperationContext, model: &Self::Model) -> Result<RelationshipId, GraphError> {
        let request = NewAppRoleAssignment {
            app_role_id: model.app_role_id.clone(),
            principal_id: model.principal_object_id.to_string(),
            resource_id: model.resource_object_id.to_string(),
        };
        let created = self
            .client
            .create_app_role_assigned_to(ctx.surface, &request)
            .await?;
        assignment_id(&model.resource_object_id, &created)
    }

    async fn fetch(
        &self,
        ctx: OperationContext,
        id: &RelationshipId,
    ) -> Result<Presence<Self::Model>, GraphError> {
        let assignment = found(
            self.client
                .get_app_role_assigned_to(ctx.surface, id.parent().as_str(), id.child().as_str())
                .await,
        )?;

        match assignment {
            Some(assignment) => Ok(Presence::Present(AppRoleAssignmentModel::from_remote(&assignment)?)),
            None => Ok(Presence::Absent),
        }
    }

    async fn remove(&self, ctx: OperationContext, id: &RelationshipId) -> Result<(), GraphError> {
        self.client
            .delete_app_role_assigned_to(ctx.surface, id.parent().as_str(), id.child().as_str())
            .await
    }
}

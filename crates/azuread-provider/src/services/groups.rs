//! Groups service: `azuread_group_member`.

use async_trait::async_trait;
use azuread_graph::{GraphClient, GraphError};
use azuread_sdk::prelude::*;
use std::sync::Arc;
use tracing::debug;

use crate::services::required_object_id;

pub const REGISTRATION: ServiceRegistration = ServiceRegistration {
    name: "Groups",
    package: "groups",
    github_label: Some("feature/groups"),
    website_categories: &["Groups"],
    resources: &["azuread_group_member"],
    data_sources: &[],
};

pub(crate) fn resources(client: &GraphClient) -> Vec<Arc<dyn DynResource>> {
    vec![Arc::new(GroupMemberResource::new(client.clone()))]
}

static FIELDS: &[FieldSpec] = &[
    FieldSpec::string(
        "group_object_id",
        "The object ID of the group you want to add the member to",
    )
    .required()
    .force_new()
    .validated(validate_uuid),
    FieldSpec::string(
        "member_object_id",
        "The object ID of the principal you want to add as a member to the group",
    )
    .required()
    .force_new()
    .validated(validate_uuid),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMemberModel {
    pub group_object_id: DirectoryObjectId,
    pub member_object_id: DirectoryObjectId,
}

#[derive(Debug, Clone)]
pub struct GroupMemberResource {
    client: GraphClient,
}

impl GroupMemberResource {
    #[must_use]
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    async fn is_member(
        &self,
        surface: ApiSurface,
        group_id: &DirectoryObjectId,
        member_id: &DirectoryObjectId,
    ) -> Result<bool, GraphError> {
        let members = self
            .client
            .list_group_members(surface, group_id.as_str())
            .await?;
        Ok(members.iter().any(|m| member_id.matches(&m.id)))
    }
}

#[async_trait]
impl Resource for GroupMemberResource {
    type Model = GroupMemberModel;
    type Error = GraphError;

    fn resource_type(&self) -> &'static str {
        "azuread_group_member"
    }

    fn lock_scope(&self) -> &'static str {
        "azuread_group"
    }

    fn schema(&self) -> Schema {
        Schema::new(FIELDS)
    }

    fn decode(&self, attrs: &Attributes) -> Result<Self::Model, String> {
        Ok(GroupMemberModel {
            group_object_id: required_object_id(attrs, "group_object_id")?,
            member_object_id: required_object_id(attrs, "member_object_id")?,
        })
    }

    fn encode(&self, model: &Self::Model) -> Attributes {
        Attributes::new()
            .with_string("group_object_id", model.group_object_id.as_str())
            .with_string("member_object_id", model.member_object_id.as_str())
    }

    fn parent_of(&self, model: &Self::Model) -> Result<DirectoryObjectId, String> {
        Ok(model.group_object_id.clone())
    }

    fn planned_id(&self, model: &Self::Model) -> Option<RelationshipId> {
        Some(RelationshipId::new(
            model.group_object_id.clone(),
            model.member_object_id.clone(),
        ))
    }

    fn parse_id(&self, id: &str) -> Result<RelationshipId, IdError> {
        RelationshipId::parse_legacy(id, &["members", "member"])
    }

    async fn find(
        &self,
        ctx: OperationContext,
        model: &Self::Model,
    ) -> Result<Option<RelationshipId>, GraphError> {
        let present = self
            .is_member(ctx.surface, &model.group_object_id, &model.member_object_id)
            .await?;
        Ok(present.then(|| self.planned_id(model)).flatten())
    }

    async fn add(&self, ctx: OperationContext, model: &Self::Model) -> Result<RelationshipId, GraphError> {
        self.client
            .add_group_member(
                ctx.surface,
                model.group_object_id.as_str(),
                model.member_object_id.as_str(),
            )
            .await?;
        Ok(RelationshipId::new(
            model.group_object_id.clone(),
            model.member_object_id.clone(),
        ))
    }

    async fn fetch(
        &self,
        ctx: OperationContext,
        id: &RelationshipId,
    ) -> Result<Presence<Self::Model>, GraphError> {
        if !self.is_member(ctx.surface, id.parent(), id.child()).await? {
            debug!("member {} not present in group {}", id.child(), id.parent());
            return Ok(Presence::Absent);
        }

        Ok(Presence::Present(GroupMemberModel {
            group_object_id: id.parent().clone(),
            member_object_id: id.child().clone(),
        }))
    }

    async fn remove(&self, ctx: OperationContext, id: &RelationshipId) -> Result<(), GraphError> {
        self.client
            .remove_group_member(ctx.surface, id.parent().as_str(), id.child().as_str())
            .await
    }
}

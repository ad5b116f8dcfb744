//! Directory roles service: `azuread_directory_role_member`.

use async_trait::async_trait;
use azuread_graph::{GraphClient, GraphError};
use azuread_sdk::prelude::*;
use std::sync::Arc;

use crate::services::required_object_id;

pub const REGISTRATION: ServiceRegistration = ServiceRegistration {
    name: "Directory Roles",
    package: "directory_roles",
    github_label: Some("feature/directory-roles"),
    website_categories: &["Directory Roles"],
    resources: &["azuread_directory_role_member"],
    data_sources: &[],
};

pub(crate) fn resources(client: &GraphClient) -> Vec<Arc<dyn DynResource>> {
    vec![Arc::new(DirectoryRoleMemberResource::new(client.clone()))]
}

static FIELDS: &[FieldSpec] = &[
    FieldSpec::string("role_object_id", "The object ID of the directory role")
        .required()
        .force_new()
        .validated(validate_uuid),
    FieldSpec::string(
        "member_object_id",
        "The object ID of the member principal",
    )
    .required()
    .force_new()
    .validated(validate_uuid),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRoleMemberModel {
    pub role_object_id: DirectoryObjectId,
    pub member_object_id: DirectoryObjectId,
}

/// Manages a single member of an activated directory role.
#[derive(Debug, Clone)]
pub struct DirectoryRoleMemberResource {
    client: GraphClient,
}

impl DirectoryRoleMemberResource {
    #[must_use]
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    async fn is_member(
        &self,
        surface: ApiSurface,
        role_id: &DirectoryObjectId,
        member_id: &DirectoryObjectId,
    ) -> Result<bool, GraphError> {
        let member = self
            .client
            .find_directory_role_member(surface, role_id.as_str(), member_id.as_str())
            .await?;
        Ok(member.is_some())
    }
}

#[async_trait]
impl Resource for DirectoryRoleMemberResource {
    type Model = DirectoryRoleMemberModel;
    type Error = GraphError;

    fn resource_type(&self) -> &'static str {
        "azuread_directory_role_member"
    }

    fn lock_scope(&self) -> &'static str {
        "azuread_directory_role"
    }

    fn schema(&self) -> Schema {
        Schema::new(FIELDS)
    }

    fn decode(&self, attrs: &Attributes) -> Result<Self::Model, String> {
        Ok(DirectoryRoleMemberModel {
            role_object_id: required_object_id(attrs, "role_object_id")?,
            member_object_id: required_object_id(attrs, "member_object_id")?,
        })
    }

    fn encode(&self, model: &Self::Model) -> Attributes {
        Attributes::new()
            .with_string("role_object_id", model.role_object_id.as_str())
            .with_string("member_object_id", model.member_object_id.as_str())
    }

    fn parent_of(&self, model: &Self::Model) -> Result<DirectoryObjectId, String> {
        Ok(model.role_object_id.clone())
    }

    fn planned_id(&self, model: &Self::Model) -> Option<RelationshipId> {
        Some(RelationshipId::new(
            model.role_object_id.clone(),
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
            .is_member(ctx.surface, &model.role_object_id, &model.member_object_id)
            .await?;
        Ok(present.then(|| self.planned_id(model)).flatten())
    }

    async fn add(&self, ctx: OperationContext, model: &Self::Model) -> Result<RelationshipId, GraphError> {
        self.client
            .add_directory_role_member(
                ctx.surface,
                model.role_object_id.as_str(),
                model.member_object_id.as_str(),
            )
            .await?;
        Ok(RelationshipId::new(
            model.role_object_id.clone(),
            model.member_object_id.clone(),
        ))
    }

    async fn fetch(
        &self,
        ctx: OperationContext,
        id: &RelationshipId,
    ) -> Result<Presence<Self::Model>, GraphError> {
        if !self.is_member(ctx.surface, id.parent(), id.child()).await? {
            return Ok(Presence::Absent);
        }

        Ok(Presence::Present(DirectoryRoleMemberModel {
            role_object_id: id.parent().clone(),
            member_object_id: id.child().clone(),
        }))
    }

    async fn remove(&self, ctx: OperationContext, id: &RelationshipId) -> Result<(), GraphError> {
        self.client
            .remove_directory_role_member(ctx.surface, id.parent().as_str(), id.child().as_str())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azuread_graph::{Credentials, GraphConfig};
    use serde_json::json;

    const ROLE: &str = "00000000-0000-0000-0000-0000000000a1";
    const MEMBER: &str = "00000000-0000-0000-0000-0000000000b2";

    fn resource() -> DirectoryRoleMemberResource {
        let client = GraphClient::new(
            GraphConfig::new("tenant"),
            Credentials {
                client_id: "client".into(),
                client_secret: "secret".to_string().into(),
            },
        )
        .unwrap();
        DirectoryRoleMemberResource::new(client)
    }

    #[test]
    fn test_schema_is_consistent() {
        let resource = resource();
        resource.schema().check_consistency(resource.resource_type()).unwrap();
        assert!(!resource.supports_update());
    }

    #[test]
    fn test_decode_requires_both_ids() {
        let resource = resource();
        let err = Attributes::decode(&resource.schema(), &json!({"role_object_id": ROLE})).unwrap_err();
        assert!(err.to_string().contains("member_object_id"));

        let attrs = Attributes::decode(
            &resource.schema(),
            &json!({"role_object_id": ROLE, "member_object_id": MEMBER}),
        )
        .unwrap();
        let model = resource.decode(&attrs).unwrap();
        assert_eq!(resource.parent_of(&model).unwrap().as_str(), ROLE);
    }

    #[test]
    fn test_parse_legacy_ids() {
        let resource = resource();
        let expected = format!("{ROLE}/{MEMBER}");
        for id in [
            expected.clone(),
            format!("{ROLE}/member/{MEMBER}"),
            format!("/directoryRoles/{ROLE}/members/{MEMBER}"),
        ] {
            assert_eq!(resource.parse_id(&id).unwrap().to_string(), expected);
        }
    }
}

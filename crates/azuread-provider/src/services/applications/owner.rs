//! `azuread_application_owner`: one owner reference on an application.

use async_trait::async_trait;
use azuread_graph::{GraphClient, GraphError};
use azuread_sdk::prelude::*;
use tracing::debug;

use super::{application_resource_id, parse_application_id, validate_application_id, APPLICATION_RESOURCE_NAME};
use crate::services::required_object_id;

static FIELDS: &[FieldSpec] = &[
    FieldSpec::string(
        "application_id",
        "The resource ID of the application to which the owner should be added",
    )
    .required()
    .force_new()
    .validated(validate_application_id),
    FieldSpec::string(
        "owner_object_id",
        "Object ID of the principal that will be granted ownership of the application",
    )
    .required()
    .force_new()
    .validated(validate_uuid),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationOwnerModel {
    pub application_id: DirectoryObjectId,
    pub owner_object_id: DirectoryObjectId,
}

/// Manages a single owner of an application.
#[derive(Debug, Clone)]
pub struct ApplicationOwnerResource {
    client: GraphClient,
}

impl ApplicationOwnerResource {
    #[must_use]
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    async fn has_owner(
        &self,
        surface: ApiSurface,
        application_id: &DirectoryObjectId,
        owner_id: &DirectoryObjectId,
    ) -> Result<bool, GraphError> {
        let owners = self
            .client
            .list_application_owners(surface, application_id.as_str())
            .await?;
        Ok(owners.iter().any(|o| owner_id.matches(&o.id)))
    }
}

#[async_trait]
impl Resource for ApplicationOwnerResource {
    type Model = ApplicationOwnerModel;
    type Error = GraphError;

    fn resource_type(&self) -> &'static str {
        "azuread_application_owner"
    }

    fn lock_scope(&self) -> &'static str {
        APPLICATION_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(FIELDS)
    }

    fn decode(&self, attrs: &Attributes) -> Result<Self::Model, String> {
        let application_id = attrs.required_string("application_id").map_err(|e| e.to_string())?;
        Ok(ApplicationOwnerModel {
            application_id: parse_application_id(application_id)?,
            owner_object_id: required_object_id(attrs, "owner_object_id")?,
        })
    }

    fn encode(&self, model: &Self::Model) -> Attributes {
        Attributes::new()
            .with_string("application_id", application_resource_id(&model.application_id))
            .with_string("owner_object_id", model.owner_object_id.as_str())
    }

    fn parent_of(&self, model: &Self::Model) -> Result<DirectoryObjectId, String> {
        Ok(model.application_id.clone())
    }

    fn planned_id(&self, model: &Self::Model) -> Option<RelationshipId> {
        Some(RelationshipId::new(
            model.application_id.clone(),
            model.owner_object_id.clone(),
        ))
    }

    fn parse_id(&self, id: &str) -> Result<RelationshipId, IdError> {
        RelationshipId::parse_legacy(id, &["owners", "owner"])
    }

    async fn find(
        &self,
        ctx: OperationContext,
        model: &Self::Model,
    ) -> Result<Option<RelationshipId>, GraphError> {
        let present = self
            .has_owner(ctx.surface, &model.application_id, &model.owner_object_id)
            .await?;
        Ok(present.then(|| {
            RelationshipId::new(model.application_id.clone(), model.owner_object_id.clone())
        }))
    }

    async fn add(&self, ctx: OperationContext, model: &Self::Model) -> Result<RelationshipId, GraphError> {
        self.client
            .add_application_owner(
                ctx.surface,
                model.application_id.as_str(),
                model.owner_object_id.as_str(),
            )
            .await?;
        Ok(RelationshipId::new(
            model.application_id.clone(),
            model.owner_object_id.clone(),
        ))
    }

    async fn fetch(
        &self,
        ctx: OperationContext,
        id: &RelationshipId,
    ) -> Result<Presence<Self::Model>, GraphError> {
        if !self.has_owner(ctx.surface, id.parent(), id.child()).await? {
            debug!("owner {} not present on application {}", id.child(), id.parent());
            return Ok(Presence::Absent);
        }

        Ok(Presence::Present(ApplicationOwnerModel {
            application_id: id.parent().clone(),
            owner_object_id: id.child().clone(),
        }))
    }

    async fn remove(&self, ctx: OperationContext, id: &RelationshipId) -> Result<(), GraphError> {
        self.client
            .remove_application_owner(ctx.surface, id.parent().as_str(), id.child().as_str())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azuread_graph::{Credentials, GraphConfig};
    use serde_json::json;

    const APP: &str = "00000000-0000-0000-0000-00000000000a";
    const OWNER: &str = "00000000-0000-0000-0000-00000000000b";

    fn resource() -> ApplicationOwnerResource {
        let client = GraphClient::new(
            GraphConfig::new("tenant"),
            Credentials {
                client_id: "client".into(),
                client_secret: "secret".to_string().into(),
            },
        )
        .unwrap();
        ApplicationOwnerResource::new(client)
    }

    #[test]
    fn test_schema_is_consistent() {
        let resource = resource();
        resource.schema().check_consistency(resource.resource_type()).unwrap();
        assert_eq!(
            resource.schema().force_new_fields(),
            vec!["application_id", "owner_object_id"]
        );
    }

    #[test]
    fn test_decode_and_encode() {
        let resource = resource();
        let attrs = Attributes::decode(
            &resource.schema(),
            &json!({"application_id": format!("/applications/{APP}"), "owner_object_id": OWNER}),
        )
        .unwrap();
        let model = resource.decode(&attrs).unwrap();
        assert_eq!(model.application_id.as_str(), APP);
        assert_eq!(
            resource.planned_id(&model).unwrap().to_string(),
            format!("{APP}/{OWNER}")
        );
        assert_eq!(resource.encode(&model), attrs);
    }

    #[test]
    fn test_rejects_non_uuid_owner() {
        let resource = resource();
        let err = Attributes::decode(
            &resource.schema(),
            &json!({"application_id": format!("/applications/{APP}"), "owner_object_id": "bob"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("owner_object_id"));
    }

    #[test]
    fn test_parse_legacy_ids() {
        let resource = resource();
        let canonical = resource.parse_id(&format!("{APP}/{OWNER}")).unwrap();
        let legacy = resource
            .parse_id(&format!("/applications/{APP}/owners/{OWNER}"))
            .unwrap();
        assert_eq!(canonical, legacy);
        assert!(resource.parse_id(&format!("{APP}/members/{OWNER}")).is_err());
    }
}

//! Application owners and API permission requests.

use azuread_sdk::types::ApiSurface;
use serde_json::json;
use tracing::{info, instrument};

use crate::models::{Application, DirectoryObject, RequiredResourceAccess};
use crate::{GraphClient, GraphResult, RequestOptions};

impl GraphClient {
    /// Retrieves an application with its `requiredResourceAccess`.
    #[instrument(skip(self))]
    pub async fn get_application(&self, surface: ApiSurface, application_id: &str) -> GraphResult<Application> {
        self.get(
            surface,
            &format!(
                "/applications/{application_id}?$select=id,appId,displayName,requiredResourceAccess"
            ),
        )
        .await
    }

    /// Replaces the application's `requiredResourceAccess` collection.
    #[instrument(skip(self, access))]
    pub async fn update_required_resource_access(
        &self,
        surface: ApiSurface,
        application_id: &str,
        access: &[RequiredResourceAccess],
    ) -> GraphResult<()> {
        self.patch(
            surface,
            &format!("/applications/{application_id}"),
            &json!({ "requiredResourceAccess": access }),
        )
        .await?;
        info!(
            "Updated required resource access of application {application_id} ({} APIs)",
            access.len()
        );
        Ok(())
    }

    /// Lists the owners of an application.
    #[instrument(skip(self))]
    pub async fn list_application_owners(
        &self,
        surface: ApiSurface,
        application_id: &str,
    ) -> GraphResult<Vec<DirectoryObject>> {
        self.list(surface, &format!("/applications/{application_id}/owners?$select=id"))
            .await
    }

    /// Adds an owner reference to an application.
    #[instrument(skip(self))]
    pub async fn add_application_owner(
        &self,
        surface: ApiSurface,
        application_id: &str,
        owner_id: &str,
    ) -> GraphResult<()> {
        let reference = self.directory_object_reference(surface, owner_id);
        self.post_no_content(
            surface,
            &format!("/applications/{application_id}/owners/$ref"),
            Some(&reference),
            RequestOptions::reference_add(),
        )
        .await
    }

    /// Removes an owner reference from an application.
    #[instrument(skip(self))]
    pub async fn remove_application_owner(
        &self,
        surface: ApiSurface,
        application_id: &str,
        owner_id: &str,
    ) -> GraphResult<()> {
        self.delete(
            surface,
            &format!("/applications/{application_id}/owners/{owner_id}/$ref"),
        )
        .await
    }
}

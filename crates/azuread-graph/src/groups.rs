//! Group membership.

use azuread_sdk::types::ApiSurface;
use tracing::instrument;

use crate::models::DirectoryObject;
use crate::{GraphClient, GraphResult, RequestOptions};

impl GraphClient {
    /// Lists direct members of a group.
    #[instrument(skip(self))]
    pub async fn list_group_members(
        &self,
        surface: ApiSurface,
        group_id: &str,
    ) -> GraphResult<Vec<DirectoryObject>> {
        self.list(surface, &format!("/groups/{group_id}/members?$select=id"))
            .await
    }

    #[instrument(skip(self))]
    pub async fn add_group_member(
        &self,
        surface: ApiSurface,
        group_id: &str,
        member_id: &str,
    ) -> GraphResult<()> {
        let reference = self.directory_object_reference(surface, member_id);
        self.post_no_content(
            surface,
            &format!("/groups/{group_id}/members/$ref"),
            Some(&reference),
            RequestOptions::reference_add(),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn remove_group_member(
        &self,
        surface: ApiSurface,
        group_id: &str,
        member_id: &str,
    ) -> GraphResult<()> {
        self.delete(
            surface,
            &format!("/groups/{group_id}/members/{member_id}/$ref"),
        )
        .await
    }
}

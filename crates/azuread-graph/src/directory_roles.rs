//! Directory role membership.

use azuread_sdk::types::ApiSurface;
use tracing::instrument;

use crate::client::{filter_query, odata_quote};
use crate::models::DirectoryObject;
use crate::{GraphClient, GraphResult, RequestOptions};

impl GraphClient {
    /// Looks up a single member of a directory role.
    #[instrument(skip(self))]
    pub async fn find_directory_role_member(
        &self,
        surface: ApiSurface,
        role_id: &str,
        member_id: &str,
    ) -> GraphResult<Option<DirectoryObject>> {
        let filter = filter_query(&format!("id eq {}", odata_quote(member_id)));
        let members: Vec<DirectoryObject> = self
            .list(
                surface,
                &format!("/directoryRoles/{role_id}/members?$select=id&{filter}"),
            )
            .await?;

        Ok(members
            .into_iter()
            .find(|m| m.id.eq_ignore_ascii_case(member_id)))
    }

    #[instrument(skip(self))]
    pub async fn add_directory_role_member(
        &self,
        surface: ApiSurface,
        role_id: &str,
        member_id: &str,
    ) -> GraphResult<()> {
        let reference = self.directory_object_reference(surface, member_id);
        self.post_no_content(
            surface,
            &format!("/directoryRoles/{role_id}/members/$ref"),
            Some(&reference),
            RequestOptions::reference_add(),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn remove_directory_role_member(
        &self,
        surface: ApiSurface,
        role_id: &str,
        member_id: &str,
    ) -> GraphResult<()> {
        self.delete(
            surface,
            &format!("/directoryRoles/{role_id}/members/{member_id}/$ref"),
        )
        .await
    }
}

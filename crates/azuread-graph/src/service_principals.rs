//! App role assignments and synchronization jobs of service principals.

use azuread_sdk::types::ApiSurface;
use serde_json::Value;
use tracing::{info, instrument};

use crate::models::{
    AppRoleAssignment, NewAppRoleAssignment, NewSynchronizationJob, SynchronizationJob,
};
use crate::{GraphClient, GraphResult, RequestOptions};

impl GraphClient {
    /// Lists app roles granted on a resource service principal.
    #[instrument(skip(self))]
    pub async fn list_app_role_assigned_to(
        &self,
        surface: ApiSurface,
        resource_id: &str,
    ) -> GraphResult<Vec<AppRoleAssignment>> {
        self.list(surface, &format!("/servicePrincipals/{resource_id}/appRoleAssignedTo"))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_app_role_assigned_to(
        &self,
        surface: ApiSurface,
        resource_id: &str,
        assignment_id: &str,
    ) -> GraphResult<AppRoleAssignment> {
        self.get(
            surface,
            &format!("/servicePrincipals/{resource_id}/appRoleAssignedTo/{assignment_id}"),
        )
        .await
    }

    #[instrument(skip(self, assignment))]
    pub async fn create_app_role_assigned_to(
        &self,
        surface: ApiSurface,
        assignment: &NewAppRoleAssignment,
    ) -> GraphResult<AppRoleAssignment> {
        let created: AppRoleAssignment = self
            .post(
                surface,
                &format!("/servicePrincipals/{}/appRoleAssignedTo", assignment.resource_id),
                assignment,
            )
            .await?;
        info!(
            "Assigned app role {} to principal {}",
            created.app_role_id, created.principal_id
        );
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn delete_app_role_assigned_to(
        &self,
        surface: ApiSurface,
        resource_id: &str,
        assignment_id: &str,
    ) -> GraphResult<()> {
        self.delete(
            surface,
            &format!("/servicePrincipals/{resource_id}/appRoleAssignedTo/{assignment_id}"),
        )
        .await
    }

    /// Lists provisioning jobs of a service principal.
    #[instrument(skip(self))]
    pub async fn list_synchronization_jobs(
        &self,
        surface: ApiSurface,
        service_principal_id: &str,
    ) -> GraphResult<Vec<SynchronizationJob>> {
        self.list(
            surface,
            &format!("/servicePrincipals/{service_principal_id}/synchronization/jobs"),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_synchronization_job(
        &self,
        surface: ApiSurface,
        service_principal_id: &str,
        job_id: &str,
    ) -> GraphResult<SynchronizationJob> {
        self.get(
            surface,
            &format!("/servicePrincipals/{service_principal_id}/synchronization/jobs/{job_id}"),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn create_synchronization_job(
        &self,
        surface: ApiSurface,
        service_principal_id: &str,
        template_id: &str,
    ) -> GraphResult<SynchronizationJob> {
        let body = NewSynchronizationJob {
            template_id: template_id.to_string(),
        };
        self.post(
            surface,
            &format!("/servicePrincipals/{service_principal_id}/synchronization/jobs"),
            &body,
        )
        .await
    }

    /// Starts (or resumes) a provisioning job.
    #[instrument(skip(self))]
    pub async fn start_synchronization_job(
        &self,
        surface: ApiSurface,
        service_principal_id: &str,
        job_id: &str,
    ) -> GraphResult<()> {
        self.post_no_content(
            surface,
            &format!(
                "/servicePrincipals/{service_principal_id}/synchronization/jobs/{job_id}/start"
            ),
            None::<&Value>,
            RequestOptions::default(),
        )
        .await
    }

    /// Pauses a provisioning job.
    #[instrument(skip(self))]
    pub async fn pause_synchronization_job(
        &self,
        surface: ApiSurface,
        service_principal_id: &str,
        job_id: &str,
    ) -> GraphResult<()> {
        self.post_no_content(
            surface,
            &format!(
                "/servicePrincipals/{service_principal_id}/synchronization/jobs/{job_id}/pause"
            ),
            None::<&Value>,
            RequestOptions::default(),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_synchronization_job(
        &self,
        surface: ApiSurface,
        service_principal_id: &str,
        job_id: &str,
    ) -> GraphResult<()> {
        self.delete(
            surface,
            &format!("/servicePrincipals/{service_principal_id}/synchronization/jobs/{job_id}"),
        )
        .await
    }
}

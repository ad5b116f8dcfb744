//! Synchronization service: `azuread_synchronization_job`.

use async_trait::async_trait;
use azuread_graph::models::SynchronizationJob;
use azuread_graph::{GraphClient, GraphError};
use azuread_sdk::prelude::*;
use std::sync::Arc;
use tracing::info;

use crate::services::{found, required_object_id};

pub const REGISTRATION: ServiceRegistration = ServiceRegistration {
    name: "Synchronization",
    package: "synchronization",
    github_label: Some("feature/synchronization"),
    website_categories: &["Synchronization"],
    resources: &["azuread_synchronization_job"],
    data_sources: &[],
};

pub(crate) fn resources(client: &GraphClient) -> Vec<Arc<dyn DynResource>> {
    vec![Arc::new(SynchronizationJobResource::new(client.clone()))]
}

static FIELDS: &[FieldSpec] = &[
    FieldSpec::string(
        "service_principal_id",
        "The object ID of the service principal for which this synchronization job should be created",
    )
    .required()
    .force_new()
    .validated(validate_uuid),
    FieldSpec::string("template_id", "Identifier of the synchronization template this job is based on")
        .required()
        .force_new()
        .validated(validate_template_id),
    FieldSpec::bool("enabled", "Whether or not the synchronization job is enabled").optional_computed(),
    FieldSpec::string_map("schedule", "Schedule of the synchronization job").computed(),
];

fn validate_template_id(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("template_id must not be empty".to_string());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynchronizationJobModel {
    pub service_principal_id: DirectoryObjectId,
    pub template_id: String,
    pub enabled: bool,
    pub schedule: Vec<(&'static str, String)>,
}

impl SynchronizationJobModel {
    fn from_remote(service_principal_id: DirectoryObjectId, job: &SynchronizationJob) -> Self {
        let schedule = job
            .schedule
            .as_ref()
            .map(|s| {
                [
                    ("expiration", s.expiration.clone()),
                    ("interval", s.interval.clone()),
                    ("state", s.state.clone()),
                ]
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect()
            })
            .unwrap_or_default();

        Self {
            service_principal_id,
            template_id: job.template_id.clone(),
            enabled: job.is_active(),
            schedule,
        }
    }
}

/// Manages a provisioning job on a service principal and whether it runs.
#[derive(Debug, Clone)]
pub struct SynchronizationJobResource {
    client: GraphClient,
}

impl SynchronizationJobResource {
    #[must_use]
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    async fn set_enabled(
        &self,
        surface: ApiSurface,
        id: &RelationshipId,
        enabled: bool,
    ) -> Result<(), GraphError> {
        let (sp, job) = (id.parent().as_str(), id.child().as_str());
        if enabled {
            self.client.start_synchronization_job(surface, sp, job).await?;
            info!("Started synchronization job {id}");
        } else {
            self.client.pause_synchronization_job(surface, sp, job).await?;
            info!("Paused synchronization job {id}");
        }
        Ok(())
    }
}

#[async_trait]
impl Resource for SynchronizationJobResource {
    type Model = SynchronizationJobModel;
    type Error = GraphError;

    fn resource_type(&self) -> &'static str {
        "azuread_synchronization_job"
    }

    fn lock_scope(&self) -> &'static str {
        "azuread_service_principal"
    }

    fn schema(&self) -> Schema {
        Schema::new(FIELDS)
    }

    fn decode(&self, attrs: &Attributes) -> Result<Self::Model, String> {
        let template_id = attrs.required_string("template_id").map_err(|e| e.to_string())?;
        Ok(SynchronizationJobModel {
            service_principal_id: required_object_id(attrs, "service_principal_id")?,
            template_id: template_id.to_string(),
            enabled: attrs.bool("enabled").unwrap_or(true),
            schedule: Vec::new(),
        })
    }

    fn encode(&self, model: &Self::Model) -> Attributes {
        Attributes::new()
            .with_string("service_principal_id", model.service_principal_id.as_str())
            .with_string("template_id", &model.template_id)
            .with_bool("enabled", model.enabled)
            .with_string_map("schedule", model.schedule.iter().cloned())
    }

    fn parent_of(&self, model: &Self::Model) -> Result<DirectoryObjectId, String> {
        Ok(model.service_principal_id.clone())
    }

    fn parse_id(&self, id: &str) -> Result<RelationshipId, IdError> {
        RelationshipId::parse_legacy(id, &["synchronization/jobs", "job"])
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn find(
        &self,
        ctx: OperationContext,
        model: &Self::Model,
    ) -> Result<Option<RelationshipId>, GraphError> {
        let jobs = self
            .client
            .list_synchronization_jobs(ctx.surface, model.service_principal_id.as_str())
            .await?;

        jobs.iter()
            .find(|j| j.template_id.eq_ignore_ascii_case(&model.template_id))
            .map(|j| {
                DirectoryObjectId::parse(&j.id)
                    .map(|job| RelationshipId::new(model.service_principal_id.clone(), job))
                    .map_err(|e| GraphError::UnexpectedResponse(format!("invalid job ID: {e}")))
            })
            .transpose()
    }

    async fn add(&self, ctx: OperationContext, model: &Self::Model) -> Result<RelationshipId, GraphError> {
        let job = self
            .client
            .create_synchronization_job(
                ctx.surface,
                model.service_principal_id.as_str(),
                &model.template_id,
            )
            .await?;
        let job_id = DirectoryObjectId::parse(&job.id)
            .map_err(|e| GraphError::UnexpectedResponse(format!("invalid job ID: {e}")))?;
        let id = RelationshipId::new(model.service_principal_id.clone(), job_id);

        if model.enabled {
            self.set_enabled(ctx.surface, &id, true).await?;
        }
        Ok(id)
    }

    async fn fetch(
        &self,
        ctx: OperationContext,
        id: &RelationshipId,
    ) -> Result<Presence<Self::Model>, GraphError> {
        let job = found(
            self.client
                .get_synchronization_job(ctx.surface, id.parent().as_str(), id.child().as_str())
                .await,
        )?;

        Ok(match job {
            Some(job) => Presence::Present(SynchronizationJobModel::from_remote(id.parent().clone(), &job)),
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
        if current.enabled == desired.enabled {
            return Ok(0);
        }
        self.set_enabled(ctx.surface, id, desired.enabled).await?;
        Ok(1)
    }

    async fn remove(&self, ctx: OperationContext, id: &RelationshipId) -> Result<(), GraphError> {
        self.client
            .delete_synchronization_job(ctx.surface, id.parent().as_str(), id.child().as_str())
            .await
    }
}

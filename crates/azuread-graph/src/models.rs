//! Graph entities used by the relationship resources.

use serde::{Deserialize, Serialize};

/// Minimal projection of any directory object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryObject {
    pub id: String,
    #[serde(rename = "@odata.type", default, skip_serializing_if = "Option::is_none")]
    pub odata_type: Option<String>,
}

/// Application registration, limited to the properties we manage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub required_resource_access: Vec<RequiredResourceAccess>,
}

/// API permissions an application requests from one resource API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredResourceAccess {
    pub resource_app_id: String,
    #[serde(default)]
    pub resource_access: Vec<ResourceAccess>,
}

/// One app role or OAuth2 permission scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAccess {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResourceAccessType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceAccessType {
    /// App role (application permission).
    Role,
    /// OAuth2 permission scope (delegated permission).
    Scope,
}

/// App role granted to a principal on a resource service principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRoleAssignment {
    pub id: String,
    pub app_role_id: String,
    pub principal_id: String,
    pub resource_id: String,
    #[serde(default)]
    pub principal_display_name: Option<String>,
    #[serde(default)]
    pub principal_type: Option<String>,
    #[serde(default)]
    pub resource_display_name: Option<String>,
}

/// Request body for a new app role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppRoleAssignment {
    pub app_role_id: String,
    pub principal_id: String,
    pub resource_id: String,
}

/// Provisioning job of a service principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizationJob {
    pub id: String,
    pub template_id: String,
    #[serde(default)]
    pub schedule: Option<SynchronizationSchedule>,
}

impl SynchronizationJob {
    /// A job runs unless its schedule says otherwise.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.schedule
            .as_ref()
            .and_then(|s| s.state.as_deref())
            .map_or(true, |state| state.eq_ignore_ascii_case("active"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizationSchedule {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub expiration: Option<String>,
}

/// Request body for a new synchronization job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSynchronizationJob {
    pub template_id: String,
}


/// Domain registered in the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    /// Fully qualified domain name.
    pub id: String,
    #[serde(default)]
    pub authentication_type: Option<String>,
    #[serde(default)]
    pub is_admin_managed: Option<bool>,
    #[serde(default)]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub is_initial: Option<bool>,
    #[serde(default)]
    pub is_root: Option<bool>,
    #[serde(default)]
    pub is_verified: Option<bool>,
    #[serde(default)]
    pub supported_services: Vec<String>,
}

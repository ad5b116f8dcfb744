//! Applications service: owners, API permissions and the published
//! application ID lookup.

mod api_access;
mod owner;
mod published_app_ids;

pub use api_access::{ApiAccessModel, ApplicationApiAccessResource};
pub use owner::{ApplicationOwnerModel, ApplicationOwnerResource};
pub use published_app_ids::{PublishedAppIdsDataSource, PUBLISHED_APIS};

use azuread_graph::GraphClient;
use azuread_sdk::prelude::*;
use std::sync::Arc;

/// Lock scope shared by every resource that mutates an application.
pub const APPLICATION_RESOURCE_NAME: &str = "azuread_application";

pub const REGISTRATION: ServiceRegistration = ServiceRegistration {
    name: "Applications",
    package: "applications",
    github_label: Some("feature/applications"),
    website_categories: &["Applications"],
    resources: &["azuread_application_api_access", "azuread_application_owner"],
    data_sources: &["azuread_application_published_app_ids"],
};

pub(crate) fn resources(client: &GraphClient) -> Vec<Arc<dyn DynResource>> {
    vec![
        Arc::new(ApplicationApiAccessResource::new(client.clone())),
        Arc::new(ApplicationOwnerResource::new(client.clone())),
    ]
}

pub(crate) fn data_sources() -> Vec<Arc<dyn DataSource>> {
    vec![Arc::new(PublishedAppIdsDataSource)]
}

/// Field validator for `application_id`: either `/applications/{objectId}`
/// or a bare object ID.
pub fn validate_application_id(value: &str) -> Result<(), String> {
    parse_application_id(value).map(|_| ())
}

/// Extracts the object ID from an application resource ID.
pub fn parse_application_id(value: &str) -> Result<DirectoryObjectId, String> {
    let object_id = match value.strip_prefix('/') {
        Some(path) => match path.split_once('/') {
            Some((collection, id)) if collection.eq_ignore_ascii_case("applications") => id,
            _ => {
                return Err(format!(
                    "expected an application ID of the form /applications/{{objectId}}, got {value:?}"
                ))
            }
        },
        None => value,
    };

    validate_uuid(object_id)?;
    DirectoryObjectId::parse(object_id).map_err(|e| e.to_string())
}

/// Resource ID of an application, as written to state.
#[must_use]
pub fn application_resource_id(object_id: &DirectoryObjectId) -> String {
    format!("/applications/{object_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP: &str = "00000000-0000-0000-0000-000000000001";

    #[test]
    fn test_parse_application_id() {
        let id = parse_application_id(&format!("/applications/{APP}")).unwrap();
        assert_eq!(id.as_str(), APP);
        assert_eq!(parse_application_id(APP).unwrap().as_str(), APP);
        assert_eq!(application_resource_id(&id), format!("/applications/{APP}"));
    }

    #[test]
    fn test_parse_application_id_rejects_other_collections() {
        assert!(parse_application_id(&format!("/groups/{APP}")).is_err());
        assert!(parse_application_id("/applications/not-a-uuid").is_err());
        assert!(parse_application_id(&format!("/applications/{APP}/owners")).is_err());
        assert!(validate_application_id("").is_err());
    }
}

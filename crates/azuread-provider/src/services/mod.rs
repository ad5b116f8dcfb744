//! Service packages and the static service manifest.
//!
//! Each service module contributes a [`ServiceRegistration`] and the
//! resources it implements. The manifest drives provider construction and
//! the labeler files written by the generator.

pub mod app_role_assignments;
pub mod applications;
pub mod directory_roles;
pub mod domains;
pub mod groups;
pub mod synchronization;

use azuread_graph::{GraphClient, GraphResult};
use azuread_sdk::prelude::*;
use std::sync::Arc;

/// Every service compiled into the provider.
pub const SERVICES: &[ServiceRegistration] = &[
    app_role_assignments::REGISTRATION,
    applications::REGISTRATION,
    directory_roles::REGISTRATION,
    domains::REGISTRATION,
    groups::REGISTRATION,
    synchronization::REGISTRATION,
];

/// Instantiates every resource of every service against `client`.
#[must_use]
pub fn resources(client: &GraphClient) -> Vec<Arc<dyn DynResource>> {
    let mut resources = Vec::new();
    resources.extend(app_role_assignments::resources(client));
    resources.extend(applications::resources(client));
    resources.extend(directory_roles::resources(client));
    resources.extend(groups::resources(client));
    resources.extend(synchronization::resources(client));
    resources
}

/// Instantiates every data source of every service against `client`.
#[must_use]
pub fn data_sources(client: &GraphClient) -> Vec<Arc<dyn DataSource>> {
    let mut data_sources = Vec::new();
    data_sources.extend(applications::data_sources());
    data_sources.extend(domains::data_sources(client));
    data_sources
}

/// Reads a required string attribute and parses it as a directory object ID.
pub(crate) fn required_object_id(attrs: &Attributes, name: &str) -> Result<DirectoryObjectId, String> {
    let value = attrs.required_string(name).map_err(|e| e.to_string())?;
    DirectoryObjectId::parse(value).map_err(|e| format!("parsing {name:?}: {e}"))
}

/// Maps a 404 from a lookup of the relationship object itself to `None`.
pub(crate) fn found<T>(result: GraphResult<T>) -> GraphResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_service_names_are_unique() {
        let names: BTreeSet<_> = SERVICES.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), SERVICES.len());

        let packages: BTreeSet<_> = SERVICES.iter().map(|s| s.package).collect();
        assert_eq!(packages.len(), SERVICES.len());
    }

    #[test]
    fn test_every_type_is_listed_once() {
        let mut seen = BTreeSet::new();
        for service in SERVICES {
            for name in service.resources.iter().chain(service.data_sources) {
                assert!(name.starts_with("azuread_"), "{name}");
                assert!(seen.insert(*name), "{name} is listed twice");
            }
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn test_data_sources_match_manifest() {
        let client = GraphClient::new(
            azuread_graph::GraphConfig::new("tenant"),
            azuread_graph::Credentials {
                client_id: "client".into(),
                client_secret: "secret".to_string().into(),
            },
        )
        .unwrap();
        for source in data_sources(&client) {
            assert!(SERVICES.iter().any(|s| s.data_sources.contains(&source.name())));
        }
    }

    #[test]
    fn test_found_maps_not_found() {
        let missing: GraphResult<()> = Err(azuread_graph::GraphError::Api {
            status: 404,
            code: "Request_ResourceNotFound".into(),
            message: "gone".into(),
        });
        assert!(found(missing).unwrap().is_none());

        let forbidden: GraphResult<()> = Err(azuread_graph::GraphError::Api {
            status: 403,
            code: "Authorization_RequestDenied".into(),
            message: "no".into(),
        });
        assert!(found(forbidden).is_err());
    }
}

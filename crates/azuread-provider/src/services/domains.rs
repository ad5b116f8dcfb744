//! Domains service: the `azuread_domains` data source.

use async_trait::async_trait;
use azuread_graph::models::Domain;
use azuread_graph::GraphClient;
use azuread_sdk::prelude::*;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

pub const REGISTRATION: ServiceRegistration = ServiceRegistration {
    name: "Domains",
    package: "domains",
    github_label: Some("feature/domains"),
    website_categories: &["Domains"],
    resources: &[],
    data_sources: &["azuread_domains"],
};

pub(crate) fn data_sources(client: &GraphClient) -> Vec<Arc<dyn DataSource>> {
    vec![Arc::new(DomainsDataSource::new(client.clone()))]
}

const DATA_SOURCE: &str = "azuread_domains";

static FIELDS: &[FieldSpec] = &[
    FieldSpec::bool(
        "admin_managed",
        "Set to `true` to only return domains whose DNS is managed by Microsoft 365",
    ),
    FieldSpec::bool(
        "include_unverified",
        "Set to `true` if unverified Azure AD domains should be included",
    ),
    FieldSpec::bool("only_default", "Set to `true` to only return the default domain"),
    FieldSpec::bool("only_initial", "Set to `true` to only return the initial domain"),
    FieldSpec::bool("only_root", "Set to `true` to only return verified root domains"),
    FieldSpec::string_set(
        "supports_services",
        "A list of supported services that must be supported by a domain",
    ),
    FieldSpec::object_list("domains", "A list of tenant domains").computed(),
];

/// Flags that cannot be combined with the listed ones.
const CONFLICTS: &[(&str, &[&str])] = &[
    ("include_unverified", &["only_default", "only_initial"]),
    ("only_default", &["only_initial", "only_root"]),
    ("only_initial", &["only_root"]),
];

/// Filters applied to the listed domains. Unset flags match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainFilter {
    pub admin_managed: bool,
    pub include_unverified: bool,
    pub only_default: bool,
    pub only_initial: bool,
    pub only_root: bool,
    pub supports_services: Vec<String>,
}

impl DomainFilter {
    /// Reads the filter from data source configuration, rejecting flags that
    /// conflict. A flag set to `false` never conflicts.
    pub fn from_config(config: &Attributes) -> Result<Self, String> {
        let enabled = |name: &str| config.bool(name).unwrap_or(false);

        for (flag, others) in CONFLICTS {
            if !enabled(flag) {
                continue;
            }
            if let Some(other) = others.iter().find(|o| enabled(o)) {
                return Err(format!("{flag:?} conflicts with {other:?}"));
            }
        }

        Ok(Self {
            admin_managed: enabled("admin_managed"),
            include_unverified: enabled("include_unverified"),
            only_default: enabled("only_default"),
            only_initial: enabled("only_initial"),
            only_root: enabled("only_root"),
            supports_services: config.string_set("supports_services"),
        })
    }

    /// A domain that does not report a property is not filtered on it.
    #[must_use]
    pub fn matches(&self, domain: &Domain) -> bool {
        let excluded = |wanted: bool, actual: Option<bool>| wanted && actual == Some(false);

        if excluded(self.admin_managed, domain.is_admin_managed)
            || excluded(self.only_default, domain.is_default)
            || excluded(self.only_initial, domain.is_initial)
            || excluded(self.only_root, domain.is_root)
            || excluded(!self.include_unverified, domain.is_verified)
        {
            return false;
        }

        self.supports_services
            .iter()
            .all(|service| domain.supported_services.contains(service))
    }
}

fn domain_state(domain: &Domain) -> Map<String, Value> {
    let flag = |value: Option<bool>| value.unwrap_or(false);
    let object = json!({
        "admin_managed": flag(domain.is_admin_managed),
        "authentication_type": domain.authentication_type.clone().unwrap_or_default(),
        "default": flag(domain.is_default),
        "domain_name": domain.id,
        "initial": flag(domain.is_initial),
        "root": flag(domain.is_root),
        "supported_services": domain.supported_services,
        "verified": flag(domain.is_verified),
    });
    match object {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// `domains#{tenant}#{digest}`, stable for the same tenant and result.
#[must_use]
pub fn data_source_id(tenant_id: &str, domain_names: &[&str]) -> String {
    let digest = Sha256::digest(domain_names.join("/").as_bytes());
    format!("domains#{tenant_id}#{}", URL_SAFE.encode(digest))
}

/// Lists tenant domains matching the configured filters.
#[derive(Debug, Clone)]
pub struct DomainsDataSource {
    client: GraphClient,
}

impl DomainsDataSource {
    #[must_use]
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for DomainsDataSource {
    fn name(&self) -> &'static str {
        DATA_SOURCE
    }

    fn schema(&self) -> Schema {
        Schema::new(FIELDS)
    }

    async fn read(&self, config: &Attributes) -> ResourceResult<ResourceResponse> {
        let filter = DomainFilter::from_config(config)
            .map_err(|message| ResourceError::validation(DATA_SOURCE, message))?;

        // Graph does not support OData filters on domains.
        let listed = self
            .client
            .list_domains(ApiSurface::Stable)
            .await
            .map_err(|e| ResourceError::remote(Operation::Read, DATA_SOURCE, e))?;

        let matched: Vec<&Domain> = listed.iter().filter(|d| filter.matches(d)).collect();
        debug!(listed = listed.len(), matched = matched.len(), "filtered domains");
        if matched.is_empty() {
            return Err(ResourceError::remote(
                Operation::Read,
                DATA_SOURCE,
                "no domains found for the provided filters",
            ));
        }

        let names: Vec<&str> = matched.iter().map(|d| d.id.as_str()).collect();
        let id = data_source_id(self.client.tenant_id(), &names);

        let mut state = config.clone();
        for (name, value) in [
            ("admin_managed", filter.admin_managed),
            ("include_unverified", filter.include_unverified),
            ("only_default", filter.only_default),
            ("only_initial", filter.only_initial),
            ("only_root", filter.only_root),
        ] {
            state = state.with_bool(name, value);
        }
        let mut state = state
            .with_string_set("supports_services", filter.supports_services)
            .with_object_list("domains", matched.into_iter().map(domain_state).collect())
            .encode();
        if let Value::Object(object) = &mut state {
            object.insert("id".to_string(), id.clone().into());
        }

        Ok(ResourceResponse { id, state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azuread_graph::{CloudEnvironment, Credentials, GraphConfig};
    use azuread_sdk::read_data_source;
    use wiremock::matchers::any;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn domain(id: &str, verified: bool, default: bool) -> Domain {
        Domain {
            id: id.to_string(),
            authentication_type: Some("Managed".to_string()),
            is_admin_managed: Some(true),
            is_default: Some(default),
            is_initial: Some(false),
            is_root: Some(true),
            is_verified: Some(verified),
            supported_services: vec!["Email".to_string()],
        }
    }

    fn filter(config: Value) -> Result<DomainFilter, String> {
        let attrs = Attributes::decode(&Schema::new(FIELDS), &config).unwrap();
        DomainFilter::from_config(&attrs)
    }

    #[test]
    fn test_schema_is_consistent() {
        Schema::new(FIELDS).check_consistency(DATA_SOURCE).unwrap();
    }

    #[test]
    fn test_conflicting_flags() {
        assert!(filter(json!({"only_default": true, "only_root": true})).is_err());
        assert!(filter(json!({"only_initial": true, "only_root": true})).is_err());
        assert!(filter(json!({"include_unverified": true, "only_initial": true})).is_err());
        assert!(filter(json!({"only_default": true, "only_root": false})).is_ok());
        assert!(filter(json!({"include_unverified": true, "only_root": true})).is_ok());
    }

    #[test]
    fn test_unverified_domains_are_excluded_by_default() {
        let unverified = domain("pending.example.com", false, false);
        assert!(!DomainFilter::default().matches(&unverified));
        assert!(filter(json!({"include_unverified": true})).unwrap().matches(&unverified));
    }

    #[test]
    fn test_filter_flags_and_services() {
        let verified = domain("example.com", true, false);
        assert!(filter(json!({"only_root": true})).unwrap().matches(&verified));
        assert!(!filter(json!({"only_default": true})).unwrap().matches(&verified));
        assert!(filter(json!({"supports_services": ["Email"]})).unwrap().matches(&verified));
        assert!(!filter(json!({"supports_services": ["Email", "Intune"]}))
            .unwrap()
            .matches(&verified));

        let unreported = Domain {
            is_default: None,
            ..verified
        };
        assert!(filter(json!({"only_default": true})).unwrap().matches(&unreported));
    }

    #[test]
    fn test_data_source_id_is_stable() {
        let first = data_source_id("tenant", &["a.com", "b.com"]);
        assert_eq!(first, data_source_id("tenant", &["a.com", "b.com"]));
        assert!(first.starts_with("domains#tenant#"));
        assert_ne!(first, data_source_id("tenant", &["a.com"]));
    }

    #[tokio::test]
    async fn test_conflict_is_rejected_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let config = GraphConfig::new("tenant").with_environment(CloudEnvironment::Custom {
            login: server.uri(),
            graph: server.uri(),
        });
        let client = GraphClient::new(
            config,
            Credentials {
                client_id: "client".to_string(),
                client_secret: "secret".to_string().into(),
            },
        )
        .unwrap();
        let source = DomainsDataSource::new(client);

        let err = read_data_source(&source, &json!({"only_default": true, "only_initial": true}))
            .await
            .unwrap_err();
        assert!(err.is_validation(), "{err}");
        assert!(err.to_string().contains("\"only_default\" conflicts with \"only_initial\""));
    }
}

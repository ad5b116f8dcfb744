use azuread_graph::{CloudEnvironment, Credentials, GraphConfig, RetryPolicy};
use azuread_sdk::types::{ApiSurface, Operation, SurfaceRoutes};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Resource types whose Delete is routed to the beta API unless configured
/// otherwise.
pub const DEFAULT_BETA_DELETE_RESOURCES: &[&str] = &["azuread_synchronization_job"];

/// Provider configuration.
#[derive(Debug)]
pub struct ProviderConfig {
    /// Tenant the provider authenticates against.
    pub tenant_id: String,

    /// Application (client) ID of the service principal.
    pub client_id: String,

    /// Client secret of the service principal.
    pub client_secret: SecretString,

    /// National cloud. Default: global.
    pub environment: CloudEnvironment,

    /// Per-request timeout for Graph calls. Default: 30 seconds.
    pub graph_timeout: Duration,

    /// Retries for throttled or transiently failing Graph calls. Default: 5.
    pub max_retries: u32,

    /// Resource types whose Delete goes to the beta API.
    pub beta_delete_resources: Vec<String>,
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// This allows tests to supply variables without mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let required = |key: &str| {
            reader(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.into()))
        };

        let tenant_id = required("ARM_TENANT_ID")?;
        let client_id = required("ARM_CLIENT_ID")?;
        let client_secret = SecretString::from(required("ARM_CLIENT_SECRET")?);

        let environment = reader("ARM_ENVIRONMENT")
            .unwrap_or_else(|_| "global".to_string())
            .parse::<CloudEnvironment>()
            .map_err(|e| ConfigError::InvalidValue("ARM_ENVIRONMENT".into(), e.to_string()))?;

        let graph_timeout_secs = reader("AZUREAD_GRAPH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidValue("AZUREAD_GRAPH_TIMEOUT_SECS".into(), e.to_string())
            })?;
        if graph_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "AZUREAD_GRAPH_TIMEOUT_SECS".into(),
                "must be greater than zero".into(),
            ));
        }

        let max_retries = reader("AZUREAD_GRAPH_MAX_RETRIES")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidValue("AZUREAD_GRAPH_MAX_RETRIES".into(), e.to_string())
            })?;

        let beta_delete_resources = match reader("AZUREAD_BETA_DELETE_RESOURCES") {
            Ok(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => DEFAULT_BETA_DELETE_RESOURCES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        };

        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
            environment,
            graph_timeout: Duration::from_secs(graph_timeout_secs),
            max_retries,
            beta_delete_resources,
        })
    }

    /// Graph client settings derived from this configuration.
    #[must_use]
    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig::new(self.tenant_id.clone())
            .with_environment(self.environment.clone())
            .with_request_timeout(self.graph_timeout)
            .with_retry(RetryPolicy::default().with_max_retries(self.max_retries))
    }

    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            client_id: self.client_id.clone(),
            client_secret: SecretString::from(self.client_secret.expose_secret().to_string()),
        }
    }

    /// API surface routing table derived from this configuration.
    #[must_use]
    pub fn surface_routes(&self) -> SurfaceRoutes {
        self.beta_delete_resources
            .iter()
            .fold(SurfaceRoutes::new(), |routes, resource_type| {
                routes.route(resource_type, Operation::Delete, ApiSurface::Beta)
            })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

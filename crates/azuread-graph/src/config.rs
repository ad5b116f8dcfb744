//! Cloud endpoints and client configuration.

use secrecy::SecretString;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::retry::RetryPolicy;
use crate::{GraphError, GraphResult};

/// National cloud the tenant lives in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CloudEnvironment {
    #[default]
    Global,
    UsGovernment,
    China,
    Germany,
    /// Explicit endpoints, used against local mock servers.
    Custom { login: String, graph: String },
}

impl CloudEnvironment {
    /// Base URL of the token service, without a trailing slash.
    #[must_use]
    pub fn login_endpoint(&self) -> &str {
        match self {
            Self::Global => "https://login.microsoftonline.com",
            Self::UsGovernment => "https://login.microsoftonline.us",
            Self::China => "https://login.chinacloudapi.cn",
            Self::Germany => "https://login.microsoftonline.de",
            Self::Custom { login, .. } => login.trim_end_matches('/'),
        }
    }

    /// Base URL of Microsoft Graph, without a trailing slash.
    #[must_use]
    pub fn graph_endpoint(&self) -> &str {
        match self {
            Self::Global => "https://graph.microsoft.com",
            Self::UsGovernment => "https://graph.microsoft.us",
            Self::China => "https://microsoftgraph.chinacloudapi.cn",
            Self::Germany => "https://graph.microsoft.de",
            Self::Custom { graph, .. } => graph.trim_end_matches('/'),
        }
    }
}

impl FromStr for CloudEnvironment {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "global" | "public" => Ok(Self::Global),
            "usgovernment" | "usgovernmentl4" | "usgovernmentl5" => Ok(Self::UsGovernment),
            "china" => Ok(Self::China),
            "germany" => Ok(Self::Germany),
            other => Err(GraphError::Config(format!(
                "unknown environment {other:?}, expected one of global, usgovernment, china, germany"
            ))),
        }
    }
}

impl fmt::Display for CloudEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::UsGovernment => f.write_str("usgovernment"),
            Self::China => f.write_str("china"),
            Self::Germany => f.write_str("germany"),
            Self::Custom { graph, .. } => write!(f, "custom({graph})"),
        }
    }
}

/// Client credentials of the service principal the provider runs as.
#[derive(Debug)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Settings for [`GraphClient`](crate::GraphClient).
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub environment: CloudEnvironment,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Delay before the single retry of a reference add that hit a 404.
    pub not_found_retry_delay: Duration,
}

impl GraphConfig {
    /// Creates a configuration for `tenant_id` with default settings.
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            environment: CloudEnvironment::default(),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            not_found_retry_delay: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn with_environment(mut self, environment: CloudEnvironment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_not_found_retry_delay(mut self, delay: Duration) -> Self {
        self.not_found_retry_delay = delay;
        self
    }

    /// Checks the settings before a client is built.
    pub fn validate(&self) -> GraphResult<()> {
        if self.tenant_id.trim().is_empty() {
            return Err(GraphError::Config("tenant ID must not be empty".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(GraphError::Config("request timeout must be > 0".to_string()));
        }
        if let CloudEnvironment::Custom { login, graph } = &self.environment {
            check_endpoint("login", login)?;
            check_endpoint("graph", graph)?;
        }
        self.retry.validate().map_err(GraphError::Config)
    }
}

fn check_endpoint(kind: &str, endpoint: &str) -> GraphResult<()> {
    let url = Url::parse(endpoint)?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(GraphError::Config(format!(
            "{kind} endpoint {endpoint:?} must be an absolute http(s) URL"
        )));
    }
    Ok(())
}

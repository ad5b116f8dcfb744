//! Common test utilities for azuread-provider integration tests.

#![allow(dead_code)]

use azuread_graph::{CloudEnvironment, Credentials, GraphClient, GraphConfig, RetryPolicy};
use azuread_provider::config::DEFAULT_BETA_DELETE_RESOURCES;
use azuread_provider::Provider;
use azuread_sdk::types::{ApiSurface, Operation, SurfaceRoutes};
use serde_json::{json, Value};
use std::sync::Once;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TENANT: &str = "test-tenant";

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        }
    });
}

/// Wraps items in an OData collection.
pub fn odata_list(items: Vec<Value>) -> Value {
    json!({ "value": items })
}

pub fn odata_error(code: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// A 404 the way Graph reports a missing object.
pub fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(odata_error(
        "Request_ResourceNotFound",
        "Resource does not exist or one of its queried reference-property objects are not present.",
    ))
}

/// Mock server standing in for both the login service and Graph.
pub struct MockGraphServer {
    pub server: MockServer,
}

impl MockGraphServer {
    /// Starts a server with the token endpoint already mounted.
    pub async fn new() -> Self {
        init_test_logging();
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "mock-access-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        Self { server }
    }

    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// OData reference body pointing at a directory object on this server.
    pub fn reference(&self, object_id: &str) -> Value {
        json!({ "@odata.id": format!("{}/v1.0/directoryObjects/{object_id}", self.url()) })
    }

    /// Provider pointed at this server, with the default beta routing.
    pub fn provider(&self) -> Provider {
        let config = GraphConfig::new(TENANT)
            .with_environment(CloudEnvironment::Custom {
                login: self.url(),
                graph: self.url(),
            })
            .with_retry(RetryPolicy::for_testing())
            .with_not_found_retry_delay(Duration::from_millis(10));

        let client = GraphClient::new(
            config,
            Credentials {
                client_id: "test-client".to_string(),
                client_secret: "test-secret".to_string().into(),
            },
        )
        .expect("client");

        let routes = DEFAULT_BETA_DELETE_RESOURCES
            .iter()
            .fold(SurfaceRoutes::new(), |routes, resource_type| {
                routes.route(resource_type, Operation::Delete, ApiSurface::Beta)
            });

        Provider::with_client(client, routes).expect("provider")
    }

    /// Requests received so far, excluding token acquisition.
    pub async fn graph_requests(&self) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| !r.url.path().ends_with("/oauth2/v2.0/token"))
            .collect()
    }
}

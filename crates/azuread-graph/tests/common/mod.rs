//! Common test utilities for azuread-graph integration tests.

#![allow(dead_code)]

use azuread_graph::{CloudEnvironment, Credentials, GraphClient, GraphConfig, RetryPolicy};
use serde_json::{json, Value};
use std::sync::Once;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TENANT: &str = "test-tenant";

static INIT: Once = Once::new();

/// Installs a test log writer once when `RUST_LOG` is set.
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
pub fn create_odata_response(items: Vec<Value>, next_link: Option<&str>) -> Value {
    let mut response = json!({ "value": items });
    if let Some(link) = next_link {
        response["@odata.nextLink"] = json!(link);
    }
    response
}

/// Creates an OData error response.
pub fn create_odata_error(code: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// Creates a mock OAuth token response.
pub fn create_token_response(access_token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in
    })
}

/// Mock server standing in for both the login service and Graph.
pub struct MockGraphServer {
    pub server: MockServer,
}

impl MockGraphServer {
    pub async fn new() -> Self {
        init_test_logging();
        let server = MockServer::start().await;
        Self { server }
    }

    pub fn url(&self) -> String {
        self.server.uri()
    }

    pub fn environment(&self) -> CloudEnvironment {
        CloudEnvironment::Custom {
            login: self.url(),
            graph: self.url(),
        }
    }

    /// Client pointed at this server with short retry delays.
    pub fn client(&self) -> GraphClient {
        let config = GraphConfig::new(TENANT)
            .with_environment(self.environment())
            .with_retry(RetryPolicy::for_testing())
            .with_not_found_retry_delay(Duration::from_millis(10));

        GraphClient::new(
            config,
            Credentials {
                client_id: "test-client".to_string(),
                client_secret: "test-secret".to_string().into(),
            },
        )
        .expect("client")
    }

    /// Sets up the OAuth token endpoint.
    pub async fn mock_token_endpoint(&self) {
        Mock::given(method("POST"))
            .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_token_response("mock-access-token", 3600)),
            )
            .mount(&self.server)
            .await;
    }
}

//! Microsoft Graph HTTP client with retries and pagination.

use azuread_sdk::types::ApiSurface;
use reqwest::header::RETRY_AFTER;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::odata::{ODataError, ODataList, ReferenceCreate};
use crate::retry::RetryPolicy;
use crate::{CloudEnvironment, Credentials, GraphConfig, GraphError, GraphResult, TokenCache};

/// Per-request behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Retry exactly once when Graph answers 404. Directory objects created
    /// moments earlier are not always visible to every replica yet.
    pub retry_once_on_not_found: bool,
}

impl RequestOptions {
    /// Options for adding a reference to a freshly created object.
    #[must_use]
    pub fn reference_add() -> Self {
        Self {
            retry_once_on_not_found: true,
        }
    }
}

/// Microsoft Graph API client.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http_client: reqwest::Client,
    token_cache: Arc<TokenCache>,
    environment: CloudEnvironment,
    tenant_id: String,
    retry: RetryPolicy,
    not_found_retry_delay: Duration,
}

impl GraphClient {
    /// Creates a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: GraphConfig, credentials: Credentials) -> GraphResult<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GraphError::Config(format!("failed to create HTTP client: {e}")))?;

        let token_cache = TokenCache::new(
            credentials,
            config.environment.clone(),
            config.tenant_id.clone(),
        );

        Ok(Self {
            http_client,
            token_cache: Arc::new(token_cache),
            environment: config.environment,
            tenant_id: config.tenant_id,
            retry: config.retry,
            not_found_retry_delay: config.not_found_retry_delay,
        })
    }

    #[must_use]
    pub fn environment(&self) -> &CloudEnvironment {
        &self.environment
    }

    /// Tenant the client authenticates against.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Absolute URL of `path` on the given API surface.
    #[must_use]
    pub fn url(&self, surface: ApiSurface, path: &str) -> String {
        format!(
            "{}/{}{}",
            self.environment.graph_endpoint(),
            surface.version(),
            path
        )
    }

    /// Reference body pointing at a directory object, for `$ref` adds.
    #[must_use]
    pub fn directory_object_reference(&self, surface: ApiSurface, id: &str) -> ReferenceCreate {
        ReferenceCreate {
            odata_id: self.url(surface, &format!("/directoryObjects/{id}")),
        }
    }

    /// GETs a single entity.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, surface: ApiSurface, path: &str) -> GraphResult<T> {
        let url = self.url(surface, path);
        let response = self
            .send(Method::GET, &url, None, RequestOptions::default())
            .await?;
        Ok(response.json().await?)
    }

    /// GETs every page of a collection, following `@odata.nextLink`.
    #[instrument(skip(self))]
    pub async fn list<T: DeserializeOwned>(&self, surface: ApiSurface, path: &str) -> GraphResult<Vec<T>> {
        let mut url = self.url(surface, path);
        let mut items = Vec::new();

        loop {
            debug!("Fetching page: {}", url);
            let response = self
                .send(Method::GET, &url, None, RequestOptions::default())
                .await?;
            let page: ODataList<T> = response.json().await?;
            items.extend(page.value);

            match page.next_link {
                Some(next) => url = self.next_page(&next)?,
                None => return Ok(items),
            }
        }
    }

    /// Checks that a `@odata.nextLink` stays on the Graph endpoint, so the
    /// bearer token is never sent elsewhere.
    fn next_page(&self, next: &str) -> GraphResult<String> {
        let next_url = Url::parse(next)?;
        let graph = Url::parse(self.environment.graph_endpoint())?;
        if next_url.origin() != graph.origin() {
            return Err(GraphError::UnexpectedResponse(format!(
                "next page link {next} is not on {}",
                self.environment.graph_endpoint()
            )));
        }
        Ok(next_url.into())
    }

    /// POSTs a body and decodes the created entity.
    #[instrument(skip(self, body))]
    pub async fn post<T, B>(&self, surface: ApiSurface, path: &str, body: &B) -> GraphResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(surface, path);
        let body = serde_json::to_value(body)?;
        let response = self
            .send(Method::POST, &url, Some(&body), RequestOptions::default())
            .await?;
        Ok(response.json().await?)
    }

    /// POSTs a body to an endpoint that answers `204 No Content`.
    #[instrument(skip(self, body))]
    pub async fn post_no_content<B>(
        &self,
        surface: ApiSurface,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> GraphResult<()>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(surface, path);
        let body = body.map(serde_json::to_value).transpose()?;
        self.send(Method::POST, &url, body.as_ref(), options).await?;
        Ok(())
    }

    /// PATCHes an entity.
    #[instrument(skip(self, body))]
    pub async fn patch<B>(&self, surface: ApiSurface, path: &str, body: &B) -> GraphResult<()>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(surface, path);
        let body = serde_json::to_value(body)?;
        self.send(Method::PATCH, &url, Some(&body), RequestOptions::default())
            .await?;
        Ok(())
    }

    /// DELETEs an entity or reference.
    #[instrument(skip(self))]
    pub async fn delete(&self, surface: ApiSurface, path: &str) -> GraphResult<()> {
        let url = self.url(surface, path);
        self.send(Method::DELETE, &url, None, RequestOptions::default())
            .await?;
        Ok(())
    }

    /// Sends one logical request, retrying throttled and transient
    /// failures, and returns the successful response.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> GraphResult<Response> {
        let mut attempts = 0u32;
        let mut retried_not_found = false;
        let mut reauthenticated = false;

        loop {
            let token = self.token_cache.get_token().await?;

            let mut request = self
                .http_client
                .request(method.clone(), url)
                .bearer_auth(&token);
            if let Some(b) = body {
                request = request.json(b);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            let throttled = status == StatusCode::TOO_MANY_REQUESTS;
            let transient = matches!(
                status,
                StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
            );

            if throttled || transient {
                if attempts >= self.retry.max_retries {
                    if throttled {
                        return Err(GraphError::MaxRetriesExceeded {
                            attempts,
                            status: status.as_u16(),
                        });
                    }
                    return Err(Self::api_error(response).await);
                }

                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(RetryPolicy::parse_retry_after);
                let delay = self.retry.delay_for(retry_after, attempts);
                attempts += 1;

                warn!(
                    "{} {} returned {}, retry {}/{} after {:?}",
                    method, url, status, attempts, self.retry.max_retries, delay
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if status == StatusCode::NOT_FOUND && options.retry_once_on_not_found && !retried_not_found {
                retried_not_found = true;
                debug!(
                    "{} {} returned 404, retrying once after {:?}",
                    method, url, self.not_found_retry_delay
                );
                tokio::time::sleep(self.not_found_retry_delay).await;
                continue;
            }

            if status == StatusCode::UNAUTHORIZED && !reauthenticated {
                reauthenticated = true;
                debug!("Access token rejected, acquiring a new one");
                self.token_cache.invalidate().await;
                continue;
            }

            return Err(Self::api_error(response).await);
        }
    }

    async fn api_error(response: Response) -> GraphError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<ODataError>(&body) {
            Ok(odata) => GraphError::Api {
                status: status.as_u16(),
                code: odata.error.code,
                message: odata.error.message,
            },
            Err(_) => GraphError::Api {
                status: status.as_u16(),
                code: status
                    .canonical_reason()
                    .unwrap_or("Unknown")
                    .to_string(),
                message: body,
            },
        }
    }
}

/// Builds an OData `$filter` query parameter.
#[must_use]
pub fn filter_query(expression: &str) -> String {
    format!("$filter={}", urlencoding::encode(expression))
}

/// Quotes a value for use in an OData filter expression.
#[must_use]
pub fn odata_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn client() -> GraphClient {
        GraphClient::new(
            GraphConfig::new("tenant"),
            Credentials {
                client_id: "client".into(),
                client_secret: SecretString::from("secret".to_string()),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_url_uses_surface() {
        let client = client();
        assert_eq!(
            client.url(ApiSurface::Stable, "/groups/g1/members"),
            "https://graph.microsoft.com/v1.0/groups/g1/members"
        );
        assert_eq!(
            client.url(ApiSurface::Beta, "/servicePrincipals/sp/synchronization/jobs/j"),
            "https://graph.microsoft.com/beta/servicePrincipals/sp/synchronization/jobs/j"
        );
    }

    #[test]
    fn test_next_page_must_stay_on_graph() {
        let client = client();
        let next = "https://graph.microsoft.com/v1.0/groups/g1/members?$skiptoken=abc";
        assert_eq!(client.next_page(next).unwrap(), next);

        let err = client
            .next_page("https://attacker.example/v1.0/groups/g1/members")
            .unwrap_err();
        assert!(matches!(err, GraphError::UnexpectedResponse(_)));
        assert!(matches!(client.next_page("/relative"), Err(GraphError::Url(_))));
    }

    #[test]
    fn test_directory_object_reference() {
        let reference = client().directory_object_reference(ApiSurface::Stable, "abc");
        assert_eq!(
            reference.odata_id,
            "https://graph.microsoft.com/v1.0/directoryObjects/abc"
        );
    }

    #[test]
    fn test_filter_query() {
        assert_eq!(filter_query("id eq 'a'"), "$filter=id%20eq%20%27a%27");
        assert_eq!(odata_quote("o'brien"), "'o''brien'");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = GraphClient::new(
            GraphConfig::new(""),
            Credentials {
                client_id: "client".into(),
                client_secret: SecretString::from("secret".to_string()),
            },
        );
        assert!(matches!(result, Err(GraphError::Config(_))));
    }
}

//! Client credentials token acquisition for Microsoft Graph.

use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::{CloudEnvironment, Credentials, GraphError, GraphResult};

/// Tokens are renewed this long before Graph would reject them.
const RENEWAL_MARGIN_MINUTES: i64 = 5;

/// Body of a successful `oauth2/v2.0/token` response.
#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    bearer: String,
    renew_at: DateTime<Utc>,
}

impl AccessToken {
    fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> Self {
        Self {
            bearer: grant.access_token,
            renew_at: now + Duration::seconds(grant.expires_in)
                - Duration::minutes(RENEWAL_MARGIN_MINUTES),
        }
    }

    fn usable_at(&self, now: DateTime<Utc>) -> bool {
        now < self.renew_at
    }
}

/// Access token of the service principal the provider runs as.
///
/// One token is shared by every request. It is renewed on demand once it is
/// within a few minutes of expiry, or after [`invalidate`](Self::invalidate)
/// when Graph rejected it.
#[derive(Debug)]
pub struct TokenCache {
    token_url: String,
    scope: String,
    credentials: Credentials,
    http: reqwest::Client,
    current: RwLock<Option<AccessToken>>,
}

impl TokenCache {
    #[must_use]
    pub fn new(credentials: Credentials, environment: CloudEnvironment, tenant_id: String) -> Self {
        Self {
            token_url: format!(
                "{}/{tenant_id}/oauth2/v2.0/token",
                environment.login_endpoint()
            ),
            scope: format!("{}/.default", environment.graph_endpoint()),
            credentials,
            http: reqwest::Client::new(),
            current: RwLock::new(None),
        }
    }

    /// Bearer token for the next request.
    #[instrument(skip(self))]
    pub async fn get_token(&self) -> GraphResult<String> {
        if let Some(bearer) = self.cached(Utc::now()).await {
            return Ok(bearer);
        }

        let mut current = self.current.write().await;
        // A concurrent caller may have renewed it already.
        if let Some(token) = current.as_ref().filter(|t| t.usable_at(Utc::now())) {
            return Ok(token.bearer.clone());
        }

        let token = self.request().await?;
        debug!(renew_at = %token.renew_at, "access token renewed");
        let bearer = token.bearer.clone();
        *current = Some(token);
        Ok(bearer)
    }

    /// Forgets the current token.
    pub async fn invalidate(&self) {
        self.current.write().await.take();
    }

    async fn cached(&self, now: DateTime<Utc>) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|t| t.usable_at(now))
            .map(|t| t.bearer.clone())
    }

    async fn request(&self) -> GraphResult<AccessToken> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose_secret()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| GraphError::Auth(format!("requesting token from {}: {e}", self.token_url)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GraphError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| GraphError::Auth(format!("decoding token response: {e}")))?;
        Ok(AccessToken::from_grant(grant, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(expires_in: i64) -> TokenGrant {
        TokenGrant {
            access_token: "bearer".to_string(),
            expires_in,
        }
    }

    #[test]
    fn test_token_is_renewed_before_expiry() {
        let now = Utc::now();
        let token = AccessToken::from_grant(grant(3600), now);

        assert!(token.usable_at(now));
        assert!(token.usable_at(now + Duration::minutes(54)));
        assert!(!token.usable_at(now + Duration::minutes(55)));
    }

    #[test]
    fn test_short_lived_token_is_never_usable() {
        let now = Utc::now();
        assert!(!AccessToken::from_grant(grant(60), now).usable_at(now));
    }

    #[test]
    fn test_token_url_per_cloud() {
        let cache = TokenCache::new(
            Credentials {
                client_id: "client".to_string(),
                client_secret: "secret".to_string().into(),
            },
            CloudEnvironment::China,
            "tenant".to_string(),
        );
        assert_eq!(
            cache.token_url,
            "https://login.chinacloudapi.cn/tenant/oauth2/v2.0/token"
        );
        assert_eq!(cache.scope, "https://microsoftgraph.chinacloudapi.cn/.default");
    }
}

//! Tenant domains.

use azuread_sdk::types::ApiSurface;
use tracing::instrument;

use crate::models::Domain;
use crate::{GraphClient, GraphResult};

impl GraphClient {
    /// Lists every domain of the tenant, verified or not.
    #[instrument(skip(self))]
    pub async fn list_domains(&self, surface: ApiSurface) -> GraphResult<Vec<Domain>> {
        self.list(surface, "/domains").await
    }
}

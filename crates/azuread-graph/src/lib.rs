//! Microsoft Graph client for the Azure AD provider.
//!
//! Covers what the relationship resources need: client credentials token
//! acquisition for every national cloud, retries for throttled (429) and
//! transient (502/503/504) responses, `@odata.nextLink` pagination, a single
//! 404 retry for reference adds, and typed endpoints for application owners,
//! API permissions, group and directory role members, app role assignments,
//! synchronization jobs and tenant domains.
//!
//! Every endpoint takes the [`ApiSurface`](azuread_sdk::types::ApiSurface)
//! to call, so callers can route individual operations to `beta`.
//!
//! # Example
//!
//! ```no_run
//! use azuread_graph::{Credentials, GraphClient, GraphConfig};
//! use azuread_sdk::types::ApiSurface;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GraphClient::new(
//!     GraphConfig::new("your-tenant-id"),
//!     Credentials {
//!         client_id: "your-client-id".to_string(),
//!         client_secret: "your-client-secret".to_string().into(),
//!     },
//! )?;
//! let owners = client
//!     .list_application_owners(ApiSurface::Stable, "application-object-id")
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod applications;
mod auth;
mod client;
mod config;
mod directory_roles;
mod domains;
mod error;
mod groups;
pub mod models;
pub mod odata;
mod retry;
mod service_principals;

pub use auth::TokenCache;
pub use client::{filter_query, odata_quote, GraphClient, RequestOptions};
pub use config::{CloudEnvironment, Credentials, GraphConfig};
pub use error::{GraphError, GraphResult};
pub use retry::RetryPolicy;

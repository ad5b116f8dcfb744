//! # Azure AD Provider
//!
//! Relationship resources of the Azure AD Terraform provider, backed by
//! Microsoft Graph:
//!
//! | Resource | Parent (lock scope) |
//! |----------|---------------------|
//! | `azuread_application_owner` | application |
//! | `azuread_application_api_access` | application |
//! | `azuread_directory_role_member` | directory role |
//! | `azuread_group_member` | group |
//! | `azuread_app_role_assignment` | resource service principal |
//! | `azuread_synchronization_job` | service principal |
//!
//! plus the `azuread_application_published_app_ids` and `azuread_domains` data
//! sources.
//!
//! # Example
//!
//! ```no_run
//! use azuread_provider::{Provider, ProviderConfig};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Provider::new(&ProviderConfig::from_env()?)?;
//! let member = provider
//!     .create(
//!         "azuread_group_member",
//!         &json!({
//!             "group_object_id": "00000000-0000-0000-0000-000000000001",
//!             "member_object_id": "00000000-0000-0000-0000-000000000002",
//!         }),
//!     )
//!     .await?;
//! println!("created {}", member.id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod provider;
pub mod services;

pub use config::{ConfigError, ProviderConfig};
pub use provider::{Provider, ProviderError};
pub use services::SERVICES;

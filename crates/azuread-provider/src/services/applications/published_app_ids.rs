//! `azuread_application_published_app_ids`: client IDs of well-known
//! first-party Microsoft applications.

use async_trait::async_trait;
use azuread_sdk::prelude::*;

/// Names and client IDs of the applications Microsoft publishes in every
/// tenant.
pub const PUBLISHED_APIS: &[(&str, &str)] = &[
    ("AzureActiveDirectoryGraph", "00000002-0000-0000-c000-000000000000"),
    ("AzureCli", "04b07795-8ddb-461a-bbee-02f9e1bf7b46"),
    ("AzureDataLake", "e9f49c6b-5ce5-44c8-925d-015017e9f7ad"),
    ("AzureDevOps", "499b84ac-1321-427f-aa17-267ca6975798"),
    ("AzureKeyVault", "cfa8b339-82a2-471a-a3c9-0fc0be7a4093"),
    ("AzureKubernetesServiceAadServer", "6dae42f8-4368-4678-94ff-3960e28e3630"),
    ("AzurePortal", "c44b4083-3bb0-49c1-b47d-974e53cbdf3c"),
    ("AzurePowerShell", "1950a258-227b-4e31-a9cf-717495945fc2"),
    ("AzureServiceManagement", "797f4846-ba00-4fd7-ba43-dac1f8f63013"),
    ("AzureSqlDatabase", "022907d3-0f1b-48f7-badc-1ba6abab6d66"),
    ("AzureStorage", "e406a681-f3d4-42a8-90b6-c2b029497af1"),
    ("DynamicsCrm", "00000007-0000-0000-c000-000000000000"),
    ("LogAnalyticsApi", "ca7f3f0b-7d91-482c-8e09-c5d840d0eac5"),
    ("MicrosoftGraph", "00000003-0000-0000-c000-000000000000"),
    ("MicrosoftIntune", "0000000a-0000-0000-c000-000000000000"),
    ("MicrosoftTeams", "1fec8e78-bce4-4aaf-ab1b-5451cc387264"),
    ("Office365ExchangeOnline", "00000002-0000-0ff1-ce00-000000000000"),
    ("Office365Management", "c5393580-f805-4401-95e8-94b7a6ef2fc2"),
    ("Office365SharePointOnline", "00000003-0000-0ff1-ce00-000000000000"),
    ("OneNote", "2d4d3d8e-2be3-4bef-9f87-7875a61c29de"),
    ("PowerBiService", "00000009-0000-0000-c000-000000000000"),
    ("SkypeForBusinessOnline", "00000004-0000-0ff1-ce00-000000000000"),
    ("Yammer", "00000005-0000-0ff1-ce00-000000000000"),
];

const DATA_SOURCE_ID: &str = "appIds";

static FIELDS: &[FieldSpec] = &[FieldSpec::string_map(
    "result",
    "A mapping of application names and application IDs",
)
.computed()];

/// Static lookup; makes no remote calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishedAppIdsDataSource;

#[async_trait]
impl DataSource for PublishedAppIdsDataSource {
    fn name(&self) -> &'static str {
        "azuread_application_published_app_ids"
    }

    fn schema(&self) -> Schema {
        Schema::new(FIELDS)
    }

    async fn read(&self, _config: &Attributes) -> ResourceResult<ResourceResponse> {
        let mut state = Attributes::new()
            .with_string_map("result", PUBLISHED_APIS.iter().copied())
            .encode();
        if let serde_json::Value::Object(object) = &mut state {
            object.insert("id".to_string(), DATA_SOURCE_ID.into());
        }

        Ok(ResourceResponse {
            id: DATA_SOURCE_ID.to_string(),
            state,
        })
    }
}

//! OData envelopes used by Microsoft Graph.

use serde::{Deserialize, Serialize};

/// Error response body.
#[derive(Debug, Deserialize)]
pub struct ODataError {
    pub error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ODataErrorBody {
    pub code: String,
    pub message: String,
}

/// One page of a collection.
#[derive(Debug, Deserialize)]
pub struct ODataList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Body of a `POST .../$ref` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceCreate {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}

use serde::{Deserialize, Serialize};

/// An app or integration registered with the home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub home_id: Option<String>,
}

use serde::{Deserialize, Serialize};

use crate::response::TransType;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Login {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ModifyPassword {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct StreamStart {
    /// Stream path, generated when empty
    #[serde(default, alias = "customPath", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Pull source address, the stream is a pull stream when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub trans_type: TransType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    /// Seconds without data before the stream is removed, 0 disables
    #[serde(default)]
    pub idle_timeout: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Id {
    pub id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Play {
    pub stream: String,
    #[serde(default)]
    pub trans_type: TransType,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PushQuery {
    pub id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StartRecord {
    pub stream: String,
    pub path: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RecordFilesQuery {
    #[serde(default)]
    pub folder: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PageQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// `ascending` or `descending`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

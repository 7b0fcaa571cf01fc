use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Token {
    pub token: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Id {
    pub id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub code: String,
    pub msg: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub username: String,
    pub role: String,
    pub login_at: String,
    pub last_active_at: String,
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransType {
    #[default]
    #[serde(rename = "TCP", alias = "tcp")]
    Tcp,
    #[serde(rename = "UDP", alias = "udp")]
    Udp,
}

impl fmt::Display for TransType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransType::Tcp => write!(f, "TCP"),
            TransType::Udp => write!(f, "UDP"),
        }
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PusherMode {
    /// The source connected to us and pushes data
    #[default]
    #[serde(rename = "push")]
    Push,
    /// We pull the data from a remote source url
    #[serde(rename = "pull")]
    Pull,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Pusher {
    pub id: String,
    pub path: String,
    pub source: String,
    pub mode: PusherMode,
    pub trans_type: TransType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    pub in_bytes: u64,
    pub out_bytes: u64,
    pub start_at: String,
    pub onlines: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub path: String,
    pub remote: String,
    pub trans_type: TransType,
    pub out_bytes: u64,
    pub start_at: String,
}

/// Page of rows, `total` counts the rows before slicing
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Page<T> {
    pub total: usize,
    pub rows: Vec<T>,
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    #[default]
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "stopped")]
    Stopped,
    #[serde(rename = "failed")]
    Failed,
}

impl RecordStatus {
    /// Pending and active tasks still own the stream
    pub fn is_running(&self) -> bool {
        matches!(self, RecordStatus::Pending | RecordStatus::Active)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RecordTask {
    pub id: String,
    pub stream: String,
    pub path: String,
    pub start_at: String,
    pub status: RecordStatus,
    pub bytes: u64,
    /// Payloads lost because the writer fell behind the stream
    #[serde(default)]
    pub dropped: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RecordFolders {
    pub folders: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RecordFile {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub modified_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RecordFiles {
    pub folder: String,
    pub files: Vec<RecordFile>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub pusher_count: usize,
    pub player_count: usize,
    pub active_recording_count: usize,
    /// Seconds since the server started
    pub uptime: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CountData {
    pub time: String,
    pub total: usize,
}

/// A usage sample, `used` is a fraction between 0 and 1
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PercentData {
    pub time: String,
    pub used: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    #[serde(flatten)]
    pub stats: Stats,
    pub hardware: String,
    pub interface_version: String,
    pub running_time: String,
    pub start_up_time: String,
    pub server: String,
    pub pusher_data: Vec<CountData>,
    pub player_data: Vec<CountData>,
    pub mem_data: Vec<PercentData>,
    pub cpu_data: Vec<PercentData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trans_type() {
        assert_eq!(
            serde_json::from_str::<TransType>("\"udp\"").unwrap(),
            TransType::Udp
        );
        assert_eq!(serde_json::to_string(&TransType::Tcp).unwrap(), "\"TCP\"");
        assert_eq!(TransType::Udp.to_string(), "UDP");
    }

    #[test]
    fn test_record_status() {
        assert!(RecordStatus::Pending.is_running());
        assert!(RecordStatus::Active.is_running());
        assert!(!RecordStatus::Stopped.is_running());
        assert!(!RecordStatus::Failed.is_running());
        assert_eq!(
            serde_json::to_string(&RecordStatus::Stopped).unwrap(),
            "\"stopped\""
        );
    }
}

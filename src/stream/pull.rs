use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use api::response::TransType;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// What it takes to register a pull stream again after a restart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullStream {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub trans_type: TransType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(default)]
    pub idle_timeout: u64,
}

impl From<PullStream> for api::request::StreamStart {
    fn from(p: PullStream) -> Self {
        Self {
            id: Some(p.id),
            url: Some(p.url),
            trans_type: p.trans_type,
            codec: p.codec,
            idle_timeout: p.idle_timeout,
        }
    }
}

/// Pull stream definitions, written through to a JSON file on every change
#[derive(Clone, Default)]
pub struct PullStore {
    path: Option<PathBuf>,
    streams: Arc<Mutex<BTreeMap<String, PullStream>>>,
}

impl PullStore {
    pub fn open(path: Option<PathBuf>) -> Self {
        let streams = path.as_deref().map(load).unwrap_or_default();
        Self {
            path,
            streams: Arc::new(Mutex::new(streams)),
        }
    }

    pub fn list(&self) -> Vec<PullStream> {
        self.streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn save(&self, stream: PullStream) {
        let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        streams.insert(stream.id.clone(), stream);
        self.flush(&streams);
    }

    pub fn remove(&self, id: &str) {
        let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        if streams.remove(id).is_some() {
            self.flush(&streams);
        }
    }

    fn flush(&self, streams: &BTreeMap<String, PullStream>) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        let list: Vec<_> = streams.values().collect();
        if let Err(e) = write(path, &list) {
            error!(path = ?path, "save pull streams error: {:?}", e);
        }
    }
}

fn load(path: &Path) -> BTreeMap<String, PullStream> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = ?path, "read pull streams error: {}", e);
            return BTreeMap::new();
        }
    };
    match serde_json::from_slice::<Vec<PullStream>>(&content) {
        Ok(list) => list.into_iter().map(|s| (s.id.clone(), s)).collect(),
        Err(e) => {
            warn!(path = ?path, "parse pull streams error: {}", e);
            BTreeMap::new()
        }
    }
}

fn write(path: &Path, list: &[&PullStream]) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    // Replace in one step so a crash never leaves half a file
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(list)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

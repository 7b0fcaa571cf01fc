use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use api::response::RecordStatus;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, warn};

use crate::{metrics, utils};

#[derive(Debug, Clone, Default)]
struct State {
    status: RecordStatus,
    bytes: u64,
    dropped: u64,
    error: Option<String>,
}

/// Status shared by the task entry and its writer
#[derive(Debug, Clone, Default)]
pub struct Status(Arc<Mutex<State>>);

impl Status {
    pub fn get(&self) -> RecordStatus {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).status
    }

    pub fn is_running(&self) -> bool {
        self.get().is_running()
    }

    /// Leaves pending / active for `status`. Terminal states never change,
    /// returns whether this call made the transition.
    pub fn finish(&self, status: RecordStatus, error: Option<String>) -> bool {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.status.is_running() {
            return false;
        }
        state.status = status;
        state.error = error;
        metrics::RECORDING.dec();
        true
    }

    fn written(&self, len: usize) -> bool {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.status.is_running() {
            return false;
        }
        state.status = RecordStatus::Active;
        state.bytes += len as u64;
        true
    }

    /// Counts payloads the writer fell too far behind to receive
    fn lagged(&self, n: u64) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).dropped += n;
    }

    fn snapshot(&self) -> State {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

pub struct RecordTask {
    pub id: String,
    pub stream: String,
    /// Path as shown to clients, relative to the record root
    pub path: String,
    pub file: PathBuf,
    pub start_at: DateTime<Utc>,
    pub status: Status,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl RecordTask {
    /// Starts the writer of an already created file. The task begins
    /// pending and turns active with the first payload written.
    pub fn spawn(
        stream: String,
        path: String,
        file: PathBuf,
        writer: File,
        receiver: broadcast::Receiver<Bytes>,
    ) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let status = Status::default();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        metrics::RECORDING.inc();

        tokio::spawn(write_loop(
            id.clone(),
            stream.clone(),
            writer,
            receiver,
            status.clone(),
            shutdown_rx,
        ));

        info!(task = %id, %stream, %path, "record task spawn");
        Self {
            id,
            stream,
            path,
            file,
            start_at: Utc::now(),
            status,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Marks the task stopped and wakes the writer so it closes the file
    pub fn stop(&mut self) -> bool {
        let stopped = self.status.finish(RecordStatus::Stopped, None);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if stopped {
            info!(task = %self.id, stream = %self.stream, "record task stop");
        }
        stopped
    }

    pub fn info(&self) -> api::response::RecordTask {
        let state = self.status.snapshot();
        api::response::RecordTask {
            id: self.id.clone(),
            stream: self.stream.clone(),
            path: self.path.clone(),
            start_at: utils::date_time(self.start_at),
            status: state.status,
            bytes: state.bytes,
            dropped: state.dropped,
            error: state.error,
        }
    }
}

async fn write_loop(
    id: String,
    stream: String,
    mut writer: File,
    mut receiver: broadcast::Receiver<Bytes>,
    status: Status,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            msg = receiver.recv() => match msg {
                Ok(data) => {
                    // A stop may land between two payloads, never write after it
                    if !status.is_running() {
                        break;
                    }
                    if let Err(e) = write(&mut writer, &data).await {
                        error!(task = %id, %stream, "record write error: {}", e);
                        status.finish(RecordStatus::Failed, Some(e.to_string()));
                        break;
                    }
                    if !status.written(data.len()) {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    status.lagged(n);
                    warn!(task = %id, %stream, "record task lagged, {} payloads dropped", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    if status.finish(RecordStatus::Stopped, None) {
                        info!(task = %id, %stream, "stream closed, record task stop");
                    }
                    break;
                }
            },
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!(task = %id, "record file close error: {}", e);
    }
    debug!(task = %id, status = ?status.get(), "record writer exit");
}

async fn write(writer: &mut File, data: &[u8]) -> std::io::Result<()> {
    writer.write_all(data).await?;
    // tokio reports a failed background write on the next operation only
    writer.flush().await
}

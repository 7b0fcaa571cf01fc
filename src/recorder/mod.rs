use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::config;
use crate::error::AppError;
use crate::result::Result;
use crate::session::SessionManager;
use crate::stream::manager::Manager;
use crate::stream::{normalize, EventHook, StreamEvent, StreamEventType};

pub mod storage;
pub mod task;

use task::RecordTask;

#[derive(Default)]
struct Tasks {
    tasks: HashMap<String, RecordTask>,
    /// Starts past their checks whose file is still being created,
    /// keyed by reservation id
    reserved: HashMap<u64, (String, PathBuf)>,
    next_reservation: u64,
    /// Stopped and failed tasks kept for listing
    history: usize,
}

impl Tasks {
    fn check_conflict(&self, stream: &str, file: &Path, display: &str) -> Result<()> {
        let running = self
            .tasks
            .values()
            .filter(|t| t.status.is_running())
            .map(|t| (t.stream.as_str(), t.file.as_path()));
        let reserved = self.reserved.values().map(|(s, f)| (s.as_str(), f.as_path()));
        match running.chain(reserved).find(|(s, f)| *s == stream || *f == file) {
            Some((s, _)) if s == stream => Err(AppError::conflict(format!(
                "stream {} is already recording",
                stream
            ))),
            Some(_) => Err(AppError::conflict(format!(
                "{} is already being recorded",
                display
            ))),
            None => Ok(()),
        }
    }

    /// Drops the oldest stopped and failed tasks beyond the history size
    fn prune(&mut self) {
        let mut finished: Vec<_> = self
            .tasks
            .values()
            .filter(|t| !t.status.is_running())
            .map(|t| (t.start_at, t.id.clone()))
            .collect();
        if finished.len() <= self.history {
            return;
        }
        finished.sort();
        let excess = finished.len() - self.history;
        for (_, id) in finished.into_iter().take(excess) {
            self.tasks.remove(&id);
        }
        debug!(removed = excess, "record task history prune");
    }
}

type SharedTasks = Arc<Mutex<Tasks>>;

fn lock(tasks: &SharedTasks) -> MutexGuard<'_, Tasks> {
    tasks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds a stream and a file for a start in progress, released on drop
struct Reservation {
    tasks: SharedTasks,
    id: u64,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        lock(&self.tasks).reserved.remove(&self.id);
    }
}

/// Recording tasks writing stream payloads below the record root.
///
/// Starting a task and tearing its stream down are ordered through the task
/// lock: a start subscribes while holding it, the teardown hook takes it once
/// the stream is gone. A task therefore never stays running on a removed
/// stream. While its file is created a start holds a reservation on the
/// stream and the file, so concurrent starts conflict without waiting on
/// each other's I/O.
#[derive(Clone)]
pub struct Recorder {
    tasks: SharedTasks,
    streams: Manager,
    sessions: SessionManager,
    root: PathBuf,
}

struct TeardownHook {
    tasks: SharedTasks,
}

impl EventHook for TeardownHook {
    fn hook(&self, event: &StreamEvent) {
        if event.r#type != StreamEventType::Down {
            return;
        }
        let mut tasks = lock(&self.tasks);
        for task in tasks.tasks.values_mut().filter(|t| t.stream == event.stream) {
            if task.stop() {
                info!(task = %task.id, stream = %event.stream, "stream down, record task stop");
            }
        }
        tasks.prune();
    }
}

impl Recorder {
    pub fn new(streams: Manager, sessions: SessionManager, config: config::Record) -> Self {
        let tasks: SharedTasks = Arc::new(Mutex::new(Tasks {
            history: config.history,
            ..Default::default()
        }));
        streams.add_hook(Arc::new(TeardownHook {
            tasks: tasks.clone(),
        }));
        Self {
            tasks,
            streams,
            sessions,
            root: config.root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn start_recording(&self, token: &str, stream: &str, path: &str) -> Result<String> {
        let session = self.sessions.authorize(token, |a| a.w)?;
        let stream = normalize(stream);

        let (file, display) = storage::resolve(&self.root, path)?;
        if display == "/" || path.trim().ends_with('/') {
            return Err(AppError::bad_request(format!("invalid record file: {}", path)));
        }

        let reservation = self.reserve(&stream, &file, &display)?;
        let writer = storage::create(&file).await?;

        let started = {
            let mut tasks = lock(&self.tasks);
            // The stream may have stopped while the file was created
            match self.streams.subscribe(&stream) {
                Ok(receiver) => {
                    tasks.reserved.remove(&reservation.id);
                    let task =
                        RecordTask::spawn(stream.clone(), display, file.clone(), writer, receiver);
                    let id = task.id.clone();
                    tasks.tasks.insert(id.clone(), task);
                    tasks.prune();
                    Ok(id)
                }
                Err(e) => Err((e, writer)),
            }
        };
        drop(reservation);

        match started {
            Ok(id) => {
                info!(task = %id, %stream, username = %session.username, "start recording");
                Ok(id)
            }
            Err((e, writer)) => {
                drop(writer);
                if let Err(e) = tokio::fs::remove_file(&file).await {
                    warn!(file = ?file, "remove record file error: {}", e);
                }
                Err(e)
            }
        }
    }

    fn reserve(&self, stream: &str, file: &Path, display: &str) -> Result<Reservation> {
        let mut tasks = lock(&self.tasks);
        if !self.streams.exists(stream) {
            return Err(AppError::not_found(format!("stream {} not found", stream)));
        }
        tasks.check_conflict(stream, file, display)?;
        let id = tasks.next_reservation;
        tasks.next_reservation += 1;
        tasks
            .reserved
            .insert(id, (stream.to_string(), file.to_path_buf()));
        Ok(Reservation {
            tasks: self.tasks.clone(),
            id,
        })
    }

    pub fn stop_recording(&self, token: &str, id: &str) -> Result<()> {
        let session = self.sessions.authorize(token, |a| a.w)?;
        let mut tasks = lock(&self.tasks);
        let task = tasks
            .tasks
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("record task {} not found", id)))?;
        if task.stop() {
            info!(task = id, username = %session.username, "stop recording");
            tasks.prune();
        }
        Ok(())
    }

    pub fn tasks(&self) -> Vec<api::response::RecordTask> {
        let tasks = lock(&self.tasks);
        let mut tasks: Vec<_> = tasks.tasks.values().map(RecordTask::info).collect();
        tasks.sort_by(|a, b| a.start_at.cmp(&b.start_at).then(a.id.cmp(&b.id)));
        tasks
    }

    /// Tasks pending or active
    pub fn active_count(&self) -> usize {
        lock(&self.tasks)
            .tasks
            .values()
            .filter(|t| t.status.is_running())
            .count()
    }

    pub async fn folders(&self) -> Result<Vec<String>> {
        storage::folders(&self.root).await
    }

    pub async fn files(&self, folder: &str) -> Result<api::response::RecordFiles> {
        storage::files(&self.root, folder).await
    }

    pub fn shutdown(&self) {
        let mut tasks = lock(&self.tasks);
        for task in tasks.tasks.values_mut() {
            task.stop();
        }
    }
}

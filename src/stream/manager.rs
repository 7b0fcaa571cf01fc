use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use api::response::TransType;
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::pull::{PullStore, PullStream};
use super::{normalize, EventHook, Player, Pusher, StreamEvent, StreamEventType};
use crate::config;
use crate::error::AppError;
use crate::result::Result;
use crate::session::SessionManager;
use crate::metrics;

#[derive(Default)]
struct Streams {
    pushers: HashMap<String, Pusher>,
    players: HashMap<String, Player>,
}

impl Streams {
    fn onlines(&self, stream: &str) -> usize {
        self.players.values().filter(|p| p.stream == stream).count()
    }
}

/// Registry of pushers and their players.
///
/// Every mutation of one stream id happens under the same write lock, so
/// start / stop / play of an id are linearized. The lock is never held across
/// an await point or while hooks run.
///
/// Pull stream definitions outlive their pushers: an explicit stop forgets
/// them, an idle timeout or a shutdown does not, and
/// [`Manager::restore_pulls`] registers the missing ones again.
#[derive(Clone)]
pub struct Manager {
    streams: Arc<RwLock<Streams>>,
    hooks: Arc<RwLock<Vec<Arc<dyn EventHook>>>>,
    pulls: PullStore,
    sessions: SessionManager,
    config: config::Stream,
}

impl Manager {
    pub fn new(sessions: SessionManager, config: config::Stream) -> Self {
        Self {
            streams: Default::default(),
            hooks: Default::default(),
            pulls: PullStore::open(config.pull_file.clone()),
            sessions,
            config,
        }
    }

    pub fn add_hook(&self, hook: Arc<dyn EventHook>) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    fn emit(&self, r#type: StreamEventType, stream: &str) {
        let event = StreamEvent {
            r#type,
            stream: stream.to_string(),
        };
        let hooks = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for hook in hooks.iter() {
            hook.hook(&event);
        }
    }

    pub fn stream_start(
        &self,
        token: &str,
        req: api::request::StreamStart,
        remote: SocketAddr,
    ) -> Result<String> {
        let session = self.sessions.authorize(token, |a| a.w)?;

        let stream = match req.id.as_deref().map(normalize) {
            Some(stream) if !stream.is_empty() => stream,
            _ => uuid::Uuid::new_v4().simple().to_string(),
        };
        let pull = match req.url.as_deref().map(str::trim) {
            Some("") => return Err(AppError::bad_request("source url cannot be empty")),
            Some(url) => Some(PullStream {
                id: stream.clone(),
                url: url.to_string(),
                trans_type: req.trans_type,
                codec: req.codec.clone(),
                idle_timeout: req.idle_timeout,
            }),
            None => None,
        };

        self.register(stream.clone(), req, remote)?;
        info!(%stream, username = %session.username, "stream start");
        if let Some(pull) = pull {
            self.pulls.save(pull);
        }
        Ok(stream)
    }

    fn register(
        &self,
        stream: String,
        req: api::request::StreamStart,
        remote: SocketAddr,
    ) -> Result<()> {
        {
            let mut streams = self.streams.write().unwrap_or_else(PoisonError::into_inner);
            if streams.pushers.contains_key(&stream) {
                return Err(AppError::duplicate_stream(format!(
                    "stream {} already exists",
                    stream
                )));
            }
            let pusher = Pusher::new(stream.clone(), req, remote, self.config.channel_capacity);
            debug!(%stream, source = %pusher.source, mode = ?pusher.mode, "pusher register");
            streams.pushers.insert(stream.clone(), pusher);
        }
        metrics::PUSHER.inc();
        self.emit(StreamEventType::Up, &stream);
        Ok(())
    }

    pub fn stream_stop(&self, token: &str, stream: &str) -> Result<()> {
        let session = self.sessions.authorize(token, |a| a.w)?;
        let stream = normalize(stream);
        self.teardown(&stream, |_| true)?;
        // An explicit stop forgets the definition whatever the mode
        self.pulls.remove(&stream);
        info!(%stream, username = %session.username, "stream stop");
        Ok(())
    }

    /// Registers every saved pull stream that has no pusher, returns the
    /// restored stream ids
    pub fn restore_pulls(&self) -> Vec<String> {
        let remote = SocketAddr::from(([0, 0, 0, 0], 0));
        let mut restored = vec![];
        for pull in self.pulls.list() {
            if self.exists(&pull.id) {
                continue;
            }
            let stream = pull.id.clone();
            if self.register(stream.clone(), pull.into(), remote).is_ok() {
                info!(%stream, "pull stream restore");
                restored.push(stream);
            }
        }
        restored
    }

    /// Removes the pusher of `stream` when `predicate` still holds under the
    /// write lock, with all its players. Hooks see the `Down` event after
    /// the lock is released.
    fn teardown(&self, stream: &str, predicate: impl Fn(&Pusher) -> bool) -> Result<()> {
        let players = {
            let mut streams = self.streams.write().unwrap_or_else(PoisonError::into_inner);
            match streams.pushers.get(stream) {
                Some(pusher) if predicate(pusher) => {}
                _ => return Err(AppError::not_found(format!("stream {} not found", stream))),
            }
            streams.pushers.remove(stream);
            let before = streams.players.len();
            streams.players.retain(|_, p| p.stream != stream);
            before - streams.players.len()
        };
        metrics::PUSHER.dec();
        metrics::PLAYER.sub(players as i64);
        debug!(stream, players, "stream teardown");
        self.emit(StreamEventType::Down, stream);
        Ok(())
    }

    pub fn play(
        &self,
        token: &str,
        stream: &str,
        remote: SocketAddr,
        trans_type: TransType,
    ) -> Result<String> {
        self.sessions.authorize(token, |a| a.r)?;
        let stream = normalize(stream);
        let player = Player {
            id: uuid::Uuid::new_v4().simple().to_string(),
            stream: stream.clone(),
            remote,
            trans_type,
            out_bytes: 0,
            start_at: Utc::now(),
        };
        let id = player.id.clone();

        let mut streams = self.streams.write().unwrap_or_else(PoisonError::into_inner);
        if !streams.pushers.contains_key(&stream) {
            return Err(AppError::not_found(format!("stream {} not found", stream)));
        }
        streams.players.insert(id.clone(), player);
        drop(streams);

        metrics::PLAYER.inc();
        info!(%stream, player = %id, %remote, "player join");
        Ok(id)
    }

    pub fn play_stop(&self, token: &str, player: &str) -> Result<()> {
        self.sessions.authorize(token, |a| a.r)?;
        let removed = self
            .streams
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .players
            .remove(player);
        match removed {
            Some(p) => {
                metrics::PLAYER.dec();
                info!(stream = %p.stream, player, "player leave");
                Ok(())
            }
            None => Err(AppError::not_found(format!("player {} not found", player))),
        }
    }

    /// Feeds one media payload into the stream and fans it out to the
    /// players and subscribers. Returns the number of subscribers reached.
    pub fn push(&self, token: &str, stream: &str, payload: Bytes) -> Result<usize> {
        self.sessions.authorize(token, |a| a.w)?;
        let stream = normalize(stream);
        let len = payload.len() as u64;

        let mut streams = self.streams.write().unwrap_or_else(PoisonError::into_inner);
        let Streams { pushers, players } = &mut *streams;
        let pusher = pushers
            .get_mut(&stream)
            .ok_or_else(|| AppError::not_found(format!("stream {} not found", stream)))?;

        pusher.in_bytes += len;
        pusher.last_data = Instant::now();
        for player in players.values_mut().filter(|p| p.stream == stream) {
            player.out_bytes += len;
            pusher.out_bytes += len;
        }
        // Err only means nobody subscribes at the moment
        Ok(pusher.sender.send(payload).unwrap_or(0))
    }

    /// Receiver of the payloads pushed into `stream`, closed on teardown
    pub fn subscribe(&self, stream: &str) -> Result<broadcast::Receiver<Bytes>> {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pushers
            .get(stream)
            .map(|pusher| pusher.sender.subscribe())
            .ok_or_else(|| AppError::not_found(format!("stream {} not found", stream)))
    }

    pub fn exists(&self, stream: &str) -> bool {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pushers
            .contains_key(stream)
    }

    pub fn pushers(&self) -> Vec<api::response::Pusher> {
        let streams = self.streams.read().unwrap_or_else(PoisonError::into_inner);
        let mut pushers: Vec<_> = streams
            .pushers
            .values()
            .map(|pusher| pusher.info(streams.onlines(&pusher.stream)))
            .collect();
        pushers.sort_by(|a, b| a.id.cmp(&b.id));
        pushers
    }

    pub fn players(&self) -> Vec<api::response::Player> {
        let streams = self.streams.read().unwrap_or_else(PoisonError::into_inner);
        let mut players: Vec<api::response::Player> =
            streams.players.values().map(|p| p.into()).collect();
        players.sort_by(|a, b| a.start_at.cmp(&b.start_at).then(a.id.cmp(&b.id)));
        players
    }

    /// (pushers, players) from one snapshot
    pub fn count(&self) -> (usize, usize) {
        let streams = self.streams.read().unwrap_or_else(PoisonError::into_inner);
        (streams.pushers.len(), streams.players.len())
    }

    /// Tears down every pusher that did not receive data within its idle
    /// timeout, returns the removed stream ids
    pub fn idle_check(&self) -> Vec<String> {
        let candidates: Vec<String> = self
            .streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pushers
            .values()
            .filter(|pusher| pusher.idle())
            .map(|pusher| pusher.stream.clone())
            .collect();

        let mut removed = vec![];
        for stream in candidates {
            if self.teardown(&stream, Pusher::idle).is_ok() {
                info!(%stream, "stream idle timeout");
                removed.push(stream);
            }
        }
        removed
    }

    pub fn shutdown(&self) {
        let streams: Vec<String> = self
            .streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pushers
            .keys()
            .cloned()
            .collect();
        for stream in streams {
            let _ = self.teardown(&stream, |_| true);
        }
    }
}

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use api::response::{PusherMode, TransType};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::utils;

pub mod manager;
pub mod pull;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEventType {
    Up,
    Down,
}

#[derive(Clone, Debug)]
pub struct StreamEvent {
    pub r#type: StreamEventType,
    pub stream: String,
}

/// Called synchronously by the stream manager after its lock is released
pub trait EventHook: Send + Sync {
    fn hook(&self, event: &StreamEvent);
}

/// A registered stream source. Owns the fan-out channel of the stream,
/// dropping the pusher closes it for every subscriber.
pub struct Pusher {
    pub stream: String,
    pub source: String,
    pub mode: PusherMode,
    pub trans_type: TransType,
    pub codec: Option<String>,
    /// Zero never times out
    pub idle_timeout: Duration,
    pub start_at: DateTime<Utc>,
    pub in_bytes: u64,
    pub out_bytes: u64,
    last_data: Instant,
    sender: broadcast::Sender<Bytes>,
}

impl Pusher {
    fn new(
        stream: String,
        req: api::request::StreamStart,
        remote: SocketAddr,
        capacity: usize,
    ) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        let (mode, source) = match req.url {
            Some(url) => (PusherMode::Pull, url),
            None => (PusherMode::Push, remote.to_string()),
        };
        Self {
            stream,
            source,
            mode,
            trans_type: req.trans_type,
            codec: req.codec,
            idle_timeout: Duration::from_secs(req.idle_timeout),
            start_at: Utc::now(),
            in_bytes: 0,
            out_bytes: 0,
            last_data: Instant::now(),
            sender,
        }
    }

    fn idle(&self) -> bool {
        !self.idle_timeout.is_zero() && self.last_data.elapsed() > self.idle_timeout
    }

    fn info(&self, onlines: usize) -> api::response::Pusher {
        api::response::Pusher {
            id: self.stream.clone(),
            path: format!("/{}", self.stream),
            source: self.source.clone(),
            mode: self.mode,
            trans_type: self.trans_type,
            codec: self.codec.clone(),
            in_bytes: self.in_bytes,
            out_bytes: self.out_bytes,
            start_at: utils::date_time(self.start_at),
            onlines,
        }
    }
}

/// A consumer of a stream. `stream` is a key into the pusher map, never an
/// owning reference: a player outliving its pusher just fails the lookup.
#[derive(Clone, Debug)]
pub struct Player {
    pub id: String,
    pub stream: String,
    pub remote: SocketAddr,
    pub trans_type: TransType,
    pub out_bytes: u64,
    pub start_at: DateTime<Utc>,
}

impl From<&Player> for api::response::Player {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.clone(),
            path: format!("/{}", p.stream),
            remote: p.remote.to_string(),
            trans_type: p.trans_type,
            out_bytes: p.out_bytes,
            start_at: utils::date_time(p.start_at),
        }
    }
}

/// Stream ids never carry the leading `/` of their path
pub fn normalize(stream: &str) -> String {
    stream.trim().trim_start_matches('/').to_string()
}

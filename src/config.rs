use std::collections::HashSet;
use std::{env, fs, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use auth::Role;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub stream: Stream,
    #[serde(default)]
    pub record: Record,
    #[serde(default)]
    pub stats: Stats,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Http {
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Auth {
    /// Seeded accounts, `admin`/`admin` is used when empty
    #[serde(default)]
    pub accounts: Vec<Account>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
            role: Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Seconds a session may stay idle
    #[serde(default = "default_session_idle_timeout")]
    pub idle_timeout: u64,
    /// Seconds between two sweeps of idle sessions
    #[serde(default = "default_session_sweep_interval")]
    pub sweep_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
    /// Milliseconds between two idle pusher checks
    #[serde(default = "default_stream_check_interval")]
    pub check_interval: u64,
    /// Packets buffered per subscriber before it starts lagging
    #[serde(default = "default_stream_channel_capacity")]
    pub channel_capacity: usize,
    /// Pull stream definitions survive restarts in this file, none keeps
    /// them in memory only
    #[serde(default = "default_stream_pull_file")]
    pub pull_file: Option<PathBuf>,
    /// Seconds between two attempts to bring back missing pull streams
    #[serde(default = "default_stream_restore_interval")]
    pub restore_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Every record path lives under this directory
    #[serde(default = "default_record_root")]
    pub root: PathBuf,
    /// Stopped and failed tasks kept for listing
    #[serde(default = "default_record_history")]
    pub history: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    /// Seconds between two samples of the pusher / player history
    #[serde(default = "default_stats_sample_interval")]
    pub sample_interval: u64,
    #[serde(default = "default_stats_samples")]
    pub samples: usize,
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("10008"))
    ))
    .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 10008)))
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

fn default_session_idle_timeout() -> u64 {
    30 * 60
}

fn default_session_sweep_interval() -> u64 {
    60
}

fn default_stream_check_interval() -> u64 {
    1000
}

fn default_stream_channel_capacity() -> usize {
    1024
}

fn default_stream_pull_file() -> Option<PathBuf> {
    Some(PathBuf::from("./pull_streams.json"))
}

fn default_stream_restore_interval() -> u64 {
    10
}

fn default_record_root() -> PathBuf {
    PathBuf::from("./record")
}

fn default_record_history() -> usize {
    100
}

fn default_stats_sample_interval() -> u64 {
    2
}

fn default_stats_samples() -> usize {
    30
}

impl Default for Http {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            cors: Default::default(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self {
            idle_timeout: default_session_idle_timeout(),
            sweep_interval: default_session_sweep_interval(),
        }
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self {
            check_interval: default_stream_check_interval(),
            channel_capacity: default_stream_channel_capacity(),
            pull_file: default_stream_pull_file(),
            restore_interval: default_stream_restore_interval(),
        }
    }
}

impl Default for Record {
    fn default() -> Self {
        Self {
            root: default_record_root(),
            history: default_record_history(),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            sample_interval: default_stats_sample_interval(),
            samples: default_stats_samples(),
        }
    }
}

impl Session {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }
}

impl Stream {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval)
    }

    pub fn restore_interval(&self) -> Duration {
        Duration::from_secs(self.restore_interval)
    }
}

impl Stats {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval)
    }
}

impl Auth {
    pub fn accounts(&self) -> Vec<Account> {
        if self.accounts.is_empty() {
            vec![Account::default()]
        } else {
            self.accounts.clone()
        }
    }
}

impl Config {
    pub fn parse(path: Option<String>) -> anyhow::Result<Self> {
        let content = match path {
            Some(path) => {
                fs::read_to_string(&path).with_context(|| format!("read config {}", path))?
            }
            None => fs::read_to_string("livectl.toml")
                .or(fs::read_to_string("/etc/livectl/livectl.toml"))
                .unwrap_or_default(),
        };
        let cfg: Self = toml::from_str(&content).context("config parse error")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.session.idle_timeout == 0 {
            return Err(anyhow!("session.idle_timeout must be greater than 0"));
        }
        if self.session.sweep_interval == 0 {
            return Err(anyhow!("session.sweep_interval must be greater than 0"));
        }
        if self.stream.check_interval == 0 {
            return Err(anyhow!("stream.check_interval must be greater than 0"));
        }
        if self.stream.channel_capacity == 0 {
            return Err(anyhow!("stream.channel_capacity must be greater than 0"));
        }
        if self.stream.restore_interval == 0 {
            return Err(anyhow!("stream.restore_interval must be greater than 0"));
        }
        if self.stats.sample_interval == 0 || self.stats.samples == 0 {
            return Err(anyhow!("stats.sample_interval and stats.samples must be greater than 0"));
        }

        let mut usernames = HashSet::new();
        for account in self.auth.accounts.iter() {
            if account.username.is_empty() || account.password.is_empty() {
                return Err(anyhow!("account username and password cannot be empty"));
            }
            if !usernames.insert(account.username.as_str()) {
                return Err(anyhow!("duplicate account: {}", account.username));
            }
        }
        Ok(())
    }
}

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use api::response::{CountData, PercentData};
use chrono::{DateTime, Utc};
use sysinfo::System;

use crate::recorder::Recorder;
use crate::stream::manager::Manager;
use crate::utils;

const INTERFACE_VERSION: &str = "V1";

#[derive(Clone)]
struct Sample {
    pushers: CountData,
    players: CountData,
    mem: PercentData,
    cpu: PercentData,
}

/// Read-only view over the registries, plus a short history of the pusher
/// and player counts and of the host memory and cpu usage, filled by the
/// sampler tick.
#[derive(Clone)]
pub struct Stats {
    streams: Manager,
    recorder: Recorder,
    start: Instant,
    start_at: DateTime<Utc>,
    samples: usize,
    system: Arc<Mutex<System>>,
    history: Arc<RwLock<VecDeque<Sample>>>,
}

impl Stats {
    pub fn new(streams: Manager, recorder: Recorder, samples: usize) -> Self {
        Self {
            streams,
            recorder,
            start: Instant::now(),
            start_at: Utc::now(),
            samples,
            system: Arc::new(Mutex::new(System::new())),
            history: Default::default(),
        }
    }

    pub fn snapshot(&self) -> api::response::Stats {
        let (pusher_count, player_count) = self.streams.count();
        api::response::Stats {
            pusher_count,
            player_count,
            active_recording_count: self.recorder.active_count(),
            uptime: self.start.elapsed().as_secs(),
        }
    }

    /// Appends the current counts and usage, dropping the oldest sample when
    /// full
    pub fn sample(&self) {
        let (pushers, players) = self.streams.count();
        let (mem, cpu) = self.usage();
        let time = utils::date_time(Utc::now());
        let sample = Sample {
            pushers: CountData {
                time: time.clone(),
                total: pushers,
            },
            players: CountData {
                time: time.clone(),
                total: players,
            },
            mem: PercentData {
                time: time.clone(),
                used: mem,
            },
            cpu: PercentData { time, used: cpu },
        };
        let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
        history.push_back(sample);
        while history.len() > self.samples {
            history.pop_front();
        }
    }

    /// Used memory and global cpu load, both as fractions. The cpu load is
    /// measured since the previous call, so the first one reads 0.
    fn usage(&self) -> (f64, f64) {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_memory();
        system.refresh_cpu();
        let mem = match system.total_memory() {
            0 => 0.0,
            total => system.used_memory() as f64 / total as f64,
        };
        let cpu = f64::from(system.global_cpu_info().cpu_usage()) / 100.0;
        (mem.clamp(0.0, 1.0), cpu.clamp(0.0, 1.0))
    }

    pub fn server_info(&self) -> api::response::ServerInfo {
        let stats = self.snapshot();
        let history = self.history.read().unwrap_or_else(PoisonError::into_inner);
        let pusher_data = history.iter().map(|s| s.pushers.clone()).collect();
        let player_data = history.iter().map(|s| s.players.clone()).collect();
        let mem_data = history.iter().map(|s| s.mem.clone()).collect();
        let cpu_data = history.iter().map(|s| s.cpu.clone()).collect();
        api::response::ServerInfo {
            hardware: std::env::consts::ARCH.to_uppercase(),
            interface_version: INTERFACE_VERSION.to_string(),
            running_time: utils::duration_string(self.start.elapsed()),
            start_up_time: utils::date_time(self.start_at),
            server: format!(
                "livectl/{} (Platform/{};)",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS
            ),
            stats,
            pusher_data,
            player_data,
            mem_data,
            cpu_data,
        }
    }
}

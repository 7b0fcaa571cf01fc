use std::time::Duration;

use tracing::{debug, info};

use crate::route::AppState;

async fn tick(interval: Duration) {
    let timeout = tokio::time::sleep(interval);
    tokio::pin!(timeout);
    let _ = timeout.as_mut().await;
}

pub async fn session_sweep(state: AppState) {
    loop {
        tick(state.config.session.sweep_interval()).await;
        let purged = state.sessions.sweep();
        if purged > 0 {
            info!(purged, "idle sessions purged");
        }
    }
}

pub async fn stream_idle_check(state: AppState) {
    loop {
        tick(state.config.stream.check_interval()).await;
        let removed = state.streams.idle_check();
        if !removed.is_empty() {
            debug!(?removed, "idle streams removed");
        }
    }
}

/// Registers saved pull streams that have no pusher, such as those removed
/// for idleness
pub async fn pull_restore(state: AppState) {
    loop {
        tick(state.config.stream.restore_interval()).await;
        let restored = state.streams.restore_pulls();
        if !restored.is_empty() {
            debug!(?restored, "pull streams restored");
        }
    }
}

pub async fn stats_sample(state: AppState) {
    loop {
        tick(state.config.stats.sample_interval()).await;
        state.stats.sample();
    }
}

use std::future::Future;
use std::net::SocketAddr;

use axum::extract::Request;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, Level};

use crate::config::Config;
use crate::recorder::Recorder;
use crate::route::AppState;
use crate::session::SessionManager;
use crate::stats::Stats;
use crate::stream::manager::Manager;

pub mod config;
pub mod error;
pub mod metrics;
pub mod page;
pub mod recorder;
pub mod result;
pub mod route;
pub mod session;
pub mod stats;
pub mod stream;
pub mod utils;

mod tick;

pub async fn serve<F>(cfg: Config, listener: TcpListener, signal: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    metrics::register();
    if let Ok(addr) = listener.local_addr() {
        info!("Server listening on {}", addr);
    }

    let sessions = SessionManager::new(cfg.auth.accounts(), cfg.session.idle_timeout());
    let streams = Manager::new(sessions.clone(), cfg.stream.clone());
    let recorder = Recorder::new(streams.clone(), sessions.clone(), cfg.record.clone());
    let stats = Stats::new(streams.clone(), recorder.clone(), cfg.stats.samples);
    let app_state = AppState {
        config: cfg.clone(),
        sessions,
        streams,
        recorder,
        stats,
    };

    let app = Router::new()
        .merge(route::sys::route())
        .merge(route::stream::route())
        .merge(route::record::route())
        .merge(route::stats::route())
        .with_state(app_state.clone())
        .layer(if cfg.http.cors {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        })
        .layer(axum::middleware::from_fn(http_log::print_request_response))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let span = info_span!(
                        "http_request",
                        uri = ?request.uri(),
                        method = ?request.method(),
                        span_id = tracing::field::Empty,
                    );
                    span.record(
                        "span_id",
                        span.id().unwrap_or(tracing::Id::from_u64(42)).into_u64(),
                    );
                    span
                })
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::DEBUG))
                .on_failure(tower_http::trace::DefaultOnFailure::new().level(Level::INFO)),
        );

    // Before the listener serves, so clients never see them missing
    let restored = app_state.streams.restore_pulls();
    if !restored.is_empty() {
        info!(count = restored.len(), "pull streams restored");
    }

    let ticks = [
        tokio::spawn(tick::session_sweep(app_state.clone())),
        tokio::spawn(tick::stream_idle_check(app_state.clone())),
        tokio::spawn(tick::pull_restore(app_state.clone())),
        tokio::spawn(tick::stats_sample(app_state.clone())),
    ];

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(signal)
    .await
    .unwrap_or_else(|e| error!("Application error: {e}"));

    for tick in ticks {
        tick.abort();
    }
    // Tearing the streams down stops every recording through the hook
    app_state.streams.shutdown();
    app_state.recorder.shutdown();
    app_state.sessions.shutdown();
    info!("Server shutdown");
}

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::STATS, get(stats))
        .route(api::path::METRICS, get(metrics))
}

async fn stats(State(state): State<AppState>) -> Json<api::response::Stats> {
    Json(state.stats.snapshot())
}

async fn metrics() -> String {
    crate::metrics::encode()
}

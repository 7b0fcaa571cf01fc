use auth::BearerToken;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::{Query, WithRejection};
use http::StatusCode;

use crate::error::AppError;
use crate::result::Result;
use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::RECORD_START, post(start))
        .route(api::path::RECORD_STOP, post(stop))
        .route(api::path::RECORD_TASKS, get(tasks))
        .route(api::path::RECORD_FOLDERS, get(folders))
        .route(api::path::RECORD_FILES, get(files))
}

async fn start(
    State(state): State<AppState>,
    token: BearerToken,
    WithRejection(Json(req), _): WithRejection<Json<api::request::StartRecord>, AppError>,
) -> Result<Json<api::response::Id>> {
    let id = state
        .recorder
        .start_recording(token.as_str(), &req.stream, &req.path)
        .await?;
    Ok(Json(api::response::Id { id }))
}

async fn stop(
    State(state): State<AppState>,
    token: BearerToken,
    WithRejection(Json(req), _): WithRejection<Json<api::request::Id>, AppError>,
) -> Result<StatusCode> {
    state.recorder.stop_recording(token.as_str(), &req.id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn tasks(State(state): State<AppState>) -> Json<Vec<api::response::RecordTask>> {
    Json(state.recorder.tasks())
}

async fn folders(State(state): State<AppState>) -> Result<Json<api::response::RecordFolders>> {
    Ok(Json(api::response::RecordFolders {
        folders: state.recorder.folders().await?,
    }))
}

async fn files(
    State(state): State<AppState>,
    WithRejection(Query(req), _): WithRejection<Query<api::request::RecordFilesQuery>, AppError>,
) -> Result<Json<api::response::RecordFiles>> {
    Ok(Json(state.recorder.files(&req.folder).await?))
}

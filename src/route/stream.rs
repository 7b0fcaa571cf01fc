use std::net::SocketAddr;

use auth::BearerToken;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::{Query, WithRejection};
use http::StatusCode;
use serde_json::Value;

use crate::page::paginate;
use crate::error::AppError;
use crate::result::Result;
use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::PUSHERS, get(pushers))
        .route(api::path::PLAYERS, get(players))
        .route(api::path::STREAM_START, post(start))
        .route(api::path::STREAM_STOP, post(stop))
        .route(api::path::STREAM_PLAY, post(play))
        .route(api::path::STREAM_PLAY_STOP, post(play_stop))
        .route(api::path::STREAM_PUSH, post(push))
}

async fn pushers(
    State(state): State<AppState>,
    WithRejection(Query(req), _): WithRejection<Query<api::request::PageQuery>, AppError>,
) -> Result<Json<api::response::Page<Value>>> {
    Ok(Json(paginate(state.streams.pushers(), &req)?))
}

async fn players(
    State(state): State<AppState>,
    WithRejection(Query(req), _): WithRejection<Query<api::request::PageQuery>, AppError>,
) -> Result<Json<api::response::Page<Value>>> {
    Ok(Json(paginate(state.streams.players(), &req)?))
}

async fn start(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    token: BearerToken,
    WithRejection(Json(req), _): WithRejection<Json<api::request::StreamStart>, AppError>,
) -> Result<Json<api::response::Id>> {
    let id = state.streams.stream_start(token.as_str(), req, remote)?;
    Ok(Json(api::response::Id { id }))
}

async fn stop(
    State(state): State<AppState>,
    token: BearerToken,
    WithRejection(Json(req), _): WithRejection<Json<api::request::Id>, AppError>,
) -> Result<StatusCode> {
    state.streams.stream_stop(token.as_str(), &req.id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn play(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    token: BearerToken,
    WithRejection(Json(req), _): WithRejection<Json<api::request::Play>, AppError>,
) -> Result<Json<api::response::Id>> {
    let id = state
        .streams
        .play(token.as_str(), &req.stream, remote, req.trans_type)?;
    Ok(Json(api::response::Id { id }))
}

async fn play_stop(
    State(state): State<AppState>,
    token: BearerToken,
    WithRejection(Json(req), _): WithRejection<Json<api::request::Id>, AppError>,
) -> Result<StatusCode> {
    state.streams.play_stop(token.as_str(), &req.id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn push(
    State(state): State<AppState>,
    token: BearerToken,
    WithRejection(Query(req), _): WithRejection<Query<api::request::PushQuery>, AppError>,
    body: Bytes,
) -> Result<StatusCode> {
    state.streams.push(token.as_str(), &req.id, body)?;
    Ok(StatusCode::NO_CONTENT)
}

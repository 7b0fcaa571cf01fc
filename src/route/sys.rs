use auth::BearerToken;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use http::StatusCode;

use crate::error::AppError;
use crate::result::Result;
use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::SYS_LOGIN, post(login))
        .route(api::path::SYS_LOGOUT, post(logout))
        .route(api::path::SYS_USER_INFO, get(user_info))
        .route(api::path::SYS_MODIFY_PASSWORD, post(modify_password))
        .route(api::path::SYS_SERVER_INFO, get(server_info))
}

async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<api::request::Login>, AppError>,
) -> Result<Json<api::response::Token>> {
    let token = state.sessions.login(&req.username, &req.password)?;
    Ok(Json(api::response::Token { token }))
}

async fn logout(State(state): State<AppState>, token: BearerToken) -> Result<StatusCode> {
    state.sessions.logout(token.as_str())?;
    Ok(StatusCode::NO_CONTENT)
}

async fn user_info(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<Json<api::response::UserInfo>> {
    Ok(Json(state.sessions.user_info(token.as_str())?))
}

async fn modify_password(
    State(state): State<AppState>,
    token: BearerToken,
    WithRejection(Json(req), _): WithRejection<Json<api::request::ModifyPassword>, AppError>,
) -> Result<StatusCode> {
    state
        .sessions
        .modify_password(token.as_str(), &req.old_password, &req.new_password)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn server_info(State(state): State<AppState>) -> Json<api::response::ServerInfo> {
    Json(state.stats.server_info())
}

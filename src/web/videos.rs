//! Watch-time endpoints under `/api/v1/videos/{user_id}`.

use axum::Json;
use axum::extract::{Path, State};
use axum::extract::rejection::JsonRejection;
use tracing::instrument;

use crate::state::AppState;
use crate::video::{UserState, VideoSetting, VideoSubmit};
use crate::web::error::ApiError;

/// `GET /api/v1/videos/{user_id}`: current state, with any daily reset applied.
#[instrument(skip_all, fields(user_id = %user_id))]
pub(super) async fn get_video(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserState>, ApiError> {
    Ok(Json(state.videos.get(&user_id).await?))
}

/// `POST /api/v1/videos/{user_id}`: add watched milliseconds.
#[instrument(skip_all, fields(user_id = %user_id))]
pub(super) async fn submit_video(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<VideoSubmit>, JsonRejection>,
) -> Result<Json<UserState>, ApiError> {
    let Json(submit) = body?;
    Ok(Json(state.videos.save(&user_id, submit).await?))
}

/// `PUT /api/v1/videos/{user_id}`: update limit and custom message.
#[instrument(skip_all, fields(user_id = %user_id))]
pub(super) async fn update_setting(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<VideoSetting>, JsonRejection>,
) -> Result<Json<UserState>, ApiError> {
    let Json(setting) = body?;
    Ok(Json(state.videos.setting(&user_id, setting).await?))
}

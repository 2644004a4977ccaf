use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use models::comment;
use service::comment_service::{CommentForm, CommentPatch, NewComment};

use super::auth::{CurrentUser, ServerState};
use super::WindowQuery;
use crate::errors::ApiError;

/// Comments under one news article.
pub async fn list_news_comments(
    State(state): State<ServerState>,
    Path(news_id): Path<i32>,
    Query(q): Query<WindowQuery>,
) -> Result<Json<Vec<comment::Model>>, ApiError> {
    let mut session = state.session();
    state.news.find(&mut session, news_id).await?;
    Ok(Json(state.comments.list(&mut session, news_id, q.window()).await?))
}

pub async fn create_comment(
    State(state): State<ServerState>,
    CurrentUser(principal): CurrentUser,
    Json(input): Json<NewComment>,
) -> Result<(StatusCode, Json<comment::Model>), ApiError> {
    let mut session = state.session();
    let created = state.comments.create(&mut session, input, &principal).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_comment(State(state): State<ServerState>, Path(id): Path<i32>) -> Result<Json<comment::Model>, ApiError> {
    let mut session = state.session();
    Ok(Json(state.comments.get(&mut session, id).await?))
}

pub async fn update_comment(
    State(state): State<ServerState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
    Json(form): Json<CommentForm>,
) -> Result<Json<comment::Model>, ApiError> {
    let mut session = state.session();
    Ok(Json(state.comments.update(&mut session, id, form, &principal).await?))
}

pub async fn patch_comment(
    State(state): State<ServerState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
    Json(patch): Json<CommentPatch>,
) -> Result<Json<comment::Model>, ApiError> {
    let mut session = state.session();
    Ok(Json(state.comments.partial_update(&mut session, id, patch, &principal).await?))
}

pub async fn delete_comment(
    State(state): State<ServerState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let mut session = state.session();
    state.comments.delete(&mut session, id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

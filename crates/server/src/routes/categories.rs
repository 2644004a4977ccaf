use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use models::category;
use service::category_service::{CategoryForm, CategoryPatch};

use super::auth::ServerState;
use super::WindowQuery;
use crate::errors::ApiError;

pub async fn list_categories(
    State(state): State<ServerState>,
    Query(q): Query<WindowQuery>,
) -> Result<Json<Vec<category::Model>>, ApiError> {
    let mut session = state.session();
    Ok(Json(state.categories.list(&mut session, q.window()).await?))
}

pub async fn create_category(
    State(state): State<ServerState>,
    Json(form): Json<CategoryForm>,
) -> Result<(StatusCode, Json<category::Model>), ApiError> {
    let mut session = state.session();
    let created = state.categories.create(&mut session, form).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_category(State(state): State<ServerState>, Path(id): Path<i32>) -> Result<Json<category::Model>, ApiError> {
    let mut session = state.session();
    Ok(Json(state.categories.get(&mut session, id).await?))
}

pub async fn update_category(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
    Json(form): Json<CategoryForm>,
) -> Result<Json<category::Model>, ApiError> {
    let mut session = state.session();
    Ok(Json(state.categories.update(&mut session, id, form).await?))
}

pub async fn patch_category(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
    Json(patch): Json<CategoryPatch>,
) -> Result<Json<category::Model>, ApiError> {
    let mut session = state.session();
    Ok(Json(state.categories.partial_update(&mut session, id, patch).await?))
}

pub async fn delete_category(State(state): State<ServerState>, Path(id): Path<i32>) -> Result<StatusCode, ApiError> {
    let mut session = state.session();
    state.categories.delete(&mut session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use models::news;
use service::media::Upload;
use service::news_service::{NewsChanges, NewsDetails, NewsDraft};

use super::auth::ServerState;
use super::WindowQuery;
use crate::errors::ApiError;

/// Multipart fields of a news submission. Every file part counts as an image.
#[derive(Debug, Default)]
struct NewsForm {
    title: Option<String>,
    content: Option<String>,
    category_id: Option<i32>,
    files: Vec<Upload>,
}

impl NewsForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = NewsForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            if let Some(file_name) = field.file_name().map(str::to_owned) {
                let data = field.bytes().await?;
                // unfilled file inputs arrive as an empty, unnamed part
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                form.files.push(Upload::from_bytes(file_name, data));
                continue;
            }
            let value = field.text().await?;
            match name.as_str() {
                "title" => form.title = Some(value),
                "content" => form.content = Some(value),
                "category" | "category_id" => form.category_id = parse_category(&value)?,
                other => tracing::debug!(field = other, "ignoring unknown multipart field"),
            }
        }
        Ok(form)
    }

    fn into_draft(self) -> Result<NewsDraft, ApiError> {
        let title = self.title.ok_or_else(|| ApiError::bad_request("title is required"))?;
        Ok(NewsDraft { title, content: self.content, category_id: self.category_id, files: self.files })
    }

    fn into_changes(self) -> NewsChanges {
        NewsChanges { title: self.title, content: self.content, category_id: self.category_id, files: self.files }
    }
}

fn parse_category(value: &str) -> Result<Option<i32>, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i32>()
        .map(Some)
        .map_err(|_| ApiError::bad_request(format!("category must be an integer id, got {value:?}")))
}

pub async fn list_news(
    State(state): State<ServerState>,
    Query(q): Query<WindowQuery>,
) -> Result<Json<Vec<news::Model>>, ApiError> {
    let mut session = state.session();
    Ok(Json(state.news.list(&mut session, q.window()).await?))
}

pub async fn create_news(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<news::Model>), ApiError> {
    let draft = NewsForm::read(multipart).await?.into_draft()?;
    let mut session = state.session();
    let created = state.news.create(&mut session, draft).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_news(State(state): State<ServerState>, Path(id): Path<i32>) -> Result<Json<NewsDetails>, ApiError> {
    let mut session = state.session();
    Ok(Json(state.news.get(&mut session, id).await?))
}

pub async fn update_news(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<news::Model>, ApiError> {
    let draft = NewsForm::read(multipart).await?.into_draft()?;
    let mut session = state.session();
    Ok(Json(state.news.update(&mut session, id, draft).await?))
}

pub async fn patch_news(
    State(state): State<ServerState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<news::Model>, ApiError> {
    let changes = NewsForm::read(multipart).await?.into_changes();
    let mut session = state.session();
    Ok(Json(state.news.partial_update(&mut session, id, changes).await?))
}

pub async fn delete_news(State(state): State<ServerState>, Path(id): Path<i32>) -> Result<StatusCode, ApiError> {
    let mut session = state.session();
    state.news.delete(&mut session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::parse_category;

    #[test]
    fn category_field_parsing() {
        assert_eq!(parse_category("").ok(), Some(None));
        assert_eq!(parse_category(" 12 ").ok(), Some(Some(12)));
        assert!(parse_category("tech").is_err());
    }
}

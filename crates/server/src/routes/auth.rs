use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Deserialize;
use uuid::Uuid;

use models::user;
use service::media::MediaStore;
use service::principal::Principal;
use service::session::Session;
use service::{CategoryService, CommentService, NewsService};

use crate::errors::ApiError;

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
}

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: ServerAuthConfig,
    pub media: Arc<MediaStore>,
    pub categories: CategoryService,
    pub news: NewsService,
    pub comments: CommentService,
}

impl ServerState {
    pub fn new(db: DatabaseConnection, media: MediaStore, jwt_secret: impl Into<String>) -> Self {
        let media = Arc::new(media);
        let categories = CategoryService::new();
        let news = NewsService::new(categories.clone(), Arc::clone(&media));
        let comments = CommentService::new(news.clone());
        Self {
            db,
            auth: ServerAuthConfig { jwt_secret: jwt_secret.into() },
            media,
            categories,
            news,
            comments,
        }
    }

    /// Unit of work for one request.
    pub fn session(&self) -> Session {
        Session::new(self.db.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Authenticated caller, resolved from `Authorization: Bearer <jwt>` whose
/// `sub` is an active user's id.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Principal);

#[async_trait]
impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_owned();
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::warn!(path = %path, "missing Authorization header");
                ApiError::unauthorized("authentication required")
            })?;
        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            tracing::warn!(path = %path, "invalid Authorization format (expect Bearer)");
            ApiError::unauthorized("expected a bearer token")
        })?;

        // 校验签名与过期时间（HS256）
        let key = DecodingKey::from_secret(state.auth.jwt_secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let claims = decode::<Claims>(token, &key, &validation)
            .map_err(|e| {
                tracing::warn!(path = %path, err = %e, "token validation failed");
                ApiError::unauthorized("invalid token")
            })?
            .claims;

        // sub 必须是已存在且启用的用户
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::unauthorized("invalid token subject"))?;
        let found = user::Entity::find_by_id(user_id)
            .one(&state.db)
            .await
            .map_err(|e| ApiError::new(axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        match found {
            Some(u) if u.is_active => Ok(CurrentUser(Principal::new(u.id))),
            _ => {
                tracing::warn!(path = %path, %user_id, "token subject is not an active user");
                Err(ApiError::unauthorized("unknown or inactive user"))
            }
        }
    }
}

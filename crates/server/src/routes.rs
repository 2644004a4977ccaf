use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use service::pagination::Window;

pub mod auth;
pub mod categories;
pub mod comments;
pub mod news;

/// Upper bound on a news submission body, files included.
const MAX_NEWS_BODY: usize = 32 * 1024 * 1024;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// `?offset=&limit=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl WindowQuery {
    pub fn window(&self) -> Window {
        let default = Window::default();
        Window::clamp(
            self.offset.unwrap_or(default.offset as i64),
            self.limit.unwrap_or(default.limit as i64),
        )
    }
}

/// Build the full application router: resources, health and stored media.
pub fn build_router(state: auth::ServerState, cors: CorsLayer) -> Router {
    let media_path = format!("/file/{}", state.media.url_prefix());
    let media_dir = ServeDir::new(state.media.root());

    // 公共路由（健康检查 + 媒体静态文件）
    let public = Router::new()
        .route("/health", get(health))
        .nest_service(&media_path, media_dir);

    let category_routes = Router::new()
        .route("/categories", get(categories::list_categories).post(categories::create_category))
        .route(
            "/categories/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .patch(categories::patch_category)
                .delete(categories::delete_category),
        );

    let news_routes = Router::new()
        .route("/news", get(news::list_news).post(news::create_news))
        .route(
            "/news/:id",
            get(news::get_news)
                .put(news::update_news)
                .patch(news::patch_news)
                .delete(news::delete_news),
        )
        .route("/news/:id/comments", get(comments::list_news_comments))
        .layer(DefaultBodyLimit::max(MAX_NEWS_BODY));

    let comment_routes = Router::new()
        .route("/comments", axum::routing::post(comments::create_comment))
        .route(
            "/comments/:id",
            get(comments::get_comment)
                .put(comments::update_comment)
                .patch(comments::patch_comment)
                .delete(comments::delete_comment),
        );

    // 组合路由
    public
        .merge(category_routes)
        .merge(news_routes)
        .merge(comment_routes)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每个请求一个 INFO 级 span，失败（5xx）以 ERROR 记录
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

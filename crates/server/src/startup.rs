use std::net::SocketAddr;

use axum::Router;
use common::env::ensure_media_root;
use configs::AppConfig;
use dotenvy::dotenv;
use migration::MigratorTrait;
use service::media::MediaStore;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes::{self, auth::ServerState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address: {e}")))
}

/// Assemble application state: database (migrated), media store, services.
pub async fn build_state(cfg: &AppConfig) -> Result<ServerState, StartupError> {
    // 连接数据库并执行迁移
    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None)
        .await
        .map_err(|e| StartupError::Runtime(format!("migrations: {e}")))?;

    // 媒体目录不存在时自动创建
    ensure_media_root(&cfg.media.root).await?;
    let media = MediaStore::new(&cfg.media.root, &cfg.media.url_prefix);

    Ok(ServerState::new(db, media, cfg.auth.jwt_secret.clone()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    // 日志由调用方（bins/server.rs）初始化
    dotenv().ok();

    let cfg = AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    let state = build_state(&cfg).await?;
    let app: Router = routes::build_router(state, build_cors());

    let addr = bind_addr(&cfg)?;
    info!(%addr, media_root = %cfg.media.root, "starting server");
    // 绑定并启动服务，Ctrl+C 时优雅停机
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

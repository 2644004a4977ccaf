#![cfg(test)]
use std::future::Future;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use migration::MigratorTrait;
use models::db::connect_in_memory;
use models::user;
use sea_orm::DatabaseConnection;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Sleep;

use crate::media::{MediaStore, Upload};
use crate::{CategoryService, CommentService, NewsService};

/// Fresh, migrated in-memory database for one test.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    let db = connect_in_memory().await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn make_user(db: &DatabaseConnection, handle: &str) -> Result<user::Model, anyhow::Error> {
    Ok(user::create(db, &format!("{handle}@example.com"), handle).await?)
}

pub struct Services {
    pub categories: CategoryService,
    pub news: NewsService,
    pub comments: CommentService,
    pub media: Arc<MediaStore>,
}

pub fn services(media_root: &std::path::Path) -> Services {
    let media = Arc::new(MediaStore::new(media_root, "media"));
    let categories = CategoryService::new();
    let news = NewsService::new(categories.clone(), Arc::clone(&media));
    let comments = CommentService::new(news.clone());
    Services { categories, news, comments, media }
}

/// Reader that yields its data only after `delay` has elapsed.
struct Delayed {
    delay: Pin<Box<Sleep>>,
    inner: Cursor<Vec<u8>>,
}

impl AsyncRead for Delayed {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        ready!(self.delay.as_mut().poll(cx));
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

/// Reader that fails once `delay` has elapsed.
struct Broken {
    delay: Pin<Box<Sleep>>,
}

impl AsyncRead for Broken {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        ready!(self.delay.as_mut().poll(cx));
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "upload stream interrupted")))
    }
}

pub fn delayed_upload(name: &str, data: Vec<u8>, delay: Duration) -> Upload {
    Upload::new(name, Delayed { delay: Box::pin(tokio::time::sleep(delay)), inner: Cursor::new(data) })
}

pub fn broken_upload(name: &str, delay: Duration) -> Upload {
    Upload::new(name, Broken { delay: Box::pin(tokio::time::sleep(delay)) })
}

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ModelTrait, Set};
use serde::Serialize;
use tracing::{info, instrument, warn};

use models::news::MediaList;
use models::{category, comment, news};

use crate::category_service::CategoryService;
use crate::errors::ServiceError;
use crate::manager::{Filters, ObjectManager, Patch, Replacement};
use crate::media::{Ingested, MediaStore, Upload};
use crate::pagination::Window;
use crate::session::Session;

type News = ObjectManager<news::Entity>;

/// Every writable field of a news article, plus the files that become its images.
#[derive(Debug)]
pub struct NewsDraft {
    pub title: String,
    pub content: Option<String>,
    pub category_id: Option<i32>,
    pub files: Vec<Upload>,
}

/// Fields to change on a news article. `None` and an empty file list leave
/// the stored value alone.
#[derive(Debug, Default)]
pub struct NewsChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<i32>,
    pub files: Vec<Upload>,
}

/// News row together with its category and comments.
#[derive(Clone, Debug, Serialize)]
pub struct NewsDetails {
    #[serde(flatten)]
    pub news: news::Model,
    pub category: Option<category::Model>,
    pub comments: Vec<comment::Model>,
}

struct NewsColumns {
    title: String,
    content: Option<String>,
    images: MediaList,
    category_id: Option<i32>,
}

impl Replacement<news::Entity> for NewsColumns {
    fn overwrite(self, row: &mut news::ActiveModel) {
        row.title = Set(self.title);
        row.content = Set(self.content);
        row.images = Set(self.images);
        row.category_id = Set(self.category_id);
        row.updated = Set(Utc::now().into());
    }
}

#[derive(Default)]
struct NewsColumnsPatch {
    title: Option<String>,
    content: Option<String>,
    images: Option<MediaList>,
    category_id: Option<i32>,
}

impl NewsColumnsPatch {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.images.is_none() && self.category_id.is_none()
    }
}

impl Patch<news::Entity> for NewsColumnsPatch {
    fn apply(self, row: &mut news::ActiveModel) {
        if self.is_empty() {
            return;
        }
        if let Some(title) = self.title {
            row.title = Set(title);
        }
        if let Some(content) = self.content {
            row.content = Set(Some(content));
        }
        if let Some(images) = self.images {
            row.images = Set(images);
        }
        if let Some(category_id) = self.category_id {
            row.category_id = Set(Some(category_id));
        }
        row.updated = Set(Utc::now().into());
    }
}

/// News CRUD: category references are checked before any media is written,
/// and media is written before anything is committed.
#[derive(Clone, Debug)]
pub struct NewsService {
    categories: CategoryService,
    media: Arc<MediaStore>,
}

impl NewsService {
    pub fn new(categories: CategoryService, media: Arc<MediaStore>) -> Self {
        Self { categories, media }
    }

    pub async fn list(&self, session: &mut Session, window: Window) -> Result<Vec<news::Model>, ServiceError> {
        Ok(News::list(session, Filters::none(), window).await?)
    }

    /// The bare news row, or `NotFound`.
    pub async fn find(&self, session: &mut Session, id: i32) -> Result<news::Model, ServiceError> {
        News::get_by_id(session, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("news", id))
    }

    pub async fn get(&self, session: &mut Session, id: i32) -> Result<NewsDetails, ServiceError> {
        let news = self.find(session, id).await?;
        let txn = session.txn().await?;
        let category = news.find_related(category::Entity).one(txn).await?;
        let comments = news.find_related(comment::Entity).all(txn).await?;
        Ok(NewsDetails { news, category, comments })
    }

    async fn check_category(&self, session: &mut Session, category_id: i32) -> Result<(), ServiceError> {
        match self.categories.get(session, category_id).await {
            Ok(_) => Ok(()),
            Err(ServiceError::NotFound(_)) => {
                warn!(category_id, "news references a missing category");
                Err(ServiceError::invalid_reference("category", category_id))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, session, draft), fields(files = draft.files.len(), category_id = ?draft.category_id))]
    pub async fn create(&self, session: &mut Session, draft: NewsDraft) -> Result<news::Model, ServiceError> {
        news::validate_title(&draft.title)?;
        if let Some(category_id) = draft.category_id {
            self.check_category(session, category_id).await?;
        }

        let ingested = self.media.ingest(draft.files).await?;

        let now = Utc::now();
        let row = news::ActiveModel {
            title: Set(draft.title),
            content: Set(draft.content),
            images: Set(MediaList::from(ingested.references().to_vec())),
            created: Set(now.into()),
            updated: Set(now.into()),
            category_id: Set(draft.category_id),
            ..Default::default()
        };
        match News::create(session, row, true).await {
            Ok(created) => {
                info!(news_id = created.id, images = created.images.len(), "news_created");
                Ok(created)
            }
            Err(e) => {
                self.abandon(session, &ingested).await;
                Err(e.into())
            }
        }
    }

    /// Replace every field. Images are always re-ingested, so an empty file
    /// list clears them; a `None` category detaches the article.
    #[instrument(skip(self, session, draft), fields(files = draft.files.len(), category_id = ?draft.category_id))]
    pub async fn update(&self, session: &mut Session, id: i32, draft: NewsDraft) -> Result<news::Model, ServiceError> {
        news::validate_title(&draft.title)?;
        self.find(session, id).await?;
        if let Some(category_id) = draft.category_id {
            self.check_category(session, category_id).await?;
        }

        let ingested = self.media.ingest(draft.files).await?;

        let columns = NewsColumns {
            title: draft.title,
            content: draft.content,
            images: MediaList::from(ingested.references().to_vec()),
            category_id: draft.category_id,
        };
        match News::update(session, news::Column::Id, id, true, columns).await {
            Ok(Some(model)) => {
                info!(news_id = id, images = model.images.len(), "news_updated");
                Ok(model)
            }
            Ok(None) => {
                self.abandon(session, &ingested).await;
                Err(ServiceError::not_found("news", id))
            }
            Err(e) => {
                self.abandon(session, &ingested).await;
                Err(e.into())
            }
        }
    }

    /// Change only the supplied fields. The category is checked and files are
    /// ingested only when given.
    #[instrument(skip(self, session, changes), fields(files = changes.files.len(), category_id = ?changes.category_id))]
    pub async fn partial_update(&self, session: &mut Session, id: i32, changes: NewsChanges) -> Result<news::Model, ServiceError> {
        if let Some(title) = &changes.title {
            news::validate_title(title)?;
        }
        self.find(session, id).await?;
        if let Some(category_id) = changes.category_id {
            self.check_category(session, category_id).await?;
        }

        let ingested = if changes.files.is_empty() {
            Ingested::default()
        } else {
            self.media.ingest(changes.files).await?
        };

        let patch = NewsColumnsPatch {
            title: changes.title,
            content: changes.content,
            images: (!ingested.is_empty()).then(|| MediaList::from(ingested.references().to_vec())),
            category_id: changes.category_id,
        };
        match News::partial_update(session, news::Column::Id, id, true, patch).await {
            Ok(Some(model)) => {
                info!(news_id = id, "news_patched");
                Ok(model)
            }
            Ok(None) => {
                self.abandon(session, &ingested).await;
                Err(ServiceError::not_found("news", id))
            }
            Err(e) => {
                self.abandon(session, &ingested).await;
                Err(e.into())
            }
        }
    }

    /// Undo a write that never committed: drop whatever the session staged and
    /// remove only the files this write introduced.
    async fn abandon(&self, session: &mut Session, ingested: &Ingested) {
        if let Err(e) = session.rollback().await {
            warn!(error = %e, "rollback after failed news write");
        }
        self.media.discard(ingested.created()).await;
    }

    /// Remove the article; its comments go with it.
    #[instrument(skip(self, session))]
    pub async fn delete(&self, session: &mut Session, id: i32) -> Result<(), ServiceError> {
        let removed = News::delete(session, news::Column::Id, id, true).await?;
        info!(news_id = id, removed, "news_deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::category_service::CategoryForm;
    use crate::comment_service::{CommentForm, NewComment};
    use crate::media::MediaError;
    use crate::principal::Principal;
    use crate::test_support::{broken_upload, delayed_upload, get_db, make_user, services};

    fn draft(title: &str, category_id: Option<i32>, files: Vec<Upload>) -> NewsDraft {
        NewsDraft { title: title.into(), content: Some("body".into()), category_id, files }
    }

    fn paths(model: &news::Model) -> Vec<String> {
        model.images.0.iter().flatten().cloned().collect()
    }

    #[tokio::test]
    async fn create_resolves_category_and_stores_images_in_order() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let svc = services(dir.path());
        let mut session = Session::new(get_db().await?);

        let tech = svc.categories.create(&mut session, CategoryForm { name: "Tech".into() }).await?;
        let files = vec![
            delayed_upload("x.png", b"x".to_vec(), Duration::from_millis(60)),
            delayed_upload("y.jpg", b"y".to_vec(), Duration::ZERO),
            delayed_upload("z.png", b"z".to_vec(), Duration::from_millis(30)),
        ];
        let created = svc.news.create(&mut session, draft("A", Some(tech.id), files)).await?;

        assert_eq!(created.category_id, Some(tech.id));
        assert_eq!(paths(&created), vec!["media/x.png", "media/y.jpg", "media/z.png"]);
        let details = svc.news.get(&mut session, created.id).await?;
        assert_eq!(details.category.map(|c| c.name), Some("Tech".to_string()));
        assert!(details.comments.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_category_is_rejected_before_media_is_written() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let svc = services(dir.path());
        let mut session = Session::new(get_db().await?);

        let files = vec![Upload::from_bytes("never.png", "data")];
        let err = svc.news.create(&mut session, draft("B", Some(999), files)).await.expect_err("missing category");

        assert!(matches!(err, ServiceError::InvalidReference(ref m) if m.contains("category 999")));
        assert!(tokio::fs::metadata(dir.path().join("never.png")).await.is_err());
        assert!(svc.news.list(&mut session, Window::default()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn media_failure_aborts_creation() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let svc = services(dir.path());
        let mut session = Session::new(get_db().await?);

        let files = vec![Upload::from_bytes("ok.png", "ok"), broken_upload("bad.png", Duration::from_millis(50))];
        let err = svc.news.create(&mut session, draft("C", None, files)).await.expect_err("write failure");

        assert!(matches!(err, ServiceError::Media(MediaError::Write { .. })));
        assert!(svc.news.list(&mut session, Window::default()).await?.is_empty());
        assert!(tokio::fs::metadata(dir.path().join("ok.png")).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn full_update_replaces_every_field() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let svc = services(dir.path());
        let mut session = Session::new(get_db().await?);

        let tech = svc.categories.create(&mut session, CategoryForm { name: "Tech".into() }).await?;
        let original = svc
            .news
            .create(&mut session, draft("A", Some(tech.id), vec![Upload::from_bytes("a.png", "a")]))
            .await?;

        let replacement = NewsDraft { title: "A2".into(), content: None, category_id: None, files: Vec::new() };
        let updated = svc.news.update(&mut session, original.id, replacement).await?;

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created, original.created);
        assert_eq!(updated.title, "A2");
        assert_eq!(updated.content, None);
        assert_eq!(updated.category_id, None);
        assert!(updated.images.is_empty());
        assert!(updated.updated >= original.updated);
        Ok(())
    }

    #[tokio::test]
    async fn partial_update_keeps_omitted_fields() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let svc = services(dir.path());
        let mut session = Session::new(get_db().await?);

        let tech = svc.categories.create(&mut session, CategoryForm { name: "Tech".into() }).await?;
        let original = svc
            .news
            .create(&mut session, draft("A", Some(tech.id), vec![Upload::from_bytes("a.png", "a")]))
            .await?;

        let changes = NewsChanges { title: Some("A (edited)".into()), ..Default::default() };
        let patched = svc.news.partial_update(&mut session, original.id, changes).await?;

        assert_eq!(patched.title, "A (edited)");
        assert_eq!(patched.content, original.content);
        assert_eq!(patched.category_id, Some(tech.id));
        assert_eq!(patched.images, original.images);

        let changes = NewsChanges { files: vec![Upload::from_bytes("b.png", "b")], ..Default::default() };
        let patched = svc.news.partial_update(&mut session, original.id, changes).await?;
        assert_eq!(paths(&patched), vec!["media/b.png"]);
        assert_eq!(patched.title, "A (edited)");
        Ok(())
    }

    #[tokio::test]
    async fn partial_update_checks_supplied_category() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let svc = services(dir.path());
        let mut session = Session::new(get_db().await?);

        let original = svc.news.create(&mut session, draft("A", None, Vec::new())).await?;
        let changes = NewsChanges {
            category_id: Some(42),
            files: vec![Upload::from_bytes("wasted.png", "w")],
            ..Default::default()
        };
        let err = svc.news.partial_update(&mut session, original.id, changes).await.expect_err("bad category");

        assert!(matches!(err, ServiceError::InvalidReference(_)));
        assert!(tokio::fs::metadata(dir.path().join("wasted.png")).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn update_of_missing_news_is_not_found() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let svc = services(dir.path());
        let mut session = Session::new(get_db().await?);

        let err = svc
            .news
            .update(&mut session, 7, draft("X", None, vec![Upload::from_bytes("x.png", "x")]))
            .await
            .expect_err("missing news");
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(tokio::fs::metadata(dir.path().join("x.png")).await.is_err());

        let err = svc.news.partial_update(&mut session, 7, NewsChanges::default()).await.expect_err("missing news");
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(matches!(svc.news.get(&mut session, 7).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn deleting_news_removes_comments_and_category_deletion_detaches() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let svc = services(dir.path());
        let db = get_db().await?;
        let author = make_user(&db, "writer").await?;
        let mut session = Session::new(db);
        let principal = Principal::new(author.id);

        let tech = svc.categories.create(&mut session, CategoryForm { name: "Tech".into() }).await?;
        let a = svc.news.create(&mut session, draft("A", Some(tech.id), Vec::new())).await?;
        let b = svc.news.create(&mut session, draft("B", None, Vec::new())).await?;
        for text in ["one", "two", "three"] {
            svc.comments.create(&mut session, NewComment { text: text.into(), news_id: b.id }, &principal).await?;
        }
        assert_eq!(svc.news.get(&mut session, b.id).await?.comments.len(), 3);

        svc.news.delete(&mut session, b.id).await?;
        assert!(svc.comments.list(&mut session, b.id, Window::default()).await?.is_empty());

        svc.categories.delete(&mut session, tech.id).await?;
        let a = svc.news.find(&mut session, a.id).await?;
        assert_eq!(a.category_id, None);
        Ok(())
    }

    #[tokio::test]
    async fn category_news_comment_walkthrough() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let svc = services(dir.path());
        let db = get_db().await?;
        let u1 = Principal::new(make_user(&db, "u1").await?.id);
        let u2 = Principal::new(make_user(&db, "u2").await?.id);
        let mut session = Session::new(db);

        let tech = svc.categories.create(&mut session, CategoryForm { name: "Tech".into() }).await?;
        assert_eq!(tech.id, 1);

        let a = svc.news.create(&mut session, draft("A", Some(tech.id), Vec::new())).await?;
        assert_eq!(a.category_id, Some(1));

        let err = svc.news.create(&mut session, draft("B", Some(999), Vec::new())).await.expect_err("missing category");
        assert!(matches!(err, ServiceError::InvalidReference(_)));
        assert_eq!(svc.news.list(&mut session, Window::default()).await?.len(), 1);

        let hi = svc.comments.create(&mut session, NewComment { text: "hi".into(), news_id: a.id }, &u1).await?;
        assert_eq!(hi.user_id, u1.user_id);

        let err = svc
            .comments
            .update(&mut session, hi.id, CommentForm { text: "mine now".into() }, &u2)
            .await
            .expect_err("not the author");
        assert!(matches!(err, ServiceError::Forbidden(_)));

        svc.categories.delete(&mut session, tech.id).await?;
        assert_eq!(svc.news.find(&mut session, a.id).await?.category_id, None);
        Ok(())
    }

    #[tokio::test]
    async fn failed_create_keeps_files_of_saved_news() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let svc = services(dir.path());
        let mut session = Session::new(get_db().await?);

        let a = svc.news.create(&mut session, draft("A", None, vec![Upload::from_bytes("a.png", "A's image")])).await?;

        let files = vec![Upload::from_bytes("a.png", "B's image"), broken_upload("bad.png", Duration::from_millis(50))];
        let err = svc.news.create(&mut session, draft("B", None, files)).await.expect_err("write failure");
        assert!(matches!(err, ServiceError::Media(_)));

        let a = svc.news.find(&mut session, a.id).await?;
        assert_eq!(paths(&a), vec!["media/a.png"]);
        assert_eq!(tokio::fs::read(dir.path().join("a.png")).await?, b"A's image");
        assert!(tokio::fs::metadata(dir.path().join("bad.png")).await.is_err());
        Ok(())
    }
}

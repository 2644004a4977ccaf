use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use models::comment;

use crate::errors::ServiceError;
use crate::manager::{Filters, ObjectManager, Patch, Replacement};
use crate::news_service::NewsService;
use crate::pagination::Window;
use crate::principal::Principal;
use crate::session::Session;

type Comments = ObjectManager<comment::Entity>;

#[derive(Clone, Debug, Deserialize)]
pub struct NewComment {
    pub text: String,
    pub news_id: i32,
}

/// Full replacement of a comment's editable fields.
#[derive(Clone, Debug, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommentPatch {
    pub text: Option<String>,
}

impl Replacement<comment::Entity> for CommentForm {
    fn overwrite(self, row: &mut comment::ActiveModel) {
        row.text = Set(self.text);
        row.updated = Set(Utc::now().into());
    }
}

impl Patch<comment::Entity> for CommentPatch {
    fn apply(self, row: &mut comment::ActiveModel) {
        if let Some(text) = self.text {
            row.text = Set(text);
            row.updated = Set(Utc::now().into());
        }
    }
}

/// Comments on news. Only the author may change or remove a comment.
#[derive(Clone, Debug)]
pub struct CommentService {
    news: NewsService,
}

impl CommentService {
    pub fn new(news: NewsService) -> Self {
        Self { news }
    }

    /// Comments attached to one news article.
    pub async fn list(&self, session: &mut Session, news_id: i32, window: Window) -> Result<Vec<comment::Model>, ServiceError> {
        let filters = Filters::<comment::Entity>::none().eq(comment::Column::NewsId, news_id);
        Ok(Comments::list(session, filters, window).await?)
    }

    pub async fn get(&self, session: &mut Session, id: i32) -> Result<comment::Model, ServiceError> {
        Comments::get_by_id(session, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("comment", id))
    }

    /// Attach a comment authored by `principal` to an existing news article.
    #[instrument(skip(self, session, input, principal), fields(news_id = input.news_id, user_id = %principal.user_id))]
    pub async fn create(&self, session: &mut Session, input: NewComment, principal: &Principal) -> Result<comment::Model, ServiceError> {
        comment::validate_text(&input.text)?;
        self.news.find(session, input.news_id).await?;

        let now = Utc::now();
        let row = comment::ActiveModel {
            text: Set(input.text),
            created: Set(now.into()),
            updated: Set(now.into()),
            news_id: Set(input.news_id),
            user_id: Set(principal.user_id),
            ..Default::default()
        };
        let created = Comments::create(session, row, true).await?;
        info!(comment_id = created.id, "comment_created");
        Ok(created)
    }

    /// The comment, provided `principal` wrote it. A missing comment is
    /// reported as such, never as forbidden.
    async fn authorize(&self, session: &mut Session, id: i32, principal: &Principal) -> Result<comment::Model, ServiceError> {
        let found = self.get(session, id).await?;
        if !principal.owns(found.user_id) {
            warn!(comment_id = id, user_id = %principal.user_id, "comment access denied");
            return Err(ServiceError::Forbidden(format!("comment {} belongs to another user", id)));
        }
        Ok(found)
    }

    #[instrument(skip(self, session, form, principal), fields(user_id = %principal.user_id))]
    pub async fn update(&self, session: &mut Session, id: i32, form: CommentForm, principal: &Principal) -> Result<comment::Model, ServiceError> {
        comment::validate_text(&form.text)?;
        self.authorize(session, id, principal).await?;
        Comments::update(session, comment::Column::Id, id, true, form)
            .await?
            .ok_or_else(|| ServiceError::not_found("comment", id))
    }

    #[instrument(skip(self, session, patch, principal), fields(user_id = %principal.user_id))]
    pub async fn partial_update(&self, session: &mut Session, id: i32, patch: CommentPatch, principal: &Principal) -> Result<comment::Model, ServiceError> {
        if let Some(text) = &patch.text {
            comment::validate_text(text)?;
        }
        self.authorize(session, id, principal).await?;
        Comments::partial_update(session, comment::Column::Id, id, true, patch)
            .await?
            .ok_or_else(|| ServiceError::not_found("comment", id))
    }

    #[instrument(skip(self, session, principal), fields(user_id = %principal.user_id))]
    pub async fn delete(&self, session: &mut Session, id: i32, principal: &Principal) -> Result<(), ServiceError> {
        self.authorize(session, id, principal).await?;
        Comments::delete(session, comment::Column::Id, id, true).await?;
        info!(comment_id = id, "comment_deleted");
        Ok(())
    }
}

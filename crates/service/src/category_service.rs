use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use tracing::{info, instrument};

use models::category;

use crate::errors::ServiceError;
use crate::manager::{Filters, ObjectManager, Patch, Replacement};
use crate::pagination::Window;
use crate::session::Session;

type Categories = ObjectManager<category::Entity>;

/// Writable category columns, all of them.
#[derive(Clone, Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
}

impl Replacement<category::Entity> for CategoryForm {
    fn overwrite(self, row: &mut category::ActiveModel) {
        row.name = Set(self.name);
    }
}

impl Patch<category::Entity> for CategoryPatch {
    fn apply(self, row: &mut category::ActiveModel) {
        if let Some(name) = self.name {
            row.name = Set(name);
        }
    }
}

/// Category CRUD. Also the authority on whether a category id resolves.
#[derive(Clone, Debug, Default)]
pub struct CategoryService;

impl CategoryService {
    pub fn new() -> Self { Self }

    pub async fn list(&self, session: &mut Session, window: Window) -> Result<Vec<category::Model>, ServiceError> {
        Ok(Categories::list(session, Filters::none(), window).await?)
    }

    pub async fn get(&self, session: &mut Session, id: i32) -> Result<category::Model, ServiceError> {
        Categories::get_by_id(session, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("category", id))
    }

    #[instrument(skip(self, session, form))]
    pub async fn create(&self, session: &mut Session, form: CategoryForm) -> Result<category::Model, ServiceError> {
        category::validate_name(&form.name)?;
        let row = category::ActiveModel {
            name: Set(form.name),
            created: Set(Utc::now().into()),
            ..Default::default()
        };
        let created = Categories::create(session, row, true).await?;
        info!(category_id = created.id, "category_created");
        Ok(created)
    }

    #[instrument(skip(self, session, form))]
    pub async fn update(&self, session: &mut Session, id: i32, form: CategoryForm) -> Result<category::Model, ServiceError> {
        category::validate_name(&form.name)?;
        Categories::update(session, category::Column::Id, id, true, form)
            .await?
            .ok_or_else(|| ServiceError::not_found("category", id))
    }

    #[instrument(skip(self, session, patch))]
    pub async fn partial_update(&self, session: &mut Session, id: i32, patch: CategoryPatch) -> Result<category::Model, ServiceError> {
        if let Some(name) = &patch.name {
            category::validate_name(name)?;
        }
        Categories::partial_update(session, category::Column::Id, id, true, patch)
            .await?
            .ok_or_else(|| ServiceError::not_found("category", id))
    }

    /// Remove the category; its news stay, detached from it.
    #[instrument(skip(self, session))]
    pub async fn delete(&self, session: &mut Session, id: i32) -> Result<(), ServiceError> {
        let removed = Categories::delete(session, category::Column::Id, id, true).await?;
        info!(category_id = id, removed, "category_deleted");
        Ok(())
    }
}

use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

use crate::{category, comment, errors};

pub const TITLE_MAX_LEN: usize = 100;

/// Ordered media references attached to a news row. Positions mirror the
/// order the files were submitted in; a slot may be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct MediaList(pub Vec<Option<String>>);

impl MediaList {
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl From<Vec<String>> for MediaList {
    fn from(paths: Vec<String>) -> Self {
        MediaList(paths.into_iter().map(Some).collect())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "news")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub images: MediaList,
    pub created: DateTimeWithTimeZone,
    pub updated: DateTimeWithTimeZone,
    pub category_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Category,
    Comments,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Category => Entity::belongs_to(category::Entity)
                .from(Column::CategoryId)
                .to(category::Column::Id)
                .on_delete(ForeignKeyAction::SetNull)
                .into(),
            Relation::Comments => Entity::has_many(comment::Entity).into(),
        }
    }
}

impl Related<category::Entity> for Entity {
    fn to() -> RelationDef { Relation::Category.def() }
}

impl Related<comment::Entity> for Entity {
    fn to() -> RelationDef { Relation::Comments.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_title(title: &str) -> Result<(), errors::ModelError> {
    errors::validate_bounded("title", title, TITLE_MAX_LEN)
}

use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::comment;

/// Account row. Only `id` matters to the content tables: it is the
/// principal that authors comments.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub created: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Comments,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Comments => Entity::has_many(comment::Entity).into() }
    }
}

impl Related<comment::Entity> for Entity {
    fn to() -> RelationDef { Relation::Comments.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_email(email: &str) -> Result<(), errors::ModelError> {
    if !email.contains('@') { return Err(errors::ModelError::Validation("invalid email".into())); }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, email: &str, full_name: &str) -> Result<Model, errors::ModelError> {
    validate_email(email)?;
    errors::validate_bounded("full_name", full_name, 255)?;
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        full_name: Set(full_name.to_string()),
        is_active: Set(true),
        created: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn hard_delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), errors::ModelError> {
    Entity::delete_by_id(id).exec(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))?;
    Ok(())
}

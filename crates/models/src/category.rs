use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{errors, news};

pub const NAME_MAX_LEN: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub created: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    News,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::News => Entity::has_many(news::Entity).into() }
    }
}

impl Related<news::Entity> for Entity {
    fn to() -> RelationDef { Relation::News.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    errors::validate_bounded("name", name, NAME_MAX_LEN)
}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classroom;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trainers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub specialty: String,
    pub classroom_id: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    ClassRoom,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::ClassRoom => Entity::belongs_to(classroom::Entity)
                .from(Column::ClassroomId)
                .to(classroom::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

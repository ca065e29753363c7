use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classroom;
use crate::course;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub level: String,
    pub course_id: Option<i64>,
    pub classroom_id: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Course,
    ClassRoom,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Course => Entity::belongs_to(course::Entity)
                .from(Column::CourseId)
                .to(course::Column::Id)
                .into(),
            Relation::ClassRoom => Entity::belongs_to(classroom::Entity)
                .from(Column::ClassroomId)
                .to(classroom::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::trainer;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub title: String,
    pub level: String,
    pub prerequisites: Option<String>,
    pub min_capacity: i32,
    pub max_capacity: i32,
    pub current_capacity: i32,
    pub start_date: Date,
    pub end_date: Date,
    pub status: CourseStatus,
    pub trainer_id: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

/// Stored as the upper-case wire form ("IN_PROGRESS") for parity with the
/// values clients send and receive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseStatus {
    #[sea_orm(string_value = "PLANNED")]
    Planned,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl CourseStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PLANNED" => Some(Self::Planned),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Trainer,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Trainer => Entity::belongs_to(trainer::Entity)
                .from(Column::TrainerId)
                .to(trainer::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_available(&self) -> bool {
        self.current_capacity < self.max_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::CourseStatus;

    #[test]
    fn status_parse_accepts_wire_values() {
        assert_eq!(CourseStatus::parse("PLANNED"), Some(CourseStatus::Planned));
        assert_eq!(CourseStatus::parse("in_progress"), Some(CourseStatus::InProgress));
        assert_eq!(CourseStatus::parse(" completed "), Some(CourseStatus::Completed));
        assert_eq!(CourseStatus::parse("CANCELLED"), Some(CourseStatus::Cancelled));
        assert_eq!(CourseStatus::parse("bogus"), None);
    }
}

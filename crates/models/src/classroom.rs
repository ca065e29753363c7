use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "classrooms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub room_number: String,
    pub current_capacity: i32,
    pub max_capacity: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("no relations defined here")
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A room can take another student while occupancy is strictly below the maximum.
    pub fn is_available(&self) -> bool {
        self.current_capacity < self.max_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn room(current: i32, max: i32) -> Model {
        let now = Utc::now().into();
        Model {
            id: 1,
            name: "Room A".into(),
            room_number: "R1".into(),
            current_capacity: current,
            max_capacity: max,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn availability_is_strict() {
        assert!(room(1, 2).is_available());
        assert!(!room(2, 2).is_available());
    }
}

use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Set, SqlErr, TransactionTrait,
};
use serde::Deserialize;
use tracing::info;

use common::pagination::{Page, Pagination, Sort};
use models::{classroom, student, trainer};

use crate::errors::{EntityKind, ServiceError, MIN_KEYWORD_LEN};
use crate::paging::{order_of, to_page};

const ENTITY: EntityKind = EntityKind::ClassRoom;

/// Incoming classroom payload, shared by create and update (full replace).
#[derive(Clone, Debug, Deserialize)]
pub struct ClassRoomInput {
    pub name: String,
    pub room_number: String,
    #[serde(default)]
    pub current_capacity: i32,
    #[serde(default = "default_max_capacity")]
    pub max_capacity: i32,
}

fn default_max_capacity() -> i32 {
    30
}

fn validate(input: &ClassRoomInput) -> Vec<String> {
    let mut violations = Vec::new();
    let name_len = input.name.trim().chars().count();
    if !(2..=100).contains(&name_len) {
        violations.push("Name must be between 2 and 100 characters".to_string());
    }
    let room_len = input.room_number.trim().chars().count();
    if !(2..=20).contains(&room_len) {
        violations.push("Room number must be between 2 and 20 characters".to_string());
    }
    if input.current_capacity < 0 {
        violations.push("Current capacity must not be negative".to_string());
    }
    if input.max_capacity < input.current_capacity {
        violations.push("Maximum capacity cannot be less than current capacity".to_string());
    }
    violations
}

fn check_valid(input: &ClassRoomInput) -> Result<(), ServiceError> {
    let violations = validate(input);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::violations(ENTITY, violations))
    }
}

fn duplicate_room_number(room_number: &str) -> ServiceError {
    ServiceError::duplicate(ENTITY, format!("A classroom with room number {room_number} already exists"))
}

/// Translate a lost unique-constraint race into the same failure the
/// pre-insert check raises.
fn write_err(err: DbErr, room_number: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_room_number(room_number),
        _ => ServiceError::db(err),
    }
}

async fn room_number_taken<C: ConnectionTrait>(
    db: &C,
    room_number: &str,
    exclude_id: Option<i64>,
) -> Result<bool, ServiceError> {
    let mut query = classroom::Entity::find().filter(classroom::Column::RoomNumber.eq(room_number));
    if let Some(id) = exclude_id {
        query = query.filter(classroom::Column::Id.ne(id));
    }
    let count = query.count(db).await.map_err(ServiceError::db)?;
    Ok(count > 0)
}

async fn find_in<C: ConnectionTrait>(db: &C, id: i64) -> Result<classroom::Model, ServiceError> {
    classroom::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(ENTITY, id))
}

pub async fn create_classroom(
    db: &DatabaseConnection,
    input: ClassRoomInput,
) -> Result<classroom::Model, ServiceError> {
    check_valid(&input)?;
    let room_number = input.room_number.trim().to_string();
    if room_number_taken(db, &room_number, None).await? {
        return Err(duplicate_room_number(&room_number));
    }
    let now = Utc::now().into();
    let am = classroom::ActiveModel {
        name: Set(input.name.trim().to_string()),
        room_number: Set(room_number.clone()),
        current_capacity: Set(input.current_capacity),
        max_capacity: Set(input.max_capacity),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = am.insert(db).await.map_err(|e| write_err(e, &room_number))?;
    info!(id = created.id, room_number = %created.room_number, "created classroom");
    Ok(created)
}

pub async fn get_classroom(db: &DatabaseConnection, id: i64) -> Result<classroom::Model, ServiceError> {
    find_in(db, id).await
}

pub async fn update_classroom(
    db: &DatabaseConnection,
    id: i64,
    input: ClassRoomInput,
) -> Result<classroom::Model, ServiceError> {
    check_valid(&input)?;
    let txn = db.begin().await.map_err(ServiceError::db)?;
    let existing = find_in(&txn, id).await?;
    let room_number = input.room_number.trim().to_string();
    // Uniqueness is only re-checked when the value actually changed.
    if existing.room_number != room_number && room_number_taken(&txn, &room_number, Some(id)).await? {
        return Err(duplicate_room_number(&room_number));
    }
    let mut am: classroom::ActiveModel = existing.into();
    am.name = Set(input.name.trim().to_string());
    am.room_number = Set(room_number.clone());
    am.current_capacity = Set(input.current_capacity);
    am.max_capacity = Set(input.max_capacity);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(&txn).await.map_err(|e| write_err(e, &room_number))?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id = updated.id, "updated classroom");
    Ok(updated)
}

/// Delete a room. Guards run inside the delete transaction, students first.
pub async fn delete_classroom(db: &DatabaseConnection, id: i64) -> Result<(), ServiceError> {
    let txn = db.begin().await.map_err(ServiceError::db)?;
    find_in(&txn, id).await?;
    let students = student::Entity::find()
        .filter(student::Column::ClassroomId.eq(id))
        .count(&txn)
        .await
        .map_err(ServiceError::db)?;
    if students > 0 {
        return Err(ServiceError::in_use(ENTITY, "Cannot delete classroom with enrolled students"));
    }
    let trainers = trainer::Entity::find()
        .filter(trainer::Column::ClassroomId.eq(id))
        .count(&txn)
        .await
        .map_err(ServiceError::db)?;
    if trainers > 0 {
        return Err(ServiceError::in_use(ENTITY, "Cannot delete classroom with assigned trainers"));
    }
    classroom::Entity::delete_by_id(id).exec(&txn).await.map_err(ServiceError::db)?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id, "deleted classroom");
    Ok(())
}

/// Assign a student to a room, bumping occupancy in the same transaction.
pub async fn add_student(
    db: &DatabaseConnection,
    id: i64,
    student_id: i64,
) -> Result<classroom::Model, ServiceError> {
    let txn = db.begin().await.map_err(ServiceError::db)?;
    let room = find_in(&txn, id).await?;
    let student = student::Entity::find_by_id(student_id)
        .one(&txn)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(EntityKind::Student, student_id))?;
    match student.classroom_id {
        Some(current) if current == id => {
            return Err(ServiceError::invalid(
                EntityKind::Student,
                format!("Student is already assigned to classroom: {id}"),
            ));
        }
        Some(_) => {
            return Err(ServiceError::invalid(
                EntityKind::Student,
                "Student is already assigned to another classroom",
            ));
        }
        None => {}
    }
    if !room.is_available() {
        return Err(ServiceError::invalid(ENTITY, "Classroom is at full capacity"));
    }

    let mut student_am: student::ActiveModel = student.into();
    student_am.classroom_id = Set(Some(id));
    student_am.updated_at = Set(Utc::now().into());
    student_am.update(&txn).await.map_err(ServiceError::db)?;

    let occupancy = room.current_capacity + 1;
    let mut room_am: classroom::ActiveModel = room.into();
    room_am.current_capacity = Set(occupancy);
    room_am.updated_at = Set(Utc::now().into());
    let updated = room_am.update(&txn).await.map_err(ServiceError::db)?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id, student_id, occupancy, "assigned student to classroom");
    Ok(updated)
}

/// Unassign a student from a room, releasing one occupancy slot.
pub async fn remove_student(
    db: &DatabaseConnection,
    id: i64,
    student_id: i64,
) -> Result<classroom::Model, ServiceError> {
    let txn = db.begin().await.map_err(ServiceError::db)?;
    let room = find_in(&txn, id).await?;
    let student = student::Entity::find_by_id(student_id)
        .one(&txn)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(EntityKind::Student, student_id))?;
    if student.classroom_id != Some(id) {
        return Err(ServiceError::invalid(
            EntityKind::Student,
            format!("Student is not assigned to classroom: {id}"),
        ));
    }
    // An enrolled student must keep a classroom assignment.
    if student.course_id.is_some() {
        return Err(ServiceError::in_use(
            EntityKind::Student,
            "Cannot remove student from classroom while enrolled in a course",
        ));
    }

    let mut student_am: student::ActiveModel = student.into();
    student_am.classroom_id = Set(None);
    student_am.updated_at = Set(Utc::now().into());
    student_am.update(&txn).await.map_err(ServiceError::db)?;

    let occupancy = (room.current_capacity - 1).max(0);
    let mut room_am: classroom::ActiveModel = room.into();
    room_am.current_capacity = Set(occupancy);
    room_am.updated_at = Set(Utc::now().into());
    let updated = room_am.update(&txn).await.map_err(ServiceError::db)?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id, student_id, occupancy, "removed student from classroom");
    Ok(updated)
}

fn sort_column(field: &str) -> Option<classroom::Column> {
    match field {
        "id" => Some(classroom::Column::Id),
        "name" => Some(classroom::Column::Name),
        "room_number" | "roomNumber" => Some(classroom::Column::RoomNumber),
        "current_capacity" | "currentCapacity" => Some(classroom::Column::CurrentCapacity),
        "max_capacity" | "maxCapacity" => Some(classroom::Column::MaxCapacity),
        "created_at" | "createdAt" => Some(classroom::Column::CreatedAt),
        _ => None,
    }
}

fn apply_sort(select: Select<classroom::Entity>, sort: Option<&Sort>) -> Select<classroom::Entity> {
    match sort.and_then(|s| sort_column(&s.field).map(|col| (col, order_of(s.direction)))) {
        Some((col, order)) => select.order_by(col, order),
        None => select.order_by_asc(classroom::Column::Name),
    }
}

pub async fn list_classrooms(
    db: &DatabaseConnection,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<classroom::Model>, ServiceError> {
    to_page(db, apply_sort(classroom::Entity::find(), sort), opts).await
}

/// Case-insensitive substring search over name and room number.
pub async fn search_classrooms(
    db: &DatabaseConnection,
    keyword: &str,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<classroom::Model>, ServiceError> {
    let keyword = keyword.trim();
    if keyword.chars().count() < MIN_KEYWORD_LEN {
        return Err(ServiceError::bad_request("Search term must be at least 2 characters long"));
    }
    let pattern = format!("%{keyword}%");
    let query = classroom::Entity::find().filter(
        Condition::any()
            .add(Expr::col(classroom::Column::Name).ilike(pattern.as_str()))
            .add(Expr::col(classroom::Column::RoomNumber).ilike(pattern.as_str())),
    );
    to_page(db, apply_sort(query, sort), opts).await
}

/// Rooms with occupancy strictly below the given threshold.
pub async fn find_available_rooms(
    db: &DatabaseConnection,
    capacity: i32,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<classroom::Model>, ServiceError> {
    let query = classroom::Entity::find().filter(classroom::Column::CurrentCapacity.lt(capacity));
    to_page(db, apply_sort(query, sort), opts).await
}

fn without_students() -> sea_orm::sea_query::SimpleExpr {
    Expr::col((classroom::Entity, classroom::Column::Id)).not_in_subquery(
        Query::select()
            .column(student::Column::ClassroomId)
            .from(student::Entity)
            .and_where(student::Column::ClassroomId.is_not_null())
            .to_owned(),
    )
}

fn without_trainers() -> sea_orm::sea_query::SimpleExpr {
    Expr::col((classroom::Entity, classroom::Column::Id)).not_in_subquery(
        Query::select()
            .column(trainer::Column::ClassroomId)
            .from(trainer::Entity)
            .and_where(trainer::Column::ClassroomId.is_not_null())
            .to_owned(),
    )
}

/// Rooms referenced by no student and no trainer.
pub async fn find_empty_rooms(
    db: &DatabaseConnection,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<classroom::Model>, ServiceError> {
    let query = classroom::Entity::find()
        .filter(Condition::all().add(without_students()).add(without_trainers()));
    to_page(db, apply_sort(query, sort), opts).await
}

pub async fn find_rooms_without_trainers(
    db: &DatabaseConnection,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<classroom::Model>, ServiceError> {
    let query = classroom::Entity::find().filter(without_trainers());
    to_page(db, apply_sort(query, sort), opts).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, room_number: &str, current: i32, max: i32) -> ClassRoomInput {
        ClassRoomInput {
            name: name.to_string(),
            room_number: room_number.to_string(),
            current_capacity: current,
            max_capacity: max,
        }
    }

    #[test]
    fn validate_accepts_reasonable_room() {
        assert!(validate(&input("Room A", "R1", 0, 30)).is_empty());
    }

    #[test]
    fn validate_collects_all_violations() {
        let violations = validate(&input("x", "y", 5, 2));
        assert_eq!(violations.len(), 3);
        assert!(violations.iter().any(|v| v.contains("Name")));
        assert!(violations.iter().any(|v| v.contains("Room number")));
        assert!(violations.iter().any(|v| v.contains("Maximum capacity")));
    }

    #[test]
    fn validate_rejects_negative_occupancy() {
        let violations = validate(&input("Room A", "R1", -1, 30));
        assert!(violations.iter().any(|v| v.contains("negative")));
    }

    #[test]
    fn capacity_bound_is_inclusive() {
        // current == max is fine; the room is merely full, not invalid.
        assert!(validate(&input("Room A", "R1", 30, 30)).is_empty());
    }

    #[test]
    fn unknown_sort_field_is_ignored() {
        assert!(sort_column("bogus").is_none());
        assert!(sort_column("roomNumber").is_some());
        assert!(sort_column("room_number").is_some());
    }

    mod db {
        use super::*;
        use crate::test_support::get_db;
        use uuid::Uuid;

        fn unique_room(prefix: &str) -> String {
            format!("{prefix}-{}", Uuid::new_v4())
        }

        #[tokio::test]
        async fn classroom_crud_and_guards() -> Result<(), anyhow::Error> {
            if std::env::var("SKIP_DB_TESTS").is_ok() {
                return Ok(());
            }
            let db = get_db().await?;

            let room_number = unique_room("R");
            let created = create_classroom(&db, input("Room A", &room_number, 0, 2)).await?;
            assert!(created.id > 0);
            assert_eq!(created.current_capacity, 0);

            // Same room number again is a duplicate.
            let dup = create_classroom(&db, input("Room B", &room_number, 0, 2)).await;
            assert!(matches!(dup, Err(ServiceError::Duplicate { .. })));

            // Round-trip update with unchanged fields succeeds.
            let updated = update_classroom(
                &db,
                created.id,
                input(&created.name, &created.room_number, created.current_capacity, created.max_capacity),
            )
            .await?;
            assert_eq!(updated.room_number, room_number);

            let fetched = get_classroom(&db, created.id).await?;
            assert_eq!(fetched.id, created.id);

            delete_classroom(&db, created.id).await?;
            let gone = get_classroom(&db, created.id).await;
            assert!(matches!(gone, Err(ServiceError::NotFound { .. })));
            Ok(())
        }

        #[tokio::test]
        async fn full_room_blocks_assignment_and_delete() -> Result<(), anyhow::Error> {
            if std::env::var("SKIP_DB_TESTS").is_ok() {
                return Ok(());
            }
            let db = get_db().await?;

            let room = create_classroom(&db, input("Room A", &unique_room("R"), 0, 2)).await?;
            let s1 = crate::test_support::make_student(&db, "alice").await?;
            let s2 = crate::test_support::make_student(&db, "bob").await?;
            let s3 = crate::test_support::make_student(&db, "carol").await?;

            let room = add_student(&db, room.id, s1.id).await?;
            assert_eq!(room.current_capacity, 1);
            let room = add_student(&db, room.id, s2.id).await?;
            assert_eq!(room.current_capacity, 2);
            assert!(!room.is_available());

            // Third student bounces off the capacity check.
            let full = add_student(&db, room.id, s3.id).await;
            assert!(matches!(full, Err(ServiceError::Validation { .. })));

            // Occupied room cannot be deleted.
            let blocked = delete_classroom(&db, room.id).await;
            assert!(matches!(blocked, Err(ServiceError::InUse { .. })));

            // Drain the room, then deletion goes through.
            remove_student(&db, room.id, s1.id).await?;
            let room = remove_student(&db, room.id, s2.id).await?;
            assert_eq!(room.current_capacity, 0);
            crate::student_service::delete_student(&db, s1.id).await?;
            crate::student_service::delete_student(&db, s2.id).await?;
            crate::student_service::delete_student(&db, s3.id).await?;
            delete_classroom(&db, room.id).await?;
            Ok(())
        }
    }
}

use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Set, SqlErr, TransactionTrait,
};
use serde::Deserialize;
use tracing::info;

use common::pagination::{Page, Pagination, Sort};
use models::{classroom, course, student};

use crate::errors::{EntityKind, ServiceError, MIN_KEYWORD_LEN};
use crate::paging::{order_of, to_page};

const ENTITY: EntityKind = EntityKind::Student;

/// Incoming student payload, shared by create and update (full replace).
#[derive(Clone, Debug, Deserialize)]
pub struct StudentInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub level: String,
    #[serde(default)]
    pub course_id: Option<i64>,
    #[serde(default)]
    pub classroom_id: Option<i64>,
}

fn validate(input: &StudentInput) -> Vec<String> {
    let mut violations = Vec::new();
    let first_len = input.first_name.trim().chars().count();
    if !(2..=50).contains(&first_len) {
        violations.push("First name must be between 2 and 50 characters".to_string());
    }
    let last_len = input.last_name.trim().chars().count();
    if !(2..=50).contains(&last_len) {
        violations.push("Last name must be between 2 and 50 characters".to_string());
    }
    if !input.email.contains('@') {
        violations.push("Email must be valid".to_string());
    }
    let level_len = input.level.trim().chars().count();
    if !(2..=20).contains(&level_len) {
        violations.push("Level must be between 2 and 20 characters".to_string());
    }
    // An enrollment without a classroom assignment is rejected outright.
    if input.course_id.is_some() && input.classroom_id.is_none() {
        violations.push("Student must be assigned to a classroom".to_string());
    }
    violations
}

fn check_valid(input: &StudentInput) -> Result<(), ServiceError> {
    let violations = validate(input);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::violations(ENTITY, violations))
    }
}

fn duplicate_email(email: &str) -> ServiceError {
    ServiceError::duplicate(ENTITY, format!("A student with email {email} already exists"))
}

fn write_err(err: DbErr, email: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_email(email),
        _ => ServiceError::db(err),
    }
}

async fn email_taken<C: ConnectionTrait>(
    db: &C,
    email: &str,
    exclude_id: Option<i64>,
) -> Result<bool, ServiceError> {
    let mut query = student::Entity::find().filter(student::Column::Email.eq(email));
    if let Some(id) = exclude_id {
        query = query.filter(student::Column::Id.ne(id));
    }
    let count = query.count(db).await.map_err(ServiceError::db)?;
    Ok(count > 0)
}

async fn find_in<C: ConnectionTrait>(db: &C, id: i64) -> Result<student::Model, ServiceError> {
    student::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(ENTITY, id))
}

/// Claim a seat in a room: the room must exist and have spare capacity.
async fn occupy_room<C: ConnectionTrait>(db: &C, room_id: i64) -> Result<(), ServiceError> {
    let room = classroom::Entity::find_by_id(room_id)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(EntityKind::ClassRoom, room_id))?;
    if !room.is_available() {
        return Err(ServiceError::invalid(ENTITY, "Selected classroom is at full capacity"));
    }
    let occupancy = room.current_capacity + 1;
    let mut am: classroom::ActiveModel = room.into();
    am.current_capacity = Set(occupancy);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(ServiceError::db)?;
    Ok(())
}

/// Release a previously claimed seat.
async fn vacate_room<C: ConnectionTrait>(db: &C, room_id: i64) -> Result<(), ServiceError> {
    let room = classroom::Entity::find_by_id(room_id)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(EntityKind::ClassRoom, room_id))?;
    let occupancy = (room.current_capacity - 1).max(0);
    let mut am: classroom::ActiveModel = room.into();
    am.current_capacity = Set(occupancy);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(ServiceError::db)?;
    Ok(())
}

/// Claim a seat in a course: the course must exist and have spare capacity.
async fn occupy_course<C: ConnectionTrait>(db: &C, course_id: i64) -> Result<(), ServiceError> {
    let course = course::Entity::find_by_id(course_id)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(EntityKind::Course, course_id))?;
    if !course.is_available() {
        return Err(ServiceError::invalid(EntityKind::Course, "Course is at full capacity"));
    }
    let enrolled = course.current_capacity + 1;
    let mut am: course::ActiveModel = course.into();
    am.current_capacity = Set(enrolled);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(ServiceError::db)?;
    Ok(())
}

async fn vacate_course<C: ConnectionTrait>(db: &C, course_id: i64) -> Result<(), ServiceError> {
    let course = course::Entity::find_by_id(course_id)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(EntityKind::Course, course_id))?;
    let enrolled = (course.current_capacity - 1).max(0);
    let mut am: course::ActiveModel = course.into();
    am.current_capacity = Set(enrolled);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(ServiceError::db)?;
    Ok(())
}

pub async fn create_student(db: &DatabaseConnection, input: StudentInput) -> Result<student::Model, ServiceError> {
    check_valid(&input)?;
    let email = input.email.trim().to_string();
    let txn = db.begin().await.map_err(ServiceError::db)?;
    if email_taken(&txn, &email, None).await? {
        return Err(duplicate_email(&email));
    }
    // References claim their capacity slots inside the same transaction.
    if let Some(room_id) = input.classroom_id {
        occupy_room(&txn, room_id).await?;
    }
    if let Some(course_id) = input.course_id {
        occupy_course(&txn, course_id).await?;
    }
    let now = Utc::now().into();
    let am = student::ActiveModel {
        first_name: Set(input.first_name.trim().to_string()),
        last_name: Set(input.last_name.trim().to_string()),
        email: Set(email.clone()),
        level: Set(input.level.trim().to_string()),
        course_id: Set(input.course_id),
        classroom_id: Set(input.classroom_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = am.insert(&txn).await.map_err(|e| write_err(e, &email))?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id = created.id, email = %created.email, "created student");
    Ok(created)
}

pub async fn get_student(db: &DatabaseConnection, id: i64) -> Result<student::Model, ServiceError> {
    find_in(db, id).await
}

pub async fn update_student(
    db: &DatabaseConnection,
    id: i64,
    input: StudentInput,
) -> Result<student::Model, ServiceError> {
    check_valid(&input)?;
    let txn = db.begin().await.map_err(ServiceError::db)?;
    let existing = find_in(&txn, id).await?;
    let email = input.email.trim().to_string();
    if existing.email != email && email_taken(&txn, &email, Some(id)).await? {
        return Err(duplicate_email(&email));
    }
    // Move capacity slots only for references that actually changed.
    if existing.classroom_id != input.classroom_id {
        if let Some(old) = existing.classroom_id {
            vacate_room(&txn, old).await?;
        }
        if let Some(new) = input.classroom_id {
            occupy_room(&txn, new).await?;
        }
    }
    if existing.course_id != input.course_id {
        if let Some(old) = existing.course_id {
            vacate_course(&txn, old).await?;
        }
        if let Some(new) = input.course_id {
            occupy_course(&txn, new).await?;
        }
    }
    let mut am: student::ActiveModel = existing.into();
    am.first_name = Set(input.first_name.trim().to_string());
    am.last_name = Set(input.last_name.trim().to_string());
    am.email = Set(email.clone());
    am.level = Set(input.level.trim().to_string());
    am.course_id = Set(input.course_id);
    am.classroom_id = Set(input.classroom_id);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(&txn).await.map_err(|e| write_err(e, &email))?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id = updated.id, "updated student");
    Ok(updated)
}

/// Delete a student. Enrollment blocks deletion; a plain room assignment is
/// released along the way.
pub async fn delete_student(db: &DatabaseConnection, id: i64) -> Result<(), ServiceError> {
    let txn = db.begin().await.map_err(ServiceError::db)?;
    let student = find_in(&txn, id).await?;
    if student.course_id.is_some() {
        return Err(ServiceError::in_use(ENTITY, "Cannot delete student enrolled in a course"));
    }
    if let Some(room_id) = student.classroom_id {
        vacate_room(&txn, room_id).await?;
    }
    student::Entity::delete_by_id(id).exec(&txn).await.map_err(ServiceError::db)?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id, "deleted student");
    Ok(())
}

fn sort_column(field: &str) -> Option<student::Column> {
    match field {
        "id" => Some(student::Column::Id),
        "first_name" | "firstName" => Some(student::Column::FirstName),
        "last_name" | "lastName" => Some(student::Column::LastName),
        "email" => Some(student::Column::Email),
        "level" => Some(student::Column::Level),
        "created_at" | "createdAt" => Some(student::Column::CreatedAt),
        _ => None,
    }
}

fn apply_sort(select: Select<student::Entity>, sort: Option<&Sort>) -> Select<student::Entity> {
    match sort.and_then(|s| sort_column(&s.field).map(|col| (col, order_of(s.direction)))) {
        Some((col, order)) => select.order_by(col, order),
        None => select.order_by_asc(student::Column::LastName),
    }
}

pub async fn list_students(
    db: &DatabaseConnection,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<student::Model>, ServiceError> {
    to_page(db, apply_sort(student::Entity::find(), sort), opts).await
}

/// Case-insensitive substring search over last name, first name and email.
pub async fn search_students(
    db: &DatabaseConnection,
    keyword: &str,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<student::Model>, ServiceError> {
    let keyword = keyword.trim();
    if keyword.chars().count() < MIN_KEYWORD_LEN {
        return Err(ServiceError::bad_request("Search term must be at least 2 characters long"));
    }
    let pattern = format!("%{keyword}%");
    let query = student::Entity::find().filter(
        Condition::any()
            .add(Expr::col(student::Column::LastName).ilike(pattern.as_str()))
            .add(Expr::col(student::Column::FirstName).ilike(pattern.as_str()))
            .add(Expr::col(student::Column::Email).ilike(pattern.as_str())),
    );
    to_page(db, apply_sort(query, sort), opts).await
}

pub async fn find_by_level(
    db: &DatabaseConnection,
    level: &str,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<student::Model>, ServiceError> {
    let query = student::Entity::find().filter(student::Column::Level.eq(level));
    to_page(db, apply_sort(query, sort), opts).await
}

pub async fn find_by_course(
    db: &DatabaseConnection,
    course_id: i64,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<student::Model>, ServiceError> {
    let query = student::Entity::find().filter(student::Column::CourseId.eq(course_id));
    to_page(db, apply_sort(query, sort), opts).await
}

pub async fn find_by_classroom(
    db: &DatabaseConnection,
    classroom_id: i64,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<student::Model>, ServiceError> {
    let query = student::Entity::find().filter(student::Column::ClassroomId.eq(classroom_id));
    to_page(db, apply_sort(query, sort), opts).await
}

/// Exact match on both name parts.
pub async fn find_by_name(
    db: &DatabaseConnection,
    last_name: &str,
    first_name: &str,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<student::Model>, ServiceError> {
    let query = student::Entity::find()
        .filter(student::Column::LastName.eq(last_name))
        .filter(student::Column::FirstName.eq(first_name));
    to_page(db, apply_sort(query, sort), opts).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(email: &str) -> StudentInput {
        StudentInput {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            level: "Beginner".to_string(),
            course_id: None,
            classroom_id: None,
        }
    }

    #[test]
    fn validate_accepts_reasonable_student() {
        assert!(validate(&input("ada@example.com")).is_empty());
    }

    #[test]
    fn validate_rejects_bad_email() {
        let violations = validate(&input("not-an-email"));
        assert!(violations.iter().any(|v| v.contains("Email")));
    }

    #[test]
    fn enrollment_without_classroom_is_a_violation() {
        let mut student = input("ada@example.com");
        student.course_id = Some(1);
        let violations = validate(&student);
        assert!(violations.iter().any(|v| v.contains("classroom")));

        student.classroom_id = Some(1);
        assert!(validate(&student).is_empty());
    }

    #[test]
    fn validate_collects_all_violations() {
        let student = StudentInput {
            first_name: "A".to_string(),
            last_name: "".to_string(),
            email: "nope".to_string(),
            level: "x".to_string(),
            course_id: None,
            classroom_id: None,
        };
        assert_eq!(validate(&student).len(), 4);
    }

    mod db {
        use super::*;
        use crate::test_support::get_db;
        use uuid::Uuid;

        #[tokio::test]
        async fn duplicate_email_and_delete_guard() -> Result<(), anyhow::Error> {
            if std::env::var("SKIP_DB_TESTS").is_ok() {
                return Ok(());
            }
            let db = get_db().await?;

            let email = format!("student_{}@example.com", Uuid::new_v4());
            let created = create_student(&db, input(&email)).await?;

            let dup = create_student(&db, input(&email)).await;
            assert!(matches!(dup, Err(ServiceError::Duplicate { .. })));

            // Enroll through a room; then deletion is blocked.
            let room = crate::classroom_service::create_classroom(
                &db,
                crate::classroom_service::ClassRoomInput {
                    name: "Room S".to_string(),
                    room_number: format!("S-{}", Uuid::new_v4()),
                    current_capacity: 0,
                    max_capacity: 5,
                },
            )
            .await?;
            let course = crate::course_service::create_course(
                &db,
                crate::course_service::CourseInput {
                    title: format!("Course {}", Uuid::new_v4()),
                    level: "Beginner".to_string(),
                    prerequisites: None,
                    min_capacity: 1,
                    max_capacity: 10,
                    current_capacity: 0,
                    start_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                    end_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                    status: models::course::CourseStatus::Planned,
                    trainer_id: None,
                },
            )
            .await?;

            crate::classroom_service::add_student(&db, room.id, created.id).await?;
            crate::course_service::enroll_student(&db, course.id, created.id).await?;

            let blocked = delete_student(&db, created.id).await;
            assert!(matches!(blocked, Err(ServiceError::InUse { .. })));

            crate::course_service::withdraw_student(&db, course.id, created.id).await?;
            delete_student(&db, created.id).await?;
            crate::course_service::delete_course(&db, course.id).await?;
            crate::classroom_service::delete_classroom(&db, room.id).await?;
            Ok(())
        }
    }
}

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Set, SqlErr, TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument};

use common::pagination::{Page, Pagination, Sort};
use models::course::CourseStatus;
use models::{course, student, trainer};

use crate::errors::{EntityKind, ServiceError, MAX_COURSES_PER_TRAINER, MIN_KEYWORD_LEN};
use crate::paging::{order_of, to_page};

const ENTITY: EntityKind = EntityKind::Course;

/// Incoming course payload, shared by create and update (full replace).
#[derive(Clone, Debug, Deserialize)]
pub struct CourseInput {
    pub title: String,
    pub level: String,
    #[serde(default)]
    pub prerequisites: Option<String>,
    pub min_capacity: i32,
    pub max_capacity: i32,
    #[serde(default)]
    pub current_capacity: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: CourseStatus,
    #[serde(default)]
    pub trainer_id: Option<i64>,
}

fn validate(input: &CourseInput) -> Vec<String> {
    let mut violations = Vec::new();
    let title_len = input.title.trim().chars().count();
    if !(2..=100).contains(&title_len) {
        violations.push("Title must be between 2 and 100 characters".to_string());
    }
    let level_len = input.level.trim().chars().count();
    if !(2..=20).contains(&level_len) {
        violations.push("Level must be between 2 and 20 characters".to_string());
    }
    if let Some(prerequisites) = &input.prerequisites {
        if prerequisites.chars().count() > 500 {
            violations.push("Prerequisites must not exceed 500 characters".to_string());
        }
    }
    if input.min_capacity < 1 {
        violations.push("Minimum capacity must be at least 1".to_string());
    }
    if input.max_capacity < 1 {
        violations.push("Maximum capacity must be at least 1".to_string());
    }
    if input.current_capacity < 0 {
        violations.push("Current capacity must not be negative".to_string());
    }
    if input.min_capacity > input.max_capacity {
        violations.push("Minimum capacity must be less than or equal to maximum capacity".to_string());
    }
    if input.max_capacity < input.current_capacity {
        violations.push("Maximum capacity cannot be less than current capacity".to_string());
    }
    if input.start_date > input.end_date {
        violations.push("Start date must be before or equal to end date".to_string());
    }
    violations
}

fn check_valid(input: &CourseInput) -> Result<(), ServiceError> {
    let violations = validate(input);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::violations(ENTITY, violations))
    }
}

fn duplicate_title(title: &str) -> ServiceError {
    ServiceError::duplicate(ENTITY, format!("A course with title {title} already exists"))
}

fn write_err(err: DbErr, title: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_title(title),
        _ => ServiceError::db(err),
    }
}

async fn title_taken<C: ConnectionTrait>(
    db: &C,
    title: &str,
    exclude_id: Option<i64>,
) -> Result<bool, ServiceError> {
    let mut query = course::Entity::find().filter(course::Column::Title.eq(title));
    if let Some(id) = exclude_id {
        query = query.filter(course::Column::Id.ne(id));
    }
    let count = query.count(db).await.map_err(ServiceError::db)?;
    Ok(count > 0)
}

async fn find_in<C: ConnectionTrait>(db: &C, id: i64) -> Result<course::Model, ServiceError> {
    course::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(ENTITY, id))
}

/// Trainer must exist and hold fewer than the allowed number of other courses.
async fn check_trainer_assignment<C: ConnectionTrait>(
    db: &C,
    trainer_id: i64,
    exclude_course: Option<i64>,
) -> Result<(), ServiceError> {
    trainer::Entity::find_by_id(trainer_id)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(EntityKind::Trainer, trainer_id))?;
    let mut query = course::Entity::find().filter(course::Column::TrainerId.eq(trainer_id));
    if let Some(id) = exclude_course {
        query = query.filter(course::Column::Id.ne(id));
    }
    let assigned = query.count(db).await.map_err(ServiceError::db)?;
    if assigned >= MAX_COURSES_PER_TRAINER {
        return Err(ServiceError::in_use(
            EntityKind::Trainer,
            format!("Trainer has reached maximum course load: {trainer_id}"),
        ));
    }
    Ok(())
}

pub async fn create_course(db: &DatabaseConnection, input: CourseInput) -> Result<course::Model, ServiceError> {
    check_valid(&input)?;
    let title = input.title.trim().to_string();
    let txn = db.begin().await.map_err(ServiceError::db)?;
    if title_taken(&txn, &title, None).await? {
        return Err(duplicate_title(&title));
    }
    if let Some(trainer_id) = input.trainer_id {
        check_trainer_assignment(&txn, trainer_id, None).await?;
    }
    let now = Utc::now().into();
    let am = course::ActiveModel {
        title: Set(title.clone()),
        level: Set(input.level.trim().to_string()),
        prerequisites: Set(input.prerequisites.clone()),
        min_capacity: Set(input.min_capacity),
        max_capacity: Set(input.max_capacity),
        current_capacity: Set(input.current_capacity),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        status: Set(input.status),
        trainer_id: Set(input.trainer_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = am.insert(&txn).await.map_err(|e| write_err(e, &title))?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id = created.id, title = %created.title, "created course");
    Ok(created)
}

pub async fn get_course(db: &DatabaseConnection, id: i64) -> Result<course::Model, ServiceError> {
    find_in(db, id).await
}

pub async fn update_course(
    db: &DatabaseConnection,
    id: i64,
    input: CourseInput,
) -> Result<course::Model, ServiceError> {
    check_valid(&input)?;
    let txn = db.begin().await.map_err(ServiceError::db)?;
    let existing = find_in(&txn, id).await?;
    let title = input.title.trim().to_string();
    if existing.title != title && title_taken(&txn, &title, Some(id)).await? {
        return Err(duplicate_title(&title));
    }
    if let Some(trainer_id) = input.trainer_id {
        check_trainer_assignment(&txn, trainer_id, Some(id)).await?;
    }
    let mut am: course::ActiveModel = existing.into();
    am.title = Set(title.clone());
    am.level = Set(input.level.trim().to_string());
    am.prerequisites = Set(input.prerequisites.clone());
    am.min_capacity = Set(input.min_capacity);
    am.max_capacity = Set(input.max_capacity);
    am.current_capacity = Set(input.current_capacity);
    am.start_date = Set(input.start_date);
    am.end_date = Set(input.end_date);
    am.status = Set(input.status);
    am.trainer_id = Set(input.trainer_id);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(&txn).await.map_err(|e| write_err(e, &title))?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id = updated.id, "updated course");
    Ok(updated)
}

pub async fn delete_course(db: &DatabaseConnection, id: i64) -> Result<(), ServiceError> {
    let txn = db.begin().await.map_err(ServiceError::db)?;
    find_in(&txn, id).await?;
    let enrolled = student::Entity::find()
        .filter(student::Column::CourseId.eq(id))
        .count(&txn)
        .await
        .map_err(ServiceError::db)?;
    if enrolled > 0 {
        return Err(ServiceError::in_use(ENTITY, "Cannot delete course with enrolled students"));
    }
    course::Entity::delete_by_id(id).exec(&txn).await.map_err(ServiceError::db)?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id, "deleted course");
    Ok(())
}

/// Enroll a student, bumping course occupancy in the same transaction. The
/// student must already hold a classroom assignment.
#[instrument(skip(db))]
pub async fn enroll_student(
    db: &DatabaseConnection,
    id: i64,
    student_id: i64,
) -> Result<course::Model, ServiceError> {
    let txn = db.begin().await.map_err(ServiceError::db)?;
    let course = find_in(&txn, id).await?;
    let student = student::Entity::find_by_id(student_id)
        .one(&txn)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(EntityKind::Student, student_id))?;
    match student.course_id {
        Some(current) if current == id => {
            return Err(ServiceError::in_use(
                EntityKind::Student,
                format!("Student is already enrolled in course: {id}"),
            ));
        }
        Some(_) => {
            return Err(ServiceError::in_use(
                EntityKind::Student,
                "Student already enrolled in another course",
            ));
        }
        None => {}
    }
    if student.classroom_id.is_none() {
        return Err(ServiceError::invalid(EntityKind::Student, "Student must be assigned to a classroom"));
    }
    if !course.is_available() {
        return Err(ServiceError::invalid(ENTITY, "Course is at full capacity"));
    }

    let mut student_am: student::ActiveModel = student.into();
    student_am.course_id = Set(Some(id));
    student_am.updated_at = Set(Utc::now().into());
    student_am.update(&txn).await.map_err(ServiceError::db)?;

    let enrolled = course.current_capacity + 1;
    let mut course_am: course::ActiveModel = course.into();
    course_am.current_capacity = Set(enrolled);
    course_am.updated_at = Set(Utc::now().into());
    let updated = course_am.update(&txn).await.map_err(ServiceError::db)?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id, student_id, enrolled, "enrolled student in course");
    Ok(updated)
}

/// Withdraw a student from a course, releasing one seat.
#[instrument(skip(db))]
pub async fn withdraw_student(
    db: &DatabaseConnection,
    id: i64,
    student_id: i64,
) -> Result<course::Model, ServiceError> {
    let txn = db.begin().await.map_err(ServiceError::db)?;
    let course = find_in(&txn, id).await?;
    let student = student::Entity::find_by_id(student_id)
        .one(&txn)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(EntityKind::Student, student_id))?;
    if student.course_id != Some(id) {
        return Err(ServiceError::invalid(
            EntityKind::Student,
            format!("Student is not enrolled in course: {id}"),
        ));
    }

    let mut student_am: student::ActiveModel = student.into();
    student_am.course_id = Set(None);
    student_am.updated_at = Set(Utc::now().into());
    student_am.update(&txn).await.map_err(ServiceError::db)?;

    let enrolled = (course.current_capacity - 1).max(0);
    let mut course_am: course::ActiveModel = course.into();
    course_am.current_capacity = Set(enrolled);
    course_am.updated_at = Set(Utc::now().into());
    let updated = course_am.update(&txn).await.map_err(ServiceError::db)?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id, student_id, enrolled, "withdrew student from course");
    Ok(updated)
}

fn sort_column(field: &str) -> Option<course::Column> {
    match field {
        "id" => Some(course::Column::Id),
        "title" => Some(course::Column::Title),
        "level" => Some(course::Column::Level),
        "start_date" | "startDate" => Some(course::Column::StartDate),
        "end_date" | "endDate" => Some(course::Column::EndDate),
        "status" => Some(course::Column::Status),
        "max_capacity" | "maxCapacity" => Some(course::Column::MaxCapacity),
        "created_at" | "createdAt" => Some(course::Column::CreatedAt),
        _ => None,
    }
}

fn apply_sort(select: Select<course::Entity>, sort: Option<&Sort>) -> Select<course::Entity> {
    match sort.and_then(|s| sort_column(&s.field).map(|col| (col, order_of(s.direction)))) {
        Some((col, order)) => select.order_by(col, order),
        None => select.order_by_desc(course::Column::StartDate),
    }
}

pub async fn list_courses(
    db: &DatabaseConnection,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<course::Model>, ServiceError> {
    to_page(db, apply_sort(course::Entity::find(), sort), opts).await
}

/// Case-insensitive substring search over title, level and prerequisites.
pub async fn search_courses(
    db: &DatabaseConnection,
    keyword: &str,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<course::Model>, ServiceError> {
    let keyword = keyword.trim();
    if keyword.chars().count() < MIN_KEYWORD_LEN {
        return Err(ServiceError::bad_request("Search term must be at least 2 characters long"));
    }
    let pattern = format!("%{keyword}%");
    let query = course::Entity::find().filter(
        Condition::any()
            .add(Expr::col(course::Column::Title).ilike(pattern.as_str()))
            .add(Expr::col(course::Column::Level).ilike(pattern.as_str()))
            .add(Expr::col(course::Column::Prerequisites).ilike(pattern.as_str())),
    );
    to_page(db, apply_sort(query, sort), opts).await
}

/// Courses running entirely inside the given window. The window itself is
/// validated before any query runs.
pub async fn find_by_date_range(
    db: &DatabaseConnection,
    start_date: NaiveDate,
    end_date: NaiveDate,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<course::Model>, ServiceError> {
    if start_date > end_date {
        return Err(ServiceError::invalid(ENTITY, "Start date must be before or equal to end date"));
    }
    let query = course::Entity::find()
        .filter(course::Column::StartDate.gte(start_date))
        .filter(course::Column::EndDate.lte(end_date));
    to_page(db, apply_sort(query, sort), opts).await
}

pub async fn find_by_trainer(
    db: &DatabaseConnection,
    trainer_id: i64,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<course::Model>, ServiceError> {
    let query = course::Entity::find().filter(course::Column::TrainerId.eq(trainer_id));
    to_page(db, apply_sort(query, sort), opts).await
}

pub async fn find_by_level(
    db: &DatabaseConnection,
    level: &str,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<course::Model>, ServiceError> {
    let query = course::Entity::find().filter(course::Column::Level.eq(level));
    to_page(db, apply_sort(query, sort), opts).await
}

pub async fn find_by_status(
    db: &DatabaseConnection,
    status: CourseStatus,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<course::Model>, ServiceError> {
    let query = course::Entity::find().filter(course::Column::Status.eq(status));
    to_page(db, apply_sort(query, sort), opts).await
}

/// Planned courses that still have open seats.
pub async fn find_available_courses(
    db: &DatabaseConnection,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<course::Model>, ServiceError> {
    let query = course::Entity::find()
        .filter(course::Column::Status.eq(CourseStatus::Planned))
        .filter(
            Expr::col(course::Column::CurrentCapacity).lt(Expr::col(course::Column::MaxCapacity)),
        );
    to_page(db, apply_sort(query, sort), opts).await
}

/// Planned courses starting after today.
pub async fn find_upcoming_courses(
    db: &DatabaseConnection,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<course::Model>, ServiceError> {
    let today = Utc::now().date_naive();
    let query = course::Entity::find()
        .filter(course::Column::Status.eq(CourseStatus::Planned))
        .filter(course::Column::StartDate.gt(today));
    to_page(db, apply_sort(query, sort), opts).await
}

pub async fn find_ongoing_courses(
    db: &DatabaseConnection,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<course::Model>, ServiceError> {
    let query = course::Entity::find().filter(course::Column::Status.eq(CourseStatus::InProgress));
    to_page(db, apply_sort(query, sort), opts).await
}

pub async fn find_courses_without_trainer(
    db: &DatabaseConnection,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<course::Model>, ServiceError> {
    let query = course::Entity::find().filter(course::Column::TrainerId.is_null());
    to_page(db, apply_sort(query, sort), opts).await
}

/// Courses whose min/max capacity window contains the given head count.
pub async fn find_by_capacity(
    db: &DatabaseConnection,
    capacity: i32,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<course::Model>, ServiceError> {
    let query = course::Entity::find()
        .filter(course::Column::MinCapacity.lte(capacity))
        .filter(course::Column::MaxCapacity.gte(capacity));
    to_page(db, apply_sort(query, sort), opts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input(title: &str) -> CourseInput {
        CourseInput {
            title: title.to_string(),
            level: "Beginner".to_string(),
            prerequisites: None,
            min_capacity: 1,
            max_capacity: 20,
            current_capacity: 0,
            start_date: date(2024, 3, 1),
            end_date: date(2024, 6, 1),
            status: CourseStatus::Planned,
            trainer_id: None,
        }
    }

    #[test]
    fn validate_accepts_reasonable_course() {
        assert!(validate(&input("Rust Fundamentals")).is_empty());
    }

    #[test]
    fn validate_rejects_reversed_dates() {
        let mut course = input("Rust Fundamentals");
        course.start_date = date(2024, 6, 2);
        let violations = validate(&course);
        assert!(violations.iter().any(|v| v.contains("Start date")));
    }

    #[test]
    fn equal_dates_are_allowed() {
        let mut course = input("One Day Workshop");
        course.end_date = course.start_date;
        assert!(validate(&course).is_empty());
    }

    #[test]
    fn validate_rejects_inverted_capacity_range() {
        let mut course = input("Rust Fundamentals");
        course.min_capacity = 30;
        course.max_capacity = 20;
        let violations = validate(&course);
        assert!(violations.iter().any(|v| v.contains("Minimum capacity must be less than or equal")));
    }

    #[test]
    fn validate_rejects_occupancy_above_maximum() {
        let mut course = input("Rust Fundamentals");
        course.current_capacity = 21;
        let violations = validate(&course);
        assert!(violations.iter().any(|v| v.contains("Maximum capacity cannot be less than current capacity")));
    }

    #[test]
    fn validate_collects_multiple_violations_at_once() {
        let mut course = input("x");
        course.level = "a".to_string();
        course.min_capacity = 0;
        let violations = validate(&course);
        assert!(violations.len() >= 3);
    }

    mod db {
        use super::*;
        use crate::errors::ServiceError;
        use crate::test_support::get_db;
        use common::pagination::Pagination;
        use uuid::Uuid;

        #[tokio::test]
        async fn duplicate_title_is_rejected() -> Result<(), anyhow::Error> {
            if std::env::var("SKIP_DB_TESTS").is_ok() {
                return Ok(());
            }
            let db = get_db().await?;

            let title = format!("Course {}", Uuid::new_v4());
            let created = create_course(&db, input(&title)).await?;

            let dup = create_course(&db, input(&title)).await;
            assert!(matches!(dup, Err(ServiceError::Duplicate { .. })));

            // Unchanged title on update is not treated as a duplicate.
            let updated = update_course(&db, created.id, input(&title)).await?;
            assert_eq!(updated.title, title);

            delete_course(&db, created.id).await?;
            Ok(())
        }

        #[tokio::test]
        async fn date_range_query_validates_window() -> Result<(), anyhow::Error> {
            if std::env::var("SKIP_DB_TESTS").is_ok() {
                return Ok(());
            }
            let db = get_db().await?;

            let bad = find_by_date_range(
                &db,
                date(2024, 6, 1),
                date(2024, 3, 1),
                Pagination::default(),
                None,
            )
            .await;
            assert!(matches!(bad, Err(ServiceError::Validation { .. })));
            Ok(())
        }
    }
}

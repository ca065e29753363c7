use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{BinOper, Expr, Query, SimpleExpr, SubQueryStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Set, SqlErr, TransactionTrait,
};
use serde::Deserialize;
use tracing::info;

use common::pagination::{Page, Pagination, Sort};
use models::{classroom, course, trainer};

use crate::errors::{EntityKind, ServiceError, MIN_KEYWORD_LEN};
use crate::paging::{order_of, to_page};

const ENTITY: EntityKind = EntityKind::Trainer;

/// Incoming trainer payload, shared by create and update (full replace).
#[derive(Clone, Debug, Deserialize)]
pub struct TrainerInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialty: String,
    #[serde(default)]
    pub classroom_id: Option<i64>,
}

fn validate(input: &TrainerInput) -> Vec<String> {
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
    let specialty_len = input.specialty.trim().chars().count();
    if !(2..=50).contains(&specialty_len) {
        violations.push("Specialty must be between 2 and 50 characters".to_string());
    }
    violations
}

fn check_valid(input: &TrainerInput) -> Result<(), ServiceError> {
    let violations = validate(input);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::violations(ENTITY, violations))
    }
}

fn duplicate_email(email: &str) -> ServiceError {
    ServiceError::duplicate(ENTITY, format!("A trainer with email {email} already exists"))
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
    let mut query = trainer::Entity::find().filter(trainer::Column::Email.eq(email));
    if let Some(id) = exclude_id {
        query = query.filter(trainer::Column::Id.ne(id));
    }
    let count = query.count(db).await.map_err(ServiceError::db)?;
    Ok(count > 0)
}

async fn find_in<C: ConnectionTrait>(db: &C, id: i64) -> Result<trainer::Model, ServiceError> {
    trainer::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(ENTITY, id))
}

async fn check_classroom<C: ConnectionTrait>(db: &C, room_id: i64) -> Result<(), ServiceError> {
    classroom::Entity::find_by_id(room_id)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found(EntityKind::ClassRoom, room_id))?;
    Ok(())
}

pub async fn create_trainer(db: &DatabaseConnection, input: TrainerInput) -> Result<trainer::Model, ServiceError> {
    check_valid(&input)?;
    let email = input.email.trim().to_string();
    let txn = db.begin().await.map_err(ServiceError::db)?;
    if email_taken(&txn, &email, None).await? {
        return Err(duplicate_email(&email));
    }
    if let Some(room_id) = input.classroom_id {
        check_classroom(&txn, room_id).await?;
    }
    let now = Utc::now().into();
    let am = trainer::ActiveModel {
        first_name: Set(input.first_name.trim().to_string()),
        last_name: Set(input.last_name.trim().to_string()),
        email: Set(email.clone()),
        specialty: Set(input.specialty.trim().to_string()),
        classroom_id: Set(input.classroom_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = am.insert(&txn).await.map_err(|e| write_err(e, &email))?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id = created.id, email = %created.email, "created trainer");
    Ok(created)
}

pub async fn get_trainer(db: &DatabaseConnection, id: i64) -> Result<trainer::Model, ServiceError> {
    find_in(db, id).await
}

pub async fn update_trainer(
    db: &DatabaseConnection,
    id: i64,
    input: TrainerInput,
) -> Result<trainer::Model, ServiceError> {
    check_valid(&input)?;
    let txn = db.begin().await.map_err(ServiceError::db)?;
    let existing = find_in(&txn, id).await?;
    let email = input.email.trim().to_string();
    if existing.email != email && email_taken(&txn, &email, Some(id)).await? {
        return Err(duplicate_email(&email));
    }
    if let Some(room_id) = input.classroom_id {
        if existing.classroom_id != Some(room_id) {
            check_classroom(&txn, room_id).await?;
        }
    }
    let mut am: trainer::ActiveModel = existing.into();
    am.first_name = Set(input.first_name.trim().to_string());
    am.last_name = Set(input.last_name.trim().to_string());
    am.email = Set(email.clone());
    am.specialty = Set(input.specialty.trim().to_string());
    am.classroom_id = Set(input.classroom_id);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(&txn).await.map_err(|e| write_err(e, &email))?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id = updated.id, "updated trainer");
    Ok(updated)
}

pub async fn delete_trainer(db: &DatabaseConnection, id: i64) -> Result<(), ServiceError> {
    let txn = db.begin().await.map_err(ServiceError::db)?;
    find_in(&txn, id).await?;
    let assigned = course::Entity::find()
        .filter(course::Column::TrainerId.eq(id))
        .count(&txn)
        .await
        .map_err(ServiceError::db)?;
    if assigned > 0 {
        return Err(ServiceError::in_use(ENTITY, "Cannot delete trainer with assigned courses"));
    }
    trainer::Entity::delete_by_id(id).exec(&txn).await.map_err(ServiceError::db)?;
    txn.commit().await.map_err(ServiceError::db)?;
    info!(id, "deleted trainer");
    Ok(())
}

fn sort_column(field: &str) -> Option<trainer::Column> {
    match field {
        "id" => Some(trainer::Column::Id),
        "first_name" | "firstName" => Some(trainer::Column::FirstName),
        "last_name" | "lastName" => Some(trainer::Column::LastName),
        "email" => Some(trainer::Column::Email),
        "specialty" => Some(trainer::Column::Specialty),
        "created_at" | "createdAt" => Some(trainer::Column::CreatedAt),
        _ => None,
    }
}

fn apply_sort(select: Select<trainer::Entity>, sort: Option<&Sort>) -> Select<trainer::Entity> {
    match sort.and_then(|s| sort_column(&s.field).map(|col| (col, order_of(s.direction)))) {
        Some((col, order)) => select.order_by(col, order),
        None => select.order_by_asc(trainer::Column::LastName),
    }
}

pub async fn list_trainers(
    db: &DatabaseConnection,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<trainer::Model>, ServiceError> {
    to_page(db, apply_sort(trainer::Entity::find(), sort), opts).await
}

/// Case-insensitive substring search over last name, first name and specialty.
pub async fn search_trainers(
    db: &DatabaseConnection,
    keyword: &str,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<trainer::Model>, ServiceError> {
    let keyword = keyword.trim();
    if keyword.chars().count() < MIN_KEYWORD_LEN {
        return Err(ServiceError::bad_request("Search term must be at least 2 characters long"));
    }
    let pattern = format!("%{keyword}%");
    let query = trainer::Entity::find().filter(
        Condition::any()
            .add(Expr::col(trainer::Column::LastName).ilike(pattern.as_str()))
            .add(Expr::col(trainer::Column::FirstName).ilike(pattern.as_str()))
            .add(Expr::col(trainer::Column::Specialty).ilike(pattern.as_str())),
    );
    to_page(db, apply_sort(query, sort), opts).await
}

pub async fn find_by_email(
    db: &DatabaseConnection,
    email: &str,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<trainer::Model>, ServiceError> {
    let query = trainer::Entity::find().filter(trainer::Column::Email.eq(email));
    to_page(db, apply_sort(query, sort), opts).await
}

pub async fn find_by_specialty(
    db: &DatabaseConnection,
    specialty: &str,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<trainer::Model>, ServiceError> {
    let query = trainer::Entity::find().filter(trainer::Column::Specialty.eq(specialty));
    to_page(db, apply_sort(query, sort), opts).await
}

/// Exact match on both name parts.
pub async fn find_by_name(
    db: &DatabaseConnection,
    last_name: &str,
    first_name: &str,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<trainer::Model>, ServiceError> {
    let query = trainer::Entity::find()
        .filter(trainer::Column::LastName.eq(last_name))
        .filter(trainer::Column::FirstName.eq(first_name));
    to_page(db, apply_sort(query, sort), opts).await
}

pub async fn find_by_classroom(
    db: &DatabaseConnection,
    classroom_id: i64,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<trainer::Model>, ServiceError> {
    let query = trainer::Entity::find().filter(trainer::Column::ClassroomId.eq(classroom_id));
    to_page(db, apply_sort(query, sort), opts).await
}

/// Correlated count of the courses a trainer currently holds.
fn assigned_course_count() -> SimpleExpr {
    SimpleExpr::SubQuery(
        None,
        Box::new(SubQueryStatement::SelectStatement(
            Query::select()
                .expr(Expr::col((course::Entity, course::Column::Id)).count())
                .from(course::Entity)
                .and_where(
                    Expr::col((course::Entity, course::Column::TrainerId))
                        .equals((trainer::Entity, trainer::Column::Id)),
                )
                .to_owned(),
        )),
    )
}

/// Trainers holding strictly fewer than `max_courses` assignments.
pub async fn find_available_trainers(
    db: &DatabaseConnection,
    max_courses: i64,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<trainer::Model>, ServiceError> {
    let query = trainer::Entity::find()
        .filter(assigned_course_count().binary(BinOper::SmallerThan, Expr::val(max_courses)));
    to_page(db, apply_sort(query, sort), opts).await
}

pub async fn find_trainers_without_courses(
    db: &DatabaseConnection,
    opts: Pagination,
    sort: Option<&Sort>,
) -> Result<Page<trainer::Model>, ServiceError> {
    let query = trainer::Entity::find().filter(
        Expr::col((trainer::Entity, trainer::Column::Id)).not_in_subquery(
            Query::select()
                .column(course::Column::TrainerId)
                .from(course::Entity)
                .and_where(course::Column::TrainerId.is_not_null())
                .to_owned(),
        ),
    );
    to_page(db, apply_sort(query, sort), opts).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(email: &str) -> TrainerInput {
        TrainerInput {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: email.to_string(),
            specialty: "Compilers".to_string(),
            classroom_id: None,
        }
    }

    #[test]
    fn validate_accepts_reasonable_trainer() {
        assert!(validate(&input("grace@example.com")).is_empty());
    }

    #[test]
    fn validate_collects_all_violations() {
        let trainer = TrainerInput {
            first_name: "G".to_string(),
            last_name: "H".to_string(),
            email: "broken".to_string(),
            specialty: "x".to_string(),
            classroom_id: None,
        };
        assert_eq!(validate(&trainer).len(), 4);
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

            let email = format!("trainer_{}@example.com", Uuid::new_v4());
            let created = create_trainer(&db, input(&email)).await?;

            let dup = create_trainer(&db, input(&email)).await;
            assert!(matches!(dup, Err(ServiceError::Duplicate { .. })));

            // A course assignment blocks deletion.
            let course = crate::course_service::create_course(
                &db,
                crate::course_service::CourseInput {
                    title: format!("Course {}", Uuid::new_v4()),
                    level: "Advanced".to_string(),
                    prerequisites: None,
                    min_capacity: 1,
                    max_capacity: 10,
                    current_capacity: 0,
                    start_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                    end_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                    status: models::course::CourseStatus::Planned,
                    trainer_id: Some(created.id),
                },
            )
            .await?;

            let blocked = delete_trainer(&db, created.id).await;
            assert!(matches!(blocked, Err(ServiceError::InUse { .. })));

            crate::course_service::delete_course(&db, course.id).await?;
            delete_trainer(&db, created.id).await?;
            Ok(())
        }
    }
}

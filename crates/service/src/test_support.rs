#![cfg(test)]
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::student_service::{create_student, StudentInput};

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<()> = OnceCell::const_new();

pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    MIGRATED
        .get_or_init(|| async {
            let db = models::db::connect().await.expect("connect db for migration");
            migration::Migrator::up(&db, None).await.expect("migrate up");
            drop(db);
        })
        .await;

    // Return a fresh connection for the current test's runtime
    let db = models::db::connect().await?;
    Ok(db)
}

/// A throwaway student with a unique email and no assignments.
pub async fn make_student(db: &DatabaseConnection, name: &str) -> Result<models::student::Model, ServiceError> {
    create_student(
        db,
        StudentInput {
            first_name: name.to_string(),
            last_name: "Tester".to_string(),
            email: format!("{name}_{}@example.com", Uuid::new_v4()),
            level: "Beginner".to_string(),
            course_id: None,
            classroom_id: None,
        },
    )
    .await
}

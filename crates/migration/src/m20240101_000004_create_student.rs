//! Create `students` table with optional FKs to `courses` and `classrooms`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Student::Table)
                    .if_not_exists()
                    .col(big_integer(Student::Id).auto_increment().primary_key())
                    .col(string_len(Student::FirstName, 50).not_null())
                    .col(string_len(Student::LastName, 50).not_null())
                    .col(string_len(Student::Email, 100).unique_key().not_null())
                    .col(string_len(Student::Level, 20).not_null())
                    .col(big_integer_null(Student::CourseId))
                    .col(big_integer_null(Student::ClassroomId))
                    .col(timestamp_with_time_zone(Student::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Student::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_course")
                            .from(Student::Table, Student::CourseId)
                            .to(Course::Table, Course::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_classroom")
                            .from(Student::Table, Student::ClassroomId)
                            .to(ClassRoom::Table, ClassRoom::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Student::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Student {
    #[sea_orm(iden = "students")]
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Level,
    CourseId,
    ClassroomId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Course {
    #[sea_orm(iden = "courses")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum ClassRoom {
    #[sea_orm(iden = "classrooms")]
    Table,
    Id,
}

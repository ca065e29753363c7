use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Students: FK lookups and the level listing
        manager
            .create_index(
                Index::create()
                    .name("idx_student_course")
                    .table(Student::Table)
                    .col(Student::CourseId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_student_classroom")
                    .table(Student::Table)
                    .col(Student::ClassroomId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_student_level")
                    .table(Student::Table)
                    .col(Student::Level)
                    .to_owned(),
            )
            .await?;

        // Trainers: FK lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_trainer_classroom")
                    .table(Trainer::Table)
                    .col(Trainer::ClassroomId)
                    .to_owned(),
            )
            .await?;

        // Courses: trainer lookups plus the status/date listings
        manager
            .create_index(
                Index::create()
                    .name("idx_course_trainer")
                    .table(Course::Table)
                    .col(Course::TrainerId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_course_status")
                    .table(Course::Table)
                    .col(Course::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_course_start_date")
                    .table(Course::Table)
                    .col(Course::StartDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_student_course",
            "idx_student_classroom",
            "idx_student_level",
            "idx_trainer_classroom",
            "idx_course_trainer",
            "idx_course_status",
            "idx_course_start_date",
        ] {
            manager.drop_index(Index::drop().name(name).to_owned()).await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Student {
    #[sea_orm(iden = "students")]
    Table,
    CourseId,
    ClassroomId,
    Level,
}

#[derive(DeriveIden)]
enum Trainer {
    #[sea_orm(iden = "trainers")]
    Table,
    ClassroomId,
}

#[derive(DeriveIden)]
enum Course {
    #[sea_orm(iden = "courses")]
    Table,
    TrainerId,
    Status,
    StartDate,
}

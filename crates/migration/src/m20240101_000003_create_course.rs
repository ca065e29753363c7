//! Create `courses` table with an optional FK to `trainers`.
//!
//! Status is stored as a short string; dates are plain calendar dates.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Course::Table)
                    .if_not_exists()
                    .col(big_integer(Course::Id).auto_increment().primary_key())
                    .col(string_len(Course::Title, 100).unique_key().not_null())
                    .col(string_len(Course::Level, 20).not_null())
                    .col(string_len_null(Course::Prerequisites, 500))
                    .col(integer(Course::MinCapacity).not_null())
                    .col(integer(Course::MaxCapacity).not_null())
                    .col(integer(Course::CurrentCapacity).not_null().default(0))
                    .col(date(Course::StartDate).not_null())
                    .col(date(Course::EndDate).not_null())
                    .col(string_len(Course::Status, 20).not_null())
                    .col(big_integer_null(Course::TrainerId))
                    .col(timestamp_with_time_zone(Course::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Course::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_course_trainer")
                            .from(Course::Table, Course::TrainerId)
                            .to(Trainer::Table, Trainer::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Course::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Course {
    #[sea_orm(iden = "courses")]
    Table,
    Id,
    Title,
    Level,
    Prerequisites,
    MinCapacity,
    MaxCapacity,
    CurrentCapacity,
    StartDate,
    EndDate,
    Status,
    TrainerId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Trainer {
    #[sea_orm(iden = "trainers")]
    Table,
    Id,
}

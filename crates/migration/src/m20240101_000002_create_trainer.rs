//! Create `trainers` table with an optional FK to `classrooms`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Trainer::Table)
                    .if_not_exists()
                    .col(big_integer(Trainer::Id).auto_increment().primary_key())
                    .col(string_len(Trainer::FirstName, 50).not_null())
                    .col(string_len(Trainer::LastName, 50).not_null())
                    .col(string_len(Trainer::Email, 100).unique_key().not_null())
                    .col(string_len(Trainer::Specialty, 50).not_null())
                    .col(big_integer_null(Trainer::ClassroomId))
                    .col(timestamp_with_time_zone(Trainer::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Trainer::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trainer_classroom")
                            .from(Trainer::Table, Trainer::ClassroomId)
                            .to(ClassRoom::Table, ClassRoom::Id)
                            // The service refuses to delete occupied rooms; the
                            // store enforces the same rule.
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Trainer::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Trainer {
    #[sea_orm(iden = "trainers")]
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Specialty,
    ClassroomId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ClassRoom {
    #[sea_orm(iden = "classrooms")]
    Table,
    Id,
}

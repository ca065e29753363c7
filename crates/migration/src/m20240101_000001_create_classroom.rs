//! Create `classrooms` table.
//!
//! Room numbers are unique; occupancy is tracked as a plain counter next to
//! the configured maximum.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClassRoom::Table)
                    .if_not_exists()
                    .col(big_integer(ClassRoom::Id).auto_increment().primary_key())
                    .col(string_len(ClassRoom::Name, 100).not_null())
                    .col(string_len(ClassRoom::RoomNumber, 20).unique_key().not_null())
                    .col(integer(ClassRoom::CurrentCapacity).not_null().default(0))
                    .col(integer(ClassRoom::MaxCapacity).not_null().default(30))
                    .col(timestamp_with_time_zone(ClassRoom::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(ClassRoom::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ClassRoom::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ClassRoom {
    #[sea_orm(iden = "classrooms")]
    Table,
    Id,
    Name,
    RoomNumber,
    CurrentCapacity,
    MaxCapacity,
    CreatedAt,
    UpdatedAt,
}

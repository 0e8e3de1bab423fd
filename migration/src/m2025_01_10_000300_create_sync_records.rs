//! Migration to create the sync_records table.
//!
//! One row per synchronization run: status, item counters, and the list of
//! phase error messages accumulated while the run was in flight.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncRecords::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(SyncRecords::Status)
                            .text()
                            .not_null()
                            .default("in_progress"),
                    )
                    .col(
                        ColumnDef::new(SyncRecords::ItemsAdded)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncRecords::ItemsUpdated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncRecords::ItemsRemoved)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncRecords::ErrorCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncRecords::Errors)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SyncRecords::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncRecords::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_records_user_id")
                    .table(SyncRecords::Table)
                    .col(SyncRecords::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_sync_records_user_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SyncRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncRecords {
    Table,
    Id,
    UserId,
    Status,
    ItemsAdded,
    ItemsUpdated,
    ItemsRemoved,
    ErrorCount,
    Errors,
    StartedAt,
    CompletedAt,
}

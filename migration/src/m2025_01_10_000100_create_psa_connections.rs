//! Migration to create the psa_connections table.
//!
//! Stores per-user PSA endpoint configurations with encrypted OAuth client
//! credentials. Plaintext secrets never reach this table; only the base64
//! cipher blobs produced by the credential cipher are persisted.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PsaConnections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PsaConnections::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PsaConnections::UserId).uuid().not_null())
                    .col(ColumnDef::new(PsaConnections::Name).text().not_null())
                    .col(ColumnDef::new(PsaConnections::BaseUrl).text().not_null())
                    .col(
                        ColumnDef::new(PsaConnections::ClientIdCiphertext)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PsaConnections::ClientSecretCiphertext)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PsaConnections::Tenant).text().null())
                    .col(
                        ColumnDef::new(PsaConnections::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(PsaConnections::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(PsaConnections::LastTestStatus).text().null())
                    .col(
                        ColumnDef::new(PsaConnections::LastTestMessage)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PsaConnections::LastTestAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PsaConnections::LastUsedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PsaConnections::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PsaConnections::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index on user_id for per-user listing and default resolution
        manager
            .create_index(
                Index::create()
                    .name("idx_psa_connections_user_id")
                    .table(PsaConnections::Table)
                    .col(PsaConnections::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_psa_connections_user_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(PsaConnections::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PsaConnections {
    Table,
    Id,
    UserId,
    Name,
    BaseUrl,
    ClientIdCiphertext,
    ClientSecretCiphertext,
    Tenant,
    IsActive,
    IsDefault,
    LastTestStatus,
    LastTestMessage,
    LastTestAt,
    LastUsedAt,
    CreatedAt,
    UpdatedAt,
}

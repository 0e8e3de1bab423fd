//! Migration to create the knowledge_items table.
//!
//! Knowledge items are locally mirrored PSA configuration/reference records,
//! keyed for idempotent upserts by (user_id, category, source_id).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(KnowledgeItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(KnowledgeItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(KnowledgeItems::UserId).uuid().not_null())
                    .col(ColumnDef::new(KnowledgeItems::Category).text().not_null())
                    .col(
                        ColumnDef::new(KnowledgeItems::Subcategory)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(KnowledgeItems::Title).text().not_null())
                    .col(
                        ColumnDef::new(KnowledgeItems::Content)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(KnowledgeItems::Summary).text().not_null())
                    .col(ColumnDef::new(KnowledgeItems::SourceId).text().null())
                    .col(ColumnDef::new(KnowledgeItems::SourceName).text().null())
                    .col(
                        ColumnDef::new(KnowledgeItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(KnowledgeItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Upsert lookup path: (user_id, category, source_id)
        manager
            .create_index(
                Index::create()
                    .name("idx_knowledge_items_user_category_source")
                    .table(KnowledgeItems::Table)
                    .col(KnowledgeItems::UserId)
                    .col(KnowledgeItems::Category)
                    .col(KnowledgeItems::SourceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_knowledge_items_user_id")
                    .table(KnowledgeItems::Table)
                    .col(KnowledgeItems::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_knowledge_items_user_category_source")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_knowledge_items_user_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(KnowledgeItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum KnowledgeItems {
    Table,
    Id,
    UserId,
    Category,
    Subcategory,
    Title,
    Content,
    Summary,
    SourceId,
    SourceName,
    CreatedAt,
    UpdatedAt,
}

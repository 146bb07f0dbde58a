//! Migration: Create the documents table backing every collection.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Documents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Documents::Collection).string_len(32).not_null())
                    .col(ColumnDef::new(Documents::Id).uuid().not_null())
                    .col(ColumnDef::new(Documents::Version).big_integer().not_null())
                    .col(ColumnDef::new(Documents::Body).json_binary().not_null())
                    .col(
                        ColumnDef::new(Documents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Documents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(Documents::Collection)
                            .col(Documents::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Collection scans are ordered by creation time
        manager
            .create_index(
                Index::create()
                    .name("idx_documents_collection_created_at")
                    .table(Documents::Table)
                    .col(Documents::Collection)
                    .col(Documents::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Documents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Documents {
    Table,
    Collection,
    Id,
    Version,
    Body,
    CreatedAt,
    UpdatedAt,
}

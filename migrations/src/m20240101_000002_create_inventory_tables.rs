use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Materialized on-hand quantity per (store, product); version backs compare-and-swap updates
        manager
            .create_table(
                Table::create()
                    .table(Inventories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Inventories::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Inventories::StoreId).uuid().not_null())
                    .col(ColumnDef::new(Inventories::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(Inventories::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Inventories::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Inventories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Inventories::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventories_store_product")
                    .table(Inventories::Table)
                    .col(Inventories::StoreId)
                    .col(Inventories::ProductId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryTransactions::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::TransactionType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::StoreId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::ProductId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::ReferenceId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::ReferenceType)
                            .string_len(50)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::OperatorId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::BatchNumber)
                            .string_len(50)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Note)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::ReversalOf)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_transactions_store_product")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::StoreId)
                    .col(InventoryTransactions::ProductId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_transactions_reference")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::ReferenceType)
                    .col(InventoryTransactions::ReferenceId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DocumentSequences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DocumentSequences::Prefix)
                            .string_len(8)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DocumentSequences::Day)
                            .string_len(8)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DocumentSequences::LastValue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(DocumentSequences::Prefix)
                            .col(DocumentSequences::Day),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DocumentSequences::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Inventories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Inventories {
    Table,
    Id,
    StoreId,
    ProductId,
    Quantity,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InventoryTransactions {
    Table,
    Id,
    TransactionType,
    StoreId,
    ProductId,
    Quantity,
    ReferenceId,
    ReferenceType,
    OperatorId,
    BatchNumber,
    Note,
    ReversalOf,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DocumentSequences {
    Table,
    Prefix,
    Day,
    LastValue,
}

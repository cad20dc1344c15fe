use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryThresholds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryThresholds::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryThresholds::StoreId).uuid().null())
                    .col(ColumnDef::new(InventoryThresholds::Category).string_len(50).null())
                    .col(ColumnDef::new(InventoryThresholds::LowLevel).integer().not_null())
                    .col(ColumnDef::new(InventoryThresholds::HighLevel).integer().not_null())
                    .col(
                        ColumnDef::new(InventoryThresholds::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryThresholds::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryAlerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryAlerts::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryAlerts::StoreId).uuid().not_null())
                    .col(ColumnDef::new(InventoryAlerts::ProductId).uuid().not_null())
                    .col(ColumnDef::new(InventoryAlerts::Category).string_len(50).null())
                    .col(ColumnDef::new(InventoryAlerts::AlertType).string_len(20).not_null())
                    .col(ColumnDef::new(InventoryAlerts::Threshold).integer().not_null())
                    .col(ColumnDef::new(InventoryAlerts::CurrentQty).integer().not_null())
                    .col(
                        ColumnDef::new(InventoryAlerts::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(InventoryAlerts::ActiveKey).string_len(128).null())
                    .col(
                        ColumnDef::new(InventoryAlerts::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(InventoryAlerts::Description).string_len(255).null())
                    .col(
                        ColumnDef::new(InventoryAlerts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryAlerts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // NULLs never collide, so only active alerts participate in the uniqueness check
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_alerts_active_key")
                    .table(InventoryAlerts::Table)
                    .col(InventoryAlerts::ActiveKey)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryAlerts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryThresholds::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InventoryThresholds {
    Table,
    Id,
    StoreId,
    Category,
    LowLevel,
    HighLevel,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InventoryAlerts {
    Table,
    Id,
    StoreId,
    ProductId,
    Category,
    AlertType,
    Threshold,
    CurrentQty,
    Status,
    ActiveKey,
    ResolvedAt,
    Description,
    CreatedAt,
    UpdatedAt,
}

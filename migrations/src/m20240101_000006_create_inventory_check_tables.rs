use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryChecks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryChecks::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryChecks::StoreId).uuid().not_null())
                    .col(ColumnDef::new(InventoryChecks::CheckCode).string_len(50).not_null())
                    .col(ColumnDef::new(InventoryChecks::CheckType).string_len(20).not_null())
                    .col(
                        ColumnDef::new(InventoryChecks::Status)
                            .string_len(20)
                            .not_null()
                            .default("planned"),
                    )
                    .col(
                        ColumnDef::new(InventoryChecks::PlanDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryChecks::StartTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryChecks::EndTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(InventoryChecks::OperatorId).uuid().not_null())
                    .col(ColumnDef::new(InventoryChecks::Description).string_len(255).null())
                    .col(
                        ColumnDef::new(InventoryChecks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryChecks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_checks_code")
                    .table(InventoryChecks::Table)
                    .col(InventoryChecks::CheckCode)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryCheckItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryCheckItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryCheckItems::CheckId).uuid().not_null())
                    .col(ColumnDef::new(InventoryCheckItems::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(InventoryCheckItems::SystemQuantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::ActualQuantity)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::DifferenceQty)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(InventoryCheckItems::Note).string_len(255).null())
                    .col(
                        ColumnDef::new(InventoryCheckItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_check_items_check")
                            .from(InventoryCheckItems::Table, InventoryCheckItems::CheckId)
                            .to(InventoryChecks::Table, InventoryChecks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryCheckAdjustments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryCheckAdjustments::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckAdjustments::CheckId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckAdjustments::CheckItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckAdjustments::ProductId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckAdjustments::AdjustQuantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckAdjustments::Reason)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckAdjustments::ApprovalStatus)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckAdjustments::ApproverId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckAdjustments::ApprovalTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckAdjustments::ApprovalNote)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckAdjustments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckAdjustments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_check_adjustments_check")
                            .from(
                                InventoryCheckAdjustments::Table,
                                InventoryCheckAdjustments::CheckId,
                            )
                            .to(InventoryChecks::Table, InventoryChecks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryCheckAdjustments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryCheckItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryChecks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InventoryChecks {
    Table,
    Id,
    StoreId,
    CheckCode,
    CheckType,
    Status,
    PlanDate,
    StartTime,
    EndTime,
    OperatorId,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InventoryCheckItems {
    Table,
    Id,
    CheckId,
    ProductId,
    SystemQuantity,
    ActualQuantity,
    DifferenceQty,
    Status,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InventoryCheckAdjustments {
    Table,
    Id,
    CheckId,
    CheckItemId,
    ProductId,
    AdjustQuantity,
    Reason,
    ApprovalStatus,
    ApproverId,
    ApprovalTime,
    ApprovalNote,
    CreatedAt,
    UpdatedAt,
}

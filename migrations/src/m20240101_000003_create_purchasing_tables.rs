use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrders::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::OrderNumber)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::SupplierId).uuid().not_null())
                    .col(ColumnDef::new(PurchaseOrders::StoreId).uuid().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrders::Status)
                            .string_len(20)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::TotalAmount)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::ExpectedDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::ActualDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::CreatorId).uuid().not_null())
                    .col(ColumnDef::new(PurchaseOrders::ApproverId).uuid().null())
                    .col(
                        ColumnDef::new(PurchaseOrders::ApprovalTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::ApprovalNote)
                            .string_len(255)
                            .null(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::Note).string_len(255).null())
                    .col(
                        ColumnDef::new(PurchaseOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_orders_order_number")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::OrderNumber)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrderItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::PurchaseOrderId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::ProductId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::UnitPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::TotalPrice)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::ReceivedQty)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::Note)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_order_items_order")
                            .from(PurchaseOrderItems::Table, PurchaseOrderItems::PurchaseOrderId)
                            .to(PurchaseOrders::Table, PurchaseOrders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseReceivings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseReceivings::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivings::PurchaseOrderId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivings::ReceivingNumber)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseReceivings::StoreId).uuid().not_null())
                    .col(
                        ColumnDef::new(PurchaseReceivings::OperatorId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivings::ReceivingDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivings::Status)
                            .string_len(20)
                            .not_null()
                            .default("completed"),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivings::ReversedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(PurchaseReceivings::ReversedBy).uuid().null())
                    .col(
                        ColumnDef::new(PurchaseReceivings::Note)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_receivings_order")
                            .from(PurchaseReceivings::Table, PurchaseReceivings::PurchaseOrderId)
                            .to(PurchaseOrders::Table, PurchaseOrders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_receivings_number")
                    .table(PurchaseReceivings::Table)
                    .col(PurchaseReceivings::ReceivingNumber)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseReceivingItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseReceivingItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivingItems::PurchaseReceivingId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivingItems::PurchaseOrderItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivingItems::ProductId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivingItems::ExpectedQuantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivingItems::ActualQuantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivingItems::BatchNumber)
                            .string_len(50)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivingItems::QualityStatus)
                            .string_len(20)
                            .not_null()
                            .default("good"),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivingItems::Note)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseReceivingItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_receiving_items_receiving")
                            .from(
                                PurchaseReceivingItems::Table,
                                PurchaseReceivingItems::PurchaseReceivingId,
                            )
                            .to(PurchaseReceivings::Table, PurchaseReceivings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PurchaseReceivingItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseReceivings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PurchaseOrders {
    Table,
    Id,
    OrderNumber,
    SupplierId,
    StoreId,
    Status,
    TotalAmount,
    ExpectedDate,
    ActualDate,
    CreatorId,
    ApproverId,
    ApprovalTime,
    ApprovalNote,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PurchaseOrderItems {
    Table,
    Id,
    PurchaseOrderId,
    ProductId,
    Quantity,
    UnitPrice,
    TotalPrice,
    ReceivedQty,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PurchaseReceivings {
    Table,
    Id,
    PurchaseOrderId,
    ReceivingNumber,
    StoreId,
    OperatorId,
    ReceivingDate,
    Status,
    ReversedAt,
    ReversedBy,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PurchaseReceivingItems {
    Table,
    Id,
    PurchaseReceivingId,
    PurchaseOrderItemId,
    ProductId,
    ExpectedQuantity,
    ActualQuantity,
    BatchNumber,
    QualityStatus,
    Note,
    CreatedAt,
}

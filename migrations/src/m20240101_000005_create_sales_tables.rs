use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SalesOrders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SalesOrders::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(SalesOrders::OrderNumber).string_len(50).not_null())
                    .col(ColumnDef::new(SalesOrders::StoreId).uuid().not_null())
                    .col(ColumnDef::new(SalesOrders::MemberId).uuid().null())
                    .col(
                        ColumnDef::new(SalesOrders::Source)
                            .string_len(20)
                            .not_null()
                            .default("in_store"),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::Status)
                            .string_len(20)
                            .not_null()
                            .default("created"),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::TotalAmount)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::DiscountAmount)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::ActualAmount)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::PaymentMethod)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::PointsUsed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::PointsEarned)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SalesOrders::SalesPersonId).uuid().not_null())
                    .col(ColumnDef::new(SalesOrders::FittingRoomId).uuid().null())
                    .col(ColumnDef::new(SalesOrders::Note).string_len(255).null())
                    .col(
                        ColumnDef::new(SalesOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_orders_order_number")
                    .table(SalesOrders::Table)
                    .col(SalesOrders::OrderNumber)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SalesOrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SalesOrderItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SalesOrderItems::OrderId).uuid().not_null())
                    .col(ColumnDef::new(SalesOrderItems::ProductId).uuid().not_null())
                    .col(ColumnDef::new(SalesOrderItems::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(SalesOrderItems::RetailPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrderItems::ActualPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrderItems::DiscountAmount)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SalesOrderItems::QrCodeData).text().null())
                    .col(
                        ColumnDef::new(SalesOrderItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_order_items_order")
                            .from(SalesOrderItems::Table, SalesOrderItems::OrderId)
                            .to(SalesOrders::Table, SalesOrders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NegotiationRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NegotiationRecords::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(NegotiationRecords::OrderId).uuid().not_null())
                    .col(
                        ColumnDef::new(NegotiationRecords::OrderItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NegotiationRecords::InitialPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NegotiationRecords::FinalPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NegotiationRecords::NegotiationCount)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NegotiationRecords::SalesPersonId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(NegotiationRecords::Note).string_len(255).null())
                    .col(
                        ColumnDef::new(NegotiationRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_negotiation_records_order")
                            .from(NegotiationRecords::Table, NegotiationRecords::OrderId)
                            .to(SalesOrders::Table, SalesOrders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReturnOrders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ReturnOrders::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(ReturnOrders::OrderId).uuid().not_null())
                    .col(ColumnDef::new(ReturnOrders::ReturnNumber).string_len(50).not_null())
                    .col(ColumnDef::new(ReturnOrders::StoreId).uuid().not_null())
                    .col(ColumnDef::new(ReturnOrders::MemberId).uuid().null())
                    .col(ColumnDef::new(ReturnOrders::ReturnType).string_len(20).not_null())
                    .col(ColumnDef::new(ReturnOrders::ReturnReason).string_len(255).null())
                    .col(
                        ColumnDef::new(ReturnOrders::ReturnAmount)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReturnOrders::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(ReturnOrders::ProcessorId).uuid().not_null())
                    .col(ColumnDef::new(ReturnOrders::Note).string_len(255).null())
                    .col(
                        ColumnDef::new(ReturnOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReturnOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_return_orders_order")
                            .from(ReturnOrders::Table, ReturnOrders::OrderId)
                            .to(SalesOrders::Table, SalesOrders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_return_orders_return_number")
                    .table(ReturnOrders::Table)
                    .col(ReturnOrders::ReturnNumber)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReturnOrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReturnOrderItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReturnOrderItems::ReturnOrderId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReturnOrderItems::OrderItemId).uuid().not_null())
                    .col(ColumnDef::new(ReturnOrderItems::ProductId).uuid().not_null())
                    .col(ColumnDef::new(ReturnOrderItems::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(ReturnOrderItems::ReturnPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReturnOrderItems::QrCodeData).text().null())
                    .col(ColumnDef::new(ReturnOrderItems::ExchangeProductId).uuid().null())
                    .col(
                        ColumnDef::new(ReturnOrderItems::ExchangeQuantity)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReturnOrderItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_return_order_items_return")
                            .from(ReturnOrderItems::Table, ReturnOrderItems::ReturnOrderId)
                            .to(ReturnOrders::Table, ReturnOrders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReturnOrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReturnOrders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(NegotiationRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SalesOrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SalesOrders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SalesOrders {
    Table,
    Id,
    OrderNumber,
    StoreId,
    MemberId,
    Source,
    Status,
    TotalAmount,
    DiscountAmount,
    ActualAmount,
    PaymentMethod,
    PointsUsed,
    PointsEarned,
    SalesPersonId,
    FittingRoomId,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SalesOrderItems {
    Table,
    Id,
    OrderId,
    ProductId,
    Quantity,
    RetailPrice,
    ActualPrice,
    DiscountAmount,
    QrCodeData,
    CreatedAt,
}

#[derive(DeriveIden)]
enum NegotiationRecords {
    Table,
    Id,
    OrderId,
    OrderItemId,
    InitialPrice,
    FinalPrice,
    NegotiationCount,
    SalesPersonId,
    Note,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ReturnOrders {
    Table,
    Id,
    OrderId,
    ReturnNumber,
    StoreId,
    MemberId,
    ReturnType,
    ReturnReason,
    ReturnAmount,
    Status,
    ProcessorId,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ReturnOrderItems {
    Table,
    Id,
    ReturnOrderId,
    OrderItemId,
    ProductId,
    Quantity,
    ReturnPrice,
    QrCodeData,
    ExchangeProductId,
    ExchangeQuantity,
    CreatedAt,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Stores::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Stores::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Stores::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Stores::Address).string_len(255).null())
                    .col(ColumnDef::new(Stores::StoreType).string_len(50).null())
                    .col(ColumnDef::new(Stores::Phone).string_len(20).null())
                    .col(ColumnDef::new(Stores::Manager).string_len(50).null())
                    .col(
                        ColumnDef::new(Stores::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Stores::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Products::Sku).string_len(100).not_null())
                    .col(ColumnDef::new(Products::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Products::Color).string_len(50).null())
                    .col(ColumnDef::new(Products::Size).string_len(20).null())
                    .col(ColumnDef::new(Products::Season).string_len(20).null())
                    .col(ColumnDef::new(Products::Category).string_len(50).null())
                    .col(ColumnDef::new(Products::Image).string_len(255).null())
                    .col(
                        ColumnDef::new(Products::CostPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::RetailPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_sku")
                    .table(Products::Table)
                    .col(Products::Sku)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Suppliers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Suppliers::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Suppliers::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Suppliers::Code).string_len(50).not_null())
                    .col(ColumnDef::new(Suppliers::SupplierType).string_len(20).not_null())
                    .col(ColumnDef::new(Suppliers::ContactPerson).string_len(50).null())
                    .col(ColumnDef::new(Suppliers::ContactPhone).string_len(20).null())
                    .col(ColumnDef::new(Suppliers::Email).string_len(100).null())
                    .col(ColumnDef::new(Suppliers::Address).string_len(255).null())
                    .col(ColumnDef::new(Suppliers::City).string_len(50).null())
                    .col(
                        ColumnDef::new(Suppliers::Rating)
                            .string_len(10)
                            .not_null()
                            .default("B"),
                    )
                    .col(ColumnDef::new(Suppliers::Qualification).string_len(255).null())
                    .col(ColumnDef::new(Suppliers::PaymentTerms).string_len(100).null())
                    .col(ColumnDef::new(Suppliers::DeliveryTerms).string_len(100).null())
                    .col(
                        ColumnDef::new(Suppliers::Status)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Suppliers::Note).string_len(255).null())
                    .col(
                        ColumnDef::new(Suppliers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Suppliers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_suppliers_code")
                    .table(Suppliers::Table)
                    .col(Suppliers::Code)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Suppliers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Stores::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Stores {
    Table,
    Id,
    Name,
    Address,
    StoreType,
    Phone,
    Manager,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Sku,
    Name,
    Color,
    Size,
    Season,
    Category,
    Image,
    CostPrice,
    RetailPrice,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Suppliers {
    Table,
    Id,
    Name,
    Code,
    SupplierType,
    ContactPerson,
    ContactPhone,
    Email,
    Address,
    City,
    Rating,
    Qualification,
    PaymentTerms,
    DeliveryTerms,
    Status,
    Note,
    CreatedAt,
    UpdatedAt,
}

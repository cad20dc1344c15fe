use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FittingRooms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FittingRooms::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(FittingRooms::StoreId).uuid().not_null())
                    .col(ColumnDef::new(FittingRooms::RoomNumber).string_len(20).not_null())
                    .col(
                        ColumnDef::new(FittingRooms::Status)
                            .string_len(20)
                            .not_null()
                            .default("available"),
                    )
                    .col(
                        ColumnDef::new(FittingRooms::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FittingRooms::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_fitting_rooms_store_room")
                    .table(FittingRooms::Table)
                    .col(FittingRooms::StoreId)
                    .col(FittingRooms::RoomNumber)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FittingRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FittingRecords::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FittingRecords::MemberId).uuid().not_null())
                    .col(ColumnDef::new(FittingRecords::ProductId).uuid().not_null())
                    .col(ColumnDef::new(FittingRecords::FittingRoomId).uuid().not_null())
                    .col(ColumnDef::new(FittingRecords::StoreId).uuid().not_null())
                    .col(ColumnDef::new(FittingRecords::SatisfactionLevel).integer().null())
                    .col(ColumnDef::new(FittingRecords::BodyHeight).decimal_len(6, 2).null())
                    .col(ColumnDef::new(FittingRecords::BodyWeight).decimal_len(6, 2).null())
                    .col(
                        ColumnDef::new(FittingRecords::ShoulderWidth)
                            .decimal_len(6, 2)
                            .null(),
                    )
                    .col(ColumnDef::new(FittingRecords::BustSize).decimal_len(6, 2).null())
                    .col(ColumnDef::new(FittingRecords::WaistSize).decimal_len(6, 2).null())
                    .col(ColumnDef::new(FittingRecords::HipSize).decimal_len(6, 2).null())
                    .col(ColumnDef::new(FittingRecords::Comments).string_len(500).null())
                    .col(
                        ColumnDef::new(FittingRecords::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(FittingRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FittingRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_fitting_records_room")
                            .from(FittingRecords::Table, FittingRecords::FittingRoomId)
                            .to(FittingRooms::Table, FittingRooms::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FittingRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FittingRooms::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum FittingRooms {
    Table,
    Id,
    StoreId,
    RoomNumber,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum FittingRecords {
    Table,
    Id,
    MemberId,
    ProductId,
    FittingRoomId,
    StoreId,
    SatisfactionLevel,
    BodyHeight,
    BodyWeight,
    ShoulderWidth,
    BustSize,
    WaistSize,
    HipSize,
    Comments,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

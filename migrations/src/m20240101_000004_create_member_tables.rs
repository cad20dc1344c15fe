use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No points column: balances are always summed from points_transactions
        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Members::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Members::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Members::Phone).string_len(20).not_null())
                    .col(ColumnDef::new(Members::Gender).string_len(10).null())
                    .col(ColumnDef::new(Members::Birthday).date().null())
                    .col(ColumnDef::new(Members::Email).string_len(100).null())
                    .col(ColumnDef::new(Members::Address).string_len(255).null())
                    .col(
                        ColumnDef::new(Members::Level)
                            .string_len(20)
                            .not_null()
                            .default("regular"),
                    )
                    .col(
                        ColumnDef::new(Members::TotalSpent)
                            .decimal_len(14, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Members::LastPurchaseDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Members::BodyHeight).decimal_len(6, 2).null())
                    .col(ColumnDef::new(Members::BodyWeight).decimal_len(6, 2).null())
                    .col(ColumnDef::new(Members::ShoulderWidth).decimal_len(6, 2).null())
                    .col(ColumnDef::new(Members::BustSize).decimal_len(6, 2).null())
                    .col(ColumnDef::new(Members::WaistSize).decimal_len(6, 2).null())
                    .col(ColumnDef::new(Members::HipSize).decimal_len(6, 2).null())
                    .col(ColumnDef::new(Members::Inseam).decimal_len(6, 2).null())
                    .col(ColumnDef::new(Members::StylePreference).string_len(255).null())
                    .col(ColumnDef::new(Members::FavoriteColors).string_len(255).null())
                    .col(
                        ColumnDef::new(Members::FavoriteCategories)
                            .string_len(255)
                            .null(),
                    )
                    .col(ColumnDef::new(Members::ConsumptionLevel).string_len(20).null())
                    .col(ColumnDef::new(Members::Note).string_len(255).null())
                    .col(
                        ColumnDef::new(Members::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Members::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_members_phone")
                    .table(Members::Table)
                    .col(Members::Phone)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PointsTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PointsTransactions::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PointsTransactions::MemberId).uuid().not_null())
                    .col(
                        ColumnDef::new(PointsTransactions::Points)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointsTransactions::TransactionType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PointsTransactions::ReferenceId).uuid().null())
                    .col(
                        ColumnDef::new(PointsTransactions::ReferenceType)
                            .string_len(32)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PointsTransactions::Description)
                            .string_len(255)
                            .null(),
                    )
                    .col(ColumnDef::new(PointsTransactions::OperatorId).uuid().null())
                    .col(
                        ColumnDef::new(PointsTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_points_transactions_member")
                            .from(PointsTransactions::Table, PointsTransactions::MemberId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_points_transactions_member")
                    .table(PointsTransactions::Table)
                    .col(PointsTransactions::MemberId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PointsTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Members {
    Table,
    Id,
    Name,
    Phone,
    Gender,
    Birthday,
    Email,
    Address,
    Level,
    TotalSpent,
    LastPurchaseDate,
    BodyHeight,
    BodyWeight,
    ShoulderWidth,
    BustSize,
    WaistSize,
    HipSize,
    Inseam,
    StylePreference,
    FavoriteColors,
    FavoriteCategories,
    ConsumptionLevel,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PointsTransactions {
    Table,
    Id,
    MemberId,
    Points,
    TransactionType,
    ReferenceId,
    ReferenceType,
    Description,
    OperatorId,
    CreatedAt,
}

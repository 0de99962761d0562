use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Products::ItemCode)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string_len(500).not_null())
                    .col(ColumnDef::new(Products::ImageUrl).string_len(1000).null())
                    .col(ColumnDef::new(Products::ProductUrl).string_len(1000).not_null())
                    .col(ColumnDef::new(Products::AffiliateUrl).string_len(1000).null())
                    // Prices are stored in the smallest currency unit
                    .col(ColumnDef::new(Products::CurrentPrice).big_integer().not_null())
                    .col(ColumnDef::new(Products::OriginalPrice).big_integer().not_null())
                    .col(ColumnDef::new(Products::LowestPrice).big_integer().null())
                    .col(
                        ColumnDef::new(Products::DiscountRate)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Products::CheckedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(Products::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Products {
    Table,
    Id,
    ItemCode,
    Name,
    ImageUrl,
    ProductUrl,
    AffiliateUrl,
    CurrentPrice,
    OriginalPrice,
    LowestPrice,
    DiscountRate,
    CheckedAt,
    CreatedAt,
    UpdatedAt,
}

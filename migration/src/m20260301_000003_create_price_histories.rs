use sea_orm_migration::prelude::*;

use crate::m20260301_000002_create_products::Products;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only ledger of observed prices
        manager
            .create_table(
                Table::create()
                    .table(PriceHistories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PriceHistories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PriceHistories::ProductId).uuid().not_null())
                    .col(ColumnDef::new(PriceHistories::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(PriceHistories::DiscountRate)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(PriceHistories::ObservedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceHistories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_price_histories_product")
                            .from(PriceHistories::Table, PriceHistories::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Per-product time series lookups: (product_id, observed_at DESC)
        manager
            .create_index(
                Index::create()
                    .name("idx_price_histories_product_time")
                    .table(PriceHistories::Table)
                    .col(PriceHistories::ProductId)
                    .col((PriceHistories::ObservedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PriceHistories::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PriceHistories {
    Table,
    Id,
    ProductId,
    Price,
    DiscountRate,
    ObservedAt,
    CreatedAt,
}

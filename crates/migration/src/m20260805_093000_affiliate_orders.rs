use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum AffiliateOrders {
    Table,
    Id,
    ProductId,
    AffiliateId,
    BrandId,
    GrossAmountMinor,
    CommissionKind,
    CommissionValue,
    PlatformFeeKind,
    PlatformFeeValue,
    GrossCommissionMinor,
    PlatformFeeMinor,
    NetCommissionMinor,
    Currency,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AffiliateOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffiliateOrders::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AffiliateOrders::ProductId).string().not_null())
                    .col(
                        ColumnDef::new(AffiliateOrders::AffiliateId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AffiliateOrders::BrandId).string().not_null())
                    .col(
                        ColumnDef::new(AffiliateOrders::GrossAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateOrders::CommissionKind)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateOrders::CommissionValue)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateOrders::PlatformFeeKind)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateOrders::PlatformFeeValue)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateOrders::GrossCommissionMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateOrders::PlatformFeeMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateOrders::NetCommissionMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AffiliateOrders::Currency).string().not_null())
                    .col(
                        ColumnDef::new(AffiliateOrders::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-affiliate_orders-affiliate_id")
                    .table(AffiliateOrders::Table)
                    .col(AffiliateOrders::AffiliateId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AffiliateOrders::Table).to_owned())
            .await
    }
}

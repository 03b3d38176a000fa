use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Campaigns {
    Table,
    Id,
    BrandId,
    InfluencerId,
    BudgetMinor,
    PlatformFeePct,
    Currency,
    Status,
    EscrowHoldId,
    Version,
    CreatedAt,
}

#[derive(Iden)]
enum Bids {
    Table,
    Id,
    CampaignId,
    InfluencerId,
    AmountMinor,
    Currency,
    Status,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Campaigns::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Campaigns::BrandId).string().not_null())
                    .col(ColumnDef::new(Campaigns::InfluencerId).string())
                    .col(
                        ColumnDef::new(Campaigns::BudgetMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::PlatformFeePct)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Campaigns::Currency).string().not_null())
                    .col(ColumnDef::new(Campaigns::Status).string().not_null())
                    .col(ColumnDef::new(Campaigns::EscrowHoldId).string())
                    .col(
                        ColumnDef::new(Campaigns::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Campaigns::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-campaigns-brand_id")
                    .table(Campaigns::Table)
                    .col(Campaigns::BrandId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Bids::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bids::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Bids::CampaignId).string().not_null())
                    .col(ColumnDef::new(Bids::InfluencerId).string().not_null())
                    .col(ColumnDef::new(Bids::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Bids::Currency).string().not_null())
                    .col(ColumnDef::new(Bids::Status).string().not_null())
                    .col(ColumnDef::new(Bids::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-bids-campaign_id")
                            .from(Bids::Table, Bids::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-bids-campaign_id-status")
                    .table(Bids::Table)
                    .col(Bids::CampaignId)
                    .col(Bids::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bids::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await
    }
}

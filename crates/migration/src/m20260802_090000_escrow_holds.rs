use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum EscrowHolds {
    Table,
    Id,
    CampaignId,
    PayerAccountId,
    AmountMinor,
    Currency,
    Status,
    AutoReleaseAt,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EscrowHolds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EscrowHolds::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EscrowHolds::CampaignId).string().not_null())
                    .col(
                        ColumnDef::new(EscrowHolds::PayerAccountId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EscrowHolds::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EscrowHolds::Currency).string().not_null())
                    .col(ColumnDef::new(EscrowHolds::Status).string().not_null())
                    .col(ColumnDef::new(EscrowHolds::AutoReleaseAt).timestamp())
                    .col(ColumnDef::new(EscrowHolds::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // The sweeper scans for active holds past their deadline.
        manager
            .create_index(
                Index::create()
                    .name("idx-escrow_holds-status-auto_release_at")
                    .table(EscrowHolds::Table)
                    .col(EscrowHolds::Status)
                    .col(EscrowHolds::AutoReleaseAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-escrow_holds-campaign_id")
                    .table(EscrowHolds::Table)
                    .col(EscrowHolds::CampaignId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EscrowHolds::Table).to_owned())
            .await
    }
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Disputes {
    Table,
    Id,
    CampaignId,
    RaisedBy,
    Reason,
    Status,
    CampaignPriorStatus,
    Resolution,
    RefundPercentage,
    ResolvedInFavorOf,
    ResolvedBy,
    ResolvedAt,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Disputes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Disputes::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Disputes::CampaignId).string().not_null())
                    .col(ColumnDef::new(Disputes::RaisedBy).string().not_null())
                    .col(ColumnDef::new(Disputes::Reason).string().not_null())
                    .col(ColumnDef::new(Disputes::Status).string().not_null())
                    .col(
                        ColumnDef::new(Disputes::CampaignPriorStatus)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Disputes::Resolution).string())
                    .col(ColumnDef::new(Disputes::RefundPercentage).integer())
                    .col(ColumnDef::new(Disputes::ResolvedInFavorOf).string())
                    .col(ColumnDef::new(Disputes::ResolvedBy).string())
                    .col(ColumnDef::new(Disputes::ResolvedAt).timestamp())
                    .col(ColumnDef::new(Disputes::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-disputes-campaign_id-status")
                    .table(Disputes::Table)
                    .col(Disputes::CampaignId)
                    .col(Disputes::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Disputes::Table).to_owned())
            .await
    }
}

pub use sea_orm_migration::prelude::*;

mod m20260801_100000_accounts;
mod m20260801_140000_transactions;
mod m20260802_090000_escrow_holds;
mod m20260802_150000_campaigns;
mod m20260803_110000_disputes;
mod m20260805_093000_affiliate_orders;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260801_100000_accounts::Migration),
            Box::new(m20260801_140000_transactions::Migration),
            Box::new(m20260802_090000_escrow_holds::Migration),
            Box::new(m20260802_150000_campaigns::Migration),
            Box::new(m20260803_110000_disputes::Migration),
            Box::new(m20260805_093000_affiliate_orders::Migration),
        ]
    }
}

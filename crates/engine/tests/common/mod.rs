use sea_orm::Database;
use uuid::Uuid;

use engine::{Engine, PartyKind};
use migration::MigratorTrait;

pub async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

pub async fn account_with_funds(engine: &Engine, party: PartyKind, amount_minor: i64) -> Uuid {
    let account = engine.create_account(party).await.unwrap();
    if amount_minor > 0 {
        engine
            .deposit(
                account.id,
                amount_minor,
                &format!("seed:{}", account.id),
            )
            .await
            .unwrap();
    }
    account.id
}

/// Replays the account's entries and asserts they match the stored balances.
pub async fn assert_reconciled(engine: &Engine, account_id: Uuid) {
    engine.reconcile_account(account_id).await.unwrap();
}

use engine::{BalanceKind, EngineError, PartyKind, PostRequest, TransactionKind};
use uuid::Uuid;

mod common;
use common::{account_with_funds, assert_reconciled, engine_with_db};

#[tokio::test]
async fn deposit_credits_available_balance() {
    let engine = engine_with_db().await;
    let account = engine.create_account(PartyKind::Brand).await.unwrap();

    let tx = engine.deposit(account.id, 10_000, "dep-1").await.unwrap();
    assert_eq!(tx.kind, TransactionKind::Deposit);
    assert_eq!(tx.entries.len(), 1);

    let account = engine.account(account.id).await.unwrap();
    assert_eq!(account.available_minor, 10_000);
    assert_eq!(account.held_minor, 0);
    assert_reconciled(&engine, account.id).await;
}

#[tokio::test]
async fn deposit_replays_on_same_idempotency_key() {
    let engine = engine_with_db().await;
    let account = engine.create_account(PartyKind::Brand).await.unwrap();

    let first = engine.deposit(account.id, 5_000, "dep-retry").await.unwrap();
    let second = engine.deposit(account.id, 5_000, "dep-retry").await.unwrap();
    assert_eq!(first.id, second.id);

    let account = engine.account(account.id).await.unwrap();
    assert_eq!(account.available_minor, 5_000);
    assert_reconciled(&engine, account.id).await;
}

#[tokio::test]
async fn withdrawal_debits_available_balance() {
    let engine = engine_with_db().await;
    let account = account_with_funds(&engine, PartyKind::Influencer, 8_000).await;

    engine.withdraw(account, 3_000, "wd-1").await.unwrap();

    let account = engine.account(account).await.unwrap();
    assert_eq!(account.available_minor, 5_000);
    assert_reconciled(&engine, account.id).await;
}

#[tokio::test]
async fn withdrawal_beyond_available_fails_and_changes_nothing() {
    let engine = engine_with_db().await;
    let account = account_with_funds(&engine, PartyKind::Influencer, 2_000).await;

    let err = engine.withdraw(account, 2_001, "wd-over").await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    let account = engine.account(account).await.unwrap();
    assert_eq!(account.available_minor, 2_000);
    assert_reconciled(&engine, account.id).await;
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let engine = engine_with_db().await;
    let account = engine.create_account(PartyKind::Brand).await.unwrap();

    let err = engine.deposit(account.id, 0, "dep-zero").await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine.deposit(account.id, -100, "dep-neg").await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn unbalanced_internal_posting_is_rejected() {
    let engine = engine_with_db().await;
    let payer = account_with_funds(&engine, PartyKind::Brand, 10_000).await;
    let payee = engine.create_account(PartyKind::Influencer).await.unwrap();

    let err = engine
        .post(PostRequest {
            kind: TransactionKind::EscrowRelease,
            amount_minor: 1_000,
            related_entity_id: None,
            idempotency_key: None,
            created_by: payer.to_string(),
            movements: vec![
                (payer, BalanceKind::Available, -1_000),
                (payee.id, BalanceKind::Available, 900),
            ],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvariantViolation(_)));

    // Nothing may leak from the rejected posting.
    assert_eq!(
        engine.account(payer).await.unwrap().available_minor,
        10_000
    );
    assert_eq!(engine.account(payee.id).await.unwrap().available_minor, 0);
}

#[tokio::test]
async fn posting_to_unknown_account_fails() {
    let engine = engine_with_db().await;

    let err = engine
        .deposit(Uuid::new_v4(), 1_000, "dep-ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownAccount(_)));
}

#[tokio::test]
async fn held_balance_cannot_go_negative() {
    let engine = engine_with_db().await;
    let account = account_with_funds(&engine, PartyKind::Brand, 5_000).await;

    let err = engine
        .post(PostRequest {
            kind: TransactionKind::EscrowRefund,
            amount_minor: 1_000,
            related_entity_id: None,
            idempotency_key: None,
            created_by: account.to_string(),
            movements: vec![
                (account, BalanceKind::Held, -1_000),
                (account, BalanceKind::Available, 1_000),
            ],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvariantViolation(_)));
}

#[tokio::test]
async fn transaction_history_is_newest_first_without_duplicates() {
    let engine = engine_with_db().await;
    let account = engine.create_account(PartyKind::Brand).await.unwrap();

    engine.deposit(account.id, 1_000, "h-1").await.unwrap();
    engine.deposit(account.id, 2_000, "h-2").await.unwrap();
    engine.withdraw(account.id, 500, "h-3").await.unwrap();

    let txs = engine
        .list_transactions_for_account(account.id, 50)
        .await
        .unwrap();
    assert_eq!(txs.len(), 3);
    let mut ids: Vec<_> = txs.iter().map(|tx| tx.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert_eq!(txs[0].kind, TransactionKind::Withdrawal);
}

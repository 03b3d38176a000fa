use chrono::{Duration, Utc};
use engine::{EngineError, HoldStatus, PartyKind, TransactionKind};
use uuid::Uuid;

mod common;
use common::{account_with_funds, assert_reconciled, engine_with_db};

#[tokio::test]
async fn lock_moves_available_into_held() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 10_000).await;

    let hold = engine
        .lock(Uuid::new_v4(), brand, 4_000, None, "lock-1")
        .await
        .unwrap();
    assert_eq!(hold.status, HoldStatus::Active);

    let account = engine.account(brand).await.unwrap();
    assert_eq!(account.available_minor, 6_000);
    assert_eq!(account.held_minor, 4_000);
    assert_reconciled(&engine, brand).await;
}

#[tokio::test]
async fn lock_beyond_available_fails() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 1_000).await;

    let err = engine
        .lock(Uuid::new_v4(), brand, 1_001, None, "lock-over")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    let account = engine.account(brand).await.unwrap();
    assert_eq!(account.available_minor, 1_000);
    assert_eq!(account.held_minor, 0);
}

#[tokio::test]
async fn release_pays_payee_minus_platform_fee() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 10_000).await;
    let influencer = engine
        .create_account(PartyKind::Influencer)
        .await
        .unwrap()
        .id;

    let hold = engine
        .lock(Uuid::new_v4(), brand, 5_000, None, "lock-rel")
        .await
        .unwrap();
    let txs = engine
        .release(hold.id, influencer, 500, "rel-1")
        .await
        .unwrap();
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].kind, TransactionKind::EscrowRelease);
    assert_eq!(txs[1].kind, TransactionKind::PlatformFee);

    assert_eq!(engine.account(brand).await.unwrap().held_minor, 0);
    assert_eq!(
        engine.account(influencer).await.unwrap().available_minor,
        4_500
    );
    assert_eq!(
        engine
            .account(engine.platform_account_id())
            .await
            .unwrap()
            .available_minor,
        500
    );
    assert_eq!(
        engine.hold(hold.id).await.unwrap().status,
        HoldStatus::Released
    );
    assert_reconciled(&engine, brand).await;
    assert_reconciled(&engine, influencer).await;
    assert_reconciled(&engine, engine.platform_account_id()).await;
}

#[tokio::test]
async fn release_without_fee_produces_single_transaction() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 3_000).await;
    let influencer = engine
        .create_account(PartyKind::Influencer)
        .await
        .unwrap()
        .id;

    let hold = engine
        .lock(Uuid::new_v4(), brand, 3_000, None, "lock-nofee")
        .await
        .unwrap();
    let txs = engine
        .release(hold.id, influencer, 0, "rel-nofee")
        .await
        .unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(
        engine.account(influencer).await.unwrap().available_minor,
        3_000
    );
}

#[tokio::test]
async fn release_is_idempotent() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 5_000).await;
    let influencer = engine
        .create_account(PartyKind::Influencer)
        .await
        .unwrap()
        .id;

    let hold = engine
        .lock(Uuid::new_v4(), brand, 5_000, None, "lock-idem")
        .await
        .unwrap();
    let first = engine
        .release(hold.id, influencer, 250, "rel-idem")
        .await
        .unwrap();
    let second = engine
        .release(hold.id, influencer, 250, "rel-idem")
        .await
        .unwrap();
    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].id, second[0].id);

    assert_eq!(
        engine.account(influencer).await.unwrap().available_minor,
        4_750
    );
    assert_reconciled(&engine, influencer).await;
}

#[tokio::test]
async fn double_settlement_under_different_keys_fails() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 5_000).await;
    let influencer = engine
        .create_account(PartyKind::Influencer)
        .await
        .unwrap()
        .id;

    let hold = engine
        .lock(Uuid::new_v4(), brand, 5_000, None, "lock-double")
        .await
        .unwrap();
    engine
        .release(hold.id, influencer, 0, "rel-a")
        .await
        .unwrap();

    let err = engine
        .release(hold.id, influencer, 0, "rel-b")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidHoldState(_)));

    let err = engine.refund(hold.id, "ref-b").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidHoldState(_)));
}

#[tokio::test]
async fn refund_returns_funds_to_payer() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 7_000).await;

    let hold = engine
        .lock(Uuid::new_v4(), brand, 7_000, None, "lock-ref")
        .await
        .unwrap();
    let tx = engine.refund(hold.id, "ref-1").await.unwrap();
    assert_eq!(tx.kind, TransactionKind::EscrowRefund);

    let account = engine.account(brand).await.unwrap();
    assert_eq!(account.available_minor, 7_000);
    assert_eq!(account.held_minor, 0);
    assert_eq!(
        engine.hold(hold.id).await.unwrap().status,
        HoldStatus::Refunded
    );
    assert_reconciled(&engine, brand).await;
}

#[tokio::test]
async fn split_exhausts_the_hold_with_floored_refund() {
    // 9_999 at 33% refund floors to 3_299; the leftover cent goes to the
    // payee.
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 9_999).await;
    let influencer = engine
        .create_account(PartyKind::Influencer)
        .await
        .unwrap()
        .id;

    let hold = engine
        .lock(Uuid::new_v4(), brand, 9_999, None, "lock-split")
        .await
        .unwrap();
    let txs = engine
        .split(hold.id, influencer, 67, 33, "split-1")
        .await
        .unwrap();
    assert_eq!(txs.len(), 2);

    let brand_account = engine.account(brand).await.unwrap();
    let influencer_account = engine.account(influencer).await.unwrap();
    assert_eq!(brand_account.held_minor, 0);
    assert_eq!(brand_account.available_minor, 3_299);
    assert_eq!(influencer_account.available_minor, 6_700);
    assert_eq!(
        brand_account.available_minor + influencer_account.available_minor,
        9_999
    );
    assert_eq!(engine.hold(hold.id).await.unwrap().status, HoldStatus::Split);
    assert_reconciled(&engine, brand).await;
    assert_reconciled(&engine, influencer).await;
}

#[tokio::test]
async fn every_split_ratio_partitions_the_hold_exactly() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 9_999 * 101).await;
    let influencer = engine
        .create_account(PartyKind::Influencer)
        .await
        .unwrap()
        .id;

    for refund_pct in 0..=100u8 {
        let hold = engine
            .lock(
                Uuid::new_v4(),
                brand,
                9_999,
                None,
                &format!("lock-ratio-{refund_pct}"),
            )
            .await
            .unwrap();
        engine
            .split(
                hold.id,
                influencer,
                100 - refund_pct,
                refund_pct,
                &format!("split-ratio-{refund_pct}"),
            )
            .await
            .unwrap();
        assert_eq!(engine.hold(hold.id).await.unwrap().status, HoldStatus::Split);

        // Every cent of the hold landed with one of the two parties; a
        // lost or invented cent at this ratio breaks the running total.
        let brand_account = engine.account(brand).await.unwrap();
        let influencer_account = engine.account(influencer).await.unwrap();
        assert_eq!(brand_account.held_minor, 0);
        assert_eq!(
            brand_account.available_minor + influencer_account.available_minor,
            9_999 * 101,
            "ratio {refund_pct} lost money"
        );
    }

    assert_reconciled(&engine, brand).await;
    assert_reconciled(&engine, influencer).await;
}

#[tokio::test]
async fn split_with_full_refund_pays_the_payee_nothing() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 2_000).await;
    let influencer = engine
        .create_account(PartyKind::Influencer)
        .await
        .unwrap()
        .id;

    let hold = engine
        .lock(Uuid::new_v4(), brand, 2_000, None, "lock-full-ref")
        .await
        .unwrap();
    let txs = engine
        .split(hold.id, influencer, 0, 100, "split-full")
        .await
        .unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].kind, TransactionKind::EscrowRefund);

    assert_eq!(engine.account(brand).await.unwrap().available_minor, 2_000);
    assert_eq!(engine.account(influencer).await.unwrap().available_minor, 0);
}

#[tokio::test]
async fn split_percentages_must_sum_to_one_hundred() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 1_000).await;
    let influencer = engine
        .create_account(PartyKind::Influencer)
        .await
        .unwrap()
        .id;

    let hold = engine
        .lock(Uuid::new_v4(), brand, 1_000, None, "lock-badsplit")
        .await
        .unwrap();
    let err = engine
        .split(hold.id, influencer, 60, 50, "split-bad")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(
        engine.hold(hold.id).await.unwrap().status,
        HoldStatus::Active
    );
}

#[tokio::test]
async fn due_holds_are_released_once_the_campaign_is_published() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 10_000).await;
    let influencer = account_with_funds(&engine, PartyKind::Influencer, 0).await;

    let campaign = engine.create_campaign(brand, 10_000, 10).await.unwrap();
    let bid = engine.place_bid(campaign.id, influencer, 6_000).await.unwrap();
    let deadline = Utc::now() - Duration::hours(1);
    engine
        .accept_bid(bid.id, Some(deadline), "accept-auto")
        .await
        .unwrap();

    // Not yet published: the sweep must leave the hold alone.
    let released = engine.release_due_holds(Utc::now()).await.unwrap();
    assert_eq!(released, 0);

    for status in [
        engine::CampaignStatus::InProgress,
        engine::CampaignStatus::DraftSubmitted,
        engine::CampaignStatus::DraftApproved,
        engine::CampaignStatus::Published,
    ] {
        engine.transition_campaign(campaign.id, status).await.unwrap();
    }

    let released = engine.release_due_holds(Utc::now()).await.unwrap();
    assert_eq!(released, 1);

    let campaign = engine.campaign(campaign.id).await.unwrap();
    assert_eq!(campaign.status, engine::CampaignStatus::Completed);
    // 10% platform fee on the 6_000 hold.
    assert_eq!(
        engine.account(influencer).await.unwrap().available_minor,
        5_400
    );
    assert_reconciled(&engine, brand).await;
    assert_reconciled(&engine, influencer).await;
}

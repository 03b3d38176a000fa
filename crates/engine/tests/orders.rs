use engine::{EngineError, FulfillOrderRequest, PartyKind, RateTerms};
use uuid::Uuid;

mod common;
use common::{account_with_funds, assert_reconciled, engine_with_db};

fn order_for(brand: Uuid, affiliate: Uuid, gross: i64) -> FulfillOrderRequest {
    FulfillOrderRequest {
        order_id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        brand_id: brand,
        affiliate_id: affiliate,
        gross_amount_minor: gross,
        commission: RateTerms::percentage(15),
        platform_fee: RateTerms::percentage(10),
    }
}

#[tokio::test]
async fn fulfillment_splits_the_commission_three_ways() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 10_000).await;
    let affiliate = account_with_funds(&engine, PartyKind::Influencer, 0).await;

    // 15% of 5000 is 750 gross; 10% of that is 75 for the platform.
    let order = engine
        .fulfill_order(order_for(brand, affiliate, 5_000))
        .await
        .unwrap();
    assert_eq!(order.breakdown.gross_commission_minor, 750);
    assert_eq!(order.breakdown.platform_fee_minor, 75);
    assert_eq!(order.breakdown.net_commission_minor, 675);

    assert_eq!(engine.account(brand).await.unwrap().available_minor, 9_250);
    assert_eq!(
        engine.account(affiliate).await.unwrap().available_minor,
        675
    );
    assert_eq!(
        engine
            .account(engine.platform_account_id())
            .await
            .unwrap()
            .available_minor,
        75
    );
    assert_reconciled(&engine, brand).await;
    assert_reconciled(&engine, affiliate).await;
    assert_reconciled(&engine, engine.platform_account_id()).await;
}

#[tokio::test]
async fn refulfilling_an_order_replays_without_moving_money() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 10_000).await;
    let affiliate = account_with_funds(&engine, PartyKind::Influencer, 0).await;

    let request = order_for(brand, affiliate, 5_000);
    let first = engine.fulfill_order(request.clone()).await.unwrap();
    let second = engine.fulfill_order(request).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.breakdown, second.breakdown);

    assert_eq!(engine.account(brand).await.unwrap().available_minor, 9_250);
    assert_eq!(
        engine.account(affiliate).await.unwrap().available_minor,
        675
    );
}

#[tokio::test]
async fn fixed_commissions_are_capped_at_the_sale_amount() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 10_000).await;
    let affiliate = account_with_funds(&engine, PartyKind::Influencer, 0).await;

    let mut request = order_for(brand, affiliate, 400);
    request.commission = RateTerms::fixed(1_000);
    request.platform_fee = RateTerms::fixed(50);

    let order = engine.fulfill_order(request).await.unwrap();
    assert_eq!(order.breakdown.gross_commission_minor, 400);
    assert_eq!(order.breakdown.platform_fee_minor, 50);
    assert_eq!(order.breakdown.net_commission_minor, 350);
    assert_eq!(engine.account(brand).await.unwrap().available_minor, 9_600);
}

#[tokio::test]
async fn zero_commission_records_the_order_without_a_posting() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 1_000).await;
    let affiliate = account_with_funds(&engine, PartyKind::Influencer, 0).await;

    let mut request = order_for(brand, affiliate, 5_000);
    request.commission = RateTerms::percentage(0);

    let order = engine.fulfill_order(request).await.unwrap();
    assert_eq!(order.breakdown.gross_commission_minor, 0);
    let stored = engine.affiliate_order(order.id).await.unwrap();
    assert_eq!(stored.id, order.id);
    assert_eq!(stored.breakdown, order.breakdown);
    assert_eq!(engine.account(brand).await.unwrap().available_minor, 1_000);
}

#[tokio::test]
async fn orders_for_unknown_parties_are_rejected() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 1_000).await;

    // Zero commission skips the ledger posting, so the parties have to be
    // checked before the row is stored.
    let mut request = order_for(brand, Uuid::new_v4(), 5_000);
    request.commission = RateTerms::percentage(0);
    let order_id = request.order_id;

    let err = engine.fulfill_order(request).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownAccount(_)));
    assert!(matches!(
        engine.affiliate_order(order_id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
}

#[tokio::test]
async fn underfunded_brands_cannot_settle_an_order() {
    let engine = engine_with_db().await;
    let brand = account_with_funds(&engine, PartyKind::Brand, 100).await;
    let affiliate = account_with_funds(&engine, PartyKind::Influencer, 0).await;

    let request = order_for(brand, affiliate, 5_000);
    let order_id = request.order_id;
    let err = engine.fulfill_order(request).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    // Nothing was recorded or moved.
    assert!(matches!(
        engine.affiliate_order(order_id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
    assert_eq!(engine.account(brand).await.unwrap().available_minor, 100);
    assert_eq!(engine.account(affiliate).await.unwrap().available_minor, 0);
}

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use engine::Engine;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde::de::DeserializeOwned;
use serde_json::json;
use server::types::{
    account::{AccountView, PartyKind},
    bid::BidView,
    campaign::{CampaignStatus, CampaignView},
};
use tower::ServiceExt;
use uuid::Uuid;

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    server::app(engine)
}

async fn send<T: DeserializeOwned>(
    app: &Router,
    method: &str,
    uri: &str,
    caller: Option<Uuid>,
    body: Option<serde_json::Value>,
) -> (StatusCode, Option<T>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder.header("x-account-id", caller.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let parsed = serde_json::from_slice(&bytes).ok();
    (status, parsed)
}

async fn register(app: &Router, party: PartyKind) -> AccountView {
    let (status, view) = send::<AccountView>(
        app,
        "POST",
        "/accounts",
        None,
        Some(json!({ "party": party })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    view.unwrap()
}

async fn deposit(app: &Router, account: Uuid, amount: i64) {
    let (status, _) = send::<AccountView>(
        app,
        "POST",
        "/accounts/deposit",
        Some(account),
        Some(json!({
            "amount_minor": amount,
            "idempotency_key": format!("seed:{account}"),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_callers_are_rejected() {
    let app = app().await;

    let (status, _) = send::<AccountView>(
        &app,
        "GET",
        &format!("/accounts/{}", Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send::<AccountView>(
        &app,
        "GET",
        &format!("/accounts/{}", Uuid::new_v4()),
        Some(Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_needs_no_header() {
    let app = app().await;
    let account = register(&app, PartyKind::Brand).await;

    let (status, fetched) = send::<AccountView>(
        &app,
        "GET",
        &format!("/accounts/{}", account.id),
        Some(account.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched.unwrap().id, account.id);
}

#[tokio::test]
async fn the_platform_party_cannot_be_registered() {
    let app = app().await;
    let (status, _) = send::<AccountView>(
        &app,
        "POST",
        "/accounts",
        None,
        Some(json!({ "party": "platform" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn campaign_flow_over_http() {
    let app = app().await;
    let brand = register(&app, PartyKind::Brand).await;
    let influencer = register(&app, PartyKind::Influencer).await;
    deposit(&app, brand.id, 20_000).await;

    let (status, campaign) = send::<CampaignView>(
        &app,
        "POST",
        "/campaigns",
        Some(brand.id),
        Some(json!({ "budget_minor": 10_000, "platform_fee_pct": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let campaign = campaign.unwrap();
    assert_eq!(campaign.status, CampaignStatus::Open);

    let (status, bid) = send::<BidView>(
        &app,
        "POST",
        &format!("/campaigns/{}/bids", campaign.id),
        Some(influencer.id),
        Some(json!({ "amount_minor": 8_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let bid = bid.unwrap();

    // Only the brand may accept.
    let (status, _) = send::<CampaignView>(
        &app,
        "POST",
        &format!("/bids/{}/accept", bid.id),
        Some(influencer.id),
        Some(json!({ "idempotency_key": "accept-http" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, campaign) = send::<CampaignView>(
        &app,
        "POST",
        &format!("/bids/{}/accept", bid.id),
        Some(brand.id),
        Some(json!({ "idempotency_key": "accept-http" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let campaign = campaign.unwrap();
    assert_eq!(campaign.status, CampaignStatus::Accepted);
    assert_eq!(campaign.influencer_id, Some(influencer.id));

    for to in [
        "in_progress",
        "draft_submitted",
        "draft_approved",
        "published",
    ] {
        let (status, _) = send::<CampaignView>(
            &app,
            "POST",
            &format!("/campaigns/{}/transition", campaign.id),
            Some(influencer.id),
            Some(json!({ "to": to })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, campaign) = send::<CampaignView>(
        &app,
        "POST",
        &format!("/campaigns/{}/complete", campaign.id),
        Some(brand.id),
        Some(json!({ "idempotency_key": "complete-http" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(campaign.unwrap().status, CampaignStatus::Completed);

    let (_, account) = send::<AccountView>(
        &app,
        "GET",
        &format!("/accounts/{}", influencer.id),
        Some(influencer.id),
        None,
    )
    .await;
    assert_eq!(account.unwrap().available_minor, 7_200);
}

#[tokio::test]
async fn engine_failures_map_to_unprocessable_entity() {
    let app = app().await;
    let brand = register(&app, PartyKind::Brand).await;

    // Withdrawing from an empty account is an engine-level refusal.
    let (status, _) = send::<AccountView>(
        &app,
        "POST",
        "/accounts/withdraw",
        Some(brand.id),
        Some(json!({ "amount_minor": 500, "idempotency_key": "w-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn outsiders_cannot_touch_a_campaign() {
    let app = app().await;
    let brand = register(&app, PartyKind::Brand).await;
    let outsider = register(&app, PartyKind::Influencer).await;
    deposit(&app, brand.id, 10_000).await;

    let (_, campaign) = send::<CampaignView>(
        &app,
        "POST",
        "/campaigns",
        Some(brand.id),
        Some(json!({ "budget_minor": 5_000, "platform_fee_pct": 10 })),
    )
    .await;
    let campaign = campaign.unwrap();

    let (status, _) = send::<CampaignView>(
        &app,
        "POST",
        &format!("/campaigns/{}/cancel", campaign.id),
        Some(outsider.id),
        Some(json!({ "idempotency_key": "cancel-http" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

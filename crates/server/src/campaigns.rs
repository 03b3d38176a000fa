//! Campaign and bid endpoints.

use api_types::bid::{BidAccept, BidListResponse, BidNew, BidStatus as ApiBidStatus, BidView};
use api_types::campaign::{
    CampaignNew, CampaignSettle, CampaignStatus as ApiStatus, CampaignTransition, CampaignView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    ServerError, accounts,
    server::{Caller, ServerState},
};

pub(crate) fn map_status(status: engine::CampaignStatus) -> ApiStatus {
    match status {
        engine::CampaignStatus::Open => ApiStatus::Open,
        engine::CampaignStatus::Pending => ApiStatus::Pending,
        engine::CampaignStatus::Accepted => ApiStatus::Accepted,
        engine::CampaignStatus::InProgress => ApiStatus::InProgress,
        engine::CampaignStatus::DraftSubmitted => ApiStatus::DraftSubmitted,
        engine::CampaignStatus::RevisionRequested => ApiStatus::RevisionRequested,
        engine::CampaignStatus::DraftApproved => ApiStatus::DraftApproved,
        engine::CampaignStatus::Published => ApiStatus::Published,
        engine::CampaignStatus::Completed => ApiStatus::Completed,
        engine::CampaignStatus::Cancelled => ApiStatus::Cancelled,
        engine::CampaignStatus::Disputed => ApiStatus::Disputed,
    }
}

fn map_status_request(status: ApiStatus) -> engine::CampaignStatus {
    match status {
        ApiStatus::Open => engine::CampaignStatus::Open,
        ApiStatus::Pending => engine::CampaignStatus::Pending,
        ApiStatus::Accepted => engine::CampaignStatus::Accepted,
        ApiStatus::InProgress => engine::CampaignStatus::InProgress,
        ApiStatus::DraftSubmitted => engine::CampaignStatus::DraftSubmitted,
        ApiStatus::RevisionRequested => engine::CampaignStatus::RevisionRequested,
        ApiStatus::DraftApproved => engine::CampaignStatus::DraftApproved,
        ApiStatus::Published => engine::CampaignStatus::Published,
        ApiStatus::Completed => engine::CampaignStatus::Completed,
        ApiStatus::Cancelled => engine::CampaignStatus::Cancelled,
        ApiStatus::Disputed => engine::CampaignStatus::Disputed,
    }
}

fn map_bid_status(status: engine::BidStatus) -> ApiBidStatus {
    match status {
        engine::BidStatus::Pending => ApiBidStatus::Pending,
        engine::BidStatus::Accepted => ApiBidStatus::Accepted,
        engine::BidStatus::Rejected => ApiBidStatus::Rejected,
        engine::BidStatus::Withdrawn => ApiBidStatus::Withdrawn,
    }
}

fn view(campaign: engine::Campaign) -> CampaignView {
    CampaignView {
        id: campaign.id,
        brand_id: campaign.brand_id,
        influencer_id: campaign.influencer_id,
        budget_minor: campaign.budget_minor,
        platform_fee_pct: campaign.platform_fee_pct,
        currency: accounts::map_currency(campaign.currency),
        status: map_status(campaign.status),
        escrow_hold_id: campaign.escrow_hold_id,
    }
}

fn bid_view(bid: engine::Bid) -> BidView {
    BidView {
        id: bid.id,
        campaign_id: bid.campaign_id,
        influencer_id: bid.influencer_id,
        amount_minor: bid.amount_minor,
        status: map_bid_status(bid.status),
    }
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<CampaignNew>,
) -> Result<Json<CampaignView>, ServerError> {
    let campaign = state
        .engine
        .create_campaign(caller.0, payload.budget_minor, payload.platform_fee_pct)
        .await?;
    Ok(Json(view(campaign)))
}

pub async fn get(
    Extension(_caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CampaignView>, ServerError> {
    let campaign = state.engine.campaign(id).await?;
    Ok(Json(view(campaign)))
}

pub async fn transition(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CampaignTransition>,
) -> Result<Json<CampaignView>, ServerError> {
    ensure_participant(&state, id, caller.0).await?;
    let campaign = state
        .engine
        .transition_campaign(id, map_status_request(payload.to))
        .await?;
    Ok(Json(view(campaign)))
}

pub async fn place_bid(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BidNew>,
) -> Result<Json<BidView>, ServerError> {
    let bid = state
        .engine
        .place_bid(id, caller.0, payload.amount_minor)
        .await?;
    Ok(Json(bid_view(bid)))
}

pub async fn list_bids(
    Extension(_caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BidListResponse>, ServerError> {
    let bids = state.engine.bids_for_campaign(id).await?;
    Ok(Json(BidListResponse {
        bids: bids.into_iter().map(bid_view).collect(),
    }))
}

pub async fn accept_bid(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BidAccept>,
) -> Result<Json<CampaignView>, ServerError> {
    let bid = state.engine.bid(id).await?;
    ensure_brand(&state, bid.campaign_id, caller.0).await?;
    let campaign = state
        .engine
        .accept_bid(id, payload.auto_release_at, &payload.idempotency_key)
        .await?;
    Ok(Json(view(campaign)))
}

pub async fn withdraw_bid(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BidView>, ServerError> {
    let bid = state.engine.bid(id).await?;
    if bid.influencer_id != caller.0 {
        return Err(ServerError::Forbidden(
            "only the bidder may withdraw a bid".to_string(),
        ));
    }
    let bid = state.engine.withdraw_bid(id).await?;
    Ok(Json(bid_view(bid)))
}

pub async fn complete(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CampaignSettle>,
) -> Result<Json<CampaignView>, ServerError> {
    ensure_brand(&state, id, caller.0).await?;
    let campaign = state
        .engine
        .complete_campaign(id, &payload.idempotency_key)
        .await?;
    Ok(Json(view(campaign)))
}

pub async fn cancel(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CampaignSettle>,
) -> Result<Json<CampaignView>, ServerError> {
    ensure_brand(&state, id, caller.0).await?;
    let campaign = state
        .engine
        .cancel_campaign(id, &payload.idempotency_key)
        .await?;
    Ok(Json(view(campaign)))
}

async fn ensure_brand(
    state: &ServerState,
    campaign_id: Uuid,
    caller: Uuid,
) -> Result<(), ServerError> {
    let campaign = state.engine.campaign(campaign_id).await?;
    if campaign.brand_id != caller {
        return Err(ServerError::Forbidden(
            "only the campaign's brand may do this".to_string(),
        ));
    }
    Ok(())
}

pub(crate) async fn ensure_participant(
    state: &ServerState,
    campaign_id: Uuid,
    caller: Uuid,
) -> Result<(), ServerError> {
    let campaign = state.engine.campaign(campaign_id).await?;
    if campaign.brand_id != caller && campaign.influencer_id != Some(caller) {
        return Err(ServerError::Forbidden(
            "only the campaign's parties may do this".to_string(),
        ));
    }
    Ok(())
}

//! Dispute endpoints. Resolution and review act on behalf of the platform's
//! arbitration team; party checks apply only to raising a dispute.

use api_types::dispute::{
    DisputeClose, DisputeNew, DisputeResolve, DisputeStatus as ApiStatus, DisputeView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    ServerError,
    server::{Caller, ServerState},
};

fn map_status(status: engine::DisputeStatus) -> ApiStatus {
    match status {
        engine::DisputeStatus::Open => ApiStatus::Open,
        engine::DisputeStatus::UnderReview => ApiStatus::UnderReview,
        engine::DisputeStatus::Resolved => ApiStatus::Resolved,
        engine::DisputeStatus::Closed => ApiStatus::Closed,
    }
}

fn view(dispute: engine::Dispute) -> DisputeView {
    DisputeView {
        id: dispute.id,
        campaign_id: dispute.campaign_id,
        raised_by: dispute.raised_by,
        reason: dispute.reason,
        status: map_status(dispute.status),
        resolution: dispute.resolution,
        refund_percentage: dispute.refund_percentage,
        resolved_in_favor_of: dispute.resolved_in_favor_of,
        created_at: dispute.created_at,
    }
}

pub async fn raise(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(campaign_id): Path<Uuid>,
    Json(payload): Json<DisputeNew>,
) -> Result<Json<DisputeView>, ServerError> {
    let dispute = state
        .engine
        .raise_dispute(campaign_id, caller.0, &payload.reason)
        .await?;
    Ok(Json(view(dispute)))
}

pub async fn get(
    Extension(_caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DisputeView>, ServerError> {
    let dispute = state.engine.dispute(id).await?;
    Ok(Json(view(dispute)))
}

pub async fn review(
    Extension(_caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DisputeView>, ServerError> {
    let dispute = state.engine.begin_review(id).await?;
    Ok(Json(view(dispute)))
}

pub async fn resolve(
    Extension(_caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DisputeResolve>,
) -> Result<Json<DisputeView>, ServerError> {
    let dispute = state
        .engine
        .resolve_dispute(
            id,
            &payload.resolution,
            payload.refund_percentage,
            payload.resolved_in_favor_of,
            &payload.resolved_by,
            &payload.idempotency_key,
        )
        .await?;
    Ok(Json(view(dispute)))
}

pub async fn close(
    Extension(_caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DisputeClose>,
) -> Result<Json<DisputeView>, ServerError> {
    let dispute = state.engine.close_dispute(id, &payload.reason).await?;
    Ok(Json(view(dispute)))
}

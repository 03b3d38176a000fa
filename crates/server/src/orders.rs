//! Affiliate order endpoints.

use api_types::order::{OrderFulfill, OrderView, Rate, RateKind as ApiRateKind};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    ServerError, accounts,
    server::{Caller, ServerState},
};

fn map_rate(rate: Rate) -> engine::commission::RateTerms {
    let kind = match rate.kind {
        ApiRateKind::Percentage => engine::commission::RateKind::Percentage,
        ApiRateKind::Fixed => engine::commission::RateKind::Fixed,
    };
    engine::commission::RateTerms {
        kind,
        value: rate.value,
    }
}

fn view(order: engine::AffiliateOrder) -> OrderView {
    OrderView {
        id: order.id,
        product_id: order.product_id,
        brand_id: order.brand_id,
        affiliate_id: order.affiliate_id,
        gross_amount_minor: order.gross_amount_minor,
        gross_commission_minor: order.breakdown.gross_commission_minor,
        platform_fee_minor: order.breakdown.platform_fee_minor,
        net_commission_minor: order.breakdown.net_commission_minor,
        currency: accounts::map_currency(order.currency),
    }
}

pub async fn fulfill(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<OrderFulfill>,
) -> Result<Json<OrderView>, ServerError> {
    if payload.brand_id != caller.0 {
        return Err(ServerError::Forbidden(
            "orders settle against the caller's own account".to_string(),
        ));
    }
    let order = state
        .engine
        .fulfill_order(engine::FulfillOrderRequest {
            order_id: payload.order_id,
            product_id: payload.product_id,
            brand_id: payload.brand_id,
            affiliate_id: payload.affiliate_id,
            gross_amount_minor: payload.gross_amount_minor,
            commission: map_rate(payload.commission),
            platform_fee: map_rate(payload.platform_fee),
        })
        .await?;
    Ok(Json(view(order)))
}

pub async fn get(
    Extension(_caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, ServerError> {
    let order = state.engine.affiliate_order(id).await?;
    Ok(Json(view(order)))
}

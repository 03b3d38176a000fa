//! Fulfilled affiliate orders.
//!
//! One row per fulfilled order, written exactly once at fulfillment time
//! with the commission breakdown frozen in. The row is never updated; a
//! replayed fulfillment returns the stored record unchanged.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CommissionBreakdown, Currency, EngineError, RateKind, RateTerms,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliateOrder {
    pub id: Uuid,
    pub product_id: Uuid,
    pub affiliate_id: Uuid,
    /// The seller account that funds the commission payout.
    pub brand_id: Uuid,
    pub gross_amount_minor: i64,
    pub commission: RateTerms,
    pub platform_fee: RateTerms,
    pub breakdown: CommissionBreakdown,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "affiliate_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub product_id: String,
    pub affiliate_id: String,
    pub brand_id: String,
    pub gross_amount_minor: i64,
    pub commission_kind: String,
    pub commission_value: i64,
    pub platform_fee_kind: String,
    pub platform_fee_value: i64,
    pub gross_commission_minor: i64,
    pub platform_fee_minor: i64,
    pub net_commission_minor: i64,
    pub currency: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&AffiliateOrder> for ActiveModel {
    fn from(order: &AffiliateOrder) -> Self {
        Self {
            id: ActiveValue::Set(order.id.to_string()),
            product_id: ActiveValue::Set(order.product_id.to_string()),
            affiliate_id: ActiveValue::Set(order.affiliate_id.to_string()),
            brand_id: ActiveValue::Set(order.brand_id.to_string()),
            gross_amount_minor: ActiveValue::Set(order.gross_amount_minor),
            commission_kind: ActiveValue::Set(order.commission.kind.as_str().to_string()),
            commission_value: ActiveValue::Set(order.commission.value),
            platform_fee_kind: ActiveValue::Set(order.platform_fee.kind.as_str().to_string()),
            platform_fee_value: ActiveValue::Set(order.platform_fee.value),
            gross_commission_minor: ActiveValue::Set(order.breakdown.gross_commission_minor),
            platform_fee_minor: ActiveValue::Set(order.breakdown.platform_fee_minor),
            net_commission_minor: ActiveValue::Set(order.breakdown.net_commission_minor),
            currency: ActiveValue::Set(order.currency.code().to_string()),
            created_at: ActiveValue::Set(order.created_at),
        }
    }
}

impl TryFrom<Model> for AffiliateOrder {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("order not exists".to_string()))?,
            product_id: Uuid::parse_str(&model.product_id)
                .map_err(|_| EngineError::KeyNotFound("product not exists".to_string()))?,
            affiliate_id: Uuid::parse_str(&model.affiliate_id)
                .map_err(|_| EngineError::UnknownAccount(model.affiliate_id.clone()))?,
            brand_id: Uuid::parse_str(&model.brand_id)
                .map_err(|_| EngineError::UnknownAccount(model.brand_id.clone()))?,
            gross_amount_minor: model.gross_amount_minor,
            commission: RateTerms {
                kind: RateKind::try_from(model.commission_kind.as_str())?,
                value: model.commission_value,
            },
            platform_fee: RateTerms {
                kind: RateKind::try_from(model.platform_fee_kind.as_str())?,
                value: model.platform_fee_value,
            },
            breakdown: CommissionBreakdown {
                gross_commission_minor: model.gross_commission_minor,
                platform_fee_minor: model.platform_fee_minor,
                net_commission_minor: model.net_commission_minor,
            },
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            created_at: model.created_at,
        })
    }
}

//! Bids placed by influencers against an open campaign.
//!
//! At most one bid per campaign ever reaches `accepted`; acceptance rejects
//! every sibling pending bid in the same database transaction (see
//! `Engine::accept_bid`).

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl BidStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }
}

impl TryFrom<&str> for BidStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "withdrawn" => Ok(Self::Withdrawn),
            other => Err(EngineError::Validation(format!(
                "invalid bid status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub influencer_id: Uuid,
    pub amount_minor: i64,
    pub currency: Currency,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

impl Bid {
    pub fn new(
        campaign_id: Uuid,
        influencer_id: Uuid,
        amount_minor: i64,
        currency: Currency,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            campaign_id,
            influencer_id,
            amount_minor,
            currency,
            status: BidStatus::Pending,
            created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bids")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub campaign_id: String,
    pub influencer_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::campaigns::Entity",
        from = "Column::CampaignId",
        to = "super::campaigns::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Campaigns,
}

impl Related<super::campaigns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaigns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Bid> for ActiveModel {
    fn from(bid: &Bid) -> Self {
        Self {
            id: ActiveValue::Set(bid.id.to_string()),
            campaign_id: ActiveValue::Set(bid.campaign_id.to_string()),
            influencer_id: ActiveValue::Set(bid.influencer_id.to_string()),
            amount_minor: ActiveValue::Set(bid.amount_minor),
            currency: ActiveValue::Set(bid.currency.code().to_string()),
            status: ActiveValue::Set(bid.status.as_str().to_string()),
            created_at: ActiveValue::Set(bid.created_at),
        }
    }
}

impl TryFrom<Model> for Bid {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("bid not exists".to_string()))?,
            campaign_id: Uuid::parse_str(&model.campaign_id)
                .map_err(|_| EngineError::KeyNotFound("campaign not exists".to_string()))?,
            influencer_id: Uuid::parse_str(&model.influencer_id)
                .map_err(|_| EngineError::UnknownAccount(model.influencer_id.clone()))?,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            status: BidStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
        })
    }
}

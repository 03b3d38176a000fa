//! Disputes over funded campaigns.
//!
//! A dispute freezes the normal campaign flow (`campaign -> disputed`) and
//! hands control of the escrow hold to an admin decision. Resolution splits
//! the hold by percentage; closing restores the campaign to the status it
//! had when the dispute was raised (kept on the dispute row for exactly that
//! purpose).

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CampaignStatus, EngineError};

/// Minimum length of a resolution text, in characters.
pub const MIN_RESOLUTION_LEN: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
    Closed,
}

impl DisputeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::UnderReview => "under_review",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// `true` while an admin can still act on the dispute.
    pub fn is_actionable(self) -> bool {
        matches!(self, Self::Open | Self::UnderReview)
    }
}

impl TryFrom<&str> for DisputeStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "open" => Ok(Self::Open),
            "under_review" => Ok(Self::UnderReview),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            other => Err(EngineError::Validation(format!(
                "invalid dispute status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub raised_by: Uuid,
    pub reason: String,
    pub status: DisputeStatus,
    /// Campaign status at the moment the dispute was raised; `close` puts
    /// the campaign back there.
    pub campaign_prior_status: CampaignStatus,
    pub resolution: Option<String>,
    pub refund_percentage: Option<u8>,
    pub resolved_in_favor_of: Option<Uuid>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Dispute {
    pub fn new(
        campaign_id: Uuid,
        raised_by: Uuid,
        reason: String,
        campaign_prior_status: CampaignStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            raised_by,
            reason,
            status: DisputeStatus::Open,
            campaign_prior_status,
            resolution: None,
            refund_percentage: None,
            resolved_in_favor_of: None,
            resolved_by: None,
            resolved_at: None,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "disputes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub campaign_id: String,
    pub raised_by: String,
    pub reason: String,
    pub status: String,
    pub campaign_prior_status: String,
    pub resolution: Option<String>,
    pub refund_percentage: Option<i32>,
    pub resolved_in_favor_of: Option<String>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Dispute> for ActiveModel {
    fn from(dispute: &Dispute) -> Self {
        Self {
            id: ActiveValue::Set(dispute.id.to_string()),
            campaign_id: ActiveValue::Set(dispute.campaign_id.to_string()),
            raised_by: ActiveValue::Set(dispute.raised_by.to_string()),
            reason: ActiveValue::Set(dispute.reason.clone()),
            status: ActiveValue::Set(dispute.status.as_str().to_string()),
            campaign_prior_status: ActiveValue::Set(
                dispute.campaign_prior_status.as_str().to_string(),
            ),
            resolution: ActiveValue::Set(dispute.resolution.clone()),
            refund_percentage: ActiveValue::Set(dispute.refund_percentage.map(i32::from)),
            resolved_in_favor_of: ActiveValue::Set(
                dispute.resolved_in_favor_of.map(|id| id.to_string()),
            ),
            resolved_by: ActiveValue::Set(dispute.resolved_by.clone()),
            resolved_at: ActiveValue::Set(dispute.resolved_at),
            created_at: ActiveValue::Set(dispute.created_at),
        }
    }
}

impl TryFrom<Model> for Dispute {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let refund_percentage = match model.refund_percentage {
            None => None,
            Some(pct) => Some(u8::try_from(pct).ok().filter(|p| *p <= 100).ok_or_else(
                || EngineError::Validation("refund_percentage must be within 0..=100".to_string()),
            )?),
        };
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("dispute not exists".to_string()))?,
            campaign_id: Uuid::parse_str(&model.campaign_id)
                .map_err(|_| EngineError::KeyNotFound("campaign not exists".to_string()))?,
            raised_by: Uuid::parse_str(&model.raised_by)
                .map_err(|_| EngineError::UnknownAccount(model.raised_by.clone()))?,
            reason: model.reason,
            status: DisputeStatus::try_from(model.status.as_str())?,
            campaign_prior_status: CampaignStatus::try_from(model.campaign_prior_status.as_str())?,
            resolution: model.resolution,
            refund_percentage,
            resolved_in_favor_of: model
                .resolved_in_favor_of
                .and_then(|s| Uuid::parse_str(&s).ok()),
            resolved_by: model.resolved_by,
            resolved_at: model.resolved_at,
            created_at: model.created_at,
        })
    }
}

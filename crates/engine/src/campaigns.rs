//! Campaigns and their lifecycle.
//!
//! The whole legal state space lives in one place: [`CampaignStatus`] plus
//! the [`CampaignStatus::can_transition`] table. Nothing else in the engine
//! (or in any caller) compares status strings; an illegal move is rejected
//! here with `InvalidTransition` before any money is touched.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Open,
    Pending,
    Accepted,
    InProgress,
    DraftSubmitted,
    RevisionRequested,
    DraftApproved,
    Published,
    Completed,
    Cancelled,
    Disputed,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::DraftSubmitted => "draft_submitted",
            Self::RevisionRequested => "revision_requested",
            Self::DraftApproved => "draft_approved",
            Self::Published => "published",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Disputed => "disputed",
        }
    }

    /// The single transition table for campaigns.
    ///
    /// - entering `accepted` allocates the escrow hold
    /// - entering `completed` releases it, entering `cancelled` refunds it
    /// - `disputed` is reachable from every funded working state
    pub fn can_transition(self, to: CampaignStatus) -> bool {
        use CampaignStatus::*;
        match (self, to) {
            (Open, Pending) => true,
            (Pending, Accepted) => true,
            (Accepted, InProgress) => true,
            (InProgress, DraftSubmitted) => true,
            (DraftSubmitted, RevisionRequested) => true,
            (DraftSubmitted, DraftApproved) => true,
            (RevisionRequested, DraftSubmitted) => true,
            (DraftApproved, Published) => true,
            (Published, Completed) => true,
            // Dispute resolution settles a disputed campaign into a terminal
            // state; no other operation may leave `disputed`.
            (Disputed, Completed) => true,
            (Disputed, Cancelled) => true,
            (from, Disputed) => from.is_disputable(),
            (from, Cancelled) => from.is_cancellable(),
            _ => false,
        }
    }

    /// States from which either party may raise a dispute.
    pub fn is_disputable(self) -> bool {
        matches!(
            self,
            Self::Accepted
                | Self::InProgress
                | Self::DraftSubmitted
                | Self::RevisionRequested
                | Self::DraftApproved
                | Self::Published
        )
    }

    /// States from which the campaign may still be cancelled.
    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Open | Self::Pending | Self::Accepted)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// States in which the campaign must reference an active escrow hold.
    pub fn is_funded(self) -> bool {
        matches!(
            self,
            Self::Accepted
                | Self::InProgress
                | Self::DraftSubmitted
                | Self::RevisionRequested
                | Self::DraftApproved
                | Self::Published
                | Self::Disputed
        )
    }
}

impl TryFrom<&str> for CampaignStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "open" => Ok(Self::Open),
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "in_progress" => Ok(Self::InProgress),
            "draft_submitted" => Ok(Self::DraftSubmitted),
            "revision_requested" => Ok(Self::RevisionRequested),
            "draft_approved" => Ok(Self::DraftApproved),
            "published" => Ok(Self::Published),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "disputed" => Ok(Self::Disputed),
            other => Err(EngineError::Validation(format!(
                "invalid campaign status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub brand_id: Uuid,
    /// Assigned when a bid is accepted.
    pub influencer_id: Option<Uuid>,
    pub budget_minor: i64,
    /// Platform cut applied when the campaign completes, 0..=100.
    pub platform_fee_pct: u8,
    pub currency: Currency,
    pub status: CampaignStatus,
    pub escrow_hold_id: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(
        brand_id: Uuid,
        budget_minor: i64,
        platform_fee_pct: u8,
        currency: Currency,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if budget_minor <= 0 {
            return Err(EngineError::Validation(
                "budget_minor must be > 0".to_string(),
            ));
        }
        if platform_fee_pct > 100 {
            return Err(EngineError::Validation(
                "platform_fee_pct must be within 0..=100".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            brand_id,
            influencer_id: None,
            budget_minor,
            platform_fee_pct,
            currency,
            status: CampaignStatus::Open,
            escrow_hold_id: None,
            version: 0,
            created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub brand_id: String,
    pub influencer_id: Option<String>,
    pub budget_minor: i64,
    pub platform_fee_pct: i32,
    pub currency: String,
    pub status: String,
    pub escrow_hold_id: Option<String>,
    pub version: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bids::Entity")]
    Bids,
}

impl Related<super::bids::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bids.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Campaign> for ActiveModel {
    fn from(campaign: &Campaign) -> Self {
        Self {
            id: ActiveValue::Set(campaign.id.to_string()),
            brand_id: ActiveValue::Set(campaign.brand_id.to_string()),
            influencer_id: ActiveValue::Set(campaign.influencer_id.map(|id| id.to_string())),
            budget_minor: ActiveValue::Set(campaign.budget_minor),
            platform_fee_pct: ActiveValue::Set(i32::from(campaign.platform_fee_pct)),
            currency: ActiveValue::Set(campaign.currency.code().to_string()),
            status: ActiveValue::Set(campaign.status.as_str().to_string()),
            escrow_hold_id: ActiveValue::Set(campaign.escrow_hold_id.map(|id| id.to_string())),
            version: ActiveValue::Set(campaign.version),
            created_at: ActiveValue::Set(campaign.created_at),
        }
    }
}

impl TryFrom<Model> for Campaign {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let platform_fee_pct = u8::try_from(model.platform_fee_pct)
            .ok()
            .filter(|pct| *pct <= 100)
            .ok_or_else(|| {
                EngineError::Validation("platform_fee_pct must be within 0..=100".to_string())
            })?;
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("campaign not exists".to_string()))?,
            brand_id: Uuid::parse_str(&model.brand_id)
                .map_err(|_| EngineError::UnknownAccount(model.brand_id.clone()))?,
            influencer_id: model.influencer_id.and_then(|s| Uuid::parse_str(&s).ok()),
            budget_minor: model.budget_minor,
            platform_fee_pct,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            status: CampaignStatus::try_from(model.status.as_str())?,
            escrow_hold_id: model.escrow_hold_id.and_then(|s| Uuid::parse_str(&s).ok()),
            version: model.version,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::CampaignStatus::*;

    #[test]
    fn happy_path_is_legal() {
        let path = [
            Open,
            Pending,
            Accepted,
            InProgress,
            DraftSubmitted,
            DraftApproved,
            Published,
            Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn revision_loop_is_legal() {
        assert!(DraftSubmitted.can_transition(RevisionRequested));
        assert!(RevisionRequested.can_transition(DraftSubmitted));
    }

    #[test]
    fn terminal_states_go_nowhere() {
        for from in [Completed, Cancelled] {
            for to in [
                Open, Pending, Accepted, InProgress, DraftSubmitted, RevisionRequested,
                DraftApproved, Published, Completed, Cancelled, Disputed,
            ] {
                assert!(!from.can_transition(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn disputes_only_from_funded_working_states() {
        assert!(Accepted.can_transition(Disputed));
        assert!(Published.can_transition(Disputed));
        assert!(!Open.can_transition(Disputed));
        assert!(!Pending.can_transition(Disputed));
        assert!(!Disputed.can_transition(Disputed));
    }

    #[test]
    fn dispute_resolution_settles_to_terminal() {
        assert!(Disputed.can_transition(Completed));
        assert!(Disputed.can_transition(Cancelled));
        assert!(!Disputed.can_transition(Published));
        assert!(!Disputed.can_transition(InProgress));
    }

    #[test]
    fn cancellation_window_closes_after_acceptance() {
        assert!(Open.can_transition(Cancelled));
        assert!(Pending.can_transition(Cancelled));
        assert!(Accepted.can_transition(Cancelled));
        assert!(!InProgress.can_transition(Cancelled));
        assert!(!Published.can_transition(Cancelled));
    }

    #[test]
    fn skipping_states_is_illegal() {
        assert!(!Open.can_transition(Accepted));
        assert!(!Pending.can_transition(InProgress));
        assert!(!Accepted.can_transition(Completed));
        assert!(!DraftApproved.can_transition(Completed));
    }

    #[test]
    fn funded_states_match_hold_invariant() {
        assert!(Accepted.is_funded());
        assert!(Disputed.is_funded());
        assert!(!Open.is_funded());
        assert!(!Pending.is_funded());
        assert!(!Completed.is_funded());
        assert!(!Cancelled.is_funded());
    }
}

use chrono::Utc;
use sea_orm::{QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    CampaignStatus, Dispute, DisputeStatus, EngineError, EngineEvent, HoldStatus, ResultEngine,
    disputes,
    disputes::MIN_RESOLUTION_LEN,
};

use super::{Engine, MAX_CONFLICT_RETRIES, with_tx};

impl Engine {
    pub async fn dispute(&self, dispute_id: Uuid) -> ResultEngine<Dispute> {
        self.dispute_on(&self.database, dispute_id).await
    }

    pub(crate) async fn dispute_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        dispute_id: Uuid,
    ) -> ResultEngine<Dispute> {
        let model = disputes::Entity::find_by_id(dispute_id.to_string())
            .one(conn)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("dispute {dispute_id}")))?;
        Dispute::try_from(model)
    }

    /// Freeze a funded campaign pending arbitration. Only the brand or the
    /// assigned influencer may raise a dispute, and a campaign carries at
    /// most one open dispute at a time.
    pub async fn raise_dispute(
        &self,
        campaign_id: Uuid,
        raised_by: Uuid,
        reason: &str,
    ) -> ResultEngine<Dispute> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::Validation(
                "dispute reason must not be empty".to_string(),
            ));
        }

        let mut attempt = 0;
        loop {
            match self.try_raise_dispute(campaign_id, raised_by, reason).await {
                Err(EngineError::ConcurrentModification(msg))
                    if attempt + 1 < MAX_CONFLICT_RETRIES =>
                {
                    attempt += 1;
                    tracing::debug!(%campaign_id, attempt, "retrying dispute: {msg}");
                }
                other => return other,
            }
        }
    }

    async fn try_raise_dispute(
        &self,
        campaign_id: Uuid,
        raised_by: Uuid,
        reason: &str,
    ) -> ResultEngine<Dispute> {
        let (dispute, prior) = with_tx!(self, |db_tx| {
            let campaign = self.campaign_on(&db_tx, campaign_id).await?;
            if !campaign.status.is_disputable() {
                return Err(EngineError::InvalidTransition(format!(
                    "{} campaigns cannot be disputed",
                    campaign.status.as_str()
                )));
            }
            let is_party =
                raised_by == campaign.brand_id || campaign.influencer_id == Some(raised_by);
            if !is_party {
                return Err(EngineError::Validation(
                    "only the brand or the assigned influencer may raise a dispute".to_string(),
                ));
            }
            let open = disputes::Entity::find()
                .filter(disputes::Column::CampaignId.eq(campaign_id.to_string()))
                .filter(disputes::Column::Status.is_in([
                    DisputeStatus::Open.as_str(),
                    DisputeStatus::UnderReview.as_str(),
                ]))
                .one(&db_tx)
                .await?;
            if open.is_some() {
                return Err(EngineError::Validation(format!(
                    "campaign {campaign_id} already has an open dispute"
                )));
            }

            let dispute = Dispute::new(
                campaign_id,
                raised_by,
                reason.to_string(),
                campaign.status,
                Utc::now(),
            );
            disputes::ActiveModel::from(&dispute).insert(&db_tx).await?;
            self.persist_campaign_transition(
                &db_tx,
                &campaign,
                CampaignStatus::Disputed,
                None,
                None,
            )
            .await?;
            Ok((dispute, campaign.status))
        })?;

        self.emit(EngineEvent::DisputeRaised {
            dispute_id: dispute.id,
            campaign_id,
        });
        self.emit(EngineEvent::CampaignStatusChanged {
            campaign_id,
            from: prior,
            to: CampaignStatus::Disputed,
        });
        Ok(dispute)
    }

    /// Mark an open dispute as being examined by an arbiter.
    pub async fn begin_review(&self, dispute_id: Uuid) -> ResultEngine<Dispute> {
        let updated = disputes::Entity::update_many()
            .col_expr(
                disputes::Column::Status,
                Expr::value(DisputeStatus::UnderReview.as_str()),
            )
            .filter(disputes::Column::Id.eq(dispute_id.to_string()))
            .filter(disputes::Column::Status.eq(DisputeStatus::Open.as_str()))
            .exec(&self.database)
            .await?;
        if updated.rows_affected != 1 {
            return Err(EngineError::InvalidTransition(format!(
                "dispute {dispute_id} is not open"
            )));
        }
        self.dispute(dispute_id).await
    }

    /// Settle a dispute: split the escrowed funds between the influencer
    /// and the brand per the arbiter's refund percentage, then move the
    /// campaign to the terminal state matching the winner.
    #[allow(clippy::too_many_arguments)]
    pub async fn resolve_dispute(
        &self,
        dispute_id: Uuid,
        resolution: &str,
        refund_percentage: u8,
        resolved_in_favor_of: Uuid,
        resolved_by: &str,
        idempotency_key: &str,
    ) -> ResultEngine<Dispute> {
        let resolution = resolution.trim();
        if resolution.chars().count() < MIN_RESOLUTION_LEN {
            return Err(EngineError::Validation(format!(
                "resolution text must be at least {MIN_RESOLUTION_LEN} characters"
            )));
        }
        if refund_percentage > 100 {
            return Err(EngineError::Validation(format!(
                "refund percentage must be <= 100, got {refund_percentage}"
            )));
        }

        let mut attempt = 0;
        loop {
            match self
                .try_resolve_dispute(
                    dispute_id,
                    resolution,
                    refund_percentage,
                    resolved_in_favor_of,
                    resolved_by,
                    idempotency_key,
                )
                .await
            {
                Err(EngineError::ConcurrentModification(msg))
                    if attempt + 1 < MAX_CONFLICT_RETRIES =>
                {
                    attempt += 1;
                    tracing::debug!(%dispute_id, attempt, "retrying resolution: {msg}");
                }
                other => return other,
            }
        }
    }

    async fn try_resolve_dispute(
        &self,
        dispute_id: Uuid,
        resolution: &str,
        refund_percentage: u8,
        resolved_in_favor_of: Uuid,
        resolved_by: &str,
        idempotency_key: &str,
    ) -> ResultEngine<Dispute> {
        let (campaign_id, outcome) = with_tx!(self, |db_tx| {
            let dispute = self.dispute_on(&db_tx, dispute_id).await?;
            if !dispute.status.is_actionable() {
                return Err(EngineError::InvalidTransition(format!(
                    "dispute {} is {}",
                    dispute.id,
                    dispute.status.as_str()
                )));
            }
            let campaign = self.campaign_on(&db_tx, dispute.campaign_id).await?;
            let (hold, influencer) = self.funded_parties(&db_tx, &campaign).await?;
            if hold.status != HoldStatus::Active {
                return Err(EngineError::InvalidHoldState(format!(
                    "hold {} is {}, funds already settled",
                    hold.id,
                    hold.status.as_str()
                )));
            }

            self.split_in(
                &db_tx,
                &hold,
                influencer,
                100 - refund_percentage,
                refund_percentage,
                idempotency_key,
            )
            .await?;

            let updated = disputes::Entity::update_many()
                .col_expr(
                    disputes::Column::Status,
                    Expr::value(DisputeStatus::Resolved.as_str()),
                )
                .col_expr(
                    disputes::Column::Resolution,
                    Expr::value(Some(resolution.to_string())),
                )
                .col_expr(
                    disputes::Column::RefundPercentage,
                    Expr::value(Some(i32::from(refund_percentage))),
                )
                .col_expr(
                    disputes::Column::ResolvedInFavorOf,
                    Expr::value(Some(resolved_in_favor_of.to_string())),
                )
                .col_expr(
                    disputes::Column::ResolvedBy,
                    Expr::value(Some(resolved_by.to_string())),
                )
                .col_expr(disputes::Column::ResolvedAt, Expr::value(Some(Utc::now())))
                .filter(disputes::Column::Id.eq(dispute_id.to_string()))
                .filter(disputes::Column::Status.is_in([
                    DisputeStatus::Open.as_str(),
                    DisputeStatus::UnderReview.as_str(),
                ]))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected != 1 {
                return Err(EngineError::ConcurrentModification(format!(
                    "dispute {dispute_id} changed underneath the resolution"
                )));
            }

            // The influencer winning completes the campaign; anything else
            // cancels it.
            let outcome = if resolved_in_favor_of == influencer {
                CampaignStatus::Completed
            } else {
                CampaignStatus::Cancelled
            };
            self.persist_campaign_transition(&db_tx, &campaign, outcome, None, Some(None))
                .await?;
            Ok((campaign.id, outcome))
        })?;

        self.emit(EngineEvent::DisputeResolved {
            dispute_id,
            campaign_id,
            refund_percentage,
        });
        self.emit(EngineEvent::CampaignStatusChanged {
            campaign_id,
            from: CampaignStatus::Disputed,
            to: outcome,
        });
        self.dispute(dispute_id).await
    }

    /// Withdraw a dispute without settling funds. The campaign returns to
    /// the status it held when the dispute was raised.
    pub async fn close_dispute(&self, dispute_id: Uuid, reason: &str) -> ResultEngine<Dispute> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::Validation(
                "closing reason must not be empty".to_string(),
            ));
        }

        let mut attempt = 0;
        loop {
            match self.try_close_dispute(dispute_id, reason).await {
                Err(EngineError::ConcurrentModification(msg))
                    if attempt + 1 < MAX_CONFLICT_RETRIES =>
                {
                    attempt += 1;
                    tracing::debug!(%dispute_id, attempt, "retrying close: {msg}");
                }
                other => return other,
            }
        }
    }

    async fn try_close_dispute(&self, dispute_id: Uuid, reason: &str) -> ResultEngine<Dispute> {
        let (campaign_id, restored) = with_tx!(self, |db_tx| {
            let dispute = self.dispute_on(&db_tx, dispute_id).await?;
            if !dispute.status.is_actionable() {
                return Err(EngineError::InvalidTransition(format!(
                    "dispute {} is {}",
                    dispute.id,
                    dispute.status.as_str()
                )));
            }
            let campaign = self.campaign_on(&db_tx, dispute.campaign_id).await?;
            let restored = if campaign.status == CampaignStatus::Disputed {
                self.persist_campaign_status(
                    &db_tx,
                    &campaign,
                    dispute.campaign_prior_status,
                    None,
                    None,
                )
                .await?;
                Some(dispute.campaign_prior_status)
            } else {
                None
            };

            let updated = disputes::Entity::update_many()
                .col_expr(
                    disputes::Column::Status,
                    Expr::value(DisputeStatus::Closed.as_str()),
                )
                .col_expr(
                    disputes::Column::Resolution,
                    Expr::value(Some(reason.to_string())),
                )
                .col_expr(disputes::Column::ResolvedAt, Expr::value(Some(Utc::now())))
                .filter(disputes::Column::Id.eq(dispute_id.to_string()))
                .filter(disputes::Column::Status.is_in([
                    DisputeStatus::Open.as_str(),
                    DisputeStatus::UnderReview.as_str(),
                ]))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected != 1 {
                return Err(EngineError::ConcurrentModification(format!(
                    "dispute {dispute_id} changed underneath the close"
                )));
            }
            Ok((campaign.id, restored))
        })?;

        self.emit(EngineEvent::DisputeClosed {
            dispute_id,
            campaign_id,
        });
        if let Some(to) = restored {
            self.emit(EngineEvent::CampaignStatusChanged {
                campaign_id,
                from: CampaignStatus::Disputed,
                to,
            });
        }
        self.dispute(dispute_id).await
    }
}

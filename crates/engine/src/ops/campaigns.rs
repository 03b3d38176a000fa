use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Bid, BidStatus, Campaign, CampaignStatus, EngineError, EngineEvent, EscrowHold, MoneyCents,
    ResultEngine, bids, campaigns,
};

use super::{Engine, MAX_CONFLICT_RETRIES, with_tx};

impl Engine {
    /// Open a campaign for bidding. The budget is an upper bound for offers;
    /// funds are only locked when a bid is accepted.
    pub async fn create_campaign(
        &self,
        brand_id: Uuid,
        budget_minor: i64,
        platform_fee_pct: u8,
    ) -> ResultEngine<Campaign> {
        let brand = self.account(brand_id).await?;
        let campaign = Campaign::new(
            brand_id,
            budget_minor,
            platform_fee_pct,
            brand.currency,
            Utc::now(),
        )?;
        campaigns::ActiveModel::from(&campaign)
            .insert(&self.database)
            .await?;
        Ok(campaign)
    }

    pub async fn campaign(&self, campaign_id: Uuid) -> ResultEngine<Campaign> {
        self.campaign_on(&self.database, campaign_id).await
    }

    pub(crate) async fn campaign_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        campaign_id: Uuid,
    ) -> ResultEngine<Campaign> {
        let model = campaigns::Entity::find_by_id(campaign_id.to_string())
            .one(conn)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("campaign {campaign_id}")))?;
        Campaign::try_from(model)
    }

    pub async fn bid(&self, bid_id: Uuid) -> ResultEngine<Bid> {
        self.bid_on(&self.database, bid_id).await
    }

    pub(crate) async fn bid_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        bid_id: Uuid,
    ) -> ResultEngine<Bid> {
        let model = bids::Entity::find_by_id(bid_id.to_string())
            .one(conn)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("bid {bid_id}")))?;
        Bid::try_from(model)
    }

    pub async fn bids_for_campaign(&self, campaign_id: Uuid) -> ResultEngine<Vec<Bid>> {
        let models = bids::Entity::find()
            .filter(bids::Column::CampaignId.eq(campaign_id.to_string()))
            .order_by_asc(bids::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Bid::try_from).collect()
    }

    /// Offer to run a campaign. The first bid moves an open campaign to
    /// `pending`.
    pub async fn place_bid(
        &self,
        campaign_id: Uuid,
        influencer_id: Uuid,
        amount_minor: i64,
    ) -> ResultEngine<Bid> {
        self.account(influencer_id).await?;
        let mut attempt = 0;
        loop {
            match self
                .try_place_bid(campaign_id, influencer_id, amount_minor)
                .await
            {
                Err(EngineError::ConcurrentModification(msg))
                    if attempt + 1 < MAX_CONFLICT_RETRIES =>
                {
                    attempt += 1;
                    tracing::debug!(%campaign_id, attempt, "retrying bid: {msg}");
                }
                other => return other,
            }
        }
    }

    async fn try_place_bid(
        &self,
        campaign_id: Uuid,
        influencer_id: Uuid,
        amount_minor: i64,
    ) -> ResultEngine<Bid> {
        let (bid, moved_from) = with_tx!(self, |db_tx| {
            let campaign = self.campaign_on(&db_tx, campaign_id).await?;
            if amount_minor > campaign.budget_minor {
                return Err(EngineError::Validation(format!(
                    "bid {amount_minor} exceeds the campaign budget {}",
                    campaign.budget_minor
                )));
            }
            let moved_from = match campaign.status {
                CampaignStatus::Pending => None,
                CampaignStatus::Open => {
                    self.persist_campaign_transition(
                        &db_tx,
                        &campaign,
                        CampaignStatus::Pending,
                        None,
                        None,
                    )
                    .await?;
                    Some(campaign.status)
                }
                other => {
                    return Err(EngineError::InvalidTransition(format!(
                        "cannot bid on a {} campaign",
                        other.as_str()
                    )));
                }
            };
            let bid = Bid::new(
                campaign_id,
                influencer_id,
                amount_minor,
                campaign.currency,
                Utc::now(),
            )?;
            bids::ActiveModel::from(&bid).insert(&db_tx).await?;
            Ok((bid, moved_from))
        })?;
        if let Some(from) = moved_from {
            self.emit(EngineEvent::CampaignStatusChanged {
                campaign_id,
                from,
                to: CampaignStatus::Pending,
            });
        }
        Ok(bid)
    }

    /// Withdraw a pending bid. Accepted or rejected bids stay put.
    pub async fn withdraw_bid(&self, bid_id: Uuid) -> ResultEngine<Bid> {
        self.bid(bid_id).await?;
        let updated = bids::Entity::update_many()
            .col_expr(
                bids::Column::Status,
                Expr::value(BidStatus::Withdrawn.as_str()),
            )
            .filter(bids::Column::Id.eq(bid_id.to_string()))
            .filter(bids::Column::Status.eq(BidStatus::Pending.as_str()))
            .exec(&self.database)
            .await?;
        if updated.rows_affected != 1 {
            return Err(EngineError::InvalidTransition(format!(
                "bid {bid_id} is not pending"
            )));
        }
        self.bid(bid_id).await
    }

    /// Accept one bid: the winner is marked, every sibling pending bid is
    /// rejected, the bid amount is locked from the brand's balance and the
    /// campaign moves to `accepted`, all in one transaction.
    pub async fn accept_bid(
        &self,
        bid_id: Uuid,
        auto_release_at: Option<DateTime<Utc>>,
        idempotency_key: &str,
    ) -> ResultEngine<Campaign> {
        let mut attempt = 0;
        loop {
            match self
                .try_accept_bid(bid_id, auto_release_at, idempotency_key)
                .await
            {
                Err(EngineError::ConcurrentModification(msg))
                    if attempt + 1 < MAX_CONFLICT_RETRIES =>
                {
                    attempt += 1;
                    tracing::debug!(%bid_id, attempt, "retrying bid acceptance: {msg}");
                }
                other => return other,
            }
        }
    }

    async fn try_accept_bid(
        &self,
        bid_id: Uuid,
        auto_release_at: Option<DateTime<Utc>>,
        idempotency_key: &str,
    ) -> ResultEngine<Campaign> {
        let (campaign, bid, hold) = with_tx!(self, |db_tx| {
            let bid = self.bid_on(&db_tx, bid_id).await?;
            if bid.status != BidStatus::Pending {
                return Err(EngineError::InvalidTransition(format!(
                    "bid {} is {}, expected pending",
                    bid.id,
                    bid.status.as_str()
                )));
            }
            let campaign = self.campaign_on(&db_tx, bid.campaign_id).await?;
            if !campaign.status.can_transition(CampaignStatus::Accepted) {
                return Err(EngineError::InvalidTransition(format!(
                    "{} -> accepted",
                    campaign.status.as_str()
                )));
            }

            // Claim the winner first; the status filter linearizes racing
            // acceptances on the same bid.
            let won = bids::Entity::update_many()
                .col_expr(
                    bids::Column::Status,
                    Expr::value(BidStatus::Accepted.as_str()),
                )
                .filter(bids::Column::Id.eq(bid.id.to_string()))
                .filter(bids::Column::Status.eq(BidStatus::Pending.as_str()))
                .exec(&db_tx)
                .await?;
            if won.rows_affected != 1 {
                return Err(EngineError::InvalidTransition(format!(
                    "bid {} is no longer pending",
                    bid.id
                )));
            }
            bids::Entity::update_many()
                .col_expr(
                    bids::Column::Status,
                    Expr::value(BidStatus::Rejected.as_str()),
                )
                .filter(bids::Column::CampaignId.eq(campaign.id.to_string()))
                .filter(bids::Column::Status.eq(BidStatus::Pending.as_str()))
                .filter(bids::Column::Id.ne(bid.id.to_string()))
                .exec(&db_tx)
                .await?;

            let hold = self
                .lock_in(
                    &db_tx,
                    campaign.id,
                    campaign.brand_id,
                    bid.amount_minor,
                    auto_release_at,
                    idempotency_key,
                )
                .await?;
            self.persist_campaign_transition(
                &db_tx,
                &campaign,
                CampaignStatus::Accepted,
                Some(bid.influencer_id),
                Some(Some(hold.id)),
            )
            .await?;
            Ok((campaign, bid, hold))
        })?;

        self.emit(EngineEvent::BidAccepted {
            campaign_id: campaign.id,
            bid_id: bid.id,
            influencer_id: bid.influencer_id,
        });
        self.emit(EngineEvent::CampaignStatusChanged {
            campaign_id: campaign.id,
            from: campaign.status,
            to: CampaignStatus::Accepted,
        });
        self.emit(EngineEvent::HoldLocked {
            hold_id: hold.id,
            campaign_id: campaign.id,
            amount_minor: hold.amount_minor,
        });
        self.campaign(campaign.id).await
    }

    /// Step a campaign through the delivery workflow. Funded settlement
    /// moves (`accepted`, `completed`, `cancelled`, `disputed`) have their
    /// own operations and are rejected here.
    pub async fn transition_campaign(
        &self,
        campaign_id: Uuid,
        to: CampaignStatus,
    ) -> ResultEngine<Campaign> {
        use CampaignStatus::*;
        if !matches!(
            to,
            Pending | InProgress | DraftSubmitted | RevisionRequested | DraftApproved | Published
        ) {
            return Err(EngineError::Validation(format!(
                "{} has a dedicated operation",
                to.as_str()
            )));
        }

        let mut attempt = 0;
        loop {
            match self.try_transition_campaign(campaign_id, to).await {
                Err(EngineError::ConcurrentModification(msg))
                    if attempt + 1 < MAX_CONFLICT_RETRIES =>
                {
                    attempt += 1;
                    tracing::debug!(%campaign_id, attempt, "retrying transition: {msg}");
                }
                other => return other,
            }
        }
    }

    async fn try_transition_campaign(
        &self,
        campaign_id: Uuid,
        to: CampaignStatus,
    ) -> ResultEngine<Campaign> {
        let from = with_tx!(self, |db_tx| {
            let campaign = self.campaign_on(&db_tx, campaign_id).await?;
            self.persist_campaign_transition(&db_tx, &campaign, to, None, None)
                .await?;
            Ok(campaign.status)
        })?;

        self.emit(EngineEvent::CampaignStatusChanged {
            campaign_id,
            from,
            to,
        });
        self.campaign(campaign_id).await
    }

    /// Complete a published campaign: release the escrowed funds to the
    /// influencer minus the campaign's platform fee.
    pub async fn complete_campaign(
        &self,
        campaign_id: Uuid,
        idempotency_key: &str,
    ) -> ResultEngine<Campaign> {
        let mut attempt = 0;
        loop {
            match self.try_complete_campaign(campaign_id, idempotency_key).await {
                Err(EngineError::ConcurrentModification(msg))
                    if attempt + 1 < MAX_CONFLICT_RETRIES =>
                {
                    attempt += 1;
                    tracing::debug!(%campaign_id, attempt, "retrying completion: {msg}");
                }
                other => return other,
            }
        }
    }

    async fn try_complete_campaign(
        &self,
        campaign_id: Uuid,
        idempotency_key: &str,
    ) -> ResultEngine<Campaign> {
        let (campaign, hold, payee, fee_minor) = with_tx!(self, |db_tx| {
            let campaign = self.campaign_on(&db_tx, campaign_id).await?;
            if campaign.status == CampaignStatus::Disputed {
                return Err(EngineError::InvalidTransition(
                    "a disputed campaign settles through its dispute".to_string(),
                ));
            }
            if !campaign.status.can_transition(CampaignStatus::Completed) {
                return Err(EngineError::InvalidTransition(format!(
                    "{} -> completed",
                    campaign.status.as_str()
                )));
            }
            let (hold, payee) = self.funded_parties(&db_tx, &campaign).await?;
            let fee_minor = MoneyCents::new(hold.amount_minor)
                .percent_floor(campaign.platform_fee_pct)
                .cents();
            self.release_in(&db_tx, &hold, payee, fee_minor, idempotency_key)
                .await?;
            self.persist_campaign_transition(
                &db_tx,
                &campaign,
                CampaignStatus::Completed,
                None,
                Some(None),
            )
            .await?;
            Ok((campaign, hold, payee, fee_minor))
        })?;

        self.emit(EngineEvent::HoldReleased {
            hold_id: hold.id,
            payee_account_id: payee,
            amount_minor: hold.amount_minor,
            platform_fee_minor: fee_minor,
        });
        self.emit(EngineEvent::CampaignStatusChanged {
            campaign_id,
            from: campaign.status,
            to: CampaignStatus::Completed,
        });
        self.campaign(campaign_id).await
    }

    /// Cancel a campaign before work starts. An existing hold is refunded
    /// to the brand in full.
    pub async fn cancel_campaign(
        &self,
        campaign_id: Uuid,
        idempotency_key: &str,
    ) -> ResultEngine<Campaign> {
        let mut attempt = 0;
        loop {
            match self.try_cancel_campaign(campaign_id, idempotency_key).await {
                Err(EngineError::ConcurrentModification(msg))
                    if attempt + 1 < MAX_CONFLICT_RETRIES =>
                {
                    attempt += 1;
                    tracing::debug!(%campaign_id, attempt, "retrying cancellation: {msg}");
                }
                other => return other,
            }
        }
    }

    async fn try_cancel_campaign(
        &self,
        campaign_id: Uuid,
        idempotency_key: &str,
    ) -> ResultEngine<Campaign> {
        let (campaign, refunded) = with_tx!(self, |db_tx| {
            let campaign = self.campaign_on(&db_tx, campaign_id).await?;
            if !campaign.status.is_cancellable() {
                return Err(EngineError::InvalidTransition(format!(
                    "{} campaigns cannot be cancelled",
                    campaign.status.as_str()
                )));
            }
            let refunded = match campaign.escrow_hold_id {
                Some(hold_id) => {
                    let hold = self.hold_on(&db_tx, hold_id).await?;
                    self.refund_in(&db_tx, &hold, idempotency_key).await?;
                    Some(hold)
                }
                None => None,
            };
            self.persist_campaign_transition(
                &db_tx,
                &campaign,
                CampaignStatus::Cancelled,
                None,
                Some(None),
            )
            .await?;
            Ok((campaign, refunded))
        })?;

        if let Some(hold) = refunded {
            self.emit(EngineEvent::HoldRefunded {
                hold_id: hold.id,
                amount_minor: hold.amount_minor,
            });
        }
        self.emit(EngineEvent::CampaignStatusChanged {
            campaign_id,
            from: campaign.status,
            to: CampaignStatus::Cancelled,
        });
        self.campaign(campaign_id).await
    }

    /// Resolve the hold and influencer a funded campaign settles against.
    pub(crate) async fn funded_parties(
        &self,
        db_tx: &DatabaseTransaction,
        campaign: &Campaign,
    ) -> ResultEngine<(EscrowHold, Uuid)> {
        let hold_id = campaign.escrow_hold_id.ok_or_else(|| {
            EngineError::InvariantViolation(format!(
                "funded campaign {} has no escrow hold",
                campaign.id
            ))
        })?;
        let payee = campaign.influencer_id.ok_or_else(|| {
            EngineError::InvariantViolation(format!(
                "funded campaign {} has no influencer",
                campaign.id
            ))
        })?;
        let hold = self.hold_on(db_tx, hold_id).await?;
        Ok((hold, payee))
    }

    /// Apply a checked state transition with an optimistic version guard.
    pub(crate) async fn persist_campaign_transition(
        &self,
        db_tx: &DatabaseTransaction,
        campaign: &Campaign,
        to: CampaignStatus,
        influencer_id: Option<Uuid>,
        escrow_hold_id: Option<Option<Uuid>>,
    ) -> ResultEngine<()> {
        if !campaign.status.can_transition(to) {
            return Err(EngineError::InvalidTransition(format!(
                "{} -> {}",
                campaign.status.as_str(),
                to.as_str()
            )));
        }
        self.persist_campaign_status(db_tx, campaign, to, influencer_id, escrow_hold_id)
            .await
    }

    /// The raw versioned update. Only dispute closure uses this without the
    /// transition check, to restore the pre-dispute status.
    pub(crate) async fn persist_campaign_status(
        &self,
        db_tx: &DatabaseTransaction,
        campaign: &Campaign,
        to: CampaignStatus,
        influencer_id: Option<Uuid>,
        escrow_hold_id: Option<Option<Uuid>>,
    ) -> ResultEngine<()> {
        let mut update = campaigns::Entity::update_many()
            .col_expr(campaigns::Column::Status, Expr::value(to.as_str()))
            .col_expr(campaigns::Column::Version, Expr::value(campaign.version + 1));
        if let Some(influencer_id) = influencer_id {
            update = update.col_expr(
                campaigns::Column::InfluencerId,
                Expr::value(influencer_id.to_string()),
            );
        }
        if let Some(hold_id) = escrow_hold_id {
            update = update.col_expr(
                campaigns::Column::EscrowHoldId,
                Expr::value(hold_id.map(|id| id.to_string())),
            );
        }
        let result = update
            .filter(campaigns::Column::Id.eq(campaign.id.to_string()))
            .filter(campaigns::Column::Version.eq(campaign.version))
            .exec(db_tx)
            .await?;
        if result.rows_affected != 1 {
            return Err(EngineError::ConcurrentModification(format!(
                "campaign {} changed underneath the update",
                campaign.id
            )));
        }
        Ok(())
    }
}

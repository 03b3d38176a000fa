use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    BalanceKind, CampaignStatus, Currency, EngineError, EngineEvent, EscrowHold, HoldStatus,
    ResultEngine, Transaction, TransactionKind, holds,
};

use super::{Engine, ledger::PostRequest, with_tx};

/// Idempotency key for the secondary transaction a settlement may produce
/// alongside its primary one.
fn derived_key(key: &str, suffix: &str) -> String {
    format!("{key}/{suffix}")
}

impl Engine {
    /// Move funds from a payer's available balance into escrow for a
    /// campaign.
    pub async fn lock(
        &self,
        campaign_id: Uuid,
        payer_account_id: Uuid,
        amount_minor: i64,
        auto_release_at: Option<DateTime<Utc>>,
        idempotency_key: &str,
    ) -> ResultEngine<EscrowHold> {
        let hold = with_tx!(self, |db_tx| {
            let hold = self
                .lock_in(
                    &db_tx,
                    campaign_id,
                    payer_account_id,
                    amount_minor,
                    auto_release_at,
                    idempotency_key,
                )
                .await?;
            Ok(hold)
        })?;
        self.emit(EngineEvent::HoldLocked {
            hold_id: hold.id,
            campaign_id,
            amount_minor: hold.amount_minor,
        });
        Ok(hold)
    }

    pub(crate) async fn lock_in(
        &self,
        db_tx: &DatabaseTransaction,
        campaign_id: Uuid,
        payer_account_id: Uuid,
        amount_minor: i64,
        auto_release_at: Option<DateTime<Utc>>,
        idempotency_key: &str,
    ) -> ResultEngine<EscrowHold> {
        if self
            .find_by_idempotency_key(db_tx, idempotency_key)
            .await?
            .is_some()
        {
            return self.hold_for_campaign_on(db_tx, campaign_id).await;
        }

        let hold = EscrowHold::new(
            campaign_id,
            payer_account_id,
            amount_minor,
            Currency::default(),
            auto_release_at,
            Utc::now(),
        );
        self.post_in(
            db_tx,
            PostRequest {
                kind: TransactionKind::EscrowLock,
                amount_minor,
                related_entity_id: Some(campaign_id),
                idempotency_key: Some(idempotency_key.to_string()),
                created_by: payer_account_id.to_string(),
                movements: vec![
                    (payer_account_id, BalanceKind::Available, -amount_minor),
                    (payer_account_id, BalanceKind::Held, amount_minor),
                ],
            },
        )
        .await?;
        holds::ActiveModel::from(&hold).insert(db_tx).await?;
        Ok(hold)
    }

    /// Settle a hold to the payee, optionally carving out a platform fee.
    /// Returns the release transaction and, when a fee applies, the fee
    /// transaction.
    pub async fn release(
        &self,
        hold_id: Uuid,
        payee_account_id: Uuid,
        platform_fee_minor: i64,
        idempotency_key: &str,
    ) -> ResultEngine<Vec<Transaction>> {
        let (hold, txs) = with_tx!(self, |db_tx| {
            let hold = self.hold_on(&db_tx, hold_id).await?;
            let txs = self
                .release_in(
                    &db_tx,
                    &hold,
                    payee_account_id,
                    platform_fee_minor,
                    idempotency_key,
                )
                .await?;
            Ok((hold, txs))
        })?;
        self.emit(EngineEvent::HoldReleased {
            hold_id: hold.id,
            payee_account_id,
            amount_minor: hold.amount_minor,
            platform_fee_minor,
        });
        Ok(txs)
    }

    pub(crate) async fn release_in(
        &self,
        db_tx: &DatabaseTransaction,
        hold: &EscrowHold,
        payee_account_id: Uuid,
        platform_fee_minor: i64,
        idempotency_key: &str,
    ) -> ResultEngine<Vec<Transaction>> {
        if let Some(original) = self.find_by_idempotency_key(db_tx, idempotency_key).await? {
            let mut txs = vec![original];
            if let Some(fee_tx) = self
                .find_by_idempotency_key(db_tx, &derived_key(idempotency_key, "fee"))
                .await?
            {
                txs.push(fee_tx);
            }
            return Ok(txs);
        }

        if !(0..=hold.amount_minor).contains(&platform_fee_minor) {
            return Err(EngineError::Validation(format!(
                "platform fee {platform_fee_minor} must be between 0 and the held {}",
                hold.amount_minor
            )));
        }
        self.settle_hold(db_tx, hold, HoldStatus::Released).await?;

        let release_tx = self
            .post_in(
                db_tx,
                PostRequest {
                    kind: TransactionKind::EscrowRelease,
                    amount_minor: hold.amount_minor,
                    related_entity_id: Some(hold.campaign_id),
                    idempotency_key: Some(idempotency_key.to_string()),
                    created_by: payee_account_id.to_string(),
                    movements: vec![
                        (hold.payer_account_id, BalanceKind::Held, -hold.amount_minor),
                        (payee_account_id, BalanceKind::Available, hold.amount_minor),
                    ],
                },
            )
            .await?;
        let mut txs = vec![release_tx];

        if platform_fee_minor > 0 {
            let fee_tx = self
                .post_in(
                    db_tx,
                    PostRequest {
                        kind: TransactionKind::PlatformFee,
                        amount_minor: platform_fee_minor,
                        related_entity_id: Some(hold.campaign_id),
                        idempotency_key: Some(derived_key(idempotency_key, "fee")),
                        created_by: payee_account_id.to_string(),
                        movements: vec![
                            (payee_account_id, BalanceKind::Available, -platform_fee_minor),
                            (
                                self.platform_account_id,
                                BalanceKind::Available,
                                platform_fee_minor,
                            ),
                        ],
                    },
                )
                .await?;
            txs.push(fee_tx);
        }
        Ok(txs)
    }

    /// Return held funds to the payer in full.
    pub async fn refund(&self, hold_id: Uuid, idempotency_key: &str) -> ResultEngine<Transaction> {
        let (hold, tx) = with_tx!(self, |db_tx| {
            let hold = self.hold_on(&db_tx, hold_id).await?;
            let tx = self.refund_in(&db_tx, &hold, idempotency_key).await?;
            Ok((hold, tx))
        })?;
        self.emit(EngineEvent::HoldRefunded {
            hold_id: hold.id,
            amount_minor: hold.amount_minor,
        });
        Ok(tx)
    }

    pub(crate) async fn refund_in(
        &self,
        db_tx: &DatabaseTransaction,
        hold: &EscrowHold,
        idempotency_key: &str,
    ) -> ResultEngine<Transaction> {
        if let Some(original) = self.find_by_idempotency_key(db_tx, idempotency_key).await? {
            return Ok(original);
        }

        self.settle_hold(db_tx, hold, HoldStatus::Refunded).await?;
        self.post_in(
            db_tx,
            PostRequest {
                kind: TransactionKind::EscrowRefund,
                amount_minor: hold.amount_minor,
                related_entity_id: Some(hold.campaign_id),
                idempotency_key: Some(idempotency_key.to_string()),
                created_by: hold.payer_account_id.to_string(),
                movements: vec![
                    (hold.payer_account_id, BalanceKind::Held, -hold.amount_minor),
                    (
                        hold.payer_account_id,
                        BalanceKind::Available,
                        hold.amount_minor,
                    ),
                ],
            },
        )
        .await
    }

    /// Split a hold between the payee and the payer. The percentages must
    /// sum to 100; any cent lost to flooring the refund goes to the payee so
    /// the split always exhausts the hold.
    pub async fn split(
        &self,
        hold_id: Uuid,
        payee_account_id: Uuid,
        payee_pct: u8,
        payer_refund_pct: u8,
        idempotency_key: &str,
    ) -> ResultEngine<Vec<Transaction>> {
        let (hold, txs) = with_tx!(self, |db_tx| {
            let hold = self.hold_on(&db_tx, hold_id).await?;
            let txs = self
                .split_in(
                    &db_tx,
                    &hold,
                    payee_account_id,
                    payee_pct,
                    payer_refund_pct,
                    idempotency_key,
                )
                .await?;
            Ok((hold, txs))
        })?;
        let refund_minor = crate::MoneyCents::new(hold.amount_minor)
            .percent_floor(payer_refund_pct)
            .cents();
        self.emit(EngineEvent::HoldSplit {
            hold_id: hold.id,
            payee_minor: hold.amount_minor - refund_minor,
            refund_minor,
        });
        Ok(txs)
    }

    pub(crate) async fn split_in(
        &self,
        db_tx: &DatabaseTransaction,
        hold: &EscrowHold,
        payee_account_id: Uuid,
        payee_pct: u8,
        payer_refund_pct: u8,
        idempotency_key: &str,
    ) -> ResultEngine<Vec<Transaction>> {
        if u16::from(payee_pct) + u16::from(payer_refund_pct) != 100 {
            return Err(EngineError::Validation(format!(
                "split percentages must sum to 100, got {payee_pct} + {payer_refund_pct}"
            )));
        }

        if let Some(original) = self.find_by_idempotency_key(db_tx, idempotency_key).await? {
            let mut txs = vec![original];
            if let Some(refund_tx) = self
                .find_by_idempotency_key(db_tx, &derived_key(idempotency_key, "refund"))
                .await?
            {
                txs.push(refund_tx);
            }
            return Ok(txs);
        }

        self.settle_hold(db_tx, hold, HoldStatus::Split).await?;

        let refund_minor = crate::MoneyCents::new(hold.amount_minor)
            .percent_floor(payer_refund_pct)
            .cents();
        let payee_minor = hold.amount_minor - refund_minor;

        let mut txs = Vec::new();
        if payee_minor > 0 {
            txs.push(
                self.post_in(
                    db_tx,
                    PostRequest {
                        kind: TransactionKind::EscrowRelease,
                        amount_minor: payee_minor,
                        related_entity_id: Some(hold.campaign_id),
                        idempotency_key: Some(idempotency_key.to_string()),
                        created_by: payee_account_id.to_string(),
                        movements: vec![
                            (hold.payer_account_id, BalanceKind::Held, -payee_minor),
                            (payee_account_id, BalanceKind::Available, payee_minor),
                        ],
                    },
                )
                .await?,
            );
        }
        if refund_minor > 0 {
            // When nothing goes to the payee the refund carries the primary
            // key, so replays still find a transaction.
            let key = if payee_minor > 0 {
                derived_key(idempotency_key, "refund")
            } else {
                idempotency_key.to_string()
            };
            txs.push(
                self.post_in(
                    db_tx,
                    PostRequest {
                        kind: TransactionKind::EscrowRefund,
                        amount_minor: refund_minor,
                        related_entity_id: Some(hold.campaign_id),
                        idempotency_key: Some(key),
                        created_by: hold.payer_account_id.to_string(),
                        movements: vec![
                            (hold.payer_account_id, BalanceKind::Held, -refund_minor),
                            (hold.payer_account_id, BalanceKind::Available, refund_minor),
                        ],
                    },
                )
                .await?,
            );
        }
        Ok(txs)
    }

    /// Flip an active hold to a terminal status. The status filter makes
    /// exactly one settlement win when two race on the same hold.
    async fn settle_hold(
        &self,
        db_tx: &DatabaseTransaction,
        hold: &EscrowHold,
        to: HoldStatus,
    ) -> ResultEngine<()> {
        if hold.status != HoldStatus::Active {
            return Err(EngineError::InvalidHoldState(format!(
                "hold {} is {}, expected active",
                hold.id,
                hold.status.as_str()
            )));
        }
        let updated = holds::Entity::update_many()
            .col_expr(holds::Column::Status, Expr::value(to.as_str()))
            .filter(holds::Column::Id.eq(hold.id.to_string()))
            .filter(holds::Column::Status.eq(HoldStatus::Active.as_str()))
            .exec(db_tx)
            .await?;
        if updated.rows_affected != 1 {
            return Err(EngineError::InvalidHoldState(format!(
                "hold {} was already settled",
                hold.id
            )));
        }
        Ok(())
    }

    pub async fn hold(&self, hold_id: Uuid) -> ResultEngine<EscrowHold> {
        self.hold_on(&self.database, hold_id).await
    }

    pub(crate) async fn hold_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        hold_id: Uuid,
    ) -> ResultEngine<EscrowHold> {
        let model = holds::Entity::find_by_id(hold_id.to_string())
            .one(conn)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("escrow hold {hold_id}")))?;
        EscrowHold::try_from(model)
    }

    pub(crate) async fn hold_for_campaign_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        campaign_id: Uuid,
    ) -> ResultEngine<EscrowHold> {
        let model = holds::Entity::find()
            .filter(holds::Column::CampaignId.eq(campaign_id.to_string()))
            .one(conn)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("hold for campaign {campaign_id}")))?;
        EscrowHold::try_from(model)
    }

    /// Settle every active hold whose auto-release deadline has passed.
    /// Only campaigns that reached `published` are completed; anything else
    /// is left for a manual decision. Returns how many holds were released.
    pub async fn release_due_holds(&self, now: DateTime<Utc>) -> ResultEngine<usize> {
        let due = holds::Entity::find()
            .filter(holds::Column::Status.eq(HoldStatus::Active.as_str()))
            .filter(holds::Column::AutoReleaseAt.is_not_null())
            .filter(holds::Column::AutoReleaseAt.lte(now))
            .all(&self.database)
            .await?;

        let mut released = 0;
        for model in due {
            let hold = EscrowHold::try_from(model)?;
            let campaign = match self.campaign(hold.campaign_id).await {
                Ok(campaign) => campaign,
                Err(err) => {
                    tracing::warn!(hold_id = %hold.id, "skipping auto-release: {err}");
                    continue;
                }
            };
            if campaign.status != CampaignStatus::Published {
                tracing::debug!(
                    campaign_id = %campaign.id,
                    status = campaign.status.as_str(),
                    "deadline passed but the campaign is not published yet"
                );
                continue;
            }
            let key = format!("auto-release:{}", hold.id);
            match self.complete_campaign(campaign.id, &key).await {
                Ok(_) => released += 1,
                Err(err) => {
                    tracing::warn!(hold_id = %hold.id, campaign_id = %campaign.id, "auto-release failed: {err}");
                }
            }
        }
        Ok(released)
    }
}

use chrono::Utc;
use sea_orm::{TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    AffiliateOrder, BalanceKind, Currency, EngineError, EngineEvent, ResultEngine, TransactionKind,
    commission,
    commission::RateTerms,
    orders,
};

use super::{Engine, ledger::PostRequest, with_tx};

/// A confirmed affiliate sale awaiting commission settlement. The order id
/// comes from the storefront and doubles as the idempotency scope.
#[derive(Clone, Debug)]
pub struct FulfillOrderRequest {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub brand_id: Uuid,
    pub affiliate_id: Uuid,
    pub gross_amount_minor: i64,
    pub commission: RateTerms,
    pub platform_fee: RateTerms,
}

impl Engine {
    /// Settle the commission for a fulfilled order: the brand funds the
    /// gross commission, the affiliate receives the net payout and the
    /// platform keeps its fee. Replaying an order id returns the stored
    /// order untouched.
    pub async fn fulfill_order(&self, request: FulfillOrderRequest) -> ResultEngine<AffiliateOrder> {
        let breakdown = commission::compute(
            request.gross_amount_minor,
            request.commission,
            request.platform_fee,
        )?;

        let order = with_tx!(self, |db_tx| {
            if let Some(existing) = orders::Entity::find_by_id(request.order_id.to_string())
                .one(&db_tx)
                .await?
            {
                return AffiliateOrder::try_from(existing);
            }
            self.account_on(&db_tx, request.brand_id).await?;
            self.account_on(&db_tx, request.affiliate_id).await?;

            if breakdown.gross_commission_minor > 0 {
                let mut movements = vec![
                    (
                        request.brand_id,
                        BalanceKind::Available,
                        -breakdown.gross_commission_minor,
                    ),
                    (
                        request.affiliate_id,
                        BalanceKind::Available,
                        breakdown.net_commission_minor,
                    ),
                ];
                if breakdown.platform_fee_minor > 0 {
                    movements.push((
                        self.platform_account_id,
                        BalanceKind::Available,
                        breakdown.platform_fee_minor,
                    ));
                }
                self.post_in(
                    &db_tx,
                    PostRequest {
                        kind: TransactionKind::Commission,
                        amount_minor: breakdown.gross_commission_minor,
                        related_entity_id: Some(request.order_id),
                        idempotency_key: Some(format!("order:{}", request.order_id)),
                        created_by: request.brand_id.to_string(),
                        movements,
                    },
                )
                .await?;
            } else {
                tracing::debug!(order_id = %request.order_id, "order carries no commission");
            }

            let order = AffiliateOrder {
                id: request.order_id,
                product_id: request.product_id,
                affiliate_id: request.affiliate_id,
                brand_id: request.brand_id,
                gross_amount_minor: request.gross_amount_minor,
                commission: request.commission,
                platform_fee: request.platform_fee,
                breakdown,
                currency: Currency::default(),
                created_at: Utc::now(),
            };
            orders::ActiveModel::from(&order).insert(&db_tx).await?;
            Ok(order)
        })?;

        self.emit(EngineEvent::OrderFulfilled {
            order_id: order.id,
            affiliate_id: order.affiliate_id,
            net_commission_minor: order.breakdown.net_commission_minor,
        });
        Ok(order)
    }

    pub async fn affiliate_order(&self, order_id: Uuid) -> ResultEngine<AffiliateOrder> {
        let model = orders::Entity::find_by_id(order_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("order {order_id}")))?;
        AffiliateOrder::try_from(model)
    }
}

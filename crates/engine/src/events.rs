//! Domain events emitted by the engine.
//!
//! Events are fire-and-forget: emission never blocks a command and a closed
//! or lagging receiver is silently ignored. The notification collaborator
//! subscribes through `Engine::subscribe`.

use uuid::Uuid;

use crate::CampaignStatus;

#[derive(Clone, Debug)]
pub enum EngineEvent {
    DepositConfirmed {
        account_id: Uuid,
        amount_minor: i64,
    },
    WithdrawalConfirmed {
        account_id: Uuid,
        amount_minor: i64,
    },
    BidAccepted {
        campaign_id: Uuid,
        bid_id: Uuid,
        influencer_id: Uuid,
    },
    CampaignStatusChanged {
        campaign_id: Uuid,
        from: CampaignStatus,
        to: CampaignStatus,
    },
    HoldLocked {
        hold_id: Uuid,
        campaign_id: Uuid,
        amount_minor: i64,
    },
    HoldReleased {
        hold_id: Uuid,
        payee_account_id: Uuid,
        amount_minor: i64,
        platform_fee_minor: i64,
    },
    HoldRefunded {
        hold_id: Uuid,
        amount_minor: i64,
    },
    HoldSplit {
        hold_id: Uuid,
        payee_minor: i64,
        refund_minor: i64,
    },
    DisputeRaised {
        dispute_id: Uuid,
        campaign_id: Uuid,
    },
    DisputeResolved {
        dispute_id: Uuid,
        campaign_id: Uuid,
        refund_percentage: u8,
    },
    DisputeClosed {
        dispute_id: Uuid,
        campaign_id: Uuid,
    },
    OrderFulfilled {
        order_id: Uuid,
        affiliate_id: Uuid,
        net_commission_minor: i64,
    },
}

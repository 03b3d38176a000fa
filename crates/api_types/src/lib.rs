use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Kes,
}

pub mod account {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PartyKind {
        Brand,
        Influencer,
        Affiliate,
        Platform,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub party: PartyKind,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: Uuid,
        pub party: PartyKind,
        pub available_minor: i64,
        pub held_minor: i64,
        pub currency: Currency,
    }

    /// Request body for confirmed gateway deposits and withdrawals.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct FundsMove {
        pub amount_minor: i64,
        /// Idempotency key for safely retrying the same confirmation.
        pub idempotency_key: String,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Deposit,
        Withdrawal,
        EscrowLock,
        EscrowRelease,
        EscrowRefund,
        PlatformFee,
        Commission,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub currency: Currency,
        pub related_entity_id: Option<Uuid>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }
}

pub mod campaign {
    use super::*;

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

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CampaignNew {
        pub budget_minor: i64,
        /// Platform cut applied at completion, 0..=100.
        pub platform_fee_pct: u8,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CampaignView {
        pub id: Uuid,
        pub brand_id: Uuid,
        pub influencer_id: Option<Uuid>,
        pub budget_minor: i64,
        pub platform_fee_pct: u8,
        pub currency: Currency,
        pub status: CampaignStatus,
        pub escrow_hold_id: Option<Uuid>,
    }

    /// Workflow step request; funded moves have dedicated endpoints.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CampaignTransition {
        pub to: CampaignStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CampaignSettle {
        /// Idempotency key for safely retrying the same settlement.
        pub idempotency_key: String,
    }
}

pub mod bid {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum BidStatus {
        Pending,
        Accepted,
        Rejected,
        Withdrawn,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BidNew {
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BidView {
        pub id: Uuid,
        pub campaign_id: Uuid,
        pub influencer_id: Uuid,
        pub amount_minor: i64,
        pub status: BidStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BidListResponse {
        pub bids: Vec<BidView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BidAccept {
        /// When set, escrow auto-releases after this deadline once the
        /// campaign is published.
        pub auto_release_at: Option<DateTime<Utc>>,
        pub idempotency_key: String,
    }
}

pub mod dispute {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DisputeStatus {
        Open,
        UnderReview,
        Resolved,
        Closed,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DisputeNew {
        pub reason: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DisputeView {
        pub id: Uuid,
        pub campaign_id: Uuid,
        pub raised_by: Uuid,
        pub reason: String,
        pub status: DisputeStatus,
        pub resolution: Option<String>,
        pub refund_percentage: Option<u8>,
        pub resolved_in_favor_of: Option<Uuid>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DisputeResolve {
        /// Arbiter's written justification, at least 20 characters.
        pub resolution: String,
        /// Share of the escrowed funds refunded to the brand, 0..=100.
        pub refund_percentage: u8,
        pub resolved_in_favor_of: Uuid,
        pub resolved_by: String,
        pub idempotency_key: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DisputeClose {
        pub reason: String,
    }
}

pub mod order {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum RateKind {
        Percentage,
        Fixed,
    }

    /// A commission or fee rate: percent of the base for `percentage`,
    /// minor units for `fixed`.
    #[derive(Clone, Copy, Debug, Serialize, Deserialize)]
    pub struct Rate {
        pub kind: RateKind,
        pub value: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderFulfill {
        /// Storefront order id; replays of the same id return the stored
        /// settlement.
        pub order_id: Uuid,
        pub product_id: Uuid,
        pub brand_id: Uuid,
        pub affiliate_id: Uuid,
        pub gross_amount_minor: i64,
        pub commission: Rate,
        pub platform_fee: Rate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderView {
        pub id: Uuid,
        pub product_id: Uuid,
        pub brand_id: Uuid,
        pub affiliate_id: Uuid,
        pub gross_amount_minor: i64,
        pub gross_commission_minor: i64,
        pub platform_fee_minor: i64,
        pub net_commission_minor: i64,
        pub currency: Currency,
    }
}

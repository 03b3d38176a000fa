//! Marketplace settlement engine.
//!
//! The engine is the single owner of money inside the marketplace: it tracks
//! brand, influencer, affiliate and platform balances through an append-only
//! double-entry ledger, reserves campaign funds in escrow holds, drives the
//! campaign/bid lifecycle, prices affiliate commissions and settles disputes.
//!
//! Everything else (HTTP surface, payment gateway, notifications) lives in
//! sibling crates and talks to this one through [`Engine`].

pub use accounts::{Account, PartyKind};
pub use bids::{Bid, BidStatus};
pub use campaigns::{Campaign, CampaignStatus};
pub use commission::{CommissionBreakdown, RateKind, RateTerms};
pub use currency::Currency;
pub use disputes::{Dispute, DisputeStatus};
pub use entries::{BalanceKind, Entry};
pub use error::EngineError;
pub use events::EngineEvent;
pub use holds::{EscrowHold, HoldStatus};
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder, FulfillOrderRequest, PostRequest};
pub use orders::AffiliateOrder;
pub use transactions::{Transaction, TransactionKind, TransactionStatus};

mod accounts;
mod bids;
mod campaigns;
pub mod commission;
mod currency;
mod disputes;
mod entries;
mod error;
mod events;
mod holds;
mod money;
mod ops;
mod orders;
mod transactions;

type ResultEngine<T> = Result<T, EngineError>;

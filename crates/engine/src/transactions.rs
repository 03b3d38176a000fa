//! Ledger transaction headers.
//!
//! A `Transaction` is an immutable, append-only event that changes balances
//! via one or more [`Entry`](crate::Entry) rows. Corrections are new
//! offsetting transactions; nothing here is ever updated after insert.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine};

use super::entries;

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

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::EscrowLock => "escrow_lock",
            Self::EscrowRelease => "escrow_release",
            Self::EscrowRefund => "escrow_refund",
            Self::PlatformFee => "platform_fee",
            Self::Commission => "commission",
        }
    }

    /// `true` for kinds that exchange money with the outside world (payment
    /// gateway). External kinds are the only ones whose entries may sum to a
    /// non-zero total; every internal kind must conserve money exactly.
    pub fn is_external(self) -> bool {
        matches!(self, Self::Deposit | Self::Withdrawal)
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "escrow_lock" => Ok(Self::EscrowLock),
            "escrow_release" => Ok(Self::EscrowRelease),
            "escrow_refund" => Ok(Self::EscrowRefund),
            "platform_fee" => Ok(Self::PlatformFee),
            "commission" => Ok(Self::Commission),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(EngineError::Validation(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub currency: Currency,
    /// Campaign or order this transaction settles, when there is one.
    pub related_entity_id: Option<Uuid>,
    pub status: TransactionStatus,
    pub idempotency_key: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<entries::Entry>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: TransactionKind,
        amount_minor: i64,
        currency: Currency,
        related_entity_id: Option<Uuid>,
        idempotency_key: Option<String>,
        created_by: String,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            amount_minor,
            currency,
            related_entity_id,
            status: TransactionStatus::Success,
            idempotency_key,
            created_by,
            created_at,
            entries: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub currency: String,
    pub related_entity_id: Option<String>,
    pub status: String,
    pub idempotency_key: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::entries::Entity")]
    Entries,
}

impl Related<super::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            related_entity_id: ActiveValue::Set(tx.related_entity_id.map(|id| id.to_string())),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            idempotency_key: ActiveValue::Set(tx.idempotency_key.clone()),
            created_by: ActiveValue::Set(tx.created_by.clone()),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            related_entity_id: model
                .related_entity_id
                .and_then(|s| Uuid::parse_str(&s).ok()),
            status: TransactionStatus::try_from(model.status.as_str())?,
            idempotency_key: model.idempotency_key,
            created_by: model.created_by,
            created_at: model.created_at,
            entries: Vec::new(),
        })
    }
}

//! Ledger entries.
//!
//! An [`Entry`] is a single balance change applied to one side of an account
//! (available or held) as part of a [`Transaction`](crate::Transaction).
//!
//! Amounts are stored as signed integer **minor units**:
//! - positive values increase the targeted balance
//! - negative values decrease it
//!
//! In the engine, *every* change to balances happens via entries, and for
//! internal transaction kinds the signed amounts of one transaction sum to
//! zero (double-entry conservation).

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError};

/// Which of an account's two balances an entry targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceKind {
    Available,
    Held,
}

impl BalanceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Held => "held",
        }
    }
}

impl TryFrom<&str> for BalanceKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "available" => Ok(Self::Available),
            "held" => Ok(Self::Held),
            other => Err(EngineError::Validation(format!(
                "invalid balance kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub balance: BalanceKind,
    pub amount_minor: i64,
    pub currency: Currency,
}

impl Entry {
    pub fn new(
        transaction_id: Uuid,
        account_id: Uuid,
        balance: BalanceKind,
        amount_minor: i64,
        currency: Currency,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id,
            account_id,
            balance,
            amount_minor,
            currency,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub transaction_id: String,
    pub account_id: String,
    pub balance: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Transactions,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Entry> for ActiveModel {
    fn from(entry: &Entry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            transaction_id: ActiveValue::Set(entry.transaction_id.to_string()),
            account_id: ActiveValue::Set(entry.account_id.to_string()),
            balance: ActiveValue::Set(entry.balance.as_str().to_string()),
            amount_minor: ActiveValue::Set(entry.amount_minor),
            currency: ActiveValue::Set(entry.currency.code().to_string()),
        }
    }
}

impl TryFrom<Model> for Entry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::Validation("invalid entry id".to_string()))?,
            transaction_id: Uuid::parse_str(&model.transaction_id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            account_id: Uuid::parse_str(&model.account_id)
                .map_err(|_| EngineError::UnknownAccount(model.account_id.clone()))?,
            balance: BalanceKind::try_from(model.balance.as_str())?,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
        })
    }
}

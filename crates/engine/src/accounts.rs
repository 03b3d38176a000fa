//! Party accounts.
//!
//! One account per settlement party (brand, influencer, affiliate, or the
//! single platform account). An account carries two denormalized balances in
//! minor units: `available_minor` (spendable) and `held_minor` (reserved by
//! an escrow hold). Both change **only** through `Ledger::post`; the
//! `version` column backs the optimistic concurrency check used there.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError};

/// The role an account plays in settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Brand,
    Influencer,
    Affiliate,
    Platform,
}

impl PartyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Influencer => "influencer",
            Self::Affiliate => "affiliate",
            Self::Platform => "platform",
        }
    }
}

impl TryFrom<&str> for PartyKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "brand" => Ok(Self::Brand),
            "influencer" => Ok(Self::Influencer),
            "affiliate" => Ok(Self::Affiliate),
            "platform" => Ok(Self::Platform),
            other => Err(EngineError::Validation(format!(
                "invalid party kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub party: PartyKind,
    pub available_minor: i64,
    pub held_minor: i64,
    pub currency: Currency,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(party: PartyKind, currency: Currency, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            party,
            available_minor: 0,
            held_minor: 0,
            currency,
            version: 0,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub party: String,
    pub available_minor: i64,
    pub held_minor: i64,
    pub currency: String,
    pub version: i64,
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

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            party: ActiveValue::Set(account.party.as_str().to_string()),
            available_minor: ActiveValue::Set(account.available_minor),
            held_minor: ActiveValue::Set(account.held_minor),
            currency: ActiveValue::Set(account.currency.code().to_string()),
            version: ActiveValue::Set(account.version),
            created_at: ActiveValue::Set(account.created_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::UnknownAccount(model.id.clone()))?,
            party: PartyKind::try_from(model.party.as_str())?,
            available_minor: model.available_minor,
            held_minor: model.held_minor,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            version: model.version,
            created_at: model.created_at,
        })
    }
}

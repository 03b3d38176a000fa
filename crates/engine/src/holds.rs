//! Escrow holds.
//!
//! An [`EscrowHold`] reserves funds for one campaign: while `active`, the
//! amount sits in the payer's held balance and nowhere else. A hold has
//! exactly one terminal transition (`released`, `refunded` or `split`);
//! the escrow manager enforces that with a conditional status update so two
//! racing settlements cannot both win.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldStatus {
    Active,
    Released,
    Refunded,
    Split,
}

impl HoldStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Released => "released",
            Self::Refunded => "refunded",
            Self::Split => "split",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl TryFrom<&str> for HoldStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "released" => Ok(Self::Released),
            "refunded" => Ok(Self::Refunded),
            "split" => Ok(Self::Split),
            other => Err(EngineError::Validation(format!(
                "invalid hold status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowHold {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub payer_account_id: Uuid,
    pub amount_minor: i64,
    pub currency: Currency,
    pub status: HoldStatus,
    /// Deadline after which the sweeper may release the hold on its own.
    pub auto_release_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EscrowHold {
    pub fn new(
        campaign_id: Uuid,
        payer_account_id: Uuid,
        amount_minor: i64,
        currency: Currency,
        auto_release_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            payer_account_id,
            amount_minor,
            currency,
            status: HoldStatus::Active,
            auto_release_at,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "escrow_holds")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub campaign_id: String,
    pub payer_account_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub auto_release_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&EscrowHold> for ActiveModel {
    fn from(hold: &EscrowHold) -> Self {
        Self {
            id: ActiveValue::Set(hold.id.to_string()),
            campaign_id: ActiveValue::Set(hold.campaign_id.to_string()),
            payer_account_id: ActiveValue::Set(hold.payer_account_id.to_string()),
            amount_minor: ActiveValue::Set(hold.amount_minor),
            currency: ActiveValue::Set(hold.currency.code().to_string()),
            status: ActiveValue::Set(hold.status.as_str().to_string()),
            auto_release_at: ActiveValue::Set(hold.auto_release_at),
            created_at: ActiveValue::Set(hold.created_at),
        }
    }
}

impl TryFrom<Model> for EscrowHold {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("hold not exists".to_string()))?,
            campaign_id: Uuid::parse_str(&model.campaign_id)
                .map_err(|_| EngineError::KeyNotFound("campaign not exists".to_string()))?,
            payer_account_id: Uuid::parse_str(&model.payer_account_id)
                .map_err(|_| EngineError::UnknownAccount(model.payer_account_id.clone()))?,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            status: HoldStatus::try_from(model.status.as_str())?,
            auto_release_at: model.auto_release_at,
            created_at: model.created_at,
        })
    }
}

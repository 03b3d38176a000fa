use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{Account, Currency, EngineEvent, PartyKind, ResultEngine, accounts};

mod campaigns;
mod disputes;
mod escrow;
mod ledger;
mod orders;

pub use ledger::PostRequest;
pub use orders::FulfillOrderRequest;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: Result<_, $crate::EngineError> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Buffered domain events per subscriber; slow receivers lag, they never
/// block a command.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How many times a compound operation re-reads and retries after an
/// optimistic-lock conflict before surfacing `ConcurrentModification`.
pub(crate) const MAX_CONFLICT_RETRIES: u32 = 3;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    platform_account_id: Uuid,
    events: broadcast::Sender<EngineEvent>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The singleton account that collects platform fees.
    pub fn platform_account_id(&self) -> Uuid {
        self.platform_account_id
    }

    /// Subscribe to domain events emitted by settlement operations.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        // No receivers is fine; events are best-effort notifications.
        let _ = self.events.send(event);
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`, creating the platform fee account on first boot.
    pub async fn build(self) -> ResultEngine<Engine> {
        let existing = accounts::Entity::find()
            .filter(accounts::Column::Party.eq(PartyKind::Platform.as_str()))
            .one(&self.database)
            .await?;
        let platform_account_id = match existing {
            Some(model) => Account::try_from(model)?.id,
            None => {
                let account = Account::new(PartyKind::Platform, Currency::default(), Utc::now());
                accounts::ActiveModel::from(&account)
                    .insert(&self.database)
                    .await?;
                account.id
            }
        };
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Engine {
            database: self.database,
            platform_account_id,
            events,
        })
    }
}

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    Account, BalanceKind, Currency, EngineError, EngineEvent, Entry, PartyKind, ResultEngine,
    Transaction, TransactionKind, TransactionStatus, accounts, entries, transactions,
};

use super::{Engine, with_tx};

/// A journal posting: a transaction header plus the balance movements it
/// causes. Movements on internal kinds must sum to zero.
#[derive(Clone, Debug)]
pub struct PostRequest {
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub related_entity_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
    pub created_by: String,
    /// `(account, balance side, signed delta)` triples.
    pub movements: Vec<(Uuid, BalanceKind, i64)>,
}

impl Engine {
    /// Atomically post a transaction and apply its movements to the stored
    /// balances. Replays the original transaction when the idempotency key
    /// has been seen before.
    pub async fn post(&self, request: PostRequest) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let tx = self.post_in(&db_tx, request).await?;
            Ok(tx)
        })
    }

    pub(crate) async fn post_in(
        &self,
        db_tx: &DatabaseTransaction,
        request: PostRequest,
    ) -> ResultEngine<Transaction> {
        if request.movements.is_empty() {
            return Err(EngineError::Validation(
                "a transaction must move at least one balance".to_string(),
            ));
        }

        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(existing) = self.find_by_idempotency_key(db_tx, key).await? {
                return Ok(existing);
            }
        }

        if !request.kind.is_external() {
            let total: i64 = request.movements.iter().map(|(_, _, delta)| *delta).sum();
            if total != 0 {
                tracing::error!(
                    kind = request.kind.as_str(),
                    total,
                    "rejecting unbalanced transaction"
                );
                return Err(EngineError::InvariantViolation(format!(
                    "entries for a {} transaction must sum to zero, got {total}",
                    request.kind.as_str()
                )));
            }
        }

        let mut tx = Transaction::new(
            request.kind,
            request.amount_minor,
            Currency::default(),
            request.related_entity_id,
            request.idempotency_key,
            request.created_by,
            Utc::now(),
        )?;

        // Aggregate movements per account so each account is read and
        // version-checked exactly once.
        let mut touched: Vec<Uuid> = Vec::new();
        let mut deltas: HashMap<Uuid, (i64, i64)> = HashMap::new();
        for (account_id, balance, delta) in &request.movements {
            if !touched.contains(account_id) {
                touched.push(*account_id);
            }
            let slot = deltas.entry(*account_id).or_insert((0, 0));
            match balance {
                BalanceKind::Available => slot.0 += delta,
                BalanceKind::Held => slot.1 += delta,
            }
            tx.entries
                .push(Entry::new(tx.id, *account_id, *balance, *delta, tx.currency));
        }

        // Insert the header before touching balances: a concurrent writer
        // racing on the same idempotency key fails here, while nothing has
        // been applied yet, and we can return its transaction instead.
        if let Err(insert_err) = transactions::ActiveModel::from(&tx).insert(db_tx).await {
            if let Some(key) = tx.idempotency_key.as_deref() {
                if let Some(existing) = self.find_by_idempotency_key(db_tx, key).await? {
                    return Ok(existing);
                }
            }
            return Err(insert_err.into());
        }

        for account_id in &touched {
            let model = accounts::Entity::find_by_id(account_id.to_string())
                .one(db_tx)
                .await?
                .ok_or_else(|| EngineError::UnknownAccount(account_id.to_string()))?;
            let (d_available, d_held) = deltas[account_id];
            let new_available = model.available_minor + d_available;
            let new_held = model.held_minor + d_held;
            if new_available < 0 {
                return Err(EngineError::InsufficientFunds(format!(
                    "account {account_id} has {} available, movement needs {}",
                    model.available_minor, -d_available
                )));
            }
            if new_held < 0 {
                tracing::error!(%account_id, new_held, "held balance would go negative");
                return Err(EngineError::InvariantViolation(format!(
                    "held balance for account {account_id} would go negative"
                )));
            }
            let updated = accounts::Entity::update_many()
                .col_expr(accounts::Column::AvailableMinor, Expr::value(new_available))
                .col_expr(accounts::Column::HeldMinor, Expr::value(new_held))
                .col_expr(accounts::Column::Version, Expr::value(model.version + 1))
                .filter(accounts::Column::Id.eq(account_id.to_string()))
                .filter(accounts::Column::Version.eq(model.version))
                .exec(db_tx)
                .await?;
            if updated.rows_affected != 1 {
                return Err(EngineError::ConcurrentModification(format!(
                    "account {account_id} changed underneath the posting"
                )));
            }
        }

        for entry in &tx.entries {
            entries::ActiveModel::from(entry).insert(db_tx).await?;
        }

        Ok(tx)
    }

    pub(crate) async fn find_by_idempotency_key<C: ConnectionTrait>(
        &self,
        conn: &C,
        key: &str,
    ) -> ResultEngine<Option<Transaction>> {
        let Some(model) = transactions::Entity::find()
            .filter(transactions::Column::IdempotencyKey.eq(key))
            .one(conn)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(self.load_transaction(conn, model).await?))
    }

    async fn load_transaction<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: transactions::Model,
    ) -> ResultEngine<Transaction> {
        let mut tx = Transaction::try_from(model)?;
        let rows = entries::Entity::find()
            .filter(entries::Column::TransactionId.eq(tx.id.to_string()))
            .all(conn)
            .await?;
        tx.entries = rows
            .into_iter()
            .map(Entry::try_from)
            .collect::<Result<_, _>>()?;
        Ok(tx)
    }

    /// Open a zero-balance account for a marketplace party.
    pub async fn create_account(&self, party: PartyKind) -> ResultEngine<Account> {
        if party == PartyKind::Platform {
            return Err(EngineError::Validation(
                "the platform account is created at boot".to_string(),
            ));
        }
        let account = Account::new(party, Currency::default(), Utc::now());
        accounts::ActiveModel::from(&account)
            .insert(&self.database)
            .await?;
        Ok(account)
    }

    pub async fn account(&self, account_id: Uuid) -> ResultEngine<Account> {
        self.account_on(&self.database, account_id).await
    }

    pub(crate) async fn account_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: Uuid,
    ) -> ResultEngine<Account> {
        let model = accounts::Entity::find_by_id(account_id.to_string())
            .one(conn)
            .await?
            .ok_or_else(|| EngineError::UnknownAccount(account_id.to_string()))?;
        Account::try_from(model)
    }

    /// Credit confirmed gateway funds to an account.
    pub async fn deposit(
        &self,
        account_id: Uuid,
        amount_minor: i64,
        idempotency_key: &str,
    ) -> ResultEngine<Transaction> {
        let tx = self
            .post(PostRequest {
                kind: TransactionKind::Deposit,
                amount_minor,
                related_entity_id: None,
                idempotency_key: Some(idempotency_key.to_string()),
                created_by: account_id.to_string(),
                movements: vec![(account_id, BalanceKind::Available, amount_minor)],
            })
            .await?;
        self.emit(EngineEvent::DepositConfirmed {
            account_id,
            amount_minor,
        });
        Ok(tx)
    }

    /// Debit available funds for a confirmed payout. Held funds are never
    /// withdrawable.
    pub async fn withdraw(
        &self,
        account_id: Uuid,
        amount_minor: i64,
        idempotency_key: &str,
    ) -> ResultEngine<Transaction> {
        let tx = self
            .post(PostRequest {
                kind: TransactionKind::Withdrawal,
                amount_minor,
                related_entity_id: None,
                idempotency_key: Some(idempotency_key.to_string()),
                created_by: account_id.to_string(),
                movements: vec![(account_id, BalanceKind::Available, -amount_minor)],
            })
            .await?;
        self.emit(EngineEvent::WithdrawalConfirmed {
            account_id,
            amount_minor,
        });
        Ok(tx)
    }

    /// List the most recent transactions that touched an account, newest
    /// first.
    pub async fn list_transactions_for_account(
        &self,
        account_id: Uuid,
        limit: usize,
    ) -> ResultEngine<Vec<Transaction>> {
        let rows: Vec<(entries::Model, Option<transactions::Model>)> = entries::Entity::find()
            .filter(entries::Column::AccountId.eq(account_id.to_string()))
            .find_also_related(transactions::Entity)
            .all(&self.database)
            .await?;

        // A transaction can touch the same account on both balance sides;
        // keep one copy per header.
        let mut models: Vec<transactions::Model> = Vec::new();
        for (_, tx_model) in rows {
            let Some(tx_model) = tx_model else { continue };
            if !models.iter().any(|m| m.id == tx_model.id) {
                models.push(tx_model);
            }
        }
        models.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        models.truncate(limit);

        let mut txs = Vec::with_capacity(models.len());
        for model in models {
            txs.push(self.load_transaction(&self.database, model).await?);
        }
        Ok(txs)
    }

    /// Replay every successful entry against the stored balances and fail
    /// loudly on a mismatch. Returns the replayed `(available, held)` pair.
    pub async fn reconcile_account(&self, account_id: Uuid) -> ResultEngine<(i64, i64)> {
        let account = self.account(account_id).await?;
        let rows: Vec<(entries::Model, Option<transactions::Model>)> = entries::Entity::find()
            .filter(entries::Column::AccountId.eq(account_id.to_string()))
            .find_also_related(transactions::Entity)
            .all(&self.database)
            .await?;

        let mut available = 0i64;
        let mut held = 0i64;
        for (entry_model, tx_model) in rows {
            let Some(tx_model) = tx_model else { continue };
            if tx_model.status != TransactionStatus::Success.as_str() {
                continue;
            }
            let entry = Entry::try_from(entry_model)?;
            match entry.balance {
                BalanceKind::Available => available += entry.amount_minor,
                BalanceKind::Held => held += entry.amount_minor,
            }
        }

        if available != account.available_minor || held != account.held_minor {
            tracing::error!(
                %account_id,
                stored_available = account.available_minor,
                stored_held = account.held_minor,
                replayed_available = available,
                replayed_held = held,
                "entry replay does not match stored balances"
            );
            return Err(EngineError::InvariantViolation(format!(
                "account {account_id} replay mismatch: stored {}/{}, replayed {available}/{held}",
                account.available_minor, account.held_minor
            )));
        }
        Ok((available, held))
    }
}

//! Account and funding endpoints.

use api_types::account::{AccountNew, AccountView, FundsMove, PartyKind as ApiParty};
use api_types::transaction::{
    TransactionKind as ApiKind, TransactionListResponse, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    ServerError,
    server::{Caller, ServerState},
};

fn map_party(party: engine::PartyKind) -> ApiParty {
    match party {
        engine::PartyKind::Brand => ApiParty::Brand,
        engine::PartyKind::Influencer => ApiParty::Influencer,
        engine::PartyKind::Affiliate => ApiParty::Affiliate,
        engine::PartyKind::Platform => ApiParty::Platform,
    }
}

fn map_party_new(party: ApiParty) -> Result<engine::PartyKind, ServerError> {
    match party {
        ApiParty::Brand => Ok(engine::PartyKind::Brand),
        ApiParty::Influencer => Ok(engine::PartyKind::Influencer),
        ApiParty::Affiliate => Ok(engine::PartyKind::Affiliate),
        ApiParty::Platform => Err(ServerError::Generic(
            "platform accounts cannot be registered".to_string(),
        )),
    }
}

pub(crate) fn map_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Kes => api_types::Currency::Kes,
    }
}

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Deposit => ApiKind::Deposit,
        engine::TransactionKind::Withdrawal => ApiKind::Withdrawal,
        engine::TransactionKind::EscrowLock => ApiKind::EscrowLock,
        engine::TransactionKind::EscrowRelease => ApiKind::EscrowRelease,
        engine::TransactionKind::EscrowRefund => ApiKind::EscrowRefund,
        engine::TransactionKind::PlatformFee => ApiKind::PlatformFee,
        engine::TransactionKind::Commission => ApiKind::Commission,
    }
}

fn view(account: engine::Account) -> AccountView {
    AccountView {
        id: account.id,
        party: map_party(account.party),
        available_minor: account.available_minor,
        held_minor: account.held_minor,
        currency: map_currency(account.currency),
    }
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<Json<AccountView>, ServerError> {
    let party = map_party_new(payload.party)?;
    let account = state.engine.create_account(party).await?;
    Ok(Json(view(account)))
}

pub async fn get(
    Extension(_caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state.engine.account(id).await?;
    Ok(Json(view(account)))
}

pub async fn deposit(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<FundsMove>,
) -> Result<Json<AccountView>, ServerError> {
    state
        .engine
        .deposit(caller.0, payload.amount_minor, &payload.idempotency_key)
        .await?;
    let account = state.engine.account(caller.0).await?;
    Ok(Json(view(account)))
}

pub async fn withdraw(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<FundsMove>,
) -> Result<Json<AccountView>, ServerError> {
    state
        .engine
        .withdraw(caller.0, payload.amount_minor, &payload.idempotency_key)
        .await?;
    let account = state.engine.account(caller.0).await?;
    Ok(Json(view(account)))
}

pub async fn list_transactions(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let txs = state.engine.list_transactions_for_account(caller.0, 50).await?;
    let transactions = txs
        .into_iter()
        .map(|tx| TransactionView {
            id: tx.id,
            kind: map_kind(tx.kind),
            amount_minor: tx.amount_minor,
            currency: map_currency(tx.currency),
            related_entity_id: tx.related_entity_id,
            created_at: tx.created_at,
        })
        .collect();
    Ok(Json(TransactionListResponse { transactions }))
}
